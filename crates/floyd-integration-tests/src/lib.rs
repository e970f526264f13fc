//! Intentionally empty: this crate exists to host `tests/`, which exercise
//! the Agent Engine end-to-end against the scriptable fixtures in
//! `floyd-test`. See `tests/engine_scenarios.rs`.
