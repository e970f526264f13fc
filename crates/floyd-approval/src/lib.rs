//! Floyd Approval — the Permission Manager.
//!
//! Computes a deterministic allow/ask/deny verdict for a tool name. Layers,
//! evaluated in this order by [`PermissionManager::check`]:
//!
//! 1. a one-shot `once` grant/deny table, consumed on first use;
//! 2. in-memory `session`-scope grants/denies, cleared at process exit;
//! 3. persisted `always`-scope grants/denies (loaded via `floyd-config`);
//! 4. the static configured rule list, first-match-wins glob patterns,
//!    `ask` if nothing matches.
//!
//! The manager itself never blocks: when the effective verdict is `ask`,
//! it is the Agent Engine's job to pause and later call [`PermissionManager::grant`]
//! or [`PermissionManager::deny`] with the user's resolution.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod manager;

pub use error::{ApprovalError, ApprovalResult};
pub use manager::{GrantScope, PermissionManager};
