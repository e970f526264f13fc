//! Floyd Config — provider defaults, MCP server list, and permission rules.
//!
//! Resolution precedence, lowest to highest:
//!
//! 1. built-in provider defaults ([`provider::defaults_for`]);
//! 2. `.floyd/mcp.json` (or `.floyd/mcp.config.json`) in the caller's
//!    working directory (MCP server list);
//! 3. `~/.config/floyd/permissions.toml` (via [`directories::ProjectDirs`])
//!    for persisted "always" permission rules;
//! 4. an explicit caller-constructed override, applied by the caller after
//!    loading.
//!
//! Nothing here blocks on the network or requires a provider credential to
//! be valid; it only resolves files to typed values.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod mcp_config;
pub mod provider;
mod rules_file;

pub use error::{ConfigError, ConfigResult};
pub use mcp_config::load_mcp_config;
pub use provider::{ProviderDefaults, ProviderTag};
pub use rules_file::{load_permission_rules, save_permission_rules, permissions_file_path};
