//! Floyd Core — shared data model and error taxonomy.
//!
//! Every type that crosses a crate boundary in the Floyd agent runtime lives
//! here: [`Message`] and its content blocks, [`Session`], [`ToolDescriptor`],
//! [`StreamEvent`], the permission [`PermissionRule`] type, the MCP server descriptor,
//! and the [`ErrorKind`] taxonomy. This crate has no I/O of its own — it is
//! pure data plus the invariant-preserving constructors that keep those
//! invariants true wherever a `Message` or `Session` is built.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]

pub mod cancel;
pub mod error;
pub mod mcp_descriptor;
pub mod message;
pub mod permission;
pub mod session;
pub mod stream_event;
pub mod token;
pub mod tool;

pub use cancel::CancelToken;
pub use error::{humanize, ErrorKind};
pub use mcp_descriptor::{McpConfigFile, McpServerDescriptor, Transport};
pub use message::{ContentBlock, Message, Role};
pub use permission::{PermissionRule, Verdict};
pub use session::{Session, SessionId, SessionSummary};
pub use stream_event::{StopReason, StreamEvent};
pub use tool::ToolDescriptor;
