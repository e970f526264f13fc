//! The caller-visible event stream emitted by [`crate::AgentEngine::send_message`].

use floyd_core::ErrorKind;
use tokio::sync::oneshot;

/// The outcome of one tool dispatch, as reported to the caller.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// The tool (or the permission check) produced this text for the model.
    Success(String),
    /// The call failed; `message` is what was recorded as the tool result.
    Error {
        /// Why it failed.
        kind: ErrorKind,
        /// Detail text, also what the model sees as the tool result.
        message: String,
    },
}

/// How a caller resolves a [`EngineEvent::PermissionRequired`] pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResolution {
    /// Allow this one call; ask again next time.
    ApproveOnce,
    /// Allow for the rest of the process.
    ApproveSession,
    /// Allow permanently (persisted to the rules file).
    ApproveAlways,
    /// Refuse this call.
    Deny,
}

/// One event in the lazy sequence returned by [`crate::AgentEngine::send_message`].
///
/// The sequence always ends in exactly one of [`EngineEvent::Done`] or
/// [`EngineEvent::Error`] — never both, and never neither (see the
/// `sendMessage` contract in the crate docs).
#[derive(Debug)]
pub enum EngineEvent {
    /// A fragment of assistant-visible text.
    Text(String),
    /// A tool dispatch has begun (after permission was resolved to proceed).
    ToolStarted {
        /// The originating `tool_use` block's id.
        id: String,
        /// The tool's name.
        name: String,
    },
    /// A tool dispatch has concluded, successfully or not. Always carries
    /// the call's id so a caller running several tools in one batch can
    /// route the output to the right pending call (I2).
    ToolFinished {
        /// The originating `tool_use` block's id.
        id: String,
        /// The tool's name.
        name: String,
        /// What happened.
        output: ToolOutcome,
    },
    /// The Permission Manager's verdict for this call was `ask`; the engine
    /// is paused until `resolve` is sent to, or the turn's cancel token fires.
    PermissionRequired {
        /// The originating `tool_use` block's id.
        id: String,
        /// The tool awaiting a decision.
        tool_name: String,
        /// Send the human's decision here to resume the turn.
        resolve: oneshot::Sender<PermissionResolution>,
    },
    /// The turn ended abnormally. No further events follow.
    Error {
        /// The kind of failure.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },
    /// The turn ended normally (including by cancellation — see
    /// [`floyd_core::StopReason::Cancelled`], surfaced here as a plain `Done`
    /// per §7's "Cancelled ... Surface as a normal done with a cancellation
    /// marker").
    Done,
}
