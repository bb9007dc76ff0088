//! Core types, config, errors, and the event stream for Drawbridge.

pub mod config;
pub mod error;
pub mod event;
pub mod transcript;
pub mod types;

pub use error::{AgentError, Result};
pub use event::{AgentEvent, EventSink, FailureKind};
pub use transcript::Turn;
pub use types::{ContentBlock, ImageSource};
