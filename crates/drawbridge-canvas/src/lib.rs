//! Canvas state and render feedback for Drawbridge.
//!
//! The canvas holds the single current diagram source being built across a
//! conversation. Every replacement goes through the feedback bridge, which
//! renders the new content and turns the outcome — image or error text — into
//! a new conversational input so the model can evaluate its own output.

pub mod feedback;
pub mod state;

pub use feedback::{Feedback, RenderFeedback};
pub use state::{CanvasSnapshot, CanvasState};
