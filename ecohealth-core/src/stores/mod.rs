//! UI-facing state with the actions that change it.
//!
//! Each action flips its pending flag, calls one service, then either
//! applies the result or records the error message and keeps the previous
//! state. Locks are only held for the synchronous updates.

mod auth;
mod chat;
mod feedback;
mod patient;

pub use auth::{AuthState, AuthStore};
pub use chat::{ChatState, ChatStore};
pub use feedback::{FeedbackState, FeedbackStore};
pub use patient::{PatientState, PatientStore};
