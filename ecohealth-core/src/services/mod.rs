//! One function per remote call. Every failure comes back as a single
//! normalized [`PortalError`](crate::error::PortalError); success returns the
//! payload with any envelope removed.

mod auth;
mod chat;
mod feedback;
mod patient;

pub use auth::AuthService;
pub use chat::ChatService;
pub use feedback::FeedbackService;
pub use patient::PatientService;
