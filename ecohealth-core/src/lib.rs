//! Client library for the EcoHealth patient portal.
//!
//! Layers, leaves first: the persisted [`token`], the HTTP [`http`] bindings
//! to the auth, chat and feedback backends, one-call-per-function
//! [`services`], and the [`stores`] that views read and drive. A [`Portal`]
//! wires them together.

pub mod config;
pub mod directory;
pub mod error;
pub mod feedback_filter;
pub mod forms;
pub mod http;
pub mod logging;
pub mod models;
pub mod portal;
pub mod recording;
pub mod services;
pub mod session;
pub mod stores;
pub mod token;

pub use config::{
    get_config_dir, get_data_dir, AutoLogoutConfig, BackendsConfig, ChatConfig, DirectoryConfig,
    LoggingConfig, PortalConfig, SessionConfig,
};
pub use directory::{departments, filter_rows, merge_doctors, DoctorRow, JoinStrategy};
pub use error::{CliErrorDisplay, PortalError, PortalResult};
pub use feedback_filter::{DateBucket, FeedbackFilter, FeedbackKind, FeedbackSort};
pub use forms::{
    validate_chat_message, validate_feedback, validate_login, validate_profile, ProfileForm,
    EMOJI_PALETTE,
};
pub use http::{AutoLogoutPolicy, Binding, EndpointCategory, RequestFailure};
pub use logging::init_logging;
pub use models::{
    ChatAnswer, ChatHistory, ChatMessage, ChatMessagePatch, ChatQuery, Doctor, DoctorAssignment,
    FeedbackDraft, FeedbackRecord, LoginCredentials, LoginResponse, MessageKind, Patient,
    ProfileUpdate, VoiceChatAnswer,
};
pub use portal::Portal;
pub use recording::{FileRecorder, Recorder, VoiceClip};
pub use services::{AuthService, ChatService, FeedbackService, PatientService};
pub use session::{LogoutHook, LogoutReason, SessionAccess, SessionEvent};
pub use stores::{
    AuthState, AuthStore, ChatState, ChatStore, FeedbackState, FeedbackStore, PatientState,
    PatientStore,
};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
