//! Client-side checks run before a form is submitted. A failing check means
//! no request is sent.

use crate::error::{PortalError, PortalResult};
use crate::models::{FeedbackDraft, LoginCredentials, ProfileUpdate};

/// Emojis offered on the feedback form, happiest first.
pub const EMOJI_PALETTE: [&str; 12] = [
    "😀", "😄", "😊", "🙂", "😌", "😐", "😑", "😕", "😟", "😢", "😠", "😡",
];

pub const MIN_PASSWORD_LEN: usize = 6;
pub const PHONE_NUMBER_LEN: usize = 9;
pub const MAX_STAR_RATING: u8 = 5;

/// Same acceptance as `\S+@\S+\.\S+` anywhere in the input.
pub fn looks_like_email(input: &str) -> bool {
    input.split_whitespace().any(|token| {
        let chars: Vec<char> = token.chars().collect();
        let Some(at) = chars.iter().skip(1).position(|c| *c == '@').map(|p| p + 1) else {
            return false;
        };
        chars
            .iter()
            .enumerate()
            .rev()
            .any(|(i, c)| *c == '.' && i >= at + 2 && i + 1 < chars.len())
    })
}

pub fn validate_login(email: &str, password: &str) -> PortalResult<LoginCredentials> {
    let email = email.trim();
    if email.is_empty() {
        return Err(PortalError::validation("email", "Email is required"));
    }
    if !looks_like_email(email) {
        return Err(PortalError::validation(
            "email",
            "Please enter a valid email address",
        ));
    }
    if password.is_empty() {
        return Err(PortalError::validation("password", "Password is required"));
    }
    Ok(LoginCredentials::new(email, password))
}

/// Raw profile form input. Empty strings mean "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub notification_preferences: String,
    pub language_preferences: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub fn validate_new_password(password: &str, confirmation: &str) -> PortalResult<()> {
    let field = "new_password";
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::validation(
            field,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PortalError::validation(
            field,
            "Password must contain at least one number",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PortalError::validation(
            field,
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PortalError::validation(
            field,
            "Password must contain at least one lowercase letter",
        ));
    }
    if password != confirmation {
        return Err(PortalError::validation(
            "confirm_password",
            "Passwords do not match",
        ));
    }
    Ok(())
}

pub fn validate_profile(form: &ProfileForm) -> PortalResult<ProfileUpdate> {
    let email = form.email.trim();
    if !email.is_empty() && !looks_like_email(email) {
        return Err(PortalError::validation(
            "email",
            "Please enter a valid email address",
        ));
    }

    let phone = form.phone_number.trim();
    if !phone.is_empty() && phone.chars().count() != PHONE_NUMBER_LEN {
        return Err(PortalError::validation(
            "phone_number",
            "Please enter a valid phone number",
        ));
    }

    if !form.new_password.trim().is_empty() {
        validate_new_password(&form.new_password, &form.confirm_password)?;
    }

    let update = ProfileUpdate {
        first_name: Some(form.first_name.clone()),
        last_name: Some(form.last_name.clone()),
        email: Some(form.email.clone()),
        phone_number: Some(form.phone_number.clone()),
        address: Some(form.address.clone()),
        notification_preferences: Some(form.notification_preferences.clone()),
        language_preferences: Some(form.language_preferences.clone()),
        password: Some(form.new_password.clone()),
    }
    .normalized();

    if update.is_empty() {
        return Err(PortalError::NothingToSubmit("No changes to save".to_string()));
    }
    Ok(update)
}

pub fn validate_feedback(draft: &FeedbackDraft) -> PortalResult<()> {
    if !draft.has_content() {
        return Err(PortalError::NothingToSubmit(
            "Please provide at least one type of feedback".to_string(),
        ));
    }
    if let Some(stars) = draft.star_rating {
        if !(1..=MAX_STAR_RATING).contains(&stars) {
            return Err(PortalError::validation(
                "star_rating",
                format!("Rating must be between 1 and {}", MAX_STAR_RATING),
            ));
        }
    }
    if let Some(emoji) = draft.emoji.as_deref().filter(|e| !e.is_empty()) {
        if !EMOJI_PALETTE.contains(&emoji) {
            return Err(PortalError::validation(
                "emoji",
                "Choose one of the available emojis",
            ));
        }
    }
    Ok(())
}

/// The message to send, trimmed.
pub fn validate_chat_message(input: &str) -> PortalResult<String> {
    let text = input.trim();
    if text.is_empty() {
        return Err(PortalError::validation("message", "Message cannot be empty"));
    }
    Ok(text.to_string())
}
