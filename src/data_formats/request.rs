use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// ----------------- User Request -----------------
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct RegisterRequest {
    #[validate(custom = "not_blank")]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom = "not_blank")]
    pub password: String,
    #[serde(default)]
    pub fullname: Option<String>,
}

/// Either `username` or `email` identifies the account.
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[validate(custom = "not_blank")]
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(custom = "not_blank")]
    pub old_password: String,
    #[validate(custom = "not_blank")]
    pub new_password: String,
}

#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdateAccountRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(custom = "not_blank")]
    pub fullname: Option<String>,
}

// ----------------- Art Request -----------------
/// Text fields of the multipart art form. The media file travels alongside.
#[derive(Debug, Default, Validate)]
pub struct CreateArtRequest {
    #[validate(custom = "not_blank")]
    pub name: String,
    pub caption: Option<String>,
}

#[derive(Debug, Default, Validate)]
pub struct UpdateArtRequest {
    #[validate(custom = "not_blank")]
    pub name: Option<String>,
    pub caption: Option<String>,
}

// ----------------- Comment Request -----------------
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CommentRequest {
    #[validate(custom = "not_blank")]
    pub content: String,
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("required");
        error.message = Some("is required".into());
        return Err(error);
    }
    Ok(())
}
