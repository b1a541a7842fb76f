use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::JsonResponse;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    UploadFailed(&'static str),
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error(transparent)]
    ServerError(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestErrorJson {
    status_code: u16,
    success: bool,
    message: String,
    errors: Vec<String>,
    data: Option<()>,
}

impl RequestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Validation { .. } => StatusCode::BAD_REQUEST,
            RequestError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::Conflict(_) => StatusCode::CONFLICT,
            RequestError::UploadFailed(_)
            | RequestError::DatabaseError(_)
            | RequestError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJson> {
        let status_code = self.status_code();
        let (message, errors) = match self {
            RequestError::Validation { message, errors } => (message.clone(), errors.clone()),
            RequestError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                ("Internal Server Error".to_owned(), Vec::new())
            }
            RequestError::ServerError(e) => {
                tracing::error!(error = ?e, "unexpected server error");
                ("Internal Server Error".to_owned(), Vec::new())
            }
            RequestError::UploadFailed(message) => {
                tracing::error!(reason = *message, "media upload failed");
                (message.to_string(), Vec::new())
            }
            other => {
                tracing::debug!(error = %other, status = %status_code, "request rejected");
                (other.to_string(), Vec::new())
            }
        };
        let json = RequestErrorJson {
            status_code: status_code.as_u16(),
            success: false,
            message,
            errors,
            data: None,
        };
        (status_code, Json(json))
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl From<validator::ValidationErrors> for RequestError {
    fn from(value: validator::ValidationErrors) -> Self {
        let mut errors: Vec<String> = value
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |error| match &error.message {
                    Some(message) => format!("{field}: {message}"),
                    None => format!("{field}: {}", error.code),
                })
            })
            .collect();
        errors.sort();
        Self::Validation {
            message: "Invalid request".to_owned(),
            errors,
        }
    }
}

/// True when the error is a UNIQUE constraint violation reported by SQLite.
pub fn is_unique_violation(error: &RequestError) -> bool {
    match error {
        RequestError::DatabaseError(sqlx::Error::Database(e)) => {
            e.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_envelope() {
        let (status, Json(body)) = RequestError::NotFound("Art").to_json_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["statusCode"], 404);
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Art not found");
        assert_eq!(value["errors"], serde_json::json!([]));
        assert!(value["data"].is_null());
    }

    #[test]
    fn server_errors_hide_details() {
        let error = RequestError::ServerError(anyhow::anyhow!("secret connection string"));
        let (status, Json(body)) = error.to_json_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["message"], "Internal Server Error");
    }

    #[test]
    fn validation_errors_are_listed() {
        use validator::Validate;

        #[derive(Validate)]
        struct Payload {
            #[validate(length(min = 1, message = "is required"))]
            name: String,
        }

        let error: RequestError = Payload {
            name: String::new(),
        }
        .validate()
        .unwrap_err()
        .into();
        let (status, Json(body)) = error.to_json_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["errors"], serde_json::json!(["name: is required"]));
    }
}
