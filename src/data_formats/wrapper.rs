use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use super::{
    response::{ArtResponse, CommentResponse},
    Page,
};

/// The success envelope every handler answers with.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            status_code: status.as_u16(),
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Placeholder payload for responses that carry no data, rendered as `{}`.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Empty {}

#[derive(Debug, Deserialize, Serialize)]
pub struct MultipleArtsWrapper {
    pub arts: Vec<ArtResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MultipleCommentsWrapper {
    pub comments: Vec<CommentResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedArtsWrapper {
    pub liked_arts: Vec<ArtResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl MultipleArtsWrapper {
    pub fn new(arts: Vec<ArtResponse>, total: i64, page: Page) -> Self {
        MultipleArtsWrapper {
            arts,
            total,
            page: page.page,
            limit: page.limit,
        }
    }
}

impl MultipleCommentsWrapper {
    pub fn new(comments: Vec<CommentResponse>, total: i64, page: Page) -> Self {
        MultipleCommentsWrapper {
            comments,
            total,
            page: page.page,
            limit: page.limit,
        }
    }
}

impl LikedArtsWrapper {
    pub fn new(liked_arts: Vec<ArtResponse>, total: i64, page: Page) -> Self {
        LikedArtsWrapper {
            liked_arts,
            total,
            page: page.page,
            limit: page.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let response = ApiResponse::created(Empty::default(), "done");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "statusCode": 201,
                "success": true,
                "message": "done",
                "data": {}
            })
        );
    }
}
