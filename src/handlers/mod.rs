mod art_handlers;
mod comment_handlers;
mod like_handlers;
mod user_handlers;

pub use art_handlers::*;
pub use comment_handlers::*;
pub use like_handlers::*;
pub use user_handlers::*;

use std::collections::HashMap;

use axum::{
    body::{Bytes, HttpBody},
    extract::{
        multipart::MultipartRejection, FromRequest, FromRequestParts, Multipart, Query,
    },
    http::{request::Parts, Request, Uri},
    BoxError, Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    data_formats::ApiResponse,
    errors::RequestError,
    media::{StagedFile, UploadedMedia},
    AppState,
};

type ApiResult<T> = Result<ApiResponse<T>, RequestError>;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> ApiResponse<&'static str> {
    ApiResponse::ok("OK", "Service is healthy")
}

pub async fn not_found(uri: Uri) -> RequestError {
    tracing::debug!(%uri, "no route matched");
    RequestError::NotFound("Route")
}

// ----------------- Extractors -----------------

/// JSON body that has passed its `Validate` rules.
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<T, S, B> FromRequest<S, B> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = RequestError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| RequestError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// Query string that has passed its `Validate` rules.
pub struct ValidQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| RequestError::validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidQuery(value))
    }
}

/// Path ids are positive integers; anything else is a client error naming
/// the parameter.
pub fn parse_id(raw: &str, name: &'static str) -> Result<i64, RequestError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(RequestError::validation(format!("Invalid {name}"))),
    }
}

// ----------------- Multipart -----------------

#[derive(Debug)]
pub struct FormFile {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Text fields and files of a multipart body, keyed by field name.
/// Later fields with the same name replace earlier ones.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FormFile>,
}

impl MultipartForm {
    pub async fn read(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Self, RequestError> {
        let mut multipart =
            multipart.map_err(|rejection| RequestError::validation(rejection.body_text()))?;
        let malformed = |e: axum::extract::multipart::MultipartError| {
            tracing::debug!(error = %e, "malformed multipart body");
            RequestError::validation("Malformed multipart body")
        };

        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = match field.name() {
                Some(name) => name.to_owned(),
                None => continue,
            };
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(malformed)?;
                    // browsers send an empty part for an untouched file input
                    if !bytes.is_empty() {
                        form.files.insert(
                            name,
                            FormFile {
                                file_name: Some(file_name),
                                bytes,
                            },
                        );
                    }
                }
                None => {
                    let text = field.text().await.map_err(malformed)?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn take_file(&mut self, name: &str) -> Option<FormFile> {
        self.files.remove(name)
    }
}

/// Stages `file` locally and pushes it to the media host. The staged copy is
/// gone afterwards either way.
async fn upload_form_file(
    state: &AppState,
    file: FormFile,
    failure: &'static str,
) -> Result<UploadedMedia, RequestError> {
    let staged = StagedFile::stage(&state.config.upload_dir, file.file_name.as_deref(), &file.bytes)
        .await
        .map_err(|error| {
            tracing::error!(%error, "failed to stage upload");
            RequestError::UploadFailed(failure)
        })?;
    staged.upload(state.media.as_ref()).await.map_err(|error| {
        tracing::warn!(%error, "media host rejected upload");
        RequestError::UploadFailed(failure)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_positive_integers() {
        assert_eq!(parse_id("42", "artId").unwrap(), 42);
    }

    #[test]
    fn parse_id_rejects_garbage() {
        for raw in ["abc", "0", "-3", "", "1.5"] {
            let error = parse_id(raw, "artId").unwrap_err();
            assert_eq!(error.to_string(), "Invalid artId");
        }
    }
}
