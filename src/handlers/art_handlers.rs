use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path},
    Extension,
};
use validator::Validate;

use crate::{
    authentication::{AuthUser, MaybeUser},
    data_formats::{
        ApiResponse, ArtQueryParams, ArtResponse, CreateArtRequest, Empty, MultipleArtsWrapper,
        UpdateArtRequest,
    },
    db_helpers::{
        delete_art_in_db, get_art_by_id, get_visible_art_by_id, increment_views, insert_art,
        list_arts_in_db, record_history, toggle_publish_in_db, update_art_in_db, ArtChanges,
    },
    errors::RequestError,
    media::discard_media,
    ownership::ensure_owner,
    AppState,
};

use super::{parse_id, upload_form_file, ApiResult, MultipartForm, ValidQuery};

const ART_FILE_FIELD: &str = "artFile";

pub async fn get_all_arts(
    Extension(state): Extension<Arc<AppState>>,
    viewer: MaybeUser,
    ValidQuery(params): ValidQuery<ArtQueryParams>,
) -> ApiResult<MultipleArtsWrapper> {
    let (arts, total) = list_arts_in_db(&state.pool, viewer.get_id(), &params).await?;
    let arts = arts.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(
        MultipleArtsWrapper::new(arts, total, params.page()),
        "Arts fetched successfully",
    ))
}

pub async fn publish_art(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ArtResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let request = CreateArtRequest {
        name: form.text("name").unwrap_or_default(),
        caption: form.text("caption"),
    };
    request.validate()?;
    let file = form
        .take_file(ART_FILE_FIELD)
        .ok_or_else(|| RequestError::Validation {
            message: "Art file is required".to_owned(),
            errors: vec![format!("{ART_FILE_FIELD}: is required")],
        })?;

    let uploaded = upload_form_file(&state, file, "Error uploading art").await?;
    let caption = request.caption.unwrap_or_default();
    let art = match insert_art(
        &state.pool,
        user.id,
        request.name.trim(),
        &uploaded.url,
        caption.trim(),
    )
    .await
    {
        Ok(art) => art,
        Err(error) => {
            // no record points at the upload, so it must not outlive the request
            discard_media(state.media.as_ref(), Some(uploaded.url.as_str())).await;
            return Err(error);
        }
    };

    tracing::info!(art_id = art.id, owner_id = user.id, "published art");
    Ok(ApiResponse::created(art.into(), "Art published successfully"))
}

/// Serves one art and counts the view. Authenticated readers also get the
/// art pushed to the front of their history.
pub async fn get_art(
    Extension(state): Extension<Arc<AppState>>,
    viewer: MaybeUser,
    Path(art_id): Path<String>,
) -> ApiResult<ArtResponse> {
    let art_id = parse_id(&art_id, "artId")?;
    let mut art = get_visible_art_by_id(&state.pool, art_id, viewer.get_id())
        .await?
        .ok_or(RequestError::NotFound("Art"))?;

    art.views = increment_views(&state.pool, art.id)
        .await?
        .ok_or(RequestError::NotFound("Art"))?;

    if let Some(viewer_id) = viewer.get_id() {
        if let Err(error) = record_history(&state.pool, viewer_id, art.id).await {
            tracing::warn!(%error, art_id = art.id, "failed to record watch history");
        }
    }

    Ok(ApiResponse::ok(art.into(), "Art fetched successfully"))
}

pub async fn update_art(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(art_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ArtResponse> {
    let art_id = parse_id(&art_id, "artId")?;
    let mut form = MultipartForm::read(multipart).await?;
    let request = UpdateArtRequest {
        name: form.text("name"),
        caption: form.text("caption"),
    };
    request.validate()?;

    let art = ensure_owner(get_art_by_id(&state.pool, art_id), user.id, "Art").await?;

    let uploaded = match form.take_file(ART_FILE_FIELD) {
        Some(file) => Some(upload_form_file(&state, file, "Error uploading art").await?),
        None => None,
    };
    let changes = ArtChanges {
        name: request.name.map(|name| name.trim().to_owned()),
        caption: request.caption.map(|caption| caption.trim().to_owned()),
        content: uploaded.as_ref().map(|media| media.url.clone()),
    };

    let updated = match update_art_in_db(&state.pool, art.id, changes).await {
        Ok(updated) => updated,
        Err(error) => {
            if let Some(media) = &uploaded {
                discard_media(state.media.as_ref(), Some(media.url.as_str())).await;
            }
            return Err(error);
        }
    };

    let notice = match uploaded {
        Some(_) => discard_media(state.media.as_ref(), Some(art.content.as_str()))
            .await
            .notice(),
        None => "",
    };
    Ok(ApiResponse::ok(
        updated.into(),
        format!("Art updated successfully{notice}"),
    ))
}

pub async fn delete_art(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(art_id): Path<String>,
) -> ApiResult<Empty> {
    let art_id = parse_id(&art_id, "artId")?;
    let art = ensure_owner(get_art_by_id(&state.pool, art_id), user.id, "Art").await?;

    let cleanup = discard_media(state.media.as_ref(), Some(art.content.as_str())).await;
    delete_art_in_db(&state.pool, art.id).await?;

    tracing::info!(art_id = art.id, owner_id = user.id, "deleted art");
    Ok(ApiResponse::ok(
        Empty {},
        format!("Art deleted successfully{}", cleanup.notice()),
    ))
}

pub async fn toggle_publish_status(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(art_id): Path<String>,
) -> ApiResult<ArtResponse> {
    let art_id = parse_id(&art_id, "artId")?;
    let art = ensure_owner(get_art_by_id(&state.pool, art_id), user.id, "Art").await?;
    let art = toggle_publish_in_db(&state.pool, art.id).await?;
    let message = if art.is_published {
        "Art is now published"
    } else {
        "Art is now unpublished"
    };
    Ok(ApiResponse::ok(art.into(), message))
}
