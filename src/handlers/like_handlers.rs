use std::sync::Arc;

use axum::{extract::Path, Extension};

use crate::{
    authentication::AuthUser,
    data_formats::{ApiResponse, LikedArtsWrapper, PageParams, ToggleLikeResponse},
    db_helpers::{get_comment_by_id, get_liked_arts_in_db, get_visible_art_by_id, toggle_like_in_db},
    errors::RequestError,
    models::LikeTarget,
    AppState,
};

use super::{parse_id, ApiResult, ValidQuery};

fn toggled(liked: bool, likes: i64, what: &str) -> ApiResponse<ToggleLikeResponse> {
    let verb = if liked { "liked" } else { "unliked" };
    ApiResponse::ok(
        ToggleLikeResponse { liked, likes },
        format!("{what} {verb} successfully"),
    )
}

pub async fn toggle_art_like(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(art_id): Path<String>,
) -> ApiResult<ToggleLikeResponse> {
    let art_id = parse_id(&art_id, "artId")?;
    let art = get_visible_art_by_id(&state.pool, art_id, Some(user.id))
        .await?
        .ok_or(RequestError::NotFound("Art"))?;

    let (liked, likes) = toggle_like_in_db(&state.pool, user.id, LikeTarget::Art(art.id)).await?;
    tracing::debug!(art_id = art.id, user_id = user.id, liked, likes, "toggled art like");
    Ok(toggled(liked, likes, "Art"))
}

pub async fn toggle_comment_like(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<ToggleLikeResponse> {
    let comment_id = parse_id(&comment_id, "commentId")?;
    let comment = get_comment_by_id(&state.pool, comment_id)
        .await?
        .ok_or(RequestError::NotFound("Comment"))?;
    // comments under an art the requester cannot see do not exist for them
    get_visible_art_by_id(&state.pool, comment.art_id, Some(user.id))
        .await?
        .ok_or(RequestError::NotFound("Comment"))?;

    let (liked, likes) =
        toggle_like_in_db(&state.pool, user.id, LikeTarget::Comment(comment.id)).await?;
    Ok(toggled(liked, likes, "Comment"))
}

pub async fn get_liked_arts(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidQuery(params): ValidQuery<PageParams>,
) -> ApiResult<LikedArtsWrapper> {
    let page = params.into();
    let (arts, total) = get_liked_arts_in_db(&state.pool, user.id, page).await?;
    let arts = arts.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(
        LikedArtsWrapper::new(arts, total, page),
        "Liked arts fetched successfully",
    ))
}
