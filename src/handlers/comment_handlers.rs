use std::sync::Arc;

use axum::{extract::Path, Extension};

use crate::{
    authentication::{AuthUser, MaybeUser},
    data_formats::{
        ApiResponse, CommentRequest, CommentResponse, Empty, MultipleCommentsWrapper, PageParams,
    },
    db_helpers::{
        add_comment_to_art_in_db, delete_comment_in_db, get_comment_by_id,
        get_comments_for_art_in_db, get_visible_art_by_id, update_comment_in_db,
    },
    errors::RequestError,
    ownership::ensure_owner,
    AppState,
};

use super::{parse_id, ApiResult, ValidJson, ValidQuery};

pub async fn get_art_comments(
    Extension(state): Extension<Arc<AppState>>,
    viewer: MaybeUser,
    Path(art_id): Path<String>,
    ValidQuery(params): ValidQuery<PageParams>,
) -> ApiResult<MultipleCommentsWrapper> {
    let art_id = parse_id(&art_id, "artId")?;
    let art = get_visible_art_by_id(&state.pool, art_id, viewer.get_id())
        .await?
        .ok_or(RequestError::NotFound("Art"))?;

    let page = params.into();
    let (comments, total) = get_comments_for_art_in_db(&state.pool, art.id, page).await?;
    let comments = comments.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(
        MultipleCommentsWrapper::new(comments, total, page),
        "Comments fetched successfully",
    ))
}

pub async fn add_comment(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(art_id): Path<String>,
    ValidJson(request): ValidJson<CommentRequest>,
) -> ApiResult<CommentResponse> {
    let art_id = parse_id(&art_id, "artId")?;
    let art = get_visible_art_by_id(&state.pool, art_id, Some(user.id))
        .await?
        .ok_or(RequestError::NotFound("Art"))?;

    let comment =
        add_comment_to_art_in_db(&state.pool, user.id, art.id, request.content.trim()).await?;
    Ok(ApiResponse::created(
        comment.into(),
        "Comment added successfully",
    ))
}

pub async fn update_comment(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
    ValidJson(request): ValidJson<CommentRequest>,
) -> ApiResult<CommentResponse> {
    let comment_id = parse_id(&comment_id, "commentId")?;
    let comment = ensure_owner(
        get_comment_by_id(&state.pool, comment_id),
        user.id,
        "Comment",
    )
    .await?;
    let comment = update_comment_in_db(&state.pool, comment.id, request.content.trim()).await?;
    Ok(ApiResponse::ok(
        comment.into(),
        "Comment updated successfully",
    ))
}

pub async fn delete_comment(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<Empty> {
    let comment_id = parse_id(&comment_id, "commentId")?;
    let comment = ensure_owner(
        get_comment_by_id(&state.pool, comment_id),
        user.id,
        "Comment",
    )
    .await?;
    delete_comment_in_db(&state.pool, comment.id).await?;
    Ok(ApiResponse::ok(Empty {}, "Comment deleted successfully"))
}
