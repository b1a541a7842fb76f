use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path},
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    authentication::{
        generate_access_token, generate_refresh_token, hash_password_argon2,
        verify_password_argon2, verify_refresh_token, with_auth_cookies, without_auth_cookies,
        AuthUser, REFRESH_TOKEN_COOKIE,
    },
    data_formats::{
        ApiResponse, ChangePasswordRequest, ChannelProfileResponse, Empty, LoginRequest,
        LoginResponse, MultipleArtsWrapper, PageParams, RefreshTokenRequest, RegisterRequest,
        TokenPairResponse, UpdateAccountRequest, UserResponse,
    },
    db_helpers::{
        get_channel_profile, get_user_by_id, get_user_by_identifier, get_user_credentials,
        insert_user, list_history, rotate_refresh_token, set_refresh_token, update_user_in_db,
        user_exists, NewUser, UserChanges,
    },
    errors::{is_unique_violation, RequestError},
    media::discard_media,
    models::User,
    AppState,
};

use super::{upload_form_file, ApiResult, MultipartForm, ValidJson, ValidQuery};

type CookieResult<T> = Result<(CookieJar, ApiResponse<T>), RequestError>;

/// Issues a fresh token pair and makes the refresh token the user's current one.
async fn issue_tokens(state: &AppState, user: &User) -> Result<(String, String), RequestError> {
    let access_token = generate_access_token(&state.config, user)?;
    let refresh_token = generate_refresh_token(&state.config, user.id)?;
    set_refresh_token(&state.pool, user.id, Some(&refresh_token)).await?;
    Ok((access_token, refresh_token))
}

pub async fn register_user(
    Extension(state): Extension<Arc<AppState>>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ApiResult<UserResponse> {
    let username = request.username.trim().to_lowercase();
    let email = request.email.trim().to_lowercase();

    const TAKEN: &str = "User with email or username already exists";
    if user_exists(&state.pool, &username, &email).await? {
        return Err(RequestError::Conflict(TAKEN));
    }

    let password_hash = hash_password_argon2(request.password).await?;
    let new_user = NewUser {
        username,
        email,
        fullname: request.fullname.unwrap_or_default().trim().to_owned(),
        password_hash,
    };
    // two registrations racing past the check above meet the unique index
    let user = insert_user(&state.pool, &new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            RequestError::Conflict(TAKEN)
        } else {
            e
        }
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "registered user");
    Ok(ApiResponse::created(
        user.into(),
        "User registered successfully",
    ))
}

pub async fn login_user(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(request): ValidJson<LoginRequest>,
) -> CookieResult<LoginResponse> {
    let username = request.username.as_deref().filter(|s| !s.trim().is_empty());
    let email = request.email.as_deref().filter(|s| !s.trim().is_empty());
    if username.is_none() && email.is_none() {
        return Err(RequestError::validation("username or email is required"));
    }

    // unknown account and wrong password look the same to the caller
    const REJECTED: RequestError = RequestError::NotAuthorized("Invalid credentials");
    let user = get_user_by_identifier(&state.pool, username, email)
        .await?
        .ok_or(REJECTED)?;
    let credentials = get_user_credentials(&state.pool, user.id)
        .await?
        .ok_or(REJECTED)?;
    if !verify_password_argon2(request.password, credentials.password).await? {
        tracing::debug!(user_id = user.id, "password mismatch");
        return Err(REJECTED);
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;
    let jar = with_auth_cookies(jar, &state.config, &access_token, &refresh_token);
    let response = LoginResponse {
        user: user.into(),
        access_token,
        refresh_token,
    };
    Ok((jar, ApiResponse::ok(response, "User logged in successfully")))
}

pub async fn logout_user(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> CookieResult<Empty> {
    set_refresh_token(&state.pool, user.id, None).await?;
    let jar = without_auth_cookies(jar, &state.config);
    Ok((jar, ApiResponse::ok(Empty {}, "User logged out")))
}

pub async fn refresh_access_token(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    payload: Option<Json<RefreshTokenRequest>>,
) -> Result<(CookieJar, ApiResponse<TokenPairResponse>), (CookieJar, RequestError)> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty())
        .or_else(|| payload.and_then(|Json(body)| body.refresh_token));

    match rotate_tokens(&state, presented).await {
        Ok((access_token, refresh_token)) => {
            let jar = with_auth_cookies(jar, &state.config, &access_token, &refresh_token);
            let tokens = TokenPairResponse {
                access_token,
                refresh_token,
            };
            Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
        }
        Err(error) => Err((without_auth_cookies(jar, &state.config), error)),
    }
}

async fn rotate_tokens(
    state: &AppState,
    presented: Option<String>,
) -> Result<(String, String), RequestError> {
    let presented = presented.ok_or(RequestError::NotAuthorized("Unauthorized request"))?;
    let user_id = verify_refresh_token(&state.config, &presented)?;
    let user = get_user_by_id(&state.pool, user_id)
        .await?
        .ok_or(RequestError::NotAuthorized("Invalid refresh token"))?;

    let access_token = generate_access_token(&state.config, &user)?;
    let refresh_token = generate_refresh_token(&state.config, user.id)?;
    if !rotate_refresh_token(&state.pool, user.id, &presented, &refresh_token).await? {
        tracing::debug!(user_id = user.id, "refresh token already used or revoked");
        return Err(RequestError::NotAuthorized(
            "Refresh token is expired or used",
        ));
    }
    Ok((access_token, refresh_token))
}

pub async fn change_password(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> ApiResult<Empty> {
    let credentials = get_user_credentials(&state.pool, user.id)
        .await?
        .ok_or(RequestError::NotFound("User"))?;
    if !verify_password_argon2(request.old_password, credentials.password).await? {
        return Err(RequestError::NotAuthorized("Invalid old password"));
    }

    let password_hash = hash_password_argon2(request.new_password).await?;
    let changes = UserChanges {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    update_user_in_db(&state.pool, user.id, changes).await?;
    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

pub async fn get_current_user(AuthUser(user): AuthUser) -> ApiResult<UserResponse> {
    Ok(ApiResponse::ok(
        user.into(),
        "Current user fetched successfully",
    ))
}

pub async fn update_account(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(request): ValidJson<UpdateAccountRequest>,
) -> ApiResult<UserResponse> {
    if request.email.is_none() && request.fullname.is_none() {
        return Err(RequestError::validation(
            "At least one of email or fullname is required",
        ));
    }
    let changes = UserChanges {
        email: request.email.map(|email| email.trim().to_lowercase()),
        fullname: request.fullname.map(|fullname| fullname.trim().to_owned()),
        ..Default::default()
    };
    let user = update_user_in_db(&state.pool, user.id, changes)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RequestError::Conflict("Email is already in use")
            } else {
                e
            }
        })?;
    Ok(ApiResponse::ok(
        user.into(),
        "Account details updated successfully",
    ))
}

#[derive(Clone, Copy)]
enum ProfileImage {
    Avatar,
    CoverImage,
}

impl ProfileImage {
    fn field(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::CoverImage => "coverImage",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "Avatar",
            ProfileImage::CoverImage => "Cover image",
        }
    }

    fn upload_failure(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "Error while uploading avatar",
            ProfileImage::CoverImage => "Error while uploading cover image",
        }
    }

    fn current(self, user: &User) -> Option<&str> {
        match self {
            ProfileImage::Avatar => user.avatar.as_deref(),
            ProfileImage::CoverImage => user.cover_image.as_deref(),
        }
    }

    fn changes(self, url: String) -> UserChanges {
        match self {
            ProfileImage::Avatar => UserChanges {
                avatar: Some(url),
                ..Default::default()
            },
            ProfileImage::CoverImage => UserChanges {
                cover_image: Some(url),
                ..Default::default()
            },
        }
    }
}

/// Upload the new image, point the user at it, then drop the old one.
async fn replace_profile_image(
    state: &AppState,
    user: User,
    multipart: Result<Multipart, MultipartRejection>,
    kind: ProfileImage,
) -> ApiResult<UserResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file(kind.field()).ok_or_else(|| RequestError::Validation {
        message: format!("{} file is missing", kind.label()),
        errors: vec![format!("{}: is required", kind.field())],
    })?;

    let uploaded = upload_form_file(state, file, kind.upload_failure()).await?;
    let updated = match update_user_in_db(&state.pool, user.id, kind.changes(uploaded.url.clone()))
        .await
    {
        Ok(updated) => updated,
        Err(error) => {
            discard_media(state.media.as_ref(), Some(uploaded.url.as_str())).await;
            return Err(error);
        }
    };

    let cleanup = discard_media(state.media.as_ref(), kind.current(&user)).await;
    Ok(ApiResponse::ok(
        updated.into(),
        format!("{} updated successfully{}", kind.label(), cleanup.notice()),
    ))
}

pub async fn update_user_avatar(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UserResponse> {
    replace_profile_image(&state, user, multipart, ProfileImage::Avatar).await
}

pub async fn update_user_cover_image(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UserResponse> {
    replace_profile_image(&state, user, multipart, ProfileImage::CoverImage).await
}

pub async fn get_user_channel_profile(
    Extension(state): Extension<Arc<AppState>>,
    Path(username): Path<String>,
) -> ApiResult<ChannelProfileResponse> {
    let profile = get_channel_profile(&state.pool, &username)
        .await?
        .ok_or(RequestError::NotFound("Channel"))?;
    Ok(ApiResponse::ok(
        profile.into(),
        "Channel profile fetched successfully",
    ))
}

pub async fn get_watch_history(
    Extension(state): Extension<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidQuery(params): ValidQuery<PageParams>,
) -> ApiResult<MultipleArtsWrapper> {
    let page = params.into();
    let (arts, total) = list_history(&state.pool, user.id, page).await?;
    let arts = arts.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(
        MultipleArtsWrapper::new(arts, total, page),
        "Watch history fetched successfully",
    ))
}
