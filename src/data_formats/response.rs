use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Art, ChannelProfile, Comment, User};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfileResponse {
    pub id: i64,
    pub username: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub arts_count: i64,
    pub total_likes: i64,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct OwnerResponse {
    pub id: i64,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ArtResponse {
    pub id: i64,
    pub owner: OwnerResponse,
    pub name: String,
    pub content: String,
    pub caption: String,
    pub likes: i64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub art: i64,
    pub owner: OwnerResponse,
    pub content: String,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy)]
pub struct ToggleLikeResponse {
    pub liked: bool,
    pub likes: i64,
}

fn utc(timestamp: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&timestamp)
}

impl From<User> for UserResponse {
    fn from(
        User {
            id,
            username,
            email,
            fullname,
            avatar,
            cover_image,
            created_at,
            updated_at,
        }: User,
    ) -> Self {
        UserResponse {
            id,
            username,
            email,
            fullname,
            avatar,
            cover_image,
            created_at: utc(created_at),
            updated_at: utc(updated_at),
        }
    }
}

impl From<ChannelProfile> for ChannelProfileResponse {
    fn from(
        ChannelProfile {
            id,
            username,
            fullname,
            avatar,
            cover_image,
            arts_count,
            total_likes,
        }: ChannelProfile,
    ) -> Self {
        ChannelProfileResponse {
            id,
            username,
            fullname,
            avatar,
            cover_image,
            arts_count,
            total_likes,
        }
    }
}

impl From<Art> for ArtResponse {
    fn from(
        Art {
            id,
            owner_id,
            name,
            content,
            caption,
            likes,
            views,
            is_published,
            created_at,
            updated_at,
            owner_username,
            owner_avatar,
        }: Art,
    ) -> Self {
        ArtResponse {
            id,
            owner: OwnerResponse {
                id: owner_id,
                username: owner_username,
                avatar: owner_avatar,
            },
            name,
            content,
            caption,
            likes,
            views,
            is_published,
            created_at: utc(created_at),
            updated_at: utc(updated_at),
        }
    }
}

impl From<Comment> for CommentResponse {
    fn from(
        Comment {
            id,
            owner_id,
            art_id,
            content,
            likes,
            created_at,
            updated_at,
            owner_username,
            owner_avatar,
        }: Comment,
    ) -> Self {
        CommentResponse {
            id,
            art: art_id,
            owner: OwnerResponse {
                id: owner_id,
                username: owner_username,
                avatar: owner_avatar,
            },
            content,
            likes,
            created_at: utc(created_at),
            updated_at: utc(updated_at),
        }
    }
}
