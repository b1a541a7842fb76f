use chrono::NaiveDateTime;

/// A user row without its secrets. Everything that leaves the database
/// through this type is safe to hand back to clients.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub password: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChannelProfile {
    pub id: i64,
    pub username: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub arts_count: i64,
    pub total_likes: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Art {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub content: String,
    pub caption: String,
    pub likes: i64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub owner_username: String,
    pub owner_avatar: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub owner_id: i64,
    pub art_id: i64,
    pub content: String,
    pub likes: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub owner_username: String,
    pub owner_avatar: Option<String>,
}

/// The thing a like row points at. Exactly one per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Art(i64),
    Comment(i64),
}

impl LikeTarget {
    pub fn id(self) -> i64 {
        match self {
            LikeTarget::Art(id) | LikeTarget::Comment(id) => id,
        }
    }

    pub(crate) fn table(self) -> &'static str {
        match self {
            LikeTarget::Art(_) => "arts",
            LikeTarget::Comment(_) => "comments",
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            LikeTarget::Art(_) => "art_id",
            LikeTarget::Comment(_) => "comment_id",
        }
    }
}
