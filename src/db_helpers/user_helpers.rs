use sqlx::{Sqlite, SqlitePool};

use crate::{
    data_formats::Page,
    errors::RequestError,
    models::{Art, ChannelProfile, User, UserCredentials},
};

use super::{QueryBuilder, ART_SELECT, NOW};

const USER_COLUMNS: &str =
    "id, username, email, fullname, avatar, cover_image, created_at, updated_at";

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password_hash: String,
}

#[derive(Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password_hash: Option<String>,
}

pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!(
        "INSERT INTO users (username, email, fullname, password) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<Sqlite, User>(&query)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.fullname)
        .bind(&user.password_hash)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(user)
}

pub async fn user_exists(
    pool: &SqlitePool,
    username: &str,
    email: &str,
) -> Result<bool, RequestError> {
    let matches = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT COUNT(*) FROM users WHERE username = $1 OR email = $2",
    )
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(matches > 0)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let user = sqlx::query_as::<Sqlite, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Looks a user up by username or email, whichever is given. Username wins.
pub async fn get_user_by_identifier(
    pool: &SqlitePool,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>, RequestError> {
    let (column, value) = match (username, email) {
        (Some(username), _) => ("username", username),
        (None, Some(email)) => ("email", email),
        (None, None) => return Ok(None),
    };
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
    let user = sqlx::query_as::<Sqlite, User>(&query)
        .bind(value.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_credentials(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<UserCredentials>, RequestError> {
    let credentials =
        sqlx::query_as::<Sqlite, UserCredentials>("SELECT password FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(credentials)
}

pub async fn update_user_in_db(
    pool: &SqlitePool,
    id: i64,
    UserChanges {
        email,
        fullname,
        avatar,
        cover_image,
        password_hash,
    }: UserChanges,
) -> Result<User, RequestError> {
    let builder = QueryBuilder::new("UPDATE users SET ", ", ")
        .add_param("email", email)
        .add_param("fullname", fullname)
        .add_param("avatar", avatar)
        .add_param("cover_image", cover_image)
        .add_param("password", password_hash)
        .touch(&format!("updated_at = {NOW}"));

    if let Some((query, params)) = builder.build(" WHERE id = ?") {
        let mut tx = pool.begin().await?;
        let mut query = sqlx::query(&query);
        for param in params {
            query = query.bind(param);
        }
        query.bind(id).execute(&mut tx).await?;
        tx.commit().await?;
    }

    get_user_by_id(pool, id).await?.ok_or(RequestError::NotFound("User"))
}

pub async fn set_refresh_token(
    pool: &SqlitePool,
    id: i64,
    token: Option<&str>,
) -> Result<(), RequestError> {
    sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2")
        .bind(token)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Swaps the stored refresh token for `next` only if it still equals
/// `presented`. Returns false when another rotation or a logout got there first.
pub async fn rotate_refresh_token(
    pool: &SqlitePool,
    id: i64,
    presented: &str,
    next: &str,
) -> Result<bool, RequestError> {
    let result =
        sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2 AND refresh_token = $3")
            .bind(next)
            .bind(id)
            .bind(presented)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn get_channel_profile(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<ChannelProfile>, RequestError> {
    let profile = sqlx::query_as::<Sqlite, ChannelProfile>(
        r#"
        SELECT users.id,
               users.username,
               users.fullname,
               users.avatar,
               users.cover_image,
               (SELECT COUNT(*) FROM arts
                 WHERE arts.owner_id = users.id AND arts.is_published)               AS arts_count,
               (SELECT COALESCE(SUM(arts.likes), 0) FROM arts
                 WHERE arts.owner_id = users.id AND arts.is_published)               AS total_likes
        FROM   users
        WHERE  users.username = $1
        "#,
    )
    .bind(username.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}

/// Moves `art_id` to the front of the user's history.
pub async fn record_history(
    pool: &SqlitePool,
    user_id: i64,
    art_id: i64,
) -> Result<(), RequestError> {
    let query = format!(
        "INSERT INTO user_history (user_id, art_id) VALUES ($1, $2)
         ON CONFLICT (user_id, art_id) DO UPDATE SET viewed_at = {NOW}"
    );
    sqlx::query(&query)
        .bind(user_id)
        .bind(art_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_history(
    pool: &SqlitePool,
    user_id: i64,
    page: Page,
) -> Result<(Vec<Art>, i64), RequestError> {
    let visible = "(arts.is_published OR arts.owner_id = $1)";
    let query = format!(
        "{ART_SELECT}
         JOIN user_history ON user_history.art_id = arts.id
         WHERE user_history.user_id = $1 AND {visible}
         ORDER BY user_history.viewed_at DESC, arts.id DESC
         LIMIT $2 OFFSET $3"
    );
    let arts = sqlx::query_as::<Sqlite, Art>(&query)
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let count_query = format!(
        "SELECT COUNT(*) FROM user_history
         JOIN arts ON arts.id = user_history.art_id
         WHERE user_history.user_id = $1 AND {visible}"
    );
    let total = sqlx::query_scalar::<Sqlite, i64>(&count_query)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok((arts, total))
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn credentials_carry_only_the_password_hash() {
        let pool = memory_pool().await;
        let user = insert_user(
            &pool,
            &NewUser {
                username: "ada".to_owned(),
                email: "ada@example.com".to_owned(),
                fullname: "Ada Lovelace".to_owned(),
                password_hash: "$argon2id$stub".to_owned(),
            },
        )
        .await
        .unwrap();

        let credentials = get_user_credentials(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(credentials.password, "$argon2id$stub");
        assert!(get_user_credentials(&pool, user.id + 1)
            .await
            .unwrap()
            .is_none());
    }
}
