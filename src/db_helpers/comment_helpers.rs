use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::Page, errors::RequestError, models::Comment};

use super::{COMMENT_SELECT, NOW};

pub async fn add_comment_to_art_in_db(
    pool: &SqlitePool,
    owner_id: i64,
    art_id: i64,
    content: &str,
) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO comments (owner_id, art_id, content)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(art_id)
    .bind(content)
    .fetch_one(&mut tx)
    .await?;

    let query = format!("{COMMENT_SELECT} WHERE comments.id = $1");
    let comment = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;

    Ok(comment)
}

pub async fn get_comment_by_id(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<Comment>, RequestError> {
    let query = format!("{COMMENT_SELECT} WHERE comments.id = $1");
    let comment = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(comment)
}

pub async fn get_comments_for_art_in_db(
    pool: &SqlitePool,
    art_id: i64,
    page: Page,
) -> Result<(Vec<Comment>, i64), RequestError> {
    let query = format!(
        "{COMMENT_SELECT}
         WHERE comments.art_id = $1
         ORDER BY comments.created_at DESC, comments.id DESC
         LIMIT $2 OFFSET $3"
    );
    let comments = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(art_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let total = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM comments WHERE art_id = $1")
        .bind(art_id)
        .fetch_one(pool)
        .await?;

    Ok((comments, total))
}

pub async fn update_comment_in_db(
    pool: &SqlitePool,
    id: i64,
    content: &str,
) -> Result<Comment, RequestError> {
    let query = format!("UPDATE comments SET content = $1, updated_at = {NOW} WHERE id = $2");
    let result = sqlx::query(&query)
        .bind(content)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Comment"));
    }
    get_comment_by_id(pool, id)
        .await?
        .ok_or(RequestError::NotFound("Comment"))
}

pub async fn delete_comment_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Comment"));
    }
    Ok(())
}
