use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::ArtQueryParams;
use crate::errors::RequestError;
use crate::models::Art;

use super::{QueryBuilder, ART_SELECT, NOW};

/// Owners always see their own unpublished work; everyone else only sees
/// published arts. `$1` is the viewer id (NULL for anonymous readers).
const VISIBLE_TO_VIEWER: &str = "(arts.is_published OR arts.owner_id = $1)";

const ART_FILTER: &str = r#"
    WHERE (arts.is_published OR arts.owner_id = $1)
      AND ( arts.owner_id = $2 OR $2 IS NULL )
      AND ( instr(lower(arts.name), lower($3)) > 0 OR $3 IS NULL )
"#;

#[derive(Debug, Default)]
pub struct ArtChanges {
    pub name: Option<String>,
    pub caption: Option<String>,
    pub content: Option<String>,
}

pub async fn list_arts_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    params: &ArtQueryParams,
) -> Result<(Vec<Art>, i64), RequestError> {
    let page = params.page();
    let direction = params.sort_type.keyword();
    let query = format!(
        "{ART_SELECT} {ART_FILTER}
         ORDER BY {column} {direction}, arts.id {direction}
         LIMIT $4 OFFSET $5",
        column = params.sort_by.column(),
    );
    let arts = sqlx::query_as::<Sqlite, Art>(&query)
        .bind(viewer)
        .bind(params.user_id)
        .bind(params.search())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let count_query = format!("SELECT COUNT(*) FROM arts {ART_FILTER}");
    let total = sqlx::query_scalar::<Sqlite, i64>(&count_query)
        .bind(viewer)
        .bind(params.user_id)
        .bind(params.search())
        .fetch_one(pool)
        .await?;

    Ok((arts, total))
}

pub async fn get_art_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Art>, RequestError> {
    let query = format!("{ART_SELECT} WHERE arts.id = $1");
    let art = sqlx::query_as::<Sqlite, Art>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(art)
}

/// Fetches an art only if `viewer` is allowed to see it.
pub async fn get_visible_art_by_id(
    pool: &SqlitePool,
    id: i64,
    viewer: Option<i64>,
) -> Result<Option<Art>, RequestError> {
    let query = format!("{ART_SELECT} WHERE {VISIBLE_TO_VIEWER} AND arts.id = $2");
    let art = sqlx::query_as::<Sqlite, Art>(&query)
        .bind(viewer)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(art)
}

pub async fn insert_art(
    pool: &SqlitePool,
    owner_id: i64,
    name: &str,
    content: &str,
    caption: &str,
) -> Result<Art, RequestError> {
    let mut tx = pool.begin().await?;
    let id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO arts (owner_id, name, content, caption, is_published)
        VALUES ($1, $2, $3, $4, TRUE)
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(name)
    .bind(content)
    .bind(caption)
    .fetch_one(&mut tx)
    .await?;

    let query = format!("{ART_SELECT} WHERE arts.id = $1");
    let art = sqlx::query_as::<Sqlite, Art>(&query)
        .bind(id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(art)
}

pub async fn update_art_in_db(
    pool: &SqlitePool,
    id: i64,
    ArtChanges {
        name,
        caption,
        content,
    }: ArtChanges,
) -> Result<Art, RequestError> {
    let builder = QueryBuilder::new("UPDATE arts SET ", ", ")
        .add_param("name", name)
        .add_param("caption", caption)
        .add_param("content", content)
        .touch(&format!("updated_at = {NOW}"));

    if let Some((query, params)) = builder.build(" WHERE id = ?") {
        let mut tx = pool.begin().await?;
        let mut query = sqlx::query(&query);
        for param in params {
            query = query.bind(param);
        }
        let result = query.bind(id).execute(&mut tx).await?;
        if result.rows_affected() == 0 {
            return Err(RequestError::NotFound("Art"));
        }
        tx.commit().await?;
    }

    get_art_by_id(pool, id).await?.ok_or(RequestError::NotFound("Art"))
}

pub async fn toggle_publish_in_db(pool: &SqlitePool, id: i64) -> Result<Art, RequestError> {
    let query = format!(
        "UPDATE arts SET is_published = NOT is_published, updated_at = {NOW} WHERE id = $1"
    );
    let result = sqlx::query(&query).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Art"));
    }
    get_art_by_id(pool, id).await?.ok_or(RequestError::NotFound("Art"))
}

/// Adds one view in a single statement and returns the new count.
pub async fn increment_views(pool: &SqlitePool, id: i64) -> Result<Option<i64>, RequestError> {
    let views = sqlx::query_scalar::<Sqlite, i64>(
        "UPDATE arts SET views = views + 1 WHERE id = $1 RETURNING views",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(views)
}

pub async fn delete_art_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let result = sqlx::query("DELETE FROM arts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Art"));
    }
    Ok(())
}
