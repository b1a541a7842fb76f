use sqlx::{Sqlite, SqlitePool};

use crate::{
    data_formats::Page,
    errors::RequestError,
    models::{Art, LikeTarget},
};

use super::ART_SELECT;

/// Flips the like of `user_id` on `target` and returns `(liked, like_count)`.
///
/// Runs as one write transaction: the delete takes SQLite's write lock
/// before anything is read, so concurrent toggles for the same pair are
/// serialized. The target's counter is recomputed from the like rows rather
/// than adjusted, so it can never drift from them.
pub async fn toggle_like_in_db(
    pool: &SqlitePool,
    user_id: i64,
    target: LikeTarget,
) -> Result<(bool, i64), RequestError> {
    let column = target.column();
    let mut tx = pool.begin().await?;

    let removed = sqlx::query(&format!(
        "DELETE FROM likes WHERE liked_by = $1 AND {column} = $2"
    ))
    .bind(user_id)
    .bind(target.id())
    .execute(&mut tx)
    .await?
    .rows_affected();

    let liked = if removed == 0 {
        sqlx::query(&format!(
            "INSERT INTO likes (liked_by, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(user_id)
        .bind(target.id())
        .execute(&mut tx)
        .await?;
        true
    } else {
        false
    };

    let likes = sqlx::query_scalar::<Sqlite, i64>(&format!(
        "UPDATE {table}
            SET likes = (SELECT COUNT(*) FROM likes WHERE {column} = $1)
          WHERE id = $1
         RETURNING likes",
        table = target.table(),
    ))
    .bind(target.id())
    .fetch_optional(&mut tx)
    .await?;

    let likes = match likes {
        Some(likes) => likes,
        None => {
            return Err(RequestError::NotFound(match target {
                LikeTarget::Art(_) => "Art",
                LikeTarget::Comment(_) => "Comment",
            }))
        }
    };

    tx.commit().await?;
    Ok((liked, likes))
}

pub async fn get_liked_arts_in_db(
    pool: &SqlitePool,
    user_id: i64,
    page: Page,
) -> Result<(Vec<Art>, i64), RequestError> {
    let visible = "(arts.is_published OR arts.owner_id = $1)";
    let query = format!(
        "{ART_SELECT}
         JOIN likes ON likes.art_id = arts.id
         WHERE likes.liked_by = $1 AND {visible}
         ORDER BY likes.created_at DESC, likes.id DESC
         LIMIT $2 OFFSET $3"
    );
    let arts = sqlx::query_as::<Sqlite, Art>(&query)
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let count_query = format!(
        "SELECT COUNT(*) FROM likes
         JOIN arts ON arts.id = likes.art_id
         WHERE likes.liked_by = $1 AND {visible}"
    );
    let total = sqlx::query_scalar::<Sqlite, i64>(&count_query)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok((arts, total))
}
