//! Post/tag association writes.
//!
//! A tag's `usage_count` moves only when an association row is actually
//! inserted or deleted, so repeating a write is a no-op rather than a
//! double count.

use std::collections::BTreeSet;

use sqlx::SqliteConnection;

use crate::{error::bug_msg, models::tags::TagId};

/// Which associations a write added and removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagDelta {
    pub added: BTreeSet<TagId>,
    pub removed: BTreeSet<TagId>,
}

impl TagDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The tag ids a post carries right now.
pub async fn post_tag_ids(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<BTreeSet<TagId>, sqlx::Error> {
    let ids: Vec<TagId> = sqlx::query_scalar("SELECT tag_id FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Associates a tag with a post. Returns `false` if it already was.
pub async fn attach(
    conn: &mut SqliteConnection,
    post_id: i64,
    tag_id: TagId,
) -> Result<bool, sqlx::Error> {
    let inserted = sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if inserted == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE tags SET usage_count = usage_count + 1 WHERE id = $1")
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;
    Ok(true)
}

/// Removes a tag from a post. Returns `false` if it wasn't there.
pub async fn detach(
    conn: &mut SqliteConnection,
    post_id: i64,
    tag_id: TagId,
) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM post_tags WHERE post_id = $1 AND tag_id = $2")
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Ok(false);
    }

    let decremented =
        sqlx::query("UPDATE tags SET usage_count = usage_count - 1 WHERE id = $1 AND usage_count > 0")
            .bind(tag_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

    if decremented == 0 {
        tracing::warn!(
            "Tag {tag_id} lost an association while its usage count was already zero. {}",
            bug_msg().await
        );
    }
    Ok(true)
}

/// Makes the post's associations exactly `tag_ids`.
pub async fn replace(
    conn: &mut SqliteConnection,
    post_id: i64,
    tag_ids: &BTreeSet<TagId>,
) -> Result<TagDelta, sqlx::Error> {
    let current = post_tag_ids(conn, post_id).await?;
    let mut delta = TagDelta::default();

    for &tag_id in current.difference(tag_ids) {
        if detach(conn, post_id, tag_id).await? {
            delta.removed.insert(tag_id);
        }
    }

    for &tag_id in tag_ids.difference(&current) {
        if attach(conn, post_id, tag_id).await? {
            delta.added.insert(tag_id);
        }
    }

    tracing::debug!(
        "Post {post_id}: +{} / -{} tags.",
        delta.added.len(),
        delta.removed.len()
    );
    Ok(delta)
}

/// Removes every association from a post.
pub async fn clear(conn: &mut SqliteConnection, post_id: i64) -> Result<TagDelta, sqlx::Error> {
    replace(conn, post_id, &BTreeSet::new()).await
}
