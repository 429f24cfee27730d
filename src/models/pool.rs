//! Pools: hand-ordered collections of posts.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    database::Database,
    error::BooruError,
    models::post::PostId,
    search::sort::Paging,
    tags::store::escape_like,
};

pub type PoolId = i64;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Pool {
    pub id: PoolId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pool {
    #[tracing::instrument(skip(db))]
    pub async fn create(
        db: &Database,
        name: &str,
        description: Option<&str>,
    ) -> Result<Pool, BooruError> {
        let now = Utc::now();
        let mut tx = db.begin_write().await?;

        let pool = sqlx::query_as::<_, Pool>(
            "INSERT INTO pools (name, description, created_at, updated_at) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(name.trim())
        .bind(description)
        .bind(now)
        .bind(now)
        .fetch_one(tx.conn())
        .await?;

        tx.commit().await?;
        Ok(pool)
    }

    pub async fn get(db: &Database, id: PoolId) -> Result<Pool, BooruError> {
        let mut conn = db.pool().acquire().await?;
        find(&mut conn, id).await
    }

    /// Pools whose name contains `query`, most recently changed first.
    ///
    /// Also returns how many pools match in total.
    #[tracing::instrument(skip(db))]
    pub async fn list(
        db: &Database,
        query: &str,
        paging: Paging,
    ) -> Result<(Vec<Pool>, u64), BooruError> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        let mut conn = db.pool().acquire().await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pools WHERE name LIKE $1 ESCAPE '\\'")
                .bind(&pattern)
                .fetch_one(&mut *conn)
                .await?;

        let pools = sqlx::query_as::<_, Pool>(
            "SELECT * FROM pools WHERE name LIKE $1 ESCAPE '\\' ORDER BY updated_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(i64::from(paging.limit))
        .bind(paging.offset())
        .fetch_all(&mut *conn)
        .await?;

        Ok((pools, u64::try_from(total).unwrap_or_default()))
    }

    /// Renames a pool and/or replaces its description. `None` leaves that
    /// field alone.
    #[tracing::instrument(skip(db))]
    pub async fn update(
        db: &Database,
        id: PoolId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Pool, BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();
        find(conn, id).await?;

        let pool = sqlx::query_as::<_, Pool>(
            "UPDATE pools SET name = COALESCE($1, name), description = COALESCE($2, description), updated_at = $3 WHERE id = $4 RETURNING *",
        )
        .bind(name.map(str::trim))
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        tx.commit().await?;
        Ok(pool)
    }

    /// Deletes a pool. Its posts stay put.
    #[tracing::instrument(skip(db))]
    pub async fn delete(db: &Database, id: PoolId) -> Result<(), BooruError> {
        let mut tx = db.begin_write().await?;
        let deleted = sqlx::query("DELETE FROM pools WHERE id = $1")
            .bind(id)
            .execute(tx.conn())
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(BooruError::PoolNotFound { id });
        }
        tx.commit().await?;
        Ok(())
    }

    /// Appends posts to the end of a pool, in the given order.
    ///
    /// Posts already in the pool keep their place, and ids with no post
    /// behind them are skipped. Returns how many were actually added.
    #[tracing::instrument(skip(db))]
    pub async fn add_posts(
        db: &Database,
        id: PoolId,
        post_ids: &[PostId],
    ) -> Result<usize, BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();
        find(conn, id).await?;

        let last: Option<i64> =
            sqlx::query_scalar(r#"SELECT MAX("order") FROM pool_posts WHERE pool_id = $1"#)
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        let mut next = last.map_or(0, |o| o + 1);

        let mut added = 0;
        for &post_id in post_ids {
            let exists: Option<PostId> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_optional(&mut *conn)
                .await?;
            if exists.is_none() {
                tracing::debug!("Skipping post {post_id}, which doesn't exist.");
                continue;
            }

            let inserted = sqlx::query(
                r#"INSERT OR IGNORE INTO pool_posts (pool_id, post_id, "order") VALUES ($1, $2, $3)"#,
            )
            .bind(id)
            .bind(post_id)
            .bind(next)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            if inserted == 1 {
                next += 1;
                added += 1;
            }
        }

        touch(conn, id).await?;
        tx.commit().await?;

        tracing::debug!("Added {added} posts to pool {id}.");
        Ok(added)
    }

    #[tracing::instrument(skip(db))]
    pub async fn remove_post(db: &Database, id: PoolId, post_id: PostId) -> Result<(), BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();
        find(conn, id).await?;

        let removed = sqlx::query("DELETE FROM pool_posts WHERE pool_id = $1 AND post_id = $2")
            .bind(id)
            .bind(post_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(BooruError::PostNotInPool {
                pool_id: id,
                post_id,
            });
        }

        touch(conn, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Renumbers the pool's posts to follow `post_ids`.
    ///
    /// Listed posts that aren't in the pool are ignored. Members missing
    /// from the list keep their relative order after the listed ones.
    #[tracing::instrument(skip(db))]
    pub async fn reorder(db: &Database, id: PoolId, post_ids: &[PostId]) -> Result<(), BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();
        find(conn, id).await?;

        let current = member_ids(conn, id).await?;
        let mut ordered: Vec<PostId> = Vec::with_capacity(current.len());
        for &post_id in post_ids {
            if current.contains(&post_id) && !ordered.contains(&post_id) {
                ordered.push(post_id);
            }
        }
        let rest = current
            .into_iter()
            .filter(|post_id| !ordered.contains(post_id))
            .collect::<Vec<_>>();
        ordered.extend(rest);

        for (order, post_id) in ordered.into_iter().enumerate() {
            sqlx::query(r#"UPDATE pool_posts SET "order" = $1 WHERE pool_id = $2 AND post_id = $3"#)
                .bind(order as i64)
                .bind(id)
                .bind(post_id)
                .execute(&mut *conn)
                .await?;
        }

        touch(conn, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// The pool's post ids, in pool order.
    pub async fn post_ids(db: &Database, id: PoolId) -> Result<Vec<PostId>, BooruError> {
        let mut conn = db.pool().acquire().await?;
        find(&mut conn, id).await?;
        Ok(member_ids(&mut conn, id).await?)
    }
}

async fn find(conn: &mut SqliteConnection, id: PoolId) -> Result<Pool, BooruError> {
    let found = sqlx::query_as::<_, Pool>("SELECT * FROM pools WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    found.ok_or(BooruError::PoolNotFound { id })
}

async fn member_ids(conn: &mut SqliteConnection, id: PoolId) -> Result<Vec<PostId>, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT post_id FROM pool_posts WHERE pool_id = $1 ORDER BY "order", id"#)
        .bind(id)
        .fetch_all(&mut *conn)
        .await
}

async fn touch(conn: &mut SqliteConnection, id: PoolId) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pools SET updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
