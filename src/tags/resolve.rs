//! Turns raw tag strings from an upload or edit into tag ids.
//!
//! Resolution is: normalize, follow at most one alias, find or create the
//! tag, then add whatever that tag directly implies. Implications are
//! expanded one hop per resolved name. A consequent's own implications are
//! only added if that consequent was also given as an input name.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    config::TagConfig,
    database::Database,
    error::BooruError,
    models::tags::{normalize_name, TagId},
};

/// The category id new tags fall back to when the default category's row
/// hasn't been seeded yet.
pub const FALLBACK_CATEGORY_ID: i64 = 1;

/// What came out of resolving some raw names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Explicit and implied tag ids.
    pub tag_ids: BTreeSet<TagId>,
    /// Names of the tags that didn't exist before this resolution.
    pub created: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagResolver {
    default_category: String,
}

impl Default for TagResolver {
    fn default() -> Self {
        Self::new(&TagConfig::default())
    }
}

impl TagResolver {
    pub fn new(conf: &TagConfig) -> Self {
        Self {
            default_category: conf.default_category.clone(),
        }
    }

    /// Resolves `raw_names` in its own write transaction.
    ///
    /// Any tags it had to create are committed before this returns.
    pub async fn resolve<I, S>(&self, db: &Database, raw_names: I) -> Result<Resolution, BooruError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tx = db.begin_write().await?;
        let resolution = self.resolve_with(tx.conn(), raw_names).await?;
        tx.commit().await?;
        Ok(resolution)
    }

    /// Resolves `raw_names` on a connection the caller controls, usually one
    /// inside a larger write transaction.
    ///
    /// Empty names are skipped, so an empty input gives an empty set.
    #[tracing::instrument(skip_all)]
    pub async fn resolve_with<I, S>(
        &self,
        conn: &mut SqliteConnection,
        raw_names: I,
    ) -> Result<Resolution, BooruError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolution = Resolution::default();
        let mut default_category = None;

        for raw in raw_names {
            let Some(name) = normalize_name(raw.as_ref()) else {
                tracing::debug!("Skipping empty tag name `{}`.", raw.as_ref());
                continue;
            };

            let target = alias_target(conn, &name).await?;
            let name = match target {
                Some(target) => {
                    tracing::debug!("Alias `{name}` resolves to `{target}`.");
                    target
                }
                None => name,
            };

            let category_id = match default_category {
                Some(id) => id,
                None => {
                    let id = self.default_category_id(conn).await?;
                    default_category = Some(id);
                    id
                }
            };

            let (tag_id, created) = find_or_create(conn, &name, category_id).await?;
            if created {
                tracing::debug!("Created tag `{name}` while resolving.");
                resolution.created.push(name);
            }
            resolution.tag_ids.insert(tag_id);

            let implied: Vec<TagId> = sqlx::query_scalar(
                "SELECT consequent_id FROM tag_implications WHERE antecedent_id = $1",
            )
            .bind(tag_id)
            .fetch_all(&mut *conn)
            .await?;
            resolution.tag_ids.extend(implied);
        }

        Ok(resolution)
    }

    async fn default_category_id(&self, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM tag_categories WHERE name = $1")
            .bind(&self.default_category)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(id.unwrap_or_else(|| {
            tracing::debug!(
                "No `{}` category yet. Falling back to category id {FALLBACK_CATEGORY_ID}.",
                self.default_category
            );
            FALLBACK_CATEGORY_ID
        }))
    }
}

/// One hop only: the target's own name is never looked up as an alias.
async fn alias_target(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT t.name FROM tag_aliases a JOIN tags t ON t.id = a.target_id WHERE a.alias_name = $1",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
}

/// Returns the tag's id, and whether this call created it.
async fn find_or_create(
    conn: &mut SqliteConnection,
    name: &str,
    category_id: i64,
) -> Result<(TagId, bool), sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO tags (name, category_id, usage_count, created_at) VALUES ($1, $2, 0, $3) ON CONFLICT(name) DO NOTHING",
    )
    .bind(name)
    .bind(category_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let id = sqlx::query_scalar("SELECT id FROM tags WHERE name = $1")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    Ok((id, inserted == 1))
}
