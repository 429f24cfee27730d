//! The authoritative tag table, plus its aliases and implications.
//!
//! Every mutation here runs inside one gated write transaction. Names given
//! to these methods are normalized first, so `Blue Sky` and `blue_sky` always
//! refer to the same record.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    database::Database,
    error::BooruError,
    models::tags::{normalize_name, Tag, TagAlias, TagCategory, TagDetail, TagId, TagImplication},
    search::sort::{Paging, SortOrder},
};

pub(crate) const TAG_SELECT: &str = r#"
SELECT
    t.id,
    t.name,
    t.category_id,
    COALESCE(c.name, 'general') AS category,
    COALESCE(c.color, '#808080') AS category_color,
    t.usage_count,
    t.created_at
FROM tags t
LEFT JOIN tag_categories c ON c.id = t.category_id"#;

const ALIAS_SELECT: &str = r#"
SELECT a.id, a.alias_name, a.target_id, t.name AS target_name
FROM tag_aliases a
JOIN tags t ON t.id = a.target_id"#;

const IMPLICATION_SELECT: &str = r#"
SELECT
    i.id,
    i.antecedent_id,
    a.name AS antecedent,
    i.consequent_id,
    c.name AS consequent
FROM tag_implications i
JOIN tags a ON a.id = i.antecedent_id
JOIN tags c ON c.id = i.consequent_id"#;

/// How to order a tag listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TagSort {
    #[default]
    Usage,
    Name,
    Date,
}

impl TagSort {
    /// Never fails: anything that isn't `usage` or `name` sorts by date.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "usage" => Self::Usage,
            "name" => Self::Name,
            _ => Self::Date,
        }
    }

    fn column(self) -> &'static str {
        match self {
            TagSort::Usage => "t.usage_count",
            TagSort::Name => "t.name",
            TagSort::Date => "t.created_at",
        }
    }
}

/// Changes to make to an existing tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TagStore {
    db: Database,
}

impl TagStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates a tag by hand.
    ///
    /// The name may not already be a tag or an alias.
    #[tracing::instrument(skip(self))]
    pub async fn create_tag(&self, raw_name: &str, category: &str) -> Result<Tag, BooruError> {
        let name = normalize_or_reject(raw_name)?;
        let mut tx = self.db.begin_write().await?;
        let conn = tx.conn();

        ensure_name_free(conn, &name).await?;
        let category_id = category_id(conn, category).await?;

        let id: TagId = sqlx::query_scalar(
            "INSERT INTO tags (name, category_id, usage_count, created_at) VALUES ($1, $2, 0, $3) RETURNING id",
        )
        .bind(&name)
        .bind(category_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        let tag = tag_by_id(conn, id).await?;
        tx.commit().await?;

        tracing::debug!("Created tag `{name}` in category `{category}`.");
        Ok(tag)
    }

    /// Grabs a tag and everything pointing to/from it.
    #[tracing::instrument(skip(self))]
    pub async fn get_tag(&self, raw_name: &str) -> Result<TagDetail, BooruError> {
        let mut conn = self.db.pool().acquire().await?;
        let tag = find_tag(&mut conn, raw_name).await?;

        let implications = sqlx::query_scalar(
            "SELECT t.name FROM tag_implications i JOIN tags t ON t.id = i.consequent_id WHERE i.antecedent_id = $1 ORDER BY t.name",
        )
        .bind(tag.id)
        .fetch_all(&mut *conn)
        .await?;

        let implied_by = sqlx::query_scalar(
            "SELECT t.name FROM tag_implications i JOIN tags t ON t.id = i.antecedent_id WHERE i.consequent_id = $1 ORDER BY t.name",
        )
        .bind(tag.id)
        .fetch_all(&mut *conn)
        .await?;

        let aliases = sqlx::query_scalar(
            "SELECT alias_name FROM tag_aliases WHERE target_id = $1 ORDER BY alias_name",
        )
        .bind(tag.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(TagDetail {
            tag,
            implications,
            implied_by,
            aliases,
        })
    }

    /// Renames and/or recategorizes a tag.
    #[tracing::instrument(skip(self))]
    pub async fn update_tag(&self, raw_name: &str, update: TagUpdate) -> Result<Tag, BooruError> {
        let mut tx = self.db.begin_write().await?;
        let conn = tx.conn();
        let tag = find_tag(conn, raw_name).await?;

        if let Some(new_name) = update.name {
            let new_name = normalize_or_reject(&new_name)?;
            if new_name != tag.name {
                ensure_name_free(conn, &new_name).await?;
                sqlx::query("UPDATE tags SET name = $1 WHERE id = $2")
                    .bind(&new_name)
                    .bind(tag.id)
                    .execute(&mut *conn)
                    .await?;
                tracing::debug!("Renamed tag `{}` to `{new_name}`.", tag.name);
            }
        }

        if let Some(category) = update.category {
            let category_id = category_id(conn, &category).await?;
            sqlx::query("UPDATE tags SET category_id = $1 WHERE id = $2")
                .bind(category_id)
                .bind(tag.id)
                .execute(&mut *conn)
                .await?;
        }

        let tag = tag_by_id(conn, tag.id).await?;
        tx.commit().await?;
        Ok(tag)
    }

    /// Deletes a tag. Its post associations, aliases, and implications go
    /// with it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_tag(&self, raw_name: &str) -> Result<(), BooruError> {
        let mut tx = self.db.begin_write().await?;
        let tag = find_tag(tx.conn(), raw_name).await?;

        sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(tag.id)
            .execute(tx.conn())
            .await?;

        tx.commit().await?;
        tracing::debug!("Deleted tag `{}`.", tag.name);
        Ok(())
    }

    /// Lists tags whose name contains `query`, with the total match count.
    #[tracing::instrument(skip(self))]
    pub async fn list_tags(
        &self,
        query: &str,
        sort: TagSort,
        order: SortOrder,
        paging: Paging,
    ) -> Result<(Vec<Tag>, u64), BooruError> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        let mut conn = self.db.pool().acquire().await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tags t WHERE t.name LIKE $1 ESCAPE '\\'")
                .bind(&pattern)
                .fetch_one(&mut *conn)
                .await?;

        let sql = format!(
            "{TAG_SELECT} WHERE t.name LIKE $1 ESCAPE '\\' ORDER BY {} {}, t.id {} LIMIT $2 OFFSET $3",
            sort.column(),
            order.keyword(),
            order.keyword(),
        );
        let tags = sqlx::query_as::<_, Tag>(&sql)
            .bind(&pattern)
            .bind(i64::from(paging.limit))
            .bind(paging.offset())
            .fetch_all(&mut *conn)
            .await?;

        Ok((tags, u64::try_from(total).unwrap_or_default()))
    }

    /// The most-used tags starting with `prefix`.
    #[tracing::instrument(skip(self))]
    pub async fn autocomplete(&self, prefix: &str, limit: u32) -> Result<Vec<Tag>, BooruError> {
        let Some(prefix) = normalize_name(prefix) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "{TAG_SELECT} WHERE t.name LIKE $1 ESCAPE '\\' ORDER BY t.usage_count DESC, t.name ASC LIMIT $2"
        );
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(format!("{}%", escape_like(&prefix)))
            .bind(i64::from(limit))
            .fetch_all(self.db.pool())
            .await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<TagCategory>, BooruError> {
        Ok(sqlx::query_as::<_, TagCategory>(
            r#"SELECT id, name, color, "order" FROM tag_categories ORDER BY "order", id"#,
        )
        .fetch_all(self.db.pool())
        .await?)
    }

    /// Fills an empty category table with [`TagCategory::DEFAULTS`].
    ///
    /// Returns how many categories were added.
    #[tracing::instrument(skip(self))]
    pub async fn seed_default_categories(&self) -> Result<usize, BooruError> {
        let mut tx = self.db.begin_write().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tag_categories")
            .fetch_one(tx.conn())
            .await?;
        if existing > 0 {
            tracing::debug!("Categories already exist. Not seeding.");
            return Ok(0);
        }

        for (order, (name, color)) in TagCategory::DEFAULTS.iter().enumerate() {
            sqlx::query(r#"INSERT INTO tag_categories (name, color, "order") VALUES ($1, $2, $3)"#)
                .bind(*name)
                .bind(*color)
                .bind(order as i64)
                .execute(tx.conn())
                .await?;
        }

        tx.commit().await?;
        Ok(TagCategory::DEFAULTS.len())
    }

    /// Makes `raw_alias` resolve to the tag named `raw_target`.
    ///
    /// The alias may not already be an alias or a tag, and the target must
    /// be a real tag (aliases never chain).
    #[tracing::instrument(skip(self))]
    pub async fn create_alias(
        &self,
        raw_alias: &str,
        raw_target: &str,
    ) -> Result<TagAlias, BooruError> {
        let alias_name = normalize_or_reject(raw_alias)?;
        let mut tx = self.db.begin_write().await?;
        let conn = tx.conn();

        if alias_exists(conn, &alias_name).await? {
            return Err(BooruError::AliasExists { name: alias_name });
        }
        if tag_by_name(conn, &alias_name).await?.is_some() {
            return Err(BooruError::NameIsTag { name: alias_name });
        }
        let target = find_tag(conn, raw_target).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tag_aliases (alias_name, target_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(&alias_name)
        .bind(target.id)
        .fetch_one(&mut *conn)
        .await?;

        let alias = sqlx::query_as::<_, TagAlias>(&format!("{ALIAS_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        tx.commit().await?;

        tracing::debug!("Aliased `{alias_name}` to `{}`.", target.name);
        Ok(alias)
    }

    pub async fn delete_alias(&self, id: i64) -> Result<(), BooruError> {
        let mut tx = self.db.begin_write().await?;
        let deleted = sqlx::query("DELETE FROM tag_aliases WHERE id = $1")
            .bind(id)
            .execute(tx.conn())
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(BooruError::AliasNotFound { id });
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_aliases(&self, paging: Paging) -> Result<Vec<TagAlias>, BooruError> {
        Ok(
            sqlx::query_as::<_, TagAlias>(&format!(
                "{ALIAS_SELECT} ORDER BY a.id LIMIT $1 OFFSET $2"
            ))
            .bind(i64::from(paging.limit))
            .bind(paging.offset())
            .fetch_all(self.db.pool())
            .await?,
        )
    }

    /// Records that posts tagged `raw_antecedent` should also carry
    /// `raw_consequent`.
    ///
    /// Existing posts aren't retagged. The rule applies the next time a
    /// post's tags are resolved.
    #[tracing::instrument(skip(self))]
    pub async fn create_implication(
        &self,
        raw_antecedent: &str,
        raw_consequent: &str,
    ) -> Result<TagImplication, BooruError> {
        let mut tx = self.db.begin_write().await?;
        let conn = tx.conn();

        let antecedent = find_tag(conn, raw_antecedent).await?;
        let consequent = find_tag(conn, raw_consequent).await?;

        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO tag_implications (antecedent_id, consequent_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING id",
        )
        .bind(antecedent.id)
        .bind(consequent.id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(id) = id else {
            return Err(BooruError::ImplicationExists {
                antecedent: antecedent.name,
                consequent: consequent.name,
            });
        };

        let implication =
            sqlx::query_as::<_, TagImplication>(&format!("{IMPLICATION_SELECT} WHERE i.id = $1"))
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        tx.commit().await?;

        Ok(implication)
    }

    pub async fn delete_implication(&self, id: i64) -> Result<(), BooruError> {
        let mut tx = self.db.begin_write().await?;
        let deleted = sqlx::query("DELETE FROM tag_implications WHERE id = $1")
            .bind(id)
            .execute(tx.conn())
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(BooruError::ImplicationNotFound { id });
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_implications(
        &self,
        paging: Paging,
    ) -> Result<Vec<TagImplication>, BooruError> {
        Ok(sqlx::query_as::<_, TagImplication>(&format!(
            "{IMPLICATION_SELECT} ORDER BY i.id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(paging.limit))
        .bind(paging.offset())
        .fetch_all(self.db.pool())
        .await?)
    }
}

fn normalize_or_reject(raw: &str) -> Result<String, BooruError> {
    normalize_name(raw).ok_or_else(|| BooruError::InvalidTagName {
        raw: raw.to_string(),
    })
}

/// Escapes `LIKE` wildcards so user text matches literally.
pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Tags and aliases share a namespace.
async fn ensure_name_free(conn: &mut SqliteConnection, name: &str) -> Result<(), BooruError> {
    if tag_by_name(conn, name).await?.is_some() {
        return Err(BooruError::TagExists {
            name: name.to_string(),
        });
    }
    if alias_exists(conn, name).await? {
        return Err(BooruError::NameIsAlias {
            name: name.to_string(),
        });
    }
    Ok(())
}

async fn alias_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM tag_aliases WHERE alias_name = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn category_id(conn: &mut SqliteConnection, name: &str) -> Result<i64, BooruError> {
    let name = name.trim().to_lowercase();
    let found = sqlx::query_scalar("SELECT id FROM tag_categories WHERE name = $1")
        .bind(&name)
        .fetch_optional(&mut *conn)
        .await?;

    found.ok_or(BooruError::CategoryNotFound { name })
}

/// Finds a tag by its (raw) name, or complains that it doesn't exist.
async fn find_tag(conn: &mut SqliteConnection, raw_name: &str) -> Result<Tag, BooruError> {
    let name = normalize_or_reject(raw_name)?;
    let found = tag_by_name(conn, &name).await?;
    found.ok_or(BooruError::TagNotFound { name })
}

pub(crate) async fn tag_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(&format!("{TAG_SELECT} WHERE t.name = $1"))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
}

pub(crate) async fn tag_by_id(conn: &mut SqliteConnection, id: TagId) -> Result<Tag, sqlx::Error> {
    sqlx::query_as::<_, Tag>(&format!("{TAG_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await
}
