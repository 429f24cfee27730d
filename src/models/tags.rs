//! Represents tags in all their glory.

use chrono::{DateTime, Utc};

pub type TagId = i64;

/// Normalizes a raw tag name.
///
/// Trims surrounding whitespace, lowercases, and joins internal whitespace
/// with underscores. Returns `None` when nothing is left.
pub fn normalize_name(raw: &str) -> Option<String> {
    let name = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");

    (!name.is_empty()).then_some(name)
}

/// A "section" for tags, like `artist` or `character`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct TagCategory {
    pub id: i64,
    pub name: String,
    /// Hex color, like `#0075f8`.
    pub color: String,
    pub order: i64,
}

impl TagCategory {
    /// The categories a fresh gallery starts with, as `(name, color)`.
    ///
    /// `general` comes first, so it gets id 1 in an empty table.
    pub const DEFAULTS: [(&'static str, &'static str); 5] = [
        ("general", "#0075f8"),
        ("artist", "#f8a100"),
        ("character", "#00c853"),
        ("copyright", "#d500f9"),
        ("meta", "#ff5252"),
    ];
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,

    /// The tag's normalized, unique name.
    pub name: String,

    /// The category this tag points at. The row might not exist yet!
    pub category_id: i64,

    /// The category's name, or `general` when the category row is missing.
    pub category: String,

    /// The category's color, or grey when the category row is missing.
    pub category_color: String,

    /// How many posts carry this tag.
    pub usage_count: i64,

    pub created_at: DateTime<Utc>,
}

/// A tag alongside the edges that touch it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TagDetail {
    pub tag: Tag,
    /// Names of the tags this tag implies.
    pub implications: Vec<String>,
    /// Names of the tags that imply this one.
    pub implied_by: Vec<String>,
    /// Alias names pointing at this tag.
    pub aliases: Vec<String>,
}

/// An alternate name that resolves to its target tag.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct TagAlias {
    pub id: i64,
    pub alias_name: String,
    pub target_id: TagId,
    pub target_name: String,
}

/// "Posts tagged `antecedent` must also be tagged `consequent`."
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct TagImplication {
    pub id: i64,
    pub antecedent_id: TagId,
    pub antecedent: String,
    pub consequent_id: TagId,
    pub consequent: String,
}
