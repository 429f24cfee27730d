use core::error::Error;
use pisserror::Error;

use crate::config::Config;

/// Where bugs go when no config has been loaded yet.
const DEFAULT_BUG_REPO: &str = "https://github.com/nekobooru/nekobooru";

/// Stick this at the end of bug warnings/errors.
///
/// It helps users find out where to report bugs when looking at logs.
pub async fn bug_msg() -> String {
    let repo = match Config::read().await {
        Some(conf) => conf.bug_report_info.repo.clone(),
        None => DEFAULT_BUG_REPO.to_string(),
    };

    format!("this is a bug, so please report it! you can do so by heading to this git repo: {repo}")
}

#[derive(Debug, Error)]
pub enum BooruError {
    #[error("The database has encountered an error. See: `{_0}`")]
    DatabaseError(#[from] DatabaseError),

    #[error("`{raw}` doesn't contain a usable tag name.")]
    InvalidTagName { raw: String },

    #[error("`{raw}` isn't a hex-encoded sha256 digest.")]
    InvalidContentHash { raw: String },

    // conflicts
    #[error("A tag named `{name}` already exists.")]
    TagExists { name: String },

    #[error("`{name}` is already an alias, so it can't be used as a tag name.")]
    NameIsAlias { name: String },

    #[error("An alias named `{name}` already exists.")]
    AliasExists { name: String },

    #[error("`{name}` is already a tag, so it can't be used as an alias.")]
    NameIsTag { name: String },

    #[error("The implication `{antecedent}` -> `{consequent}` already exists.")]
    ImplicationExists {
        antecedent: String,
        consequent: String,
    },

    #[error("A post with content hash `{sha256}` already exists.")]
    DuplicatePost { sha256: String },

    // not found
    #[error("No tag is named `{name}`.")]
    TagNotFound { name: String },

    #[error("No tag category is named `{name}`.")]
    CategoryNotFound { name: String },

    #[error("No alias has the id `{id}`.")]
    AliasNotFound { id: i64 },

    #[error("No implication has the id `{id}`.")]
    ImplicationNotFound { id: i64 },

    #[error("No post has the id `{id}`.")]
    PostNotFound { id: i64 },

    #[error("No pool has the id `{id}`.")]
    PoolNotFound { id: i64 },

    #[error("Post `{post_id}` isn't in pool `{pool_id}`.")]
    PostNotInPool { pool_id: i64, post_id: i64 },
}

impl BooruError {
    /// Whether this error rejects a write that would break a uniqueness or
    /// namespace rule.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::TagExists { .. }
                | Self::NameIsAlias { .. }
                | Self::AliasExists { .. }
                | Self::NameIsTag { .. }
                | Self::ImplicationExists { .. }
                | Self::DuplicatePost { .. }
        )
    }

    /// Whether this error means a referenced record doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TagNotFound { .. }
                | Self::CategoryNotFound { .. }
                | Self::AliasNotFound { .. }
                | Self::ImplicationNotFound { .. }
                | Self::PostNotFound { .. }
                | Self::PoolNotFound { .. }
                | Self::PostNotInPool { .. }
        )
    }
}

impl From<sqlx::Error> for BooruError {
    fn from(value: sqlx::Error) -> Self {
        Self::DatabaseError(DatabaseError::QueryFailed(value))
    }
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to the database. See: {_0}")]
    ConnectionError(String),

    #[error("Failed to complete database query. See: {_0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("Failed to migrate the database. See: {_0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// during fs read from disk
    #[error("Failed to read config file. See: `{_0}`")]
    ReadFailed(#[from] tokio::io::Error),

    /// parsing
    #[error("Failed to parse config file. See: `{_0}`")]
    ParseFailed(#[from] toml::de::Error),

    /// when we read from disk, the paths should be equal
    #[error("The config file had a data directory that didn't match the one it was loaded from.")]
    PathMismatch,
}
