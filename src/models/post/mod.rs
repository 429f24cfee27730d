use std::collections::{HashMap, HashSet};

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use futures::TryStreamExt as _;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder as _;
use sqlx::{query::Query as SqlxQuery, sqlite::SqliteArguments, Sqlite, SqliteConnection};

use crate::{
    database::{Database, InsertIntoTable},
    error::BooruError,
    search::query::{Favorites, PostTags, Tags},
    tags::{
        associations::{self, TagDelta},
        TagResolver,
    },
};

pub use hash::ContentHash;

pub mod hash;

pub type PostId = i64;

/// How safe a post is to look at.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Safety {
    #[default]
    Safe,
    Sketchy,
    Unsafe,
}

impl Safety {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(Self::Safe),
            "sketchy" => Some(Self::Sketchy),
            "unsafe" => Some(Self::Unsafe),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Safety::Safe => "safe",
            Safety::Sketchy => "sketchy",
            Safety::Unsafe => "unsafe",
        }
    }
}

/// What a post is, going by its file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Image,
    Gif,
    Video,
}

impl PostKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "gif" => Some(Self::Gif),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// The (dotted, lowercase) extensions that make up this kind.
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            PostKind::Image => &[".jpg", ".jpeg", ".png", ".webp"],
            PostKind::Gif => &[".gif"],
            PostKind::Video => &[".webm", ".mp4"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = normalize_extension(ext);
        [Self::Image, Self::Gif, Self::Video]
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }
}

/// Lowercases an extension and makes sure it starts with a dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// A stored media file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: PostId,

    /// The content hash. This is the post's real identity.
    pub sha256: String,

    /// The file name it was uploaded with.
    pub filename: String,

    /// Dotted and lowercase, like `.png`.
    pub extension: String,

    /// How large the file is, in bytes.
    pub file_size: i64,

    /// Width in pixels, if it could be read from the file.
    pub width: Option<i64>,

    /// Height in pixels, if it could be read from the file.
    pub height: Option<i64>,

    /// Video length in seconds.
    pub duration: Option<f64>,

    pub safety: Safety,

    /// Where the file came from, usually a URL.
    pub source: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Tag names, sorted. Filled in after the row is read.
    #[sqlx(skip)]
    pub tags: Vec<String>,

    #[sqlx(skip)]
    pub is_favorited: bool,
}

/// A post that hasn't been stored yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPost {
    pub sha256: ContentHash,
    pub filename: String,
    pub extension: String,
    pub file_size: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub safety: Safety,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    /// Starts a new post, taking its extension from the file name.
    pub fn new(sha256: ContentHash, filename: impl Into<String>, file_size: i64) -> Self {
        let filename = filename.into();
        let extension = Utf8Path::new(&filename)
            .extension()
            .map(normalize_extension)
            .unwrap_or_default();

        Self {
            sha256,
            filename,
            extension,
            file_size,
            width: None,
            height: None,
            duration: None,
            safety: Safety::default(),
            source: None,
            created_at: Utc::now(),
        }
    }
}

impl InsertIntoTable for NewPost {
    fn make_insertion_query(&self) -> SqlxQuery<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
        INSERT INTO posts
        (sha256, filename, extension, file_size, width, height, duration, safety, source, created_at, updated_at)
        VALUES
        ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        )
        .bind(self.sha256.as_str())
        .bind(&self.filename)
        .bind(&self.extension)
        .bind(self.file_size)
        .bind(self.width)
        .bind(self.height)
        .bind(self.duration)
        .bind(self.safety)
        .bind(&self.source)
        .bind(self.created_at)
        .bind(self.created_at)
    }
}

/// Changes to make to an existing post. `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostUpdate {
    pub safety: Option<Safety>,
    pub source: Option<String>,
    /// Replaces the whole tag set when given.
    pub tags: Option<Vec<String>>,
}

impl Post {
    pub fn kind(&self) -> Option<PostKind> {
        PostKind::from_extension(&self.extension)
    }

    /// Stores a new post and resolves its tags, all in one transaction.
    #[tracing::instrument(skip_all, fields(sha256 = %new_post.sha256))]
    pub async fn create<S: AsRef<str>>(
        db: &Database,
        resolver: &TagResolver,
        new_post: &NewPost,
        tag_names: &[S],
    ) -> Result<Post, BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();

        let existing: Option<PostId> = sqlx::query_scalar("SELECT id FROM posts WHERE sha256 = $1")
            .bind(new_post.sha256.as_str())
            .fetch_optional(&mut *conn)
            .await?;
        if existing.is_some() {
            return Err(BooruError::DuplicatePost {
                sha256: new_post.sha256.to_string(),
            });
        }

        let id = new_post
            .make_insertion_query()
            .execute(&mut *conn)
            .await
            .inspect_err(|e| tracing::error!("Post insertion failed! err: {e}"))?
            .last_insert_rowid();

        let resolution = resolver.resolve_with(&mut *conn, tag_names).await?;
        let delta = associations::replace(conn, id, &resolution.tag_ids).await?;

        let post = Self::load(conn, id).await?;
        tx.commit().await?;

        tracing::debug!(
            "Created post {id} with {} tags ({} newly made).",
            delta.added.len(),
            resolution.created.len()
        );
        Ok(post)
    }

    /// Grabs a post with its tags and favorite flag.
    pub async fn get(db: &Database, id: PostId) -> Result<Post, BooruError> {
        let mut conn = db.pool().acquire().await?;
        Self::load(&mut conn, id).await
    }

    /// Applies an edit. A new tag list replaces the old one, with usage
    /// counts moving only for tags that actually came or went.
    ///
    /// Returns the edited post along with those tag changes. The delta is
    /// empty when the tag list was left alone or didn't change.
    #[tracing::instrument(skip(db, resolver))]
    pub async fn update(
        db: &Database,
        resolver: &TagResolver,
        id: PostId,
        update: PostUpdate,
    ) -> Result<(Post, TagDelta), BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();
        ensure_exists(conn, id).await?;

        if let Some(safety) = update.safety {
            sqlx::query("UPDATE posts SET safety = $1 WHERE id = $2")
                .bind(safety)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }

        if let Some(source) = update.source {
            sqlx::query("UPDATE posts SET source = $1 WHERE id = $2")
                .bind(source)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }

        let mut delta = TagDelta::default();
        if let Some(tag_names) = update.tags {
            let resolution = resolver.resolve_with(&mut *conn, &tag_names).await?;
            delta = associations::replace(conn, id, &resolution.tag_ids).await?;
        }

        sqlx::query("UPDATE posts SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let post = Self::load(conn, id).await?;
        tx.commit().await?;

        if !delta.is_empty() {
            tracing::debug!(
                "Post {id} gained {} tags and lost {}.",
                delta.added.len(),
                delta.removed.len()
            );
        }
        Ok((post, delta))
    }

    /// Deletes a post, taking it off every tag's usage count first.
    #[tracing::instrument(skip(db))]
    pub async fn delete(db: &Database, id: PostId) -> Result<(), BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();
        ensure_exists(conn, id).await?;

        associations::clear(conn, id).await?;
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Flips the post's favorite flag, returning the new value.
    #[tracing::instrument(skip(db))]
    pub async fn toggle_favorite(db: &Database, id: PostId) -> Result<bool, BooruError> {
        let mut tx = db.begin_write().await?;
        let conn = tx.conn();
        ensure_exists(conn, id).await?;

        let removed = sqlx::query("DELETE FROM favorites WHERE post_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        let favorited = removed == 0;
        if favorited {
            sqlx::query("INSERT INTO favorites (post_id, created_at) VALUES ($1, $2)")
                .bind(id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;
        }

        tx.commit().await?;
        Ok(favorited)
    }

    async fn load(conn: &mut SqliteConnection, id: PostId) -> Result<Post, BooruError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(post) = post else {
            return Err(BooruError::PostNotFound { id });
        };

        let mut posts = [post];
        Self::hydrate(conn, &mut posts).await?;
        let [post] = posts;
        Ok(post)
    }

    /// Fills in `tags` and `is_favorited` for some freshly-read posts.
    pub(crate) async fn hydrate(
        conn: &mut SqliteConnection,
        posts: &mut [Post],
    ) -> Result<(), sqlx::Error> {
        if posts.is_empty() {
            return Ok(());
        }
        let ids = posts.iter().map(|p| p.id).collect::<Vec<_>>();

        let (select, values) = Query::select()
            .column((PostTags::Table, PostTags::PostId))
            .column((Tags::Table, Tags::Name))
            .from(PostTags::Table)
            .inner_join(
                Tags::Table,
                Expr::col((Tags::Table, Tags::Id)).equals((PostTags::Table, PostTags::TagId)),
            )
            .and_where(Expr::col((PostTags::Table, PostTags::PostId)).is_in(ids.iter().copied()))
            .order_by((Tags::Table, Tags::Name), Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let mut tags: HashMap<PostId, Vec<String>> = HashMap::new();
        {
            let mut rows =
                sqlx::query_as_with::<_, (PostId, String), _>(&select, values).fetch(&mut *conn);
            while let Some((post_id, name)) = rows.try_next().await? {
                tags.entry(post_id).or_default().push(name);
            }
        }

        let (select, values) = Query::select()
            .column(Favorites::PostId)
            .from(Favorites::Table)
            .and_where(Expr::col(Favorites::PostId).is_in(ids.iter().copied()))
            .build_sqlx(SqliteQueryBuilder);

        let favorites: HashSet<PostId> = sqlx::query_scalar_with::<_, PostId, _>(&select, values)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();

        for post in posts.iter_mut() {
            post.tags = tags.remove(&post.id).unwrap_or_default();
            post.is_favorited = favorites.contains(&post.id);
        }
        Ok(())
    }
}

async fn ensure_exists(conn: &mut SqliteConnection, id: PostId) -> Result<(), BooruError> {
    let found: Option<PostId> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    found.map(|_| ()).ok_or(BooruError::PostNotFound { id })
}
