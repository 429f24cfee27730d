//! The parent of the other tests.
//!
//! Mostly to import the setup stuff below.

#![allow(dead_code, reason = "each test binary uses a different part of this")]

use std::str::FromStr as _;

use camino::Utf8PathBuf;
use temp_dir::TempDir;
use tracing_subscriber::{filter, layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer};

use nekobooru::{
    config::{BugReportInfo, Config, CONFIG},
    database::Database,
    models::post::{ContentHash, NewPost, Post, Safety},
    tags::{TagResolver, TagStore},
};

/// A fresh database in its own temp dir. The dir goes away on drop.
pub struct Setup {
    pub db: Database,
    pub tags: TagStore,
    pub resolver: TagResolver,
    pub data_dir: Utf8PathBuf,
    _dir: TempDir,
}

/// call this at the top of any new test func! :)
pub async fn setup() -> anyhow::Result<Setup> {
    let s = setup_unseeded().await?;
    s.tags.seed_default_categories().await?;
    Ok(s)
}

/// Like [`setup`], but the category table stays empty.
pub async fn setup_unseeded() -> anyhow::Result<Setup> {
    // start logging. other tests in this binary may have beaten us to it
    _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_filter(filter::EnvFilter::from_str("DEBUG,sqlx=INFO")?),
        )
        .try_init();

    let dir = TempDir::new()?;
    let data_dir = Utf8PathBuf::try_from(dir.path().to_path_buf())?;

    if CONFIG.get().is_none() {
        Config::init_config(Config::new(data_dir.clone(), new_bug_report_info_testing())).await;
    }

    let db = Database::open(&data_dir).await?;
    let tags = TagStore::new(db.clone());

    Ok(Setup {
        db,
        tags,
        resolver: TagResolver::default(),
        data_dir,
        _dir: dir,
    })
}

/// Sample bug report information for usage in tests, to decrease
/// verbosity.
pub fn new_bug_report_info_testing() -> BugReportInfo {
    BugReportInfo {
        app_name: "bug report info testing info".to_string(),
        app_version: "0.1.0".to_string(),
        target_triple: "x86_64-farts-gnu".to_string(),
        commit: "unknown".to_string(),
        repo: "https://github.com/nekobooru/nekobooru".to_string(),
        build_time: "unknown".to_string(),
    }
}

/// A post whose bytes (and so hash) come from `seed`.
pub fn sample_post(seed: &str, extension: &str) -> NewPost {
    let mut post = NewPost::new(
        ContentHash::of_bytes(seed.as_bytes()),
        format!("{seed}.{extension}"),
        seed.len() as i64,
    );
    post.width = Some(800);
    post.height = Some(600);
    post.safety = Safety::Safe;
    post
}

/// Uploads a post with some tags.
pub async fn upload(setup: &Setup, seed: &str, tags: &[&str]) -> anyhow::Result<Post> {
    Ok(Post::create(&setup.db, &setup.resolver, &sample_post(seed, "png"), tags).await?)
}
