mod common;

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use nekobooru::models::post::{ContentHash, NewPost, Post};
    use temp_dir::TempDir;

    use crate::common::setup;

    /// Hashing a file on disk gives the same identity as hashing its bytes,
    /// and that's what the post stores.
    #[tokio::test]
    async fn file_hash_becomes_post_identity() -> anyhow::Result<()> {
        let s = setup().await?;

        let dir = TempDir::new()?;
        let path = Utf8PathBuf::try_from(dir.path().join("beach.png"))?;
        let bytes = b"not really a png, but the hash doesn't care";
        tokio::fs::write(&path, bytes).await?;

        let from_file = ContentHash::of_file(&path).await?;
        assert_eq!(from_file, ContentHash::of_bytes(bytes));

        let new_post = NewPost::new(from_file.clone(), "beach.png", bytes.len() as i64);
        let post = Post::create(&s.db, &s.resolver, &new_post, &["beach"]).await?;
        assert_eq!(post.sha256, from_file.as_str());

        let from_database: String = sqlx::query_scalar("SELECT sha256 FROM posts WHERE id = $1")
            .bind(post.id)
            .fetch_one(s.db.pool())
            .await?;
        assert_eq!(ContentHash::from_hex(&from_database), Some(from_file));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_fails_to_hash() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = Utf8PathBuf::try_from(dir.path().join("nothing_here.jpg"))?;

        assert!(ContentHash::of_file(&path).await.is_err());
        Ok(())
    }
}
