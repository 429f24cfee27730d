//! Pool listing, editing, and membership edge cases.

mod common;

#[cfg(test)]
mod tests {
    use nekobooru::{error::BooruError, models::pool::Pool, search::Paging};

    use crate::common::{setup, upload};

    #[tokio::test]
    async fn listing_searches_names_newest_first() -> anyhow::Result<()> {
        let s = setup().await?;
        let cats = Pool::create(&s.db, "cats", None).await?;
        let _dogs = Pool::create(&s.db, "dogs", None).await?;
        let cat_pics = Pool::create(&s.db, "cat pics", None).await?;

        let (found, total) = Pool::list(&s.db, "cat", Paging::new(1, 10)).await?;
        assert_eq!(total, 2);
        assert_eq!(
            found.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![cat_pics.id, cats.id]
        );

        // editing a pool brings it to the front
        Pool::update(&s.db, cats.id, None, Some("fluffy")).await?;
        let (found, _) = Pool::list(&s.db, "CAT", Paging::new(1, 10)).await?;
        assert_eq!(
            found.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![cats.id, cat_pics.id]
        );

        let (page, total) = Pool::list(&s.db, "cat", Paging::new(2, 1)).await?;
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, cat_pics.id);

        let (all, total) = Pool::list(&s.db, "", Paging::default()).await?;
        assert_eq!((all.len(), total), (3, 3));

        // wildcards match literally
        let (none, total) = Pool::list(&s.db, "%", Paging::default()).await?;
        assert!(none.is_empty());
        assert_eq!(total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn updating_only_touches_given_fields() -> anyhow::Result<()> {
        let s = setup().await?;
        let pool = Pool::create(&s.db, "sketches", Some("wip")).await?;

        let renamed = Pool::update(&s.db, pool.id, Some("  studies "), None).await?;
        assert_eq!(renamed.name, "studies");
        assert_eq!(renamed.description.as_deref(), Some("wip"));
        assert_eq!(renamed.created_at, pool.created_at);
        assert!(renamed.updated_at > pool.updated_at);

        let described = Pool::update(&s.db, pool.id, None, Some("done")).await?;
        assert_eq!(described.name, "studies");
        assert_eq!(described.description.as_deref(), Some("done"));
        assert_eq!(Pool::get(&s.db, pool.id).await?, described);

        let err = Pool::update(&s.db, 9999, Some("ghost"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BooruError::PoolNotFound { id: 9999 }), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn adding_skips_missing_posts() -> anyhow::Result<()> {
        let s = setup().await?;
        let p1 = upload(&s, "first", &[]).await?;
        let p2 = upload(&s, "second", &[]).await?;
        let pool = Pool::create(&s.db, "mixed", None).await?;

        let added = Pool::add_posts(&s.db, pool.id, &[p1.id, 9999, p2.id]).await?;
        assert_eq!(added, 2);
        assert_eq!(Pool::post_ids(&s.db, pool.id).await?, vec![p1.id, p2.id]);

        // nothing real to add still succeeds
        assert_eq!(Pool::add_posts(&s.db, pool.id, &[9998]).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn removing_a_non_member_is_not_found() -> anyhow::Result<()> {
        let s = setup().await?;
        let member = upload(&s, "member", &[]).await?;
        let outsider = upload(&s, "outsider", &[]).await?;
        let pool = Pool::create(&s.db, "club", None).await?;
        Pool::add_posts(&s.db, pool.id, &[member.id]).await?;

        let err = Pool::remove_post(&s.db, pool.id, outsider.id)
            .await
            .unwrap_err();
        assert!(
            matches!(err, BooruError::PostNotInPool { pool_id, post_id }
                if pool_id == pool.id && post_id == outsider.id),
            "{err}"
        );
        assert!(err.is_not_found());

        // a missing pool is still reported as such
        let err = Pool::remove_post(&s.db, 9999, member.id).await.unwrap_err();
        assert!(matches!(err, BooruError::PoolNotFound { .. }), "{err}");

        assert_eq!(Pool::post_ids(&s.db, pool.id).await?, vec![member.id]);
        Ok(())
    }
}
