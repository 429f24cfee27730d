//! Runs whole queries against a real database.

mod common;

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use nekobooru::{
        config::SearchConfig,
        models::{
            pool::Pool,
            post::{Post, PostUpdate, Safety},
        },
        search::{
            compile, execute, search_posts, Paging, PostFacts, SearchRequest, SortKey, SortOrder,
        },
    };

    use crate::common::{sample_post, setup, upload, Setup};

    /// Uploads a post with a given width, safety, and extension.
    async fn post_with(
        s: &Setup,
        seed: &str,
        tags: &[&str],
        width: Option<i64>,
        safety: Safety,
        extension: &str,
    ) -> anyhow::Result<Post> {
        let mut new_post = sample_post(seed, extension);
        new_post.width = width;
        new_post.safety = safety;
        Ok(Post::create(&s.db, &s.resolver, &new_post, tags).await?)
    }

    /// The ids matching `query`, sorted by id.
    async fn ids(s: &Setup, query: &str) -> anyhow::Result<Vec<i64>> {
        let compiled = compile(query);
        let (posts, total) = execute(
            &s.db,
            &compiled.predicate,
            SortKey::Id,
            SortOrder::Ascending,
            Paging::new(1, 1000),
        )
        .await?;

        assert_eq!(total, posts.len() as u64, "total for `{query}`");
        Ok(posts.into_iter().map(|p| p.id).collect())
    }

    #[tokio::test]
    async fn and_not_and_filters() -> anyhow::Result<()> {
        let s = setup().await?;
        let good = post_with(&s, "a", &["cat", "bird"], Some(800), Safety::Safe, "png").await?;
        let with_dog =
            post_with(&s, "b", &["cat", "bird", "dog"], Some(800), Safety::Safe, "png").await?;
        let narrow = post_with(&s, "c", &["cat", "bird"], Some(400), Safety::Safe, "png").await?;
        let sketchy = post_with(&s, "d", &["cat"], Some(900), Safety::Sketchy, "png").await?;
        let unknown_width = post_with(&s, "e", &["cat"], None, Safety::Safe, "png").await?;

        assert_eq!(ids(&s, "cat -dog width:>500 safety:safe").await?, vec![good.id]);
        assert_eq!(ids(&s, "dog").await?, vec![with_dog.id]);
        assert_eq!(ids(&s, "width:<=400").await?, vec![narrow.id]);
        assert_eq!(ids(&s, "rating:sketchy").await?, vec![sketchy.id]);

        // posts without a width never pass a width filter, negated or not
        assert!(!ids(&s, "width:>0").await?.contains(&unknown_width.id));
        assert!(ids(&s, "-width:>500").await?.contains(&unknown_width.id));
        Ok(())
    }

    #[tokio::test]
    async fn or_groups() -> anyhow::Result<()> {
        let s = setup().await?;
        let cat = upload(&s, "cat", &["cat"]).await?;
        let dog = upload(&s, "dog", &["dog"]).await?;
        let both = upload(&s, "both", &["cat", "dog"]).await?;
        let _neither = upload(&s, "neither", &["fish"]).await?;

        assert_eq!(ids(&s, "cat OR dog").await?, vec![cat.id, dog.id, both.id]);
        assert_eq!(ids(&s, "cat or dog -fish").await?, vec![cat.id, dog.id, both.id]);
        assert_eq!(ids(&s, "cat dog").await?, vec![both.id]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_query_matches_everything() -> anyhow::Result<()> {
        let s = setup().await?;
        upload(&s, "one", &["cat"]).await?;
        upload(&s, "two", &[]).await?;

        assert_eq!(ids(&s, "").await?.len(), 2);
        assert_eq!(ids(&s, "color:red width:wide").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn pages_are_one_indexed() -> anyhow::Result<()> {
        let s = setup().await?;
        for i in 0..25 {
            upload(&s, &format!("paged {i}"), &["paged"]).await?;
        }

        let compiled = compile("paged");
        let (posts, total) = execute(
            &s.db,
            &compiled.predicate,
            SortKey::Id,
            SortOrder::Ascending,
            Paging::new(2, 10),
        )
        .await?;

        assert_eq!(total, 25);
        assert_eq!(
            posts.iter().map(|p| p.id).collect::<Vec<_>>(),
            (11..=20).collect::<Vec<_>>()
        );

        // and through the listing entry point
        let page = search_posts(
            &s.db,
            &SearchConfig::default(),
            "paged sort:id",
            SearchRequest {
                order: SortOrder::Ascending,
                page: 3,
                limit: Some(10),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(page.total, 25);
        assert_eq!(page.pages, 3);
        assert_eq!(
            page.posts.iter().map(|p| p.id).collect::<Vec<_>>(),
            (21..=25).collect::<Vec<_>>()
        );
        Ok(())
    }

    #[tokio::test]
    async fn listing_clamps_paging() -> anyhow::Result<()> {
        let s = setup().await?;
        for i in 0..3 {
            upload(&s, &format!("clamped {i}"), &[]).await?;
        }

        let conf = SearchConfig {
            default_page_size: 2,
            max_page_size: 2,
        };
        let page = search_posts(
            &s.db,
            &conf,
            "",
            SearchRequest {
                page: 0,
                limit: Some(50),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 2);
        assert_eq!(page.posts.len(), 2);
        assert_eq!(page.pages, 2);
        Ok(())
    }

    #[tokio::test]
    async fn ties_break_by_id_in_the_same_direction() -> anyhow::Result<()> {
        let s = setup().await?;
        let a = post_with(&s, "a", &[], Some(500), Safety::Safe, "png").await?;
        let b = post_with(&s, "b", &[], Some(700), Safety::Safe, "png").await?;
        let c = post_with(&s, "c", &[], Some(500), Safety::Safe, "png").await?;

        let predicate = compile("").predicate;
        let sorted = |order| {
            let db = s.db.clone();
            let predicate = predicate.clone();
            async move {
                let (posts, _) =
                    execute(&db, &predicate, SortKey::Width, order, Paging::new(1, 10)).await?;
                anyhow::Ok(posts.into_iter().map(|p| p.id).collect::<Vec<_>>())
            }
        };

        assert_eq!(sorted(SortOrder::Descending).await?, vec![b.id, c.id, a.id]);
        assert_eq!(sorted(SortOrder::Ascending).await?, vec![a.id, c.id, b.id]);
        Ok(())
    }

    #[tokio::test]
    async fn sort_term_overrides_the_request() -> anyhow::Result<()> {
        let s = setup().await?;
        let small = post_with(&s, "x", &[], Some(100), Safety::Safe, "png").await?;
        let big = post_with(&s, "yyyyyyyyyy", &[], Some(100), Safety::Safe, "png").await?;

        let page = search_posts(
            &s.db,
            &SearchConfig::default(),
            "sort:size",
            SearchRequest {
                sort: SortKey::Id,
                order: SortOrder::Ascending,
                ..Default::default()
            },
        )
        .await?;

        // sorted by file size, which is the seed's length
        assert_eq!(
            page.posts.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![small.id, big.id]
        );
        Ok(())
    }

    #[tokio::test]
    async fn pools() -> anyhow::Result<()> {
        let s = setup().await?;
        let mut posts = Vec::new();
        for i in 0..5 {
            posts.push(upload(&s, &format!("pooled {i}"), &[]).await?);
        }

        let first = Pool::create(&s.db, "first", None).await?;
        let _second = Pool::create(&s.db, "second", Some("empty")).await?;
        let third = Pool::create(&s.db, "third", None).await?;
        assert_eq!(third.id, 3);

        Pool::add_posts(&s.db, first.id, &[posts[0].id]).await?;
        let added = Pool::add_posts(&s.db, third.id, &[posts[3].id, posts[1].id, posts[3].id]).await?;
        assert_eq!(added, 2);

        assert_eq!(ids(&s, "pool:3").await?, vec![posts[1].id, posts[3].id]);
        assert_eq!(
            Pool::post_ids(&s.db, third.id).await?,
            vec![posts[3].id, posts[1].id]
        );

        Pool::reorder(&s.db, third.id, &[posts[1].id]).await?;
        assert_eq!(
            Pool::post_ids(&s.db, third.id).await?,
            vec![posts[1].id, posts[3].id]
        );

        Pool::remove_post(&s.db, third.id, posts[1].id).await?;
        assert_eq!(ids(&s, "pool:3").await?, vec![posts[3].id]);

        Pool::delete(&s.db, third.id).await?;
        assert!(ids(&s, "pool:3").await?.is_empty());
        assert!(Pool::get(&s.db, third.id).await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn favorites_and_kinds() -> anyhow::Result<()> {
        let s = setup().await?;
        let image = post_with(&s, "img", &[], Some(10), Safety::Safe, "JPG").await?;
        let gif = post_with(&s, "gif", &[], Some(10), Safety::Safe, "gif").await?;
        let video = post_with(&s, "vid", &[], Some(10), Safety::Safe, "webm").await?;

        Post::toggle_favorite(&s.db, gif.id).await?;

        assert_eq!(ids(&s, "fav:true").await?, vec![gif.id]);
        assert_eq!(ids(&s, "favorite:no").await?, vec![image.id, video.id]);
        assert_eq!(ids(&s, "type:image").await?, vec![image.id]);
        assert_eq!(ids(&s, "type:video OR type:gif").await?, vec![gif.id, video.id]);
        assert_eq!(ids(&s, "-type:video").await?, vec![image.id, gif.id]);
        Ok(())
    }

    #[tokio::test]
    async fn tag_search_is_exact() -> anyhow::Result<()> {
        let s = setup().await?;
        let cat = s.tags.create_tag("cat", "general").await?;
        s.tags.create_alias("kitty", "cat").await?;
        let post = upload(&s, "exact", &["cat"]).await?;
        assert_eq!(cat.name, "cat");

        assert_eq!(ids(&s, "cat").await?, vec![post.id]);
        // no alias expansion, and no lowercasing
        assert!(ids(&s, "kitty").await?.is_empty());
        assert!(ids(&s, "Cat").await?.is_empty());
        Ok(())
    }

    /// The in-memory evaluator and the SQL agree on every post.
    #[tokio::test]
    async fn memory_and_sql_agree() -> anyhow::Result<()> {
        let s = setup().await?;
        let a = post_with(&s, "a", &["cat", "bird"], Some(800), Safety::Safe, "png").await?;
        let b = post_with(&s, "b", &["cat", "dog"], Some(300), Safety::Unsafe, "gif").await?;
        let c = post_with(&s, "c", &["dog"], None, Safety::Sketchy, "mp4").await?;
        let d = post_with(&s, "d", &[], Some(500), Safety::Safe, "webp").await?;

        Post::toggle_favorite(&s.db, b.id).await?;
        let pool = Pool::create(&s.db, "agree", None).await?;
        Pool::add_posts(&s.db, pool.id, &[a.id, c.id]).await?;
        Post::update(
            &s.db,
            &s.resolver,
            d.id,
            PostUpdate {
                source: Some("https://example.org".into()),
                ..Default::default()
            },
        )
        .await?;

        let mut facts = BTreeMap::new();
        let pooled = Pool::post_ids(&s.db, pool.id).await?;
        for id in [a.id, b.id, c.id, d.id] {
            let post = Post::get(&s.db, id).await?;
            let mut f = PostFacts::from_post(&post);
            if pooled.contains(&id) {
                f = f.in_pools([pool.id]);
            }
            facts.insert(id, f);
        }

        for query in [
            "cat -dog width:>500 safety:safe",
            "cat OR dog",
            "-width:>=500",
            "height:>0",
            "fav:1 OR pool:1",
            "-fav:yes type:image",
            "type:video OR -cat",
            "a OR b OR dog",
            "rating:unsafe OR bird -type:gif",
            "",
        ] {
            let from_sql = ids(&s, query).await?.into_iter().collect::<BTreeSet<_>>();
            let predicate = compile(query).predicate;
            let in_memory = facts
                .iter()
                .filter(|(_, f)| predicate.matches(f))
                .map(|(id, _)| *id)
                .collect::<BTreeSet<_>>();

            assert_eq!(from_sql, in_memory, "`{query}`");
        }
        Ok(())
    }
}
