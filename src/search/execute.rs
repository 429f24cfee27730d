//! Runs compiled queries against the posts table.

use sea_query::{Asterisk, Expr, Func, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder as _;

use crate::{
    config::SearchConfig,
    database::Database,
    error::BooruError,
    models::post::Post,
};

use super::{
    compile::compile,
    modifiers::Predicate,
    query::Posts,
    sort::{Paging, SortKey, SortOrder},
};

/// What a caller asks a listing for, besides the query itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
    pub sort: SortKey,
    pub order: SortOrder,
    pub page: u32,
    /// `None` uses the configured default page size.
    pub limit: Option<u32>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            sort: SortKey::default(),
            order: SortOrder::default(),
            page: 1,
            limit: None,
        }
    }
}

/// One page of search results.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchPage {
    pub posts: Vec<Post>,
    /// How many posts match, across every page.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

/// Finds the posts matching `predicate`, returning one page and the total
/// match count.
///
/// Ties on the sort key are broken by post id, in the same direction.
#[tracing::instrument(skip(db))]
pub async fn execute(
    db: &Database,
    predicate: &Predicate,
    sort: SortKey,
    order: SortOrder,
    paging: Paging,
) -> Result<(Vec<Post>, u64), BooruError> {
    let cond = predicate.to_cond();

    // one read transaction, so the count and the page see the same rows
    let mut tx = db.pool().begin().await?;

    let (count, values) = Query::select()
        .expr(Func::count(Expr::col((Posts::Table, Posts::Id))))
        .from(Posts::Table)
        .cond_where(cond.clone())
        .build_sqlx(SqliteQueryBuilder);

    let total = sqlx::query_scalar_with::<_, i64, _>(&count, values)
        .fetch_one(&mut *tx)
        .await
        .inspect_err(|e| tracing::error!("Failed to count search results! err: {e}"))?;

    let (select, values) = Query::select()
        .column(Asterisk)
        .from(Posts::Table)
        .cond_where(cond)
        .order_by((Posts::Table, sort.column()), order.into())
        .order_by((Posts::Table, Posts::Id), order.into())
        .limit(u64::from(paging.limit))
        .offset(u64::try_from(paging.offset()).unwrap_or_default())
        .build_sqlx(SqliteQueryBuilder);

    let mut posts = sqlx::query_as_with::<_, Post, _>(&select, values)
        .fetch_all(&mut *tx)
        .await
        .inspect_err(|e| tracing::error!("Failed to fetch search results! err: {e}"))?;

    Post::hydrate(&mut *tx, &mut posts).await?;
    tx.commit().await?;

    tracing::debug!("Search matched {total} posts. Returning {}.", posts.len());
    Ok((posts, u64::try_from(total).unwrap_or_default()))
}

/// Compiles `query`, then runs it with the request's paging.
///
/// A `sort:<key>` term in the query beats the request's sort key. Page and
/// limit are kept within what `conf` allows.
#[tracing::instrument(skip(db, conf))]
pub async fn search_posts(
    db: &Database,
    conf: &SearchConfig,
    query: &str,
    request: SearchRequest,
) -> Result<SearchPage, BooruError> {
    let compiled = compile(query);
    let sort = compiled.sort.unwrap_or(request.sort);
    let paging = Paging::clamped(request.page, request.limit, conf);

    let (posts, total) = execute(db, &compiled.predicate, sort, request.order, paging).await?;

    Ok(SearchPage {
        posts,
        total,
        page: paging.page,
        limit: paging.limit,
        pages: paging.pages(total),
    })
}
