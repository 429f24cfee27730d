//! Helps to sort and page through posts.

use crate::config::SearchConfig;

use super::query::Posts;

/// Different sorts users can apply to a search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// When the post was uploaded.
    #[default]
    Date,
    Id,
    /// File size, in bytes.
    Size,
    Width,
    Height,
}

impl SortKey {
    /// Never fails. Unknown keys sort by date.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Self::Id,
            "size" => Self::Size,
            "width" => Self::Width,
            "height" => Self::Height,
            "date" => Self::Date,
            other => {
                tracing::debug!("Unknown sort key `{other}`. Sorting by date.");
                Self::Date
            }
        }
    }

    pub(crate) fn column(self) -> Posts {
        match self {
            SortKey::Date => Posts::CreatedAt,
            SortKey::Id => Posts::Id,
            SortKey::Size => Posts::FileSize,
            SortKey::Width => Posts::Width,
            SortKey::Height => Posts::Height,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortOrder {
    /// Lowest value first.
    Ascending,
    /// Highest value first.
    #[default]
    Descending,
}

impl SortOrder {
    /// `asc` sorts ascending. Anything else is descending.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Self::Ascending,
            _ => Self::Descending,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

impl From<SortOrder> for sea_query::Order {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Ascending => sea_query::Order::Asc,
            SortOrder::Descending => sea_query::Order::Desc,
        }
    }
}

/// A 1-indexed page of some listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Paging {
    pub page: u32,
    pub limit: u32,
}

impl Default for Paging {
    fn default() -> Self {
        let conf = SearchConfig::default();
        Self {
            page: 1,
            limit: conf.default_page_size,
        }
    }
}

impl Paging {
    /// Takes `page` and `limit` as given. A page below 1 still counts as 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Like [`Paging::new`], but keeps `limit` within `1..=max_page_size`,
    /// and uses the default size when no limit is given.
    pub fn clamped(page: u32, limit: Option<u32>, conf: &SearchConfig) -> Self {
        let max = conf.max_page_size.max(1);
        let limit = limit.unwrap_or(conf.default_page_size).clamp(1, max);

        Self {
            page: page.max(1),
            limit,
        }
    }

    /// How many rows come before this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.limit)
    }

    /// How many pages `total` rows fill.
    pub fn pages(&self, total: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(u64::from(self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_fall_back_to_date() {
        assert_eq!(SortKey::parse("SIZE"), SortKey::Size);
        assert_eq!(SortKey::parse("width"), SortKey::Width);
        assert_eq!(SortKey::parse("random"), SortKey::Date);
        assert_eq!(SortKey::parse(""), SortKey::Date);
    }

    #[test]
    fn sort_order_defaults_to_descending() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Ascending);
        assert_eq!(SortOrder::parse("desc"), SortOrder::Descending);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Descending);
        assert_eq!(SortOrder::default().keyword(), "DESC");
    }

    #[test]
    fn paging_math() {
        let p = Paging::new(2, 10);
        assert_eq!(p.offset(), 10);
        assert_eq!(p.pages(25), 3);
        assert_eq!(p.pages(20), 2);
        assert_eq!(p.pages(0), 0);

        // page zero is the first page
        assert_eq!(Paging::new(0, 10).offset(), 0);
    }

    #[test]
    fn clamping() {
        let conf = SearchConfig {
            default_page_size: 40,
            max_page_size: 100,
        };

        assert_eq!(Paging::clamped(0, None, &conf), Paging::new(1, 40));
        assert_eq!(Paging::clamped(3, Some(0), &conf), Paging::new(3, 1));
        assert_eq!(Paging::clamped(1, Some(5000), &conf), Paging::new(1, 100));
    }
}
