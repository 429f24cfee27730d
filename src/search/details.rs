//! A detail is something that will be searched on.
//!
//! For example, in a search for `width:>500`, `>` is the comparison and `500`
//! is the detail.

use core::fmt;

/// How a filter's value relates to the post's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Comparison {
    Less,
    LessOrEqual,
    #[default]
    Equal,
    GreaterOrEqual,
    Greater,
}

impl Comparison {
    /// Splits a leading operator off a filter value.
    ///
    /// Two-character operators are checked first, so `>=5` isn't read as `>`
    /// with the value `=5`.
    pub fn split(value: &str) -> (Self, &str) {
        const OPERATORS: [(&str, Comparison); 4] = [
            (">=", Comparison::GreaterOrEqual),
            ("<=", Comparison::LessOrEqual),
            (">", Comparison::Greater),
            ("<", Comparison::Less),
        ];

        OPERATORS
            .into_iter()
            .find_map(|(op, cmp)| value.strip_prefix(op).map(|rest| (cmp, rest)))
            .unwrap_or((Comparison::Equal, value))
    }

    /// Whether `lhs <op> rhs` holds.
    pub fn holds<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            Comparison::Less => lhs < rhs,
            Comparison::LessOrEqual => lhs <= rhs,
            Comparison::Equal => lhs == rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::Greater => lhs > rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "=",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Greater => ">",
        })
    }
}

/// The filter keys a query understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// `rating` or `safety`
    Safety,
    Width,
    Height,
    /// `fav` or `favorite`
    Favorite,
    Pool,
    /// `type`, meaning image, gif, or video
    Kind,
    /// Not a condition. The executor orders by it instead.
    Sort,
}

impl FilterKey {
    /// Expects an already-lowercased key.
    pub fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "rating" | "safety" => Self::Safety,
            "width" => Self::Width,
            "height" => Self::Height,
            "fav" | "favorite" => Self::Favorite,
            "pool" => Self::Pool,
            "type" => Self::Kind,
            "sort" => Self::Sort,
            _ => return None,
        })
    }

    /// Whether this key takes `<`, `>`, and friends. Other keys ignore any
    /// operator and compare for equality.
    pub const fn is_ordered(self) -> bool {
        matches!(self, FilterKey::Width | FilterKey::Height)
    }
}

/// `true`, `yes`, and `1` are truthy. Everything else is falsy.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}
