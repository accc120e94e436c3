//! Listing filters and pagination.
//!
//! A [`ListingQuery`] is the filter state behind every paginated listing:
//! products, category pages, search results and the blog. It parses from a
//! raw query string and writes back a canonical one, so page links keep
//! every active filter and never carry default values.
//!
//! Canonical key order: `search`, `category` (repeated), `min_price`,
//! `max_price`, `car_model` (repeated), `orderby`, `order`, `page`,
//! `per_page`. Page 1 and the default page size are omitted.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use url::form_urlencoded;

use crate::types::CategoryId;

/// Number of page links shown at once.
pub const PAGE_WINDOW: u32 = 5;

/// Largest page size the commerce API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Per-listing defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingDefaults {
    /// Page size when `per_page` is absent.
    pub per_page: u32,
    /// Query key that carries the search text.
    pub search_key: &'static str,
}

impl ListingDefaults {
    /// `/products` and `/category/{id}`.
    pub const PRODUCTS: Self = Self {
        per_page: 12,
        search_key: "search",
    };

    /// `/search`, which takes the text as `q`.
    pub const SEARCH: Self = Self {
        per_page: 12,
        search_key: "q",
    };

    /// `/blog`.
    pub const BLOG: Self = Self {
        per_page: 9,
        search_key: "search",
    };
}

/// Field to sort products by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortBy {
    Date,
    Price,
    Popularity,
    Rating,
    Title,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Price => "price",
            Self::Popularity => "popularity",
            Self::Rating => "rating",
            Self::Title => "title",
        }
    }
}

impl FromStr for SortBy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(Self::Date),
            "price" => Ok(Self::Price),
            "popularity" => Ok(Self::Popularity),
            "rating" => Ok(Self::Rating),
            "title" => Ok(Self::Title),
            _ => Err(()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

/// Filter and pagination state for a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub search: Option<String>,
    /// Selected categories, in selection order without duplicates.
    pub categories: Vec<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Free-form car model tags.
    pub car_models: Vec<String>,
    pub orderby: Option<SortBy>,
    pub order: Option<SortOrder>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    defaults: ListingDefaults,
}

impl ListingQuery {
    /// Empty filter state on page 1.
    #[must_use]
    pub const fn new(defaults: ListingDefaults) -> Self {
        Self {
            search: None,
            categories: Vec::new(),
            min_price: None,
            max_price: None,
            car_models: Vec::new(),
            orderby: None,
            order: None,
            page: 1,
            per_page: defaults.per_page,
            defaults,
        }
    }

    /// Parse a raw (still percent-encoded) query string.
    ///
    /// Unknown keys are ignored and values that do not parse are dropped.
    /// `search` is always accepted as the search key, in addition to the
    /// listing's own key.
    #[must_use]
    pub fn parse(defaults: ListingDefaults, raw: &str) -> Self {
        let mut query = Self::new(defaults);
        let raw = raw.strip_prefix('?').unwrap_or(raw);

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                k if k == defaults.search_key || k == "search" => {
                    if !value.is_empty() {
                        query.search = Some(value.to_owned());
                    }
                }
                "category" => {
                    if let Ok(id) = value.parse::<CategoryId>() {
                        if !query.categories.contains(&id) {
                            query.categories.push(id);
                        }
                    }
                }
                "min_price" => query.min_price = parse_price(value).or(query.min_price),
                "max_price" => query.max_price = parse_price(value).or(query.max_price),
                "car_model" => {
                    if !value.is_empty() && !query.car_models.iter().any(|m| m == value) {
                        query.car_models.push(value.to_owned());
                    }
                }
                "orderby" => query.orderby = value.parse().ok().or(query.orderby),
                "order" => query.order = value.parse().ok().or(query.order),
                "page" => {
                    if let Ok(page) = value.parse::<u32>() {
                        query.page = page.max(1);
                    }
                }
                "per_page" => {
                    if let Ok(per_page) = value.parse::<u32>() {
                        query.per_page = per_page.clamp(1, MAX_PAGE_SIZE);
                    }
                }
                _ => {}
            }
        }

        query
    }

    /// The defaults this query was built with.
    #[must_use]
    pub const fn defaults(&self) -> ListingDefaults {
        self.defaults
    }

    /// Canonical query string without the leading `?`. Empty when every
    /// value is a default.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());

        if let Some(search) = &self.search {
            out.append_pair(self.defaults.search_key, search);
        }
        for id in &self.categories {
            out.append_pair("category", &id.to_string());
        }
        if let Some(min) = self.min_price {
            out.append_pair("min_price", &min.normalize().to_string());
        }
        if let Some(max) = self.max_price {
            out.append_pair("max_price", &max.normalize().to_string());
        }
        for model in &self.car_models {
            out.append_pair("car_model", model);
        }
        if let Some(orderby) = self.orderby {
            out.append_pair("orderby", orderby.as_str());
        }
        if let Some(order) = self.order {
            out.append_pair("order", order.as_str());
        }
        if self.page != 1 {
            out.append_pair("page", &self.page.to_string());
        }
        if self.per_page != self.defaults.per_page {
            out.append_pair("per_page", &self.per_page.to_string());
        }

        out.finish()
    }

    /// A copy of this query on another page.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Link to `page` of the listing served at `path`.
    #[must_use]
    pub fn page_url(&self, path: &str, page: u32) -> String {
        let qs = self.with_page(page).to_query_string();
        if qs.is_empty() {
            path.to_owned()
        } else {
            format!("{path}?{qs}")
        }
    }

    /// The category forwarded to the commerce API, which accepts only one.
    #[must_use]
    pub fn primary_category(&self) -> Option<CategoryId> {
        self.categories.first().copied()
    }

    /// Whether any filter beyond paging is active.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        self.search.is_some()
            || !self.categories.is_empty()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || !self.car_models.is_empty()
            || self.orderby.is_some()
            || self.order.is_some()
    }
}

impl fmt::Display for ListingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

fn parse_price(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .ok()
        .filter(|d| !d.is_sign_negative())
}

/// Page numbers to show for `current` out of `total` pages.
///
/// Shows every page when there are at most [`PAGE_WINDOW`]; otherwise a
/// window of five anchored to the start (current ≤ 3), to the end
/// (current ≥ total − 2) or centred on `current`. Out-of-range values of
/// `current` are clamped into `1..=total` first.
#[must_use]
pub fn page_window(current: u32, total: u32) -> Vec<u32> {
    if total == 0 {
        return Vec::new();
    }
    if total <= PAGE_WINDOW {
        return (1..=total).collect();
    }

    let current = current.clamp(1, total);
    let start = if current <= 3 {
        1
    } else if current >= total - 2 {
        total - (PAGE_WINDOW - 1)
    } else {
        current - 2
    };
    (start..start + PAGE_WINDOW).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_window_small_total_shows_all() {
        assert_eq!(page_window(1, 1), vec![1]);
        assert_eq!(page_window(2, 4), vec![1, 2, 3, 4]);
        assert_eq!(page_window(5, 5), vec![1, 2, 3, 4, 5]);
        assert!(page_window(1, 0).is_empty());
    }

    #[test]
    fn test_window_anchors() {
        assert_eq!(page_window(1, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(3, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(5, 10), vec![3, 4, 5, 6, 7]);
        assert_eq!(page_window(8, 10), vec![6, 7, 8, 9, 10]);
        assert_eq!(page_window(10, 10), vec![6, 7, 8, 9, 10]);
        assert_eq!(page_window(4, 6), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_window_clamps_out_of_range_current() {
        assert_eq!(page_window(0, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(99, 10), vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_window_always_contains_current() {
        for total in 1..=20 {
            for current in 1..=total {
                let window = page_window(current, total);
                assert!(window.contains(&current), "{current}/{total}");
                assert_eq!(window.len() as u32, total.min(PAGE_WINDOW));
            }
        }
    }

    #[test]
    fn test_empty_query_has_no_string() {
        let query = ListingQuery::parse(ListingDefaults::PRODUCTS, "");
        assert_eq!(query.to_query_string(), "");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 12);
        assert!(!query.has_filters());
    }

    #[test]
    fn test_canonical_order_and_defaults_omitted() {
        let raw = "per_page=12&page=1&order=desc&orderby=price&car_model=Logan\
                   &max_price=900000&min_price=100000&category=4&category=7&search=brake+pad";
        let query = ListingQuery::parse(ListingDefaults::PRODUCTS, raw);
        assert_eq!(
            query.to_query_string(),
            "search=brake+pad&category=4&category=7&min_price=100000&max_price=900000\
             &car_model=Logan&orderby=price&order=desc"
        );
    }

    #[test]
    fn test_parse_ignores_unknown_and_bad_values() {
        let raw = "utm_source=x&page=abc&category=tires&category=3&per_page=-1&min_price=cheap&orderby=random";
        let query = ListingQuery::parse(ListingDefaults::PRODUCTS, raw);
        assert_eq!(query.page, 1);
        assert_eq!(query.categories, vec![CategoryId::new(3)]);
        assert_eq!(query.per_page, 12);
        assert_eq!(query.min_price, None);
        assert_eq!(query.orderby, None);
        assert_eq!(query.to_query_string(), "category=3");
    }

    #[test]
    fn test_page_zero_and_huge_page_size() {
        let query = ListingQuery::parse(ListingDefaults::PRODUCTS, "page=0&per_page=5000");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_duplicate_categories_collapse() {
        let query = ListingQuery::parse(ListingDefaults::PRODUCTS, "category=5&category=5&category=2");
        assert_eq!(query.categories, vec![CategoryId::new(5), CategoryId::new(2)]);
        assert_eq!(query.primary_category(), Some(CategoryId::new(5)));
    }

    #[test]
    fn test_round_trip_is_canonical() {
        let raw = "category=2&search=oil%20filter&page=3&per_page=24&car_model=L90&car_model=Sandero";
        let query = ListingQuery::parse(ListingDefaults::PRODUCTS, raw);
        let canonical = query.to_query_string();
        let reparsed = ListingQuery::parse(ListingDefaults::PRODUCTS, &canonical);
        assert_eq!(reparsed, query);
        assert_eq!(reparsed.to_query_string(), canonical);
    }

    #[test]
    fn test_search_listing_uses_q() {
        let query = ListingQuery::parse(ListingDefaults::SEARCH, "?q=spark+plug&page=2");
        assert_eq!(query.search.as_deref(), Some("spark plug"));
        assert_eq!(query.to_query_string(), "q=spark+plug&page=2");

        let legacy = ListingQuery::parse(ListingDefaults::SEARCH, "search=belt");
        assert_eq!(legacy.to_query_string(), "q=belt");
    }

    #[test]
    fn test_page_url_keeps_filters() {
        let query = ListingQuery::parse(ListingDefaults::PRODUCTS, "category=4&page=2");
        assert_eq!(query.page_url("/products", 1), "/products?category=4");
        assert_eq!(query.page_url("/products", 3), "/products?category=4&page=3");

        let plain = ListingQuery::new(ListingDefaults::BLOG);
        assert_eq!(plain.page_url("/blog", 1), "/blog");
        assert_eq!(plain.page_url("/blog", 2), "/blog?page=2");
    }

    #[test]
    fn test_blog_default_page_size() {
        let query = ListingQuery::parse(ListingDefaults::BLOG, "per_page=9&page=2");
        assert_eq!(query.to_query_string(), "page=2");
        let query = ListingQuery::parse(ListingDefaults::BLOG, "per_page=12");
        assert_eq!(query.to_query_string(), "per_page=12");
    }
}
