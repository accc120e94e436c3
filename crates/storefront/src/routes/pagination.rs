//! Page links for listing pages.

use autoparts_core::{ListingQuery, page_window};

/// One numbered page link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub number: u32,
    pub url: String,
    pub current: bool,
}

/// Links rendered under a listing: a window of page numbers plus
/// previous/next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub links: Vec<PageLink>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pagination {
    /// Build the links for `query` served at `path`. Every link keeps the
    /// query's filters.
    #[must_use]
    pub fn new(query: &ListingQuery, path: &str, total_pages: u32) -> Self {
        if total_pages <= 1 {
            return Self::default();
        }

        let current = query.page.clamp(1, total_pages);
        let links = page_window(current, total_pages)
            .into_iter()
            .map(|number| PageLink {
                number,
                url: query.page_url(path, number),
                current: number == current,
            })
            .collect();

        Self {
            links,
            prev: (current > 1).then(|| query.page_url(path, current - 1)),
            next: (current < total_pages).then(|| query.page_url(path, current + 1)),
        }
    }

    /// Whether there is more than one page.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.links.is_empty()
    }
}
