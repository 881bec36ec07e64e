//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

/// The config for pagination
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    /// The number of items to request per page when not specified.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_pages: 5,
        }
    }
}

/// One page of a query result.
///
/// A page is a snapshot: the next query replaces it wholesale.
/// Page numbers start at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The items on this page, in the order the server returned them.
    pub content: Vec<T>,
    /// The number of items across all pages.
    pub total_elements: u64,
    /// The number of pages.
    pub total_pages: u64,
    /// The zero-based index of this page.
    #[serde(rename = "number")]
    pub page_number: u64,
    /// The requested number of items per page.
    #[serde(rename = "size")]
    pub page_size: u64,
    /// Whether this is the first page.
    #[serde(rename = "first")]
    pub is_first: bool,
    /// Whether this is the last page.
    #[serde(rename = "last")]
    pub is_last: bool,
}

impl<T> Page<T> {
    /// Transform every item on the page, keeping the page position.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            page_number: self.page_number,
            page_size: self.page_size,
            is_first: self.is_first,
            is_last: self.is_last,
        }
    }

    /// Whether the page has no items.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// One element of a page-number strip such as `< 1 … 4 [5] 6 … 10 >`.
///
/// Page numbers are one-based, i.e. they are the labels shown to the user.
#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    /// A link to another page.
    Page(u64),
    /// The current page.
    CurrPage(u64),
    /// A gap in the page numbers.
    Ellipsis,
    /// A link to the next page.
    NextButton(u64),
    /// A link to the previous page.
    BackButton(u64),
}

/// Build the page-number strip for `page`, showing at most `max_pages` page
/// numbers around the current page.
pub fn pagination_indicators<T>(page: &Page<T>, max_pages: u64) -> Vec<PaginationIndicator> {
    create_pagination_indicators(page.page_number + 1, page.total_pages, max_pages)
}

fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let map_page = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };

    let half = max_pages / 2;

    let mut indicators: Vec<PaginationIndicator> = if page_count <= max_pages {
        (1..=page_count).map(map_page).collect()
    } else if curr_page <= half {
        (1..=max_pages).map(map_page).collect()
    } else if curr_page > page_count - half {
        ((page_count - max_pages + 1)..=page_count)
            .map(map_page)
            .collect()
    } else {
        ((curr_page - half)..=(curr_page + half))
            .map(map_page)
            .collect()
    };

    if page_count > max_pages {
        if curr_page > half + 1 {
            indicators.insert(0, PaginationIndicator::Page(1));
            indicators.insert(1, PaginationIndicator::Ellipsis);
        }

        if curr_page < page_count - half {
            indicators.push(PaginationIndicator::Ellipsis);
            indicators.push(PaginationIndicator::Page(page_count));
        }
    }

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}
