//! Page-number pagination for listings.

use serde::{Deserialize, Serialize};

use super::api_error::ApiError;
use crate::config::PaginationSettings;

pub const INVALID_PAGE_MESSAGE: &str = "Invalid page.";

/// Raw query values; both stay strings so that garbage can be handled
/// leniently instead of rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Page<T: Serialize> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

fn page_size(limit: Option<&str>, settings: &PaginationSettings) -> usize {
    match limit.map(str::trim).and_then(|l| l.parse::<usize>().ok()) {
        Some(size) if size >= 1 => size.min(settings.max_page_size),
        _ => settings.default_page_size,
    }
}

fn page_number(page: Option<&str>, total_pages: usize) -> Result<usize, ApiError> {
    let raw = match page.map(str::trim) {
        None | Some("") => return Ok(1),
        Some("last") => return Ok(total_pages),
        Some(raw) => raw,
    };
    match raw.parse::<usize>() {
        Ok(number) if number >= 1 && number <= total_pages => Ok(number),
        _ => Err(ApiError::NotFound(INVALID_PAGE_MESSAGE.to_string())),
    }
}

pub fn paginate<T: Serialize>(
    items: Vec<T>,
    query: &PageQuery,
    settings: &PaginationSettings,
) -> Result<Page<T>, ApiError> {
    let count = items.len();
    let page_size = page_size(query.limit.as_deref(), settings);
    // An empty listing still has one (empty) page.
    let total_pages = count.div_ceil(page_size).max(1);
    let page = page_number(query.page.as_deref(), total_pages)?;

    let results = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Page {
        count,
        page,
        page_size,
        total_pages,
        next: (page < total_pages).then_some(page + 1),
        previous: (page > 1).then(|| page - 1),
        results,
    })
}
