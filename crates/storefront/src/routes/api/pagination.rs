//! Page-number pagination and search for list endpoints.
//!
//! `?page=` is 1-based, `?page_size=` falls back to the configured default
//! and is capped at the configured maximum. Responses carry absolute links
//! to the neighbouring pages.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::PaginationConfig;
use crate::error::{AppError, Result};

/// Query parameters accepted by paginated list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Search terms, split on whitespace and lowercased.
    #[must_use]
    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }
}

/// One page of a list.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count_objects: usize,
    pub next_item: Option<String>,
    pub previous_item: Option<String>,
    pub items: Vec<T>,
}

/// True if every term occurs, case-insensitively, in at least one field.
#[must_use]
pub fn matches_search(terms: &[String], fields: &[&str]) -> bool {
    let fields: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
    terms
        .iter()
        .all(|term| fields.iter().any(|field| field.contains(term.as_str())))
}

/// Cut one page out of `items`.
///
/// `base_url` and `path` build the neighbour links; the `search` and
/// `page_size` parameters of the request are carried over.
///
/// # Errors
///
/// Returns `BadRequest` for `page=0` and `NotFound` for a page past the end.
/// The first page always exists, even for an empty list.
pub fn paginate<T>(
    items: Vec<T>,
    query: &ListQuery,
    config: &PaginationConfig,
    base_url: &Url,
    path: &str,
) -> Result<Page<T>> {
    let page_size = match query.page_size {
        None | Some(0) => config.default_page_size,
        Some(size) => size.min(config.max_page_size),
    } as usize;
    let page = match query.page {
        None => 1,
        Some(0) => return Err(AppError::BadRequest("page must be at least 1".to_string())),
        Some(page) => page as usize,
    };

    let count = items.len();
    let pages = count.div_ceil(page_size).max(1);
    if page > pages {
        return Err(AppError::NotFound(format!("page {page}")));
    }

    let link = |target: usize| -> Result<String> {
        let mut url = base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("invalid page link: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &target.to_string());
            if let Some(size) = query.page_size {
                pairs.append_pair("page_size", &size.to_string());
            }
            if let Some(search) = query.search.as_deref() {
                pairs.append_pair("search", search);
            }
        }
        Ok(url.into())
    };

    let next_item = if page < pages { Some(link(page + 1)?) } else { None };
    let previous_item = if page > 1 { Some(link(page - 1)?) } else { None };

    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Page {
        count_objects: count,
        next_item,
        previous_item,
        items,
    })
}
