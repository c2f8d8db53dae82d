//! Pure filter, sort and page arithmetic behind every list screen.

use std::cmp::Ordering;

/// Text a search term is matched against; `None` never matches.
pub type TextField<T> = fn(&T) -> Option<&str>;
/// The value a status filter is compared with.
pub type StatusField<T> = fn(&T) -> &str;
pub type SortKey<T> = fn(&T, &T) -> Ordering;

/// Lower-cased, trimmed search term. Empty means "match everything".
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// `"ALL"`, empty and whitespace-only values disable the status filter.
pub fn normalize_status(status: Option<&str>) -> Option<String> {
    status
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

pub fn matches_search<T>(item: &T, fields: &[TextField<T>], needle: &str) -> bool {
    needle.is_empty()
        || fields
            .iter()
            .any(|field| field(item).is_some_and(|v| v.to_lowercase().contains(needle)))
}

pub fn matches_status<T>(item: &T, field: Option<StatusField<T>>, wanted: Option<&str>) -> bool {
    match (field, wanted) {
        (Some(field), Some(wanted)) => field(item).eq_ignore_ascii_case(wanted),
        _ => true,
    }
}

/// Filters `items` and applies the optional sort. Without a sort key the
/// input order is kept; with one, equal elements keep their input order.
pub fn visible<'a, T>(
    items: &'a [T],
    search_fields: &[TextField<T>],
    status_field: Option<StatusField<T>>,
    sort: Option<SortKey<T>>,
    term: &str,
    status: Option<&str>,
) -> Vec<&'a T> {
    let needle = normalize_term(term);
    let mut out: Vec<&T> = items
        .iter()
        .filter(|item| matches_search(*item, search_fields, &needle))
        .filter(|item| matches_status(*item, status_field, status))
        .collect();
    if let Some(sort) = sort {
        out.sort_by(|a, b| sort(a, b));
    }
    out
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Items of the 1-based `page`; empty past the end.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page
        .saturating_sub(1)
        .saturating_mul(page_size)
        .min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}
