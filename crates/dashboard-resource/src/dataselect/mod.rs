//! Generic filter / sort / paginate over [`Cell`]s
//!
//! Selection runs in three steps: keep the items matching every filter term,
//! stable-sort them by the sort keys, then cut out the requested page. The
//! count after filtering is reported separately from the unfiltered total.

mod cell;
mod query;

use std::cmp::Ordering;

pub use cell::{Cell, ComparableValue, PropertyName};
pub use query::{DataSelectQuery, FilterQuery, PaginationQuery, SortBy, SortQuery};

/// Default cap on the page size
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Selected items and counts
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult<T> {
    /// Items on the requested page
    pub items: Vec<T>,
    /// Items before filtering
    pub total: usize,
    /// Items after filtering, before pagination
    pub filtered_total: usize,
}

/// Apply `query` to `items`
///
/// An out-of-range page yields no items. A page size of zero returns every
/// matching item. Either way no more than `max_page_size` items are returned.
pub fn select<T: Cell>(items: Vec<T>, query: &DataSelectQuery, max_page_size: usize) -> SelectionResult<T> {
    let total = items.len();

    let mut filtered: Vec<T> = items
        .into_iter()
        .filter(|item| matches_filter(item, query))
        .collect();
    let filtered_total = filtered.len();

    if !query.sort.keys.is_empty() {
        filtered.sort_by(|a, b| compare(a, b, query));
    }

    let items = paginate(filtered, query.pagination, max_page_size);
    SelectionResult {
        items,
        total,
        filtered_total,
    }
}

fn matches_filter<T: Cell>(item: &T, query: &DataSelectQuery) -> bool {
    query.filter.terms.iter().all(|(property, term)| {
        item.property(property)
            .is_some_and(|value| value.contains(term))
    })
}

fn compare<T: Cell>(a: &T, b: &T, query: &DataSelectQuery) -> Ordering {
    for key in &query.sort.keys {
        // Missing values sort last in either direction
        let ord = match (a.property(&key.property), b.property(&key.property)) {
            (Some(x), Some(y)) if key.ascending => x.compare(&y),
            (Some(x), Some(y)) => y.compare(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn paginate<T>(items: Vec<T>, pagination: PaginationQuery, max_page_size: usize) -> Vec<T> {
    let max = max_page_size.max(1);
    let size = match pagination.items_per_page {
        0 => max,
        n => n.min(max),
    };
    let page = pagination.page.max(1);
    let start = (page - 1).saturating_mul(size);
    if start >= items.len() {
        return Vec::new();
    }
    items.into_iter().skip(start).take(size).collect()
}
