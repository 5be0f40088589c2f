//! Selection query and its query-string form
//!
//! The UI encodes a query as
//! `filterBy=name,db,namespace,prod&sortBy=d,creationTimestamp,a,name&itemsPerPage=10&page=2`.

use super::cell::PropertyName;
use crate::error::{Error, Result};

/// Conjunctive substring filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    /// (property, term) pairs, all of which must match
    pub terms: Vec<(PropertyName, String)>,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortBy {
    /// Property to sort on
    pub property: PropertyName,
    /// Ascending when true
    pub ascending: bool,
}

/// Ordered sort keys; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortQuery {
    /// Sort keys
    pub keys: Vec<SortBy>,
}

/// One-based pagination
///
/// `items_per_page == 0` disables pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationQuery {
    /// Page size
    pub items_per_page: usize,
    /// One-based page number
    pub page: usize,
}

impl PaginationQuery {
    /// Pagination with the given size and one-based page
    pub fn new(items_per_page: usize, page: usize) -> Self {
        Self {
            items_per_page,
            page,
        }
    }
}

/// Complete selection query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSelectQuery {
    /// Filters
    pub filter: FilterQuery,
    /// Sort order
    pub sort: SortQuery,
    /// Page selection
    pub pagination: PaginationQuery,
}

impl DataSelectQuery {
    /// Query that selects everything in original order
    pub fn everything() -> Self {
        Self::default()
    }

    /// Build a query from its query-string parameters
    pub fn from_params(
        filter_by: Option<&str>,
        sort_by: Option<&str>,
        items_per_page: Option<usize>,
        page: Option<usize>,
    ) -> Result<Self> {
        Ok(Self {
            filter: parse_filter(filter_by.unwrap_or_default())?,
            sort: parse_sort(sort_by.unwrap_or_default())?,
            pagination: PaginationQuery::new(items_per_page.unwrap_or(0), page.unwrap_or(1)),
        })
    }

    /// Add a filter term
    pub fn with_filter(mut self, property: PropertyName, term: impl Into<String>) -> Self {
        self.filter.terms.push((property, term.into()));
        self
    }

    /// Add a sort key
    pub fn with_sort(mut self, property: PropertyName, ascending: bool) -> Self {
        self.sort.keys.push(SortBy {
            property,
            ascending,
        });
        self
    }

    /// Replace pagination
    pub fn with_pagination(mut self, items_per_page: usize, page: usize) -> Self {
        self.pagination = PaginationQuery::new(items_per_page, page);
        self
    }
}

fn split_pairs(raw: &str, param: &str) -> Result<Vec<(String, String)>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() % 2 != 0 {
        return Err(Error::InvalidQuery(format!(
            "{} must hold an even number of comma-separated values",
            param
        )));
    }
    Ok(parts
        .chunks(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect())
}

fn parse_filter(raw: &str) -> Result<FilterQuery> {
    let terms = split_pairs(raw, "filterBy")?
        .into_iter()
        .filter(|(_, term)| !term.is_empty())
        .map(|(prop, term)| (PropertyName::from(prop.as_str()), term))
        .collect();
    Ok(FilterQuery { terms })
}

fn parse_sort(raw: &str) -> Result<SortQuery> {
    let keys = split_pairs(raw, "sortBy")?
        .into_iter()
        .map(|(dir, prop)| {
            let ascending = match dir.as_str() {
                "a" => true,
                "d" => false,
                other => {
                    return Err(Error::InvalidQuery(format!(
                        "sort direction must be 'a' or 'd', got {:?}",
                        other
                    )))
                }
            };
            Ok(SortBy {
                property: PropertyName::from(prop.as_str()),
                ascending,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SortQuery { keys })
}
