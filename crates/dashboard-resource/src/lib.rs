//! Resource aggregation and shaping for the dashboard API
//!
//! - [`channels`] - one concurrent list call per kind with partial-failure semantics
//! - [`dataselect`] - filter, sort and paginate over [`dataselect::Cell`]s
//! - [`views`] - list and detail views built on the two above
//! - [`overview`] - member capacity, control-plane counts, controller manager version

#![deny(missing_docs)]

pub mod channels;
pub mod dataselect;
pub mod error;
pub mod kind;
pub mod lister;
pub mod overview;
pub mod quantity;
pub mod views;

pub use channels::{ResourceChannelAggregator, ResourceChannelSet, ResourceLists};
pub use dataselect::{select, Cell, DataSelectQuery, SelectionResult, DEFAULT_MAX_PAGE_SIZE};
pub use error::{Error, Result};
pub use kind::ResourceKind;
pub use lister::{NamespaceQuery, ResourceLister};
pub use views::{ListRequest, ResourceList};
