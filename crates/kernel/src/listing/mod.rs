//! Listing pipeline module.
//!
//! Turns a listing request (sort, filter, paging) into a shaped page of
//! records:
//! - request: inbound parameters and the request accessor seam
//! - sort / filter / paginate: query-building stages
//! - shaping: declarative column edits and additions
//! - pipeline: builder and immutable plan running the stages in order
//! - memory / sql: data sources implementing [`Queryable`]

mod error;
mod filter;
mod memory;
mod page;
mod paginate;
mod pipeline;
mod queryable;
mod record;
mod request;
mod shaping;
mod sort;
mod sql;

pub use error::ListError;
pub use filter::apply_filter;
pub use memory::{Condition, MemoryQueryable};
pub use page::{Page, PageRequest};
pub use paginate::{DEFAULT_PER_PAGE, page_request, paginate, resolve_page, resolve_per_page};
pub use pipeline::{ListingBuilder, ListingPlan};
pub use queryable::{ContainsPattern, Queryable, SortDirection};
pub use record::{Record, Relation};
pub use request::{FieldValue, ListRequest, QueryParams, RequestAccessor};
pub use shaping::{ColumnRules, ComputeFn, RuleValue, Shaper};
pub use sort::{SortDirective, apply_sort};
pub use sql::{RelationKind, RelationSpec, SqlListQuery, SqlQueryable, is_safe_identifier};
