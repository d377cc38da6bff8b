//! Listing pipeline: Sort → Filter → Paginate → Shape.
//!
//! A [`ListingBuilder`] collects column rules and options, then yields an
//! immutable [`ListingPlan`]. The plan runs once per request against a query
//! context it takes by value, so a context can never be reused.

use super::error::ListError;
use super::filter::apply_filter;
use super::page::Page;
use super::paginate::{page_request, paginate};
use super::queryable::Queryable;
use super::request::ListRequest;
use super::shaping::{ColumnRules, RuleValue, Shaper};
use super::sort::apply_sort;

/// Collects column rules and options for a [`ListingPlan`].
#[derive(Debug, Clone, Default)]
pub struct ListingBuilder {
    edit: ColumnRules,
    add: ColumnRules,
    max_per_page: Option<u32>,
}

impl ListingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an existing column on every record.
    pub fn edit_column(mut self, field: impl Into<String>, value: impl Into<RuleValue>) -> Self {
        self.edit.insert(field, value);
        self
    }

    /// Add a new column to every record.
    pub fn add_column(mut self, field: impl Into<String>, value: impl Into<RuleValue>) -> Self {
        self.add.insert(field, value);
        self
    }

    /// Cap the page size a request may ask for.
    pub fn max_per_page(mut self, max: u32) -> Self {
        self.max_per_page = Some(max).filter(|m| *m > 0);
        self
    }

    pub fn build(self) -> ListingPlan {
        ListingPlan {
            shaper: Shaper::new(self.edit, self.add),
            max_per_page: self.max_per_page,
        }
    }
}

/// An immutable, reusable listing configuration.
#[derive(Debug, Clone, Default)]
pub struct ListingPlan {
    shaper: Shaper,
    max_per_page: Option<u32>,
}

impl ListingPlan {
    /// Column rules applied to every page.
    pub fn shaper(&self) -> &Shaper {
        &self.shaper
    }

    pub fn max_per_page(&self) -> Option<u32> {
        self.max_per_page
    }

    /// Run the pipeline for one request.
    ///
    /// Any error aborts the whole call; no partial page is returned.
    pub async fn run<Q: Queryable>(
        &self,
        request: &ListRequest,
        mut query: Q,
    ) -> Result<Page, ListError> {
        apply_sort(request, &mut query)?;
        apply_filter(request, &mut query);

        let mut page = paginate(&mut query, page_request(request, self.max_per_page)).await?;

        self.shaper.apply_changes_to(&mut page)?;
        Ok(page)
    }
}
