//! One page of a listing plus pagination metadata.

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use super::record::Record;

/// Page coordinates resolved from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Current page number (1-indexed).
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

impl PageRequest {
    /// Number of rows to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// A bounded slice of a larger result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records on this page.
    pub records: Vec<Record>,

    /// Current page number (1-indexed).
    pub page: u32,

    /// Items per page.
    pub per_page: u32,

    /// Total matching records before paging.
    pub total: u64,
}

impl Page {
    /// Create a page.
    pub fn new(records: Vec<Record>, total: u64, request: PageRequest) -> Self {
        Self {
            records,
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }

    /// Swap the record sequence, keeping metadata untouched.
    pub fn replace_records(&mut self, records: Vec<Record>) -> Vec<Record> {
        std::mem::replace(&mut self.records, records)
    }

    /// Total number of pages (at least 1).
    pub fn last_page(&self) -> u32 {
        if self.per_page == 0 || self.total == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// 1-indexed position of the first record on this page, if any.
    pub fn first_position(&self) -> Option<u64> {
        if self.records.is_empty() {
            return None;
        }
        let offset = u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page);
        Some(offset + 1)
    }

    /// 1-indexed position of the last record on this page, if any.
    pub fn last_position(&self) -> Option<u64> {
        self.first_position().map(|from| from + self.records.len() as u64 - 1)
    }

    /// Whether there's a next page.
    pub fn has_next(&self) -> bool {
        self.page < self.last_page()
    }

    /// Whether there's a previous page.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 7)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("per_page", &self.per_page)?;
        state.serialize_field("current_page", &self.page)?;
        state.serialize_field("last_page", &self.last_page())?;
        state.serialize_field("from", &self.first_position())?;
        state.serialize_field("to", &self.last_position())?;
        state.serialize_field("data", &self.records)?;
        state.end()
    }
}
