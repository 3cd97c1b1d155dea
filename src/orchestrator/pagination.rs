//! Page coordinates and page results.
//!
//! A [`PageRequest`] is validated on construction and knows how to inject the
//! reserved paging parameters into a parameter bag. A [`PageResult`] applies the
//! page-count arithmetic to an already fetched page.

use crate::constants::paging_params;
use crate::constants::system::STATEMENT_SEPARATOR;
use crate::error::{SqlKitError, SqlKitResult};
use crate::params::Parameters;
use serde::{Deserialize, Serialize};

/// 1-based page index and page size, both at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> SqlKitResult<Self> {
        if page < 1 {
            return Err(SqlKitError::validation(format!(
                "Page index must be at least 1, got {page}"
            )));
        }
        if page_size < 1 {
            return Err(SqlKitError::validation(format!(
                "Page size must be at least 1, got {page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rows before this page
    pub fn skip(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.page_size)
    }

    /// Rows in this page
    pub fn take(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// First row number of the page (1-based, inclusive)
    pub fn take_start(&self) -> u64 {
        self.skip() + 1
    }

    /// Last row number of the page (inclusive)
    pub fn take_end(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }

    /// Write `TakeStart`, `TakeEnd`, `Skip` and `Take` into `params`,
    /// overwriting caller values of the same name.
    pub fn inject(&self, params: &mut Parameters) {
        params.insert(paging_params::TAKE_START, self.take_start());
        params.insert(paging_params::TAKE_END, self.take_end());
        params.insert(paging_params::SKIP, self.skip());
        params.insert(paging_params::TAKE, self.take());
    }
}

/// Join the count and data statements into one batch
pub fn batch_sql(count_sql: &str, data_sql: &str) -> String {
    if count_sql.trim_end().ends_with(STATEMENT_SEPARATOR) {
        format!("{count_sql}{data_sql}")
    } else {
        format!("{count_sql}{STATEMENT_SEPARATOR}{data_sql}")
    }
}

/// One page of results plus the totals it was cut from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub contents: Vec<T>,
    /// Requested page, clamped down to `total_page`
    pub page: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_page: u64,
}

impl<T> PageResult<T> {
    pub fn new(contents: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        let page_size = u64::from(request.page_size());
        let total_page = total_pages(total_count, page_size);
        let page = u64::from(request.page()).min(total_page);

        Self {
            contents,
            page,
            page_size,
            total_count,
            total_page,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            contents: self.contents.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_page: self.total_page,
        }
    }
}

fn total_pages(total_count: u64, page_size: u64) -> u64 {
    if total_count % page_size == 0 {
        total_count / page_size
    } else {
        total_count / page_size + 1
    }
}
