use potion::Error;
use serde::Serialize;

use crate::constants::MAX_PAGE_SIZE;

/// Page number (1-based) and page size requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid page {page}")]
pub struct PageError {
    pub page: i64,
}

impl From<PageError> for Error {
    fn from(value: PageError) -> Self {
        Error {
            code: 404,
            info: Some(value.to_string()),
            redirect: None,
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `total_rows` is the window count carried by the fetched rows. A page
    /// other than the first that comes back empty lies past the end.
    pub fn from_rows(
        results: Vec<T>,
        total_rows: i64,
        request: PageRequest,
    ) -> Result<Self, PageError> {
        if results.is_empty() {
            if request.page > 1 {
                return Err(PageError { page: request.page });
            }
            return Ok(Self::no_rows());
        }

        let page_count = (total_rows + request.limit - 1) / request.limit;
        let next = (request.page < page_count).then_some(request.page + 1);
        let previous = (request.page > 1).then_some(request.page - 1);

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}
