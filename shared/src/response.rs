//! API response envelope
//!
//! Success bodies are `{message, data?}`; list endpoints wrap rows in a
//! [`Page`]. Error bodies are produced by the server's `AppError`.

use serde::{Deserialize, Serialize};

/// Standard success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiMessage<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiMessage<()> {
    /// Message-only body (no data payload)
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Pagination query parameters (`?page=1&per_page=15`)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    15
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 15,
        }
    }
}

impl PageQuery {
    /// Clamp to sane bounds (per_page 1..=100, page ≥ 1)
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// One page of rows plus the total count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, query: PageQuery, total: i64) -> Self {
        Self {
            data,
            page: query.page,
            per_page: query.per_page,
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps() {
        let q = PageQuery {
            page: 0,
            per_page: 5000,
        }
        .clamped();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 100);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn offset_math() {
        let q = PageQuery {
            page: 3,
            per_page: 15,
        };
        assert_eq!(q.offset(), 30);
        assert_eq!(q.limit(), 15);
    }
}
