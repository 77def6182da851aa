//! Paginated list envelope.

use serde::{Deserialize, Serialize};

/// A page of results in the backend's `{count, next, previous, results}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// Number of pages for a given page size, at least 1.
    #[must_use]
    pub fn total_pages(&self, page_size: u64) -> u64 {
        if page_size == 0 {
            return 1;
        }
        self.count.div_ceil(page_size).max(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page {
            count: 41,
            ..Page::default()
        };
        assert_eq!(page.total_pages(20), 3);
        assert_eq!(Page::<u8>::default().total_pages(20), 1);
    }

    #[test]
    fn test_parse_envelope() {
        let page: Page<u8> =
            serde_json::from_str(r#"{"count": 2, "next": "http://x/?page=2", "results": [1, 2]}"#)
                .unwrap();
        assert!(page.has_next());
        assert!(!page.has_previous());
        assert_eq!(page.results, vec![1, 2]);
    }
}
