//! Page-based pagination bookkeeping.

use serde::{Deserialize, Serialize};

use super::group::MessageGroup;

/// Cursor returned alongside every page. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl PageCursor {
    /// Whether another page exists after this one.
    pub const fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    /// Number of the page after this one, if any.
    pub const fn next_page(&self) -> Option<u32> {
        if self.has_more() {
            Some(self.page + 1)
        } else {
            None
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageCursor,
}

/// A page of a conversation's grouped messages.
pub type MessagePage = Page<MessageGroup>;

/// Which conversation list a cursor belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ListScope {
    #[default]
    Global,
    Project(String),
}

impl ListScope {
    /// Scope addressed by an optional project id.
    pub fn from_project(project_uuid: Option<&str>) -> Self {
        project_uuid.map_or(Self::Global, |p| Self::Project(p.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_has_more() {
        let cursor = PageCursor {
            page: 1,
            per_page: 20,
            total: 45,
            total_pages: 3,
        };
        assert!(cursor.has_more());
        assert_eq!(cursor.next_page(), Some(2));

        let last = PageCursor { page: 3, ..cursor };
        assert!(!last.has_more());
        assert_eq!(last.next_page(), None);
    }

    #[test]
    fn test_empty_cursor_has_no_more() {
        let empty = PageCursor {
            page: 1,
            per_page: 20,
            total: 0,
            total_pages: 0,
        };
        assert_eq!(empty.next_page(), None);
    }

    #[test]
    fn test_page_envelope_parses() {
        let json = serde_json::json!({
            "data": [],
            "pagination": {"page": 2, "per_page": 10, "total": 11, "total_pages": 2}
        });
        let page: MessagePage = serde_json::from_value(json).unwrap();
        assert_eq!(page.pagination.page, 2);
        assert!(!page.pagination.has_more());
    }
}
