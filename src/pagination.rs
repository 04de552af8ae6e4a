//! Offset/limit windows over fetched collections.

use serde::Serialize;

/// One window of a larger result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the full collection before windowing.
    pub total: usize,
    pub offset: usize,
    pub has_more: bool,
    /// Offset of the next window, when there is one.
    pub next_offset: Option<usize>,
}

/// Slice `items` to `[offset, offset + limit)`.
///
/// `limit = None` returns everything from `offset` on. An offset past the end
/// yields an empty page.
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Page<T> {
    let total = items.len();
    let start = offset.min(total);
    let end = match limit {
        Some(limit) => start.saturating_add(limit).min(total),
        None => total,
    };
    let has_more = end < total;
    let items = items.into_iter().skip(start).take(end - start).collect();

    Page {
        items,
        total,
        offset,
        has_more,
        next_offset: has_more.then_some(end),
    }
}

impl<T: Serialize> Page<T> {
    /// JSON object with the items under `key` plus the window metadata.
    pub fn to_json(&self, key: &str) -> serde_json::Value {
        let mut out = serde_json::json!({
            "total": self.total,
            "offset": self.offset,
            "has_more": self.has_more,
            "next_offset": self.next_offset,
        });
        out[key] = serde_json::json!(self.items);
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn windows_are_disjoint() {
        let items: Vec<u32> = (0..5).collect();
        let first = paginate(items.clone(), 0, Some(2));
        let second = paginate(items, 2, Some(2));
        assert_eq!(first.items, vec![0, 1]);
        assert_eq!(second.items, vec![2, 3]);
        assert!(second.has_more);
        assert_eq!(second.next_offset, Some(4));
    }

    #[test]
    fn last_window_has_no_next() {
        let page = paginate((0..5).collect::<Vec<u32>>(), 4, Some(2));
        assert_eq!(page.items, vec![4]);
        assert!(!page.has_more);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let page = paginate(vec![1, 2], 10, Some(3));
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.offset, 10);
    }

    #[test]
    fn no_limit_returns_rest() {
        let page = paginate(vec![1, 2, 3], 1, None);
        assert_eq!(page.items, vec![2, 3]);
        assert!(!page.has_more);
    }

    #[test]
    fn json_uses_named_field() {
        let page = paginate(vec!["a", "b", "c"], 0, Some(1));
        let json = page.to_json("reminders");
        assert_eq!(json["reminders"], serde_json::json!(["a"]));
        assert_eq!(json["total"], 3);
        assert_eq!(json["next_offset"], 1);
    }
}
