//! Pagination display math and stale-response guards.

use serde::{Deserialize, Serialize};

/// The 1-based display range for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub start: u64,
    pub end: u64,
}

/// Compute the display range for page `page_index` (1-based) of a
/// result set with `total` rows, `page_size` rows per page, and
/// `returned` rows actually present on this page.
///
/// `start = (i - 1) * P + 1`, `end = min(start + returned - 1, total)`.
/// An empty page yields `None`.
pub fn display_range(
    total: u64,
    page_size: u64,
    page_index: u64,
    returned: u64,
) -> Option<DisplayRange> {
    if page_index == 0 {
        return None;
    }
    display_range_at(total, (page_index - 1) * page_size, returned)
}

/// Compute the display range for a window starting at the zero-based
/// row offset `start_index` with `returned` rows actually present.
/// The window need not be page-aligned.
pub fn display_range_at(total: u64, start_index: u64, returned: u64) -> Option<DisplayRange> {
    if returned == 0 {
        return None;
    }
    let start = start_index + 1;
    let end = (start + returned - 1).min(total);
    Some(DisplayRange { start, end })
}

/// An opaque tag identifying one outstanding fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken(u64);

/// Latest-wins guard for paginated fetches.
///
/// Each fetch is tagged with a token; a response is applied only when
/// its token is still the latest issued. A stale response for a page
/// the user has since navigated away from is discarded instead of
/// overwriting the current result set.
#[derive(Debug, Clone, Default)]
pub struct FetchGuard {
    latest: u64,
}

impl FetchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a new fetch, invalidating every earlier token.
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    /// Whether a response carrying `token` may still be applied.
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_range() {
        // total=95, P=10, page 1 returned 10 rows -> 1..=10.
        let range = display_range(95, 10, 1, 10).unwrap();
        assert_eq!(range, DisplayRange { start: 1, end: 10 });
    }

    #[test]
    fn last_partial_page_is_clamped_to_total() {
        // page 10 of 95 rows returns 5 rows -> 91..=95.
        let range = display_range(95, 10, 10, 5).unwrap();
        assert_eq!(range, DisplayRange { start: 91, end: 95 });
    }

    #[test]
    fn middle_page_range() {
        let range = display_range(95, 10, 3, 10).unwrap();
        assert_eq!(range, DisplayRange { start: 21, end: 30 });
    }

    #[test]
    fn empty_page_has_no_range() {
        assert_eq!(display_range(0, 10, 1, 0), None);
    }

    #[test]
    fn unaligned_offset_range() {
        // startIndex 5 of 12 rows, 7 returned -> 6..=12.
        let range = display_range_at(12, 5, 7).unwrap();
        assert_eq!(range, DisplayRange { start: 6, end: 12 });
        assert_eq!(display_range_at(12, 5, 0), None);
    }

    #[test]
    fn stale_tokens_are_rejected() {
        let mut guard = FetchGuard::new();
        let first = guard.issue();
        let second = guard.issue();

        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));

        // The stale response arriving after the fresh one stays stale.
        let third = guard.issue();
        assert!(!guard.is_current(second));
        assert!(guard.is_current(third));
    }
}
