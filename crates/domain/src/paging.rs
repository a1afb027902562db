use std::fmt::{Display, Formatter};
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Page position of a server-paged listing whose total is owned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    page_index: u32,
    page_size: u32,
    server_total: u64,
}

impl PageWindow {
    /// Creates a window on page 1 with no known total.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page_index: 1,
            page_size: page_size.max(1),
            server_total: 0,
        }
    }

    /// Returns the 1-based page index.
    #[must_use]
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Returns the fixed page size.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the total last reported by the server.
    #[must_use]
    pub fn server_total(&self) -> u64 {
        self.server_total
    }

    /// Returns `ceil(server_total / page_size)`.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.server_total.div_ceil(u64::from(self.page_size))
    }

    /// Returns the following page index when it exists.
    #[must_use]
    pub fn next_index(&self) -> Option<u32> {
        let candidate = self.page_index.checked_add(1)?;
        (u64::from(candidate) <= self.page_count()).then_some(candidate)
    }

    /// Returns the preceding page index when it exists.
    #[must_use]
    pub fn previous_index(&self) -> Option<u32> {
        self.page_index.checked_sub(1).filter(|index| *index >= 1)
    }

    /// Moves to a page index, clamped to at least 1.
    pub fn move_to(&mut self, page_index: u32) {
        self.page_index = page_index.max(1);
    }

    /// Records the authoritative total from a server response.
    pub fn set_server_total(&mut self, server_total: u64) {
        self.server_total = server_total;
    }

    /// Returns to page 1.
    pub fn reset(&mut self) {
        self.page_index = 1;
    }

    /// Returns whether the window shows the first page.
    #[must_use]
    pub fn is_first_page(&self) -> bool {
        self.page_index == 1
    }

    /// Returns whether no page follows the current one.
    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.next_index().is_none()
    }

    /// Returns whether the server total reached the truncation cap.
    #[must_use]
    pub fn is_truncated(&self, server_result_cap: u64) -> bool {
        server_result_cap > 0 && self.server_total >= server_result_cap
    }

    /// Returns the display range for the current page.
    #[must_use]
    pub fn page_info(&self) -> PageInfo {
        PageInfo::new(self.page_index, self.page_size, self.server_total)
    }
}

/// Display range of one page over a known number of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based index of the first record shown.
    pub start: u64,
    /// 1-based index of the last record shown.
    pub end: u64,
    /// Number of records known.
    pub total: u64,
}

impl PageInfo {
    /// Computes the range of `page_index` over `total` records.
    #[must_use]
    pub fn new(page_index: u32, page_size: u32, total: u64) -> Self {
        let page_index = u64::from(page_index.max(1));
        let page_size = u64::from(page_size.max(1));
        let start = (page_index - 1).saturating_mul(page_size).saturating_add(1);
        let end = page_index.saturating_mul(page_size).min(total);

        Self {
            start: start.min(total.max(1)),
            end,
            total,
        }
    }
}

impl Display for PageInfo {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        if self.total == 0 {
            return formatter.write_str("No records found");
        }

        write!(
            formatter,
            "Showing {}-{} of {} records",
            self.start, self.end, self.total
        )
    }
}

/// Returns the slice `(page_index - 1) * page_size .. page_index * page_size`
/// clamped to `len`.
#[must_use]
pub fn local_page_bounds(page_index: u32, page_size: u32, len: usize) -> Range<usize> {
    let page_index = usize::try_from(page_index.max(1)).unwrap_or(usize::MAX);
    let page_size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
    let start = (page_index - 1).saturating_mul(page_size).min(len);
    let end = page_index.saturating_mul(page_size).min(len);
    start..end
}

/// Returns how many records page `page_index` needs to be full.
#[must_use]
pub fn records_required_for_page(page_index: u32, page_size: u32) -> usize {
    let page_index = usize::try_from(page_index.max(1)).unwrap_or(usize::MAX);
    let page_size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
    page_index.saturating_mul(page_size)
}

#[cfg(test)]
mod tests {
    use super::{PageInfo, PageWindow, local_page_bounds};

    #[test]
    fn navigation_stays_within_server_pages() {
        let mut window = PageWindow::new(100);
        window.set_server_total(250);

        assert_eq!(window.page_count(), 3);
        assert_eq!(window.previous_index(), None);
        assert_eq!(window.next_index(), Some(2));

        window.move_to(3);
        assert_eq!(window.next_index(), None);
        assert!(window.is_last_page());
        assert_eq!(window.previous_index(), Some(2));
    }

    #[test]
    fn empty_total_has_no_next_page() {
        let window = PageWindow::new(50);
        assert_eq!(window.page_count(), 0);
        assert!(window.next_index().is_none());
        assert!(window.is_first_page());
    }

    #[test]
    fn page_info_describes_partial_last_page() {
        let info = PageInfo::new(3, 100, 250);
        assert_eq!(info.to_string(), "Showing 201-250 of 250 records");
        assert_eq!(PageInfo::new(1, 100, 0).to_string(), "No records found");
    }

    #[test]
    fn truncation_cap_applies_at_threshold() {
        let mut window = PageWindow::new(100);
        window.set_server_total(2000);
        assert!(window.is_truncated(2000));
        window.set_server_total(1999);
        assert!(!window.is_truncated(2000));
        assert!(!window.is_truncated(0));
    }

    #[test]
    fn local_bounds_clamp_to_buffer() {
        assert_eq!(local_page_bounds(1, 2, 5), 0..2);
        assert_eq!(local_page_bounds(3, 2, 5), 4..5);
        assert_eq!(local_page_bounds(4, 2, 5), 5..5);
    }
}
