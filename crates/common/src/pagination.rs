//! Pagination types shared by the store and the transport layers.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 15;
pub const MAX_LIMIT: u32 = 100;

/// Pagination parameters
#[derive(Clone, Copy, Debug)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub limit: u32,
}

impl Pagination {
    /// Clamp to sane bounds and convert to the 0-based page index / page size
    /// pair the query layer expects.
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let limit = self.limit.clamp(1, MAX_LIMIT);
        ((page - 1) as u64, limit as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_LIMIT }
    }
}

/// Page metadata returned alongside every search result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl PageInfo {
    pub fn new(page: u32, limit: u32, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(limit as u64);
        Self {
            page,
            limit,
            total_items,
            total_pages,
            has_previous_page: page > 1,
            has_next_page: (page as u64) < total_pages,
        }
    }
}

/// A page of items plus its metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

impl<T> Paginated<T> {
    pub fn empty(page: u32, limit: u32) -> Self {
        Self { items: Vec::new(), page_info: PageInfo::new(page, limit, 0) }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated { items: self.items.into_iter().map(f).collect(), page_info: self.page_info }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (idx, per) = Pagination { page: 0, limit: 0 }.normalize();
        assert_eq!(idx, 0);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (idx, per) = Pagination { page: 5, limit: 1000 }.normalize();
        assert_eq!(idx, 4);
        assert_eq!(per, 100);
    }

    #[test]
    fn page_info_sixteen_items_two_pages() {
        let first = PageInfo::new(1, 15, 16);
        assert_eq!(first.total_pages, 2);
        assert!(!first.has_previous_page);
        assert!(first.has_next_page);

        let last = PageInfo::new(2, 15, 16);
        assert!(last.has_previous_page);
        assert!(!last.has_next_page);
    }

    #[test]
    fn page_info_empty_result() {
        let info = PageInfo::new(1, 15, 0);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next_page);
        assert!(!info.has_previous_page);
    }
}
