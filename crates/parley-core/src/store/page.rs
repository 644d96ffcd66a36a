//! Pagination math shared by every paginated listing.

use serde::{Deserialize, Serialize};

/// Computed pagination state for a filtered listing.
///
/// `last_page` is `ceil(total / page_size)` clamped to a minimum of 1, so an
/// empty result still reports one (empty) page. `next_page`/`previous_page`
/// are `None` when out of range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub last_page: u32,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
}

impl Pagination {
    /// Compute pagination over the filtered row count.
    ///
    /// `page` and `page_size` must already be resolved to their defaults
    /// (1-based, non-zero); filters do that via their accessor methods.
    pub fn compute(total: u64, page: u32, page_size: u32) -> Self {
        let last_page = total
            .div_ceil(page_size as u64)
            .max(1)
            .min(u32::MAX as u64) as u32;
        let next_page = if page < last_page { Some(page + 1) } else { None };
        let previous_page = if page > 1 { Some(page - 1) } else { None };

        Self {
            page,
            page_size,
            total,
            last_page,
            next_page,
            previous_page,
        }
    }

    /// Row offset of this page's first item.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}
