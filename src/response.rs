//! Standard response envelope helpers.

use serde::Serialize;

/// Single-resource envelope: `{ "data": ... }`.
#[derive(Serialize)]
pub struct Resource<T> {
    pub data: T,
}

/// Paginated list envelope: `{ "data": [...], "meta": {...} }`.
#[derive(Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageMeta {
    /// `total` is the filtered row count, independent of the page window.
    pub fn new(current_page: u32, per_page: u32, total: u64) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            total.div_ceil(per_page as u64) as u32
        };
        PageMeta {
            current_page,
            last_page,
            per_page,
            total,
        }
    }
}
