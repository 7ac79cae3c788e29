/// Page size used when the caller doesn't ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 30;
/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Normalizes `offset`/`limit` in place against `count` rows.
///
/// For `count > 0` the result satisfies `offset >= 0`, `limit >= 1` and
/// `offset + limit <= count`. Callers must handle `count == 0` themselves.
pub fn clamp_window(count: i64, offset: &mut i64, limit: &mut i64) {
    if *limit < 1 {
        *limit = 1;
    }
    if *offset >= count {
        *offset = count - *limit;
    }
    if *offset < 0 {
        *offset = 0;
    }
    if offset.saturating_add(*limit) > count {
        *limit = count - *offset;
    }
}

/// Offset/limit derived from 1-based `page` and `size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { offset: 0, limit: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    pub fn from_page(page: Option<i64>, size: Option<i64>) -> Self {
        let limit = match size {
            Some(s) if s >= 1 => s.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        Self { offset: (page - 1).saturating_mul(limit), limit }
    }
}
