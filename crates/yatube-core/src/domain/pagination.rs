//! Page-number pagination for feeds.
//!
//! Page numbers are 1-based. A request that cannot be parsed falls back to
//! the first page; a number below 1 or past the end falls back to the last
//! page. An empty listing still has one (empty) page.

use serde::Serialize;

/// Posts per page unless configured otherwise.
pub const DEFAULT_PER_PAGE: u64 = 10;

/// A requested page, before the total item count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    requested: i64,
    per_page: u64,
}

impl PageRequest {
    pub fn new(requested: i64, per_page: u64) -> Self {
        Self {
            requested,
            per_page: per_page.max(1),
        }
    }

    /// The first page.
    pub fn first(per_page: u64) -> Self {
        Self::new(1, per_page)
    }

    /// Build a request from the raw `?page=` query value.
    pub fn from_query(raw: Option<&str>, per_page: u64) -> Self {
        let requested = raw
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(1);
        Self::new(requested, per_page)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn num_pages(&self, total: u64) -> u64 {
        if total == 0 {
            1
        } else {
            total.div_ceil(self.per_page)
        }
    }

    /// The page number actually served for a listing of `total` items.
    pub fn resolve(&self, total: u64) -> u64 {
        let num_pages = self.num_pages(total);
        match u64::try_from(self.requested) {
            Ok(number) if (1..=num_pages).contains(&number) => number,
            _ => num_pages,
        }
    }

    /// Zero-based offset of the first item on page `number`.
    pub fn offset(&self, number: u64) -> u64 {
        number.saturating_sub(1) * self.per_page
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, number: u64, total: u64, request: &PageRequest) -> Self {
        Self {
            items,
            number,
            num_pages: request.num_pages(total),
            total,
            per_page: request.per_page(),
        }
    }

    /// Cut the requested page out of a fully materialized, already ordered listing.
    pub fn from_vec(all: Vec<T>, request: &PageRequest) -> Self {
        let total = all.len() as u64;
        let number = request.resolve(total);
        let items = all
            .into_iter()
            .skip(request.offset(number) as usize)
            .take(request.per_page() as usize)
            .collect();
        Self::new(items, number, total, request)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then_some(self.number - 1)
    }

    pub fn page_range(&self) -> std::ops::RangeInclusive<u64> {
        1..=self.num_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            per_page: self.per_page,
        }
    }
}
