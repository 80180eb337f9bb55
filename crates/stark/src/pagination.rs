//! Page arithmetic and pager metadata for list views.
//!
//! Only numbers and URLs are computed here; drawing the pager is up to the
//! template.

use serde::Serialize;
use stark_router::QueryParams;

/// Pagination state of one list request.
#[derive(Debug, Clone)]
pub struct Pagination {
    current_page: usize,
    total_count: usize,
    per_page: usize,
    max_pager_count: usize,
    base_url: String,
    page_param: String,
    /// Query parameters other than the page number.
    params: QueryParams,
}

/// One link of the pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub number: usize,
    pub url: String,
    pub active: bool,
}

/// Template-facing pager description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerContext {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub per_page: usize,
    pub start: usize,
    pub end: usize,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub pages: Vec<PageLink>,
}

impl Pagination {
    /// Computes the page window.
    ///
    /// `current_page` is the raw `page` parameter; a missing, malformed or
    /// out-of-range value snaps to the nearest valid page. `per_page` of 0
    /// is treated as 1.
    pub fn new(
        current_page: Option<&str>,
        total_count: usize,
        base_url: impl Into<String>,
        query: &QueryParams,
        per_page: usize,
        max_pager_count: usize,
        page_param: &str,
    ) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_count.div_ceil(per_page).max(1);
        let current_page = current_page.map_or(1, |raw| parse_page(raw, total_pages));

        Self {
            current_page,
            total_count,
            per_page,
            max_pager_count: max_pager_count.max(1),
            base_url: base_url.into(),
            page_param: page_param.to_string(),
            params: query.without(page_param),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Number of pages; at least 1 even for an empty list.
    pub fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.per_page).max(1)
    }

    /// First row index of the current page.
    pub fn start(&self) -> usize {
        ((self.current_page - 1) * self.per_page).min(self.total_count)
    }

    /// One past the last row index of the current page.
    pub fn end(&self) -> usize {
        (self.current_page * self.per_page).min(self.total_count)
    }

    /// URL of page `number`, keeping every other query parameter.
    pub fn page_url(&self, number: usize) -> String {
        let mut params = self.params.clone();
        params.set(self.page_param.clone(), number.to_string());
        format!("{}?{}", self.base_url, params.urlencode())
    }

    /// Page numbers to show, at most `max_pager_count` of them, centred on
    /// the current page where possible.
    pub fn page_range(&self) -> std::ops::RangeInclusive<usize> {
        let total = self.total_pages();
        let max = self.max_pager_count;
        if total <= max {
            return 1..=total;
        }

        let half = max / 2;
        if self.current_page <= half {
            1..=max
        } else if self.current_page + half > total {
            (total - max + 1)..=total
        } else {
            let first = self.current_page - half;
            first..=(first + max - 1)
        }
    }

    pub fn context(&self) -> PagerContext {
        let total_pages = self.total_pages();
        PagerContext {
            current_page: self.current_page,
            total_pages,
            total_count: self.total_count,
            per_page: self.per_page,
            start: self.start(),
            end: self.end(),
            prev_url: (self.current_page > 1).then(|| self.page_url(self.current_page - 1)),
            next_url: (self.current_page < total_pages)
                .then(|| self.page_url(self.current_page + 1)),
            pages: self
                .page_range()
                .map(|number| PageLink {
                    number,
                    url: self.page_url(number),
                    active: number == self.current_page,
                })
                .collect(),
        }
    }
}

/// Clamps a raw page number into `1..=total_pages`. Negative or malformed
/// values give the first page, numbers too large for `usize` the last.
fn parse_page(raw: &str, total_pages: usize) -> usize {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if negative || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    digits
        .parse::<usize>()
        .map_or(total_pages, |page| page.clamp(1, total_pages))
}
