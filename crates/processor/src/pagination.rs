//! Cursor bookkeeping for flat and nested (per-repository) pagination

use chrono::{DateTime, Duration, TimeZone, Utc};
use github::PageInfo;

/// GitHub rejects contribution windows longer than one year
pub const MAX_WINDOW_DAYS: i64 = 365;

/// Upper bound on pages walked for a single connection
pub const MAX_PAGES: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Another page is due. `after` is `None` for the first page.
    Fetching { after: Option<String> },
    Exhausted,
}

impl PageState {
    pub fn start() -> Self {
        PageState::Fetching { after: None }
    }

    /// State following a page with this `pageInfo`. A next page without a
    /// cursor cannot be requested, so it counts as exhausted.
    pub fn next(page: &PageInfo) -> Self {
        match (page.has_next_page, &page.end_cursor) {
            (true, Some(cursor)) => PageState::Fetching {
                after: Some(cursor.clone()),
            },
            _ => PageState::Exhausted,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, PageState::Exhausted)
    }
}

/// Remaining contributions of one repository after the first page came back
/// with the top-level contributions query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContinuation {
    pub repository: String,
    pub state: PageState,
    pub pages_fetched: u32,
}

impl RepoContinuation {
    /// `None` when the first page already exhausted the repository
    pub fn after_first_page(repository: &str, page: &PageInfo) -> Option<Self> {
        match PageState::next(page) {
            PageState::Exhausted => None,
            state => Some(Self {
                repository: repository.to_string(),
                state,
                pages_fetched: 0,
            }),
        }
    }

    /// Move past a fetched page. `None` means the repository was missing from
    /// the response, which ends its pagination.
    ///
    /// Returns `true` when [`MAX_PAGES`] cut the repository short.
    pub fn advance(&mut self, page: Option<&PageInfo>) -> bool {
        self.pages_fetched += 1;
        let next = page.map_or(PageState::Exhausted, PageState::next);
        if self.pages_fetched >= MAX_PAGES && !next.is_exhausted() {
            self.state = PageState::Exhausted;
            return true;
        }
        self.state = next;
        false
    }
}

/// Time range for contributions-collection queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ContributionWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// From January 1st of `year` until `to`
    pub fn since_year(year: i32, to: DateTime<Utc>) -> Self {
        let from = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(to - Duration::days(MAX_WINDOW_DAYS));
        Self { from, to }
    }

    /// Consecutive sub-windows of at most [`MAX_WINDOW_DAYS`] covering the whole range
    pub fn slices(&self) -> Vec<ContributionWindow> {
        let mut slices = Vec::new();
        let mut start = self.from;
        while start < self.to {
            let end = (start + Duration::days(MAX_WINDOW_DAYS)).min(self.to);
            slices.push(ContributionWindow::new(start, end));
            start = end + Duration::seconds(1);
        }
        slices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(has_next_page: bool, cursor: Option<&str>) -> PageInfo {
        PageInfo {
            has_next_page,
            end_cursor: cursor.map(String::from),
        }
    }

    #[test]
    fn test_page_state_transitions() {
        assert_eq!(PageState::start(), PageState::Fetching { after: None });
        assert_eq!(
            PageState::next(&page(true, Some("c1"))),
            PageState::Fetching {
                after: Some("c1".to_string())
            }
        );
        assert!(PageState::next(&page(false, Some("c1"))).is_exhausted());
        assert!(PageState::next(&page(true, None)).is_exhausted());
    }

    #[test]
    fn test_continuation_only_for_unfinished_first_page() {
        assert!(RepoContinuation::after_first_page("o/r", &page(false, None)).is_none());

        let continuation =
            RepoContinuation::after_first_page("o/r", &page(true, Some("c1"))).unwrap();
        assert_eq!(continuation.repository, "o/r");
        assert_eq!(
            continuation.state,
            PageState::Fetching {
                after: Some("c1".to_string())
            }
        );
    }

    #[test]
    fn test_continuation_advance() {
        let mut continuation =
            RepoContinuation::after_first_page("o/r", &page(true, Some("c1"))).unwrap();

        continuation.advance(Some(&page(true, Some("c2"))));
        assert_eq!(
            continuation.state,
            PageState::Fetching {
                after: Some("c2".to_string())
            }
        );

        assert!(!continuation.advance(None));
        assert!(continuation.state.is_exhausted());
        assert_eq!(continuation.pages_fetched, 2);
    }

    #[test]
    fn test_continuation_stops_at_page_limit() {
        let mut continuation =
            RepoContinuation::after_first_page("o/r", &page(true, Some("c1"))).unwrap();
        continuation.pages_fetched = MAX_PAGES - 1;

        assert!(continuation.advance(Some(&page(true, Some("more")))));
        assert!(continuation.state.is_exhausted());

        let mut finished =
            RepoContinuation::after_first_page("o/r", &page(true, Some("c1"))).unwrap();
        finished.pages_fetched = MAX_PAGES - 1;
        // a last page that is also the end is not a truncation
        assert!(!finished.advance(Some(&page(false, None))));
        assert!(finished.state.is_exhausted());
    }

    #[test]
    fn test_window_slices_cover_range() {
        let from = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let slices = ContributionWindow::new(from, to).slices();

        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].from, from);
        assert_eq!(slices.last().unwrap().to, to);
        for slice in &slices {
            assert!(slice.to - slice.from <= Duration::days(MAX_WINDOW_DAYS));
        }
        for pair in slices.windows(2) {
            assert!(pair[0].to < pair[1].from);
        }
    }

    #[test]
    fn test_empty_window_has_no_slices() {
        let at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(ContributionWindow::new(at, at).slices().is_empty());
    }

    #[test]
    fn test_since_year() {
        let to = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let window = ContributionWindow::since_year(2010, to);
        assert_eq!(window.from, Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.to, to);
    }
}
