//! Turns raw pagination, sort and date-range parameters into retrieval specs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{
    error::{Error, Result},
    readings::{Flag, Reading, TIMESTAMP_COLUMN},
};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// Whitelisted column name, safe to splice into SQL.
    pub column: &'static str,
    pub descending: bool,
}

impl Default for SortSpec {
    /// Newest first.
    fn default() -> Self {
        Self {
            column: TIMESTAMP_COLUMN,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    /// 1-based page number.
    pub page: u64,
    pub page_size: u64,
    pub sort: SortSpec,
}

impl PageSpec {
    /// Number of records to skip before the page starts.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size.max(1))
    }

    /// The single newest record.
    pub fn latest() -> Self {
        Self {
            page: 1,
            page_size: 1,
            sort: SortSpec::default(),
        }
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortSpec::default(),
        }
    }
}

/// Inclusive `[start, end]` window over `recorded_at`.
///
/// `start > end` is allowed and simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Record predicate shared by every store.
#[derive(Debug)]
pub struct Filter<R: Reading> {
    pub range: Option<DateRange>,
    pub flag: Option<R::Flag>,
}

impl<R: Reading> Filter<R> {
    pub fn all() -> Self {
        Self { range: None, flag: None }
    }

    pub fn range(range: Option<DateRange>) -> Self {
        Self { range, flag: None }
    }

    pub fn flag(flag: R::Flag) -> Self {
        Self {
            range: None,
            flag: Some(flag),
        }
    }

    pub fn matches(&self, record: &R) -> bool {
        self.range
            .is_none_or(|range| range.contains(record.recorded_at()))
            && self.flag.is_none_or(|flag| flag.is_set(record))
    }
}

impl<R: Reading> Clone for Filter<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Reading> Copy for Filter<R> {}

// ---------------------------------------------------------------------------
// QueryBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    max_page_size: u64,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGE_SIZE)
    }
}

impl QueryBuilder {
    pub fn new(max_page_size: u64) -> Self {
        Self {
            max_page_size: max_page_size.max(1),
        }
    }

    /// Build a page spec for reading type `R`.
    ///
    /// Absent or non-positive `page`/`limit` fall back to 1 and 10; `limit` is
    /// capped at the configured maximum. `sort` is a field name, optionally
    /// prefixed with `-` for descending order, and defaults to newest first.
    pub fn build_page<R: Reading>(
        &self,
        page: Option<&str>,
        limit: Option<&str>,
        sort: Option<&str>,
    ) -> Result<PageSpec> {
        let page = positive_or("page", page, DEFAULT_PAGE)?;
        let page_size = positive_or("limit", limit, DEFAULT_PAGE_SIZE)?.min(self.max_page_size);
        let sort = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_sort::<R>(raw)?,
            None => SortSpec::default(),
        };
        Ok(PageSpec {
            page,
            page_size,
            sort,
        })
    }
}

fn positive_or(name: &str, raw: Option<&str>, default: u64) -> Result<u64> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    let n: i64 = raw
        .parse()
        .map_err(|_| Error::Validation(format!("{name} debe ser un número entero, se recibió {raw:?}")))?;
    Ok(if n > 0 { n as u64 } else { default })
}

fn parse_sort<R: Reading>(raw: &str) -> Result<SortSpec> {
    let (field, descending) = match raw.strip_prefix('-') {
        Some(field) => (field, true),
        None => (raw.strip_prefix('+').unwrap_or(raw), false),
    };
    let column = R::sort_column(field)
        .ok_or_else(|| Error::Validation(format!("campo de ordenamiento desconocido: {field:?}")))?;
    Ok(SortSpec { column, descending })
}

// ---------------------------------------------------------------------------
// Date ranges
// ---------------------------------------------------------------------------

/// Build an inclusive range; both bounds are required and must parse.
pub fn build_date_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange> {
    let (Some(start), Some(end)) = (non_empty(start), non_empty(end)) else {
        return Err(Error::InvalidRange(
            "Se requieren fechas de inicio y fin".to_owned(),
        ));
    };
    Ok(DateRange {
        start: parse_bound(start)?,
        end: parse_bound(end)?,
    })
}

/// Like [`build_date_range`], but both bounds absent means "no range".
pub fn optional_date_range(start: Option<&str>, end: Option<&str>) -> Result<Option<DateRange>> {
    match (non_empty(start), non_empty(end)) {
        (None, None) => Ok(None),
        _ => build_date_range(start, end).map(Some),
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(raw: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| Error::InvalidRange(format!("Fecha inválida: {raw:?}")))
}

/// Parse RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (UTC) or a bare date
/// (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::readings::{GasReading, MotionReading};

    fn page(p: Option<&str>, l: Option<&str>) -> PageSpec {
        QueryBuilder::default()
            .build_page::<GasReading>(p, l, None)
            .unwrap()
    }

    #[test]
    fn defaults_when_absent() {
        let spec = page(None, None);
        assert_eq!(spec.page, 1);
        assert_eq!(spec.page_size, 10);
        assert_eq!(spec.sort, SortSpec { column: "recorded_at", descending: true });
        assert_eq!(spec.skip(), 0);
    }

    #[test]
    fn non_positive_values_fall_back_to_defaults() {
        let spec = page(Some("0"), Some("-5"));
        assert_eq!(spec.page, 1);
        assert_eq!(spec.page_size, 10);
    }

    #[test]
    fn skip_is_page_minus_one_times_limit() {
        for (p, l) in [(1u64, 10u64), (2, 10), (3, 7), (10, 1)] {
            let spec = page(Some(p.to_string().as_str()), Some(l.to_string().as_str()));
            assert_eq!(spec.skip(), (p - 1) * l);
        }
    }

    #[test]
    fn hand_built_zero_page_does_not_underflow() {
        let spec = PageSpec {
            page: 0,
            page_size: 0,
            sort: SortSpec::default(),
        };
        assert_eq!(spec.skip(), 0);
        assert_eq!(spec.total_pages(5), 5);
    }

    #[test]
    fn limit_is_capped() {
        let spec = QueryBuilder::new(100)
            .build_page::<GasReading>(None, Some("100000"), None)
            .unwrap();
        assert_eq!(spec.page_size, 100);
    }

    #[test]
    fn non_numeric_page_is_a_validation_error() {
        let err = QueryBuilder::default()
            .build_page::<GasReading>(Some("abc"), None, None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn sort_prefix_controls_direction() {
        let builder = QueryBuilder::default();
        let asc = builder.build_page::<GasReading>(None, None, Some("nivel_gas")).unwrap();
        assert_eq!(asc.sort, SortSpec { column: "gas_level", descending: false });

        let desc = builder.build_page::<MotionReading>(None, None, Some("-movimiento")).unwrap();
        assert_eq!(desc.sort, SortSpec { column: "motion_detected", descending: true });
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let err = QueryBuilder::default()
            .build_page::<GasReading>(None, None, Some("-password"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn total_pages_rounds_up() {
        let spec = page(None, Some("10"));
        assert_eq!(spec.total_pages(0), 0);
        assert_eq!(spec.total_pages(10), 1);
        assert_eq!(spec.total_pages(11), 2);
    }

    #[test]
    fn date_range_requires_both_bounds() {
        assert!(matches!(
            build_date_range(Some("2024-01-01"), None),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            build_date_range(None, Some("2024-01-01")),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            build_date_range(Some(""), Some("2024-01-01")),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn date_range_rejects_unparsable_bounds() {
        let err = build_date_range(Some("yesterday"), Some("2024-01-01")).unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)));
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn inverted_range_is_accepted() {
        let range = build_date_range(Some("2024-02-01"), Some("2024-01-01")).unwrap();
        assert!(range.start > range.end);
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = build_date_range(
            Some("2024-01-01T00:00:00Z"),
            Some("2024-01-31T23:59:59Z"),
        )
        .unwrap();
        assert!(range.contains(range.start));
        assert!(range.contains(range.end));
    }

    #[test]
    fn optional_range_absent_is_none() {
        assert_eq!(optional_date_range(None, None).unwrap(), None);
        assert!(optional_date_range(Some("2024-01-01"), None).is_err());
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-05T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-05T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-05T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("05/03/2024"), None);
    }
}
