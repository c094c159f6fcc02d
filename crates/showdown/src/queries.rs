// Rust guideline compliant 2026-10-18

//! The four matched showdown test cases, written once per storage layout.
//!
//! The columnar queries read the JSON documents of `page_view_log`; the
//! time-series queries read the upserted `time_series` rows. Each pair answers
//! the same question over the same site and trailing time window.

use benchmark::TestCase;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

/// Closed time interval every test case is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl QueryWindow {
    /// The `hours` leading up to `now`.
    #[must_use]
    pub fn trailing_hours(now: DateTime<Utc>, hours: u32) -> Self {
        Self { from: now - TimeDelta::hours(i64::from(hours)), to: now }
    }
}

/// Columnar predicate: date partitions first, then the exact instant range.
///
/// `page_opened_at` is stored as fixed-width millisecond RFC 3339 text, so
/// string order is time order.
fn columnar_filter(site: &str, window: &QueryWindow) -> String {
    format!(
        "json_extract(record, '$.site') = '{site}' \
         AND json_extract(record, '$.page_opened_at_date') BETWEEN '{from_date}' AND '{to_date}' \
         AND json_extract(record, '$.page_opened_at') BETWEEN '{from}' AND '{to}'",
        site = quote(site),
        from_date = window.from.date_naive(),
        to_date = window.to.date_naive(),
        from = window.from.to_rfc3339_opts(SecondsFormat::Millis, true),
        to = window.to.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

fn time_series_filter(site: &str, window: &QueryWindow) -> String {
    format!(
        "time BETWEEN {from} AND {to} AND json_extract(dimensions, '$.site') = '{site}'",
        from = window.from.timestamp_millis(),
        to = window.to.timestamp_millis(),
        site = quote(site),
    )
}

/// Escape a value for use inside a single-quoted SQL literal.
fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Build the showdown test cases for `site` over `window`, in run order.
#[must_use]
pub fn showdown_cases(site: &str, window: &QueryWindow) -> Vec<TestCase> {
    let col = columnar_filter(site, window);
    let ts = time_series_filter(site, window);
    vec![
        TestCase {
            name: "Count all".to_owned(),
            columnar_query: format!("SELECT COUNT(*) AS count FROM page_view_log WHERE {col}"),
            time_series_query: format!("SELECT COUNT(*) AS count FROM time_series WHERE {ts}"),
        },
        TestCase {
            name: "Count page views".to_owned(),
            columnar_query: format!(
                "SELECT COUNT(json_extract(record, '$.page_id')) AS count \
                 FROM page_view_log WHERE {col}"
            ),
            time_series_query: format!(
                "SELECT COUNT(json_extract(dimensions, '$.page_id')) AS count \
                 FROM time_series WHERE {ts}"
            ),
        },
        TestCase {
            name: "Page views & stats".to_owned(),
            columnar_query: format!(
                "SELECT json_extract(record, '$.site') AS site, \
                        json_extract(record, '$.page_url') AS page_url, \
                        COUNT(*) AS views, \
                        ROUND(AVG(json_extract(record, '$.time_on_page')), 2) AS avg_time_on_page \
                 FROM page_view_log WHERE {col} \
                 GROUP BY site, page_url \
                 ORDER BY views DESC, page_url ASC \
                 LIMIT 1000"
            ),
            time_series_query: format!(
                "SELECT json_extract(dimensions, '$.site') AS site, \
                        json_extract(dimensions, '$.page_url') AS page_url, \
                        COUNT(*) AS views, \
                        ROUND(AVG(measure_value), 2) AS avg_time_on_page \
                 FROM time_series WHERE {ts} \
                 GROUP BY site, page_url \
                 ORDER BY views DESC, page_url ASC \
                 LIMIT 1000"
            ),
        },
        TestCase {
            name: "First 1k rows".to_owned(),
            columnar_query: format!(
                "SELECT record FROM page_view_log WHERE {col} \
                 ORDER BY json_extract(record, '$.page_opened_at') DESC \
                 LIMIT 1000"
            ),
            time_series_query: format!(
                "SELECT * FROM time_series WHERE {ts} ORDER BY time DESC LIMIT 1000"
            ),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
