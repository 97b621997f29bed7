use chrono::{DateTime, Datelike, Duration, NaiveDate, Weekday};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct RevenueError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl RevenueError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    Annually,
}

impl PeriodType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "daily" => Some(PeriodType::Daily),
            "weekly" => Some(PeriodType::Weekly),
            "monthly" => Some(PeriodType::Monthly),
            "annually" => Some(PeriodType::Annually),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
            PeriodType::Annually => "annually",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RevenueQuery {
    pub period_type: PeriodType,
    pub year: i32,
    pub month: Option<u32>,
}

pub fn parse_revenue_query(params: &serde_json::Value) -> Result<RevenueQuery, RevenueError> {
    let period_type = match params.get("periodType").and_then(|v| v.as_str()) {
        Some(raw) => PeriodType::parse(raw).ok_or_else(|| {
            RevenueError::new(
                "bad_params",
                "periodType must be one of: daily, weekly, monthly, annually",
            )
        })?,
        None => return Err(RevenueError::new("bad_params", "missing periodType")),
    };

    let year = match params.get("year").and_then(|v| v.as_i64()) {
        Some(y) if (1970..=2100).contains(&y) => y as i32,
        Some(_) => {
            return Err(RevenueError::new(
                "bad_params",
                "year must be in range 1970..=2100",
            ))
        }
        None => return Err(RevenueError::new("bad_params", "missing year")),
    };

    let month = match params.get("month") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => {
            let Some(m) = v.as_u64() else {
                return Err(RevenueError::new("bad_params", "month must be an integer"));
            };
            if !(1..=12).contains(&m) {
                return Err(RevenueError::new("bad_params", "month must be in range 1..=12"));
            }
            Some(m as u32)
        }
    };

    if period_type == PeriodType::Daily && month.is_none() {
        return Err(RevenueError::new(
            "bad_params",
            "month is required for daily revenue",
        ));
    }

    Ok(RevenueQuery {
        period_type,
        year,
        month,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueBucket {
    pub period: String,
    pub revenue: f64,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub period_type: String,
    pub buckets: Vec<RevenueBucket>,
    pub total_revenue: f64,
    pub average_revenue: f64,
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn bucket_label(date: NaiveDate, period_type: PeriodType) -> String {
    match period_type {
        PeriodType::Daily => date.format("%Y-%m-%d").to_string(),
        PeriodType::Weekly => {
            let iso = date.iso_week();
            format!("{:04}-W{:02}", iso.year(), iso.week())
        }
        PeriodType::Monthly => date.format("%Y-%m").to_string(),
        PeriodType::Annually => format!("{:04}", date.year()),
    }
}

/// Label of the period immediately before `label`, or None when the label
/// itself cannot be interpreted.
pub fn previous_period_label(label: &str, period_type: PeriodType) -> Option<String> {
    match period_type {
        PeriodType::Daily => {
            let d = NaiveDate::parse_from_str(label, "%Y-%m-%d").ok()?;
            Some(bucket_label(d - Duration::days(1), period_type))
        }
        PeriodType::Weekly => {
            let (year_part, week_part) = label.split_once("-W")?;
            let iso_year: i32 = year_part.parse().ok()?;
            let week: u32 = week_part.parse().ok()?;
            let monday = NaiveDate::from_isoywd_opt(iso_year, week, Weekday::Mon)?;
            Some(bucket_label(monday - Duration::days(7), period_type))
        }
        PeriodType::Monthly => {
            let (year_part, month_part) = label.split_once('-')?;
            let year: i32 = year_part.parse().ok()?;
            let month: u32 = month_part.parse().ok()?;
            if month == 1 {
                Some(format!("{:04}-12", year - 1))
            } else {
                Some(format!("{:04}-{:02}", year, month - 1))
            }
        }
        PeriodType::Annually => {
            let year: i32 = label.parse().ok()?;
            Some(format!("{:04}", year - 1))
        }
    }
}

fn month_start(year: i32, month: u32) -> Result<NaiveDate, RevenueError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| RevenueError::new("bad_params", "invalid year/month"))
}

fn next_month_start(year: i32, month: u32) -> Result<NaiveDate, RevenueError> {
    if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    }
}

struct Window {
    // Fetch window, inclusive dates. Starts one period before the requested
    // range so the first retained bucket has a candidate predecessor.
    fetch_start: NaiveDate,
    fetch_end: NaiveDate,
    // Prefix test that decides whether a bucket label is inside the
    // requested range.
    retain_prefix: String,
}

fn compute_window(query: &RevenueQuery) -> Result<Window, RevenueError> {
    let year = query.year;
    match query.period_type {
        PeriodType::Daily => {
            // month presence enforced by parse_revenue_query
            let month = query
                .month
                .ok_or_else(|| RevenueError::new("bad_params", "month is required for daily revenue"))?;
            let start = month_start(year, month)?;
            let end = next_month_start(year, month)? - Duration::days(1);
            Ok(Window {
                fetch_start: start - Duration::days(1),
                fetch_end: end,
                retain_prefix: format!("{:04}-{:02}-", year, month),
            })
        }
        PeriodType::Weekly => {
            let start = month_start(year, 1)?;
            let end = month_start(year + 1, 1)? - Duration::days(1);
            Ok(Window {
                fetch_start: start - Duration::days(7),
                // The last ISO week of the year can run up to Jan 3 of the
                // next calendar year; fetch those days so the edge week is
                // not undercounted. Early-January days that belong to the
                // previous ISO year fall out via the label prefix.
                fetch_end: end + Duration::days(3),
                retain_prefix: format!("{:04}-W", year),
            })
        }
        PeriodType::Monthly => {
            let start = month_start(year, 1)?;
            let end = month_start(year + 1, 1)? - Duration::days(1);
            Ok(Window {
                fetch_start: month_start(year - 1, 12)?,
                fetch_end: end,
                retain_prefix: format!("{:04}-", year),
            })
        }
        PeriodType::Annually => {
            let start = month_start(year, 1)?;
            let end = month_start(year + 1, 1)? - Duration::days(1);
            Ok(Window {
                fetch_start: month_start(year - 1, 1)?,
                fetch_end: end,
                retain_prefix: format!("{:04}", year),
            })
        }
    }
}

fn seed_buckets(query: &RevenueQuery, buckets: &mut BTreeMap<String, (f64, i64)>) {
    // Only daily and monthly ranges are pre-seeded so empty days/months are
    // represented; weekly and annual buckets exist only where bookings do.
    match query.period_type {
        PeriodType::Daily => {
            if let Some(month) = query.month {
                let mut day = match NaiveDate::from_ymd_opt(query.year, month, 1) {
                    Some(d) => d,
                    None => return,
                };
                while day.month() == month && day.year() == query.year {
                    buckets.entry(bucket_label(day, PeriodType::Daily)).or_insert((0.0, 0));
                    day += Duration::days(1);
                }
            }
        }
        PeriodType::Monthly => {
            for month in 1..=12 {
                buckets
                    .entry(format!("{:04}-{:02}", query.year, month))
                    .or_insert((0.0, 0));
            }
        }
        PeriodType::Weekly | PeriodType::Annually => {}
    }
}

/// Buckets paid bookings by check-in into calendar periods and computes
/// period-over-period trend deltas against each bucket's immediate
/// predecessor.
pub fn compute_revenue(conn: &Connection, query: &RevenueQuery) -> Result<RevenueReport, RevenueError> {
    let window = compute_window(query)?;

    // Stored instants are normalized RFC 3339 UTC, so the date prefix is
    // comparable as text.
    let mut stmt = conn
        .prepare(
            "SELECT b.checkin, b.total_amount
             FROM bookings b
             JOIN payment_statuses ps ON ps.id = b.payment_status_id
             WHERE ps.name = 'paid'
               AND substr(b.checkin, 1, 10) >= ?
               AND substr(b.checkin, 1, 10) <= ?",
        )
        .map_err(|e| RevenueError::new("db_query_failed", e.to_string()))?;
    let rows = stmt
        .query_map(
            [
                window.fetch_start.format("%Y-%m-%d").to_string(),
                window.fetch_end.format("%Y-%m-%d").to_string(),
            ],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, f64>(1)?,
                ))
            },
        )
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| RevenueError::new("db_query_failed", e.to_string()))?;

    // Full map including lookback buckets; those exist solely to supply
    // predecessors for trend computation and are filtered out below.
    let mut buckets: BTreeMap<String, (f64, i64)> = BTreeMap::new();
    seed_buckets(query, &mut buckets);

    for (checkin, amount) in rows {
        let Ok(instant) = DateTime::parse_from_rfc3339(&checkin) else {
            continue;
        };
        let label = bucket_label(instant.date_naive(), query.period_type);
        let entry = buckets.entry(label).or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    let mut out = Vec::new();
    let mut total = 0.0;
    for (label, (revenue, count)) in &buckets {
        if !label.starts_with(&window.retain_prefix) {
            continue;
        }
        let previous = previous_period_label(label, query.period_type)
            .and_then(|p| buckets.get(&p).copied());
        let (trend, percentage) = match previous {
            Some((prev_revenue, _)) if prev_revenue > 0.0 => {
                let pct = (((revenue - prev_revenue) / prev_revenue) * 100.0)
                    .abs()
                    .round() as i64;
                let trend = if *revenue >= prev_revenue {
                    Trend::Up
                } else {
                    Trend::Down
                };
                (Some(trend), pct)
            }
            _ => (None, 0),
        };
        total += revenue;
        out.push(RevenueBucket {
            period: label.clone(),
            revenue: round2(*revenue),
            count: *count,
            trend,
            percentage,
        });
    }

    let average = if out.is_empty() {
        0.0
    } else {
        total / out.len() as f64
    };

    Ok(RevenueReport {
        period_type: query.period_type.as_str().to_string(),
        buckets: out,
        total_revenue: round2(total),
        average_revenue: round2(average),
    })
}
