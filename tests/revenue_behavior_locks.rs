#[path = "../src/revenue.rs"]
mod revenue;

use chrono::NaiveDate;
use revenue::{bucket_label, parse_revenue_query, previous_period_label, round2, PeriodType};
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn bucket_labels_per_period_type() {
    let d = date(2030, 3, 9);
    assert_eq!(bucket_label(d, PeriodType::Daily), "2030-03-09");
    assert_eq!(bucket_label(d, PeriodType::Monthly), "2030-03");
    assert_eq!(bucket_label(d, PeriodType::Annually), "2030");
    // 2030-03-09 falls in ISO week 10 of 2030.
    assert_eq!(bucket_label(d, PeriodType::Weekly), "2030-W10");
    // Early January can belong to the previous ISO year.
    assert_eq!(bucket_label(date(2027, 1, 1), PeriodType::Weekly), "2026-W53");
}

#[test]
fn previous_period_crosses_boundaries() {
    assert_eq!(
        previous_period_label("2030-01-01", PeriodType::Daily).as_deref(),
        Some("2029-12-31")
    );
    assert_eq!(
        previous_period_label("2030-01", PeriodType::Monthly).as_deref(),
        Some("2029-12")
    );
    assert_eq!(
        previous_period_label("2030-07", PeriodType::Monthly).as_deref(),
        Some("2030-06")
    );
    assert_eq!(
        previous_period_label("2030", PeriodType::Annually).as_deref(),
        Some("2029")
    );
    // ISO week 1 of 2026 starts in the last ISO week of 2025.
    assert_eq!(
        previous_period_label("2026-W01", PeriodType::Weekly).as_deref(),
        Some("2025-W52")
    );
    assert_eq!(previous_period_label("garbage", PeriodType::Daily), None);
}

#[test]
fn query_parsing_enforces_shapes() {
    let q = parse_revenue_query(&json!({ "periodType": "daily", "year": 2030, "month": 3 }))
        .expect("valid daily query");
    assert_eq!(q.period_type, PeriodType::Daily);
    assert_eq!(q.year, 2030);
    assert_eq!(q.month, Some(3));

    let q = parse_revenue_query(&json!({ "periodType": "annually", "year": 2030 }))
        .expect("valid annual query");
    assert_eq!(q.month, None);

    assert!(parse_revenue_query(&json!({ "year": 2030 })).is_err());
    assert!(parse_revenue_query(&json!({ "periodType": "hourly", "year": 2030 })).is_err());
    assert!(parse_revenue_query(&json!({ "periodType": "daily", "year": 2030 })).is_err());
    assert!(
        parse_revenue_query(&json!({ "periodType": "daily", "year": 2030, "month": 0 })).is_err()
    );
    assert!(
        parse_revenue_query(&json!({ "periodType": "monthly", "year": 1969 })).is_err()
    );
}

#[test]
fn rounding_keeps_two_decimals() {
    assert_eq!(round2(8.064516), 8.06);
    assert_eq!(round2(1.006), 1.01);
    assert_eq!(round2(250.0), 250.0);
    assert_eq!(round2(0.0), 0.0);
}
