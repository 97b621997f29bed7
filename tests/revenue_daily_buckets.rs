
use chrono::{Datelike, Utc};
use serde_json::json;
use test_support::{request_ok, seed_hotel, spawn_daemon, temp_dir};

fn bucket<'a>(report: &'a serde_json::Value, period: &str) -> &'a serde_json::Value {
    report
        .get("buckets")
        .and_then(|v| v.as_array())
        .expect("buckets")
        .iter()
        .find(|b| b.get("period").and_then(|v| v.as_str()) == Some(period))
        .unwrap_or_else(|| panic!("bucket {} missing", period))
}

#[test]
fn daily_report_seeds_every_day_and_tracks_trend() {
    let workspace = temp_dir("hoteld-revenue-daily");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let fx = seed_hotel(&mut stdin, &mut reader, &workspace, 1);
    let year = Utc::now().year() + 1;

    // Two paid one-night stays on consecutive days, then an unpaid one that
    // must not contribute.
    for (n, (day, amount, status)) in [
        (10, 100.0, &fx.paid_status_id),
        (11, 150.0, &fx.paid_status_id),
        (12, 999.0, &fx.unpaid_status_id),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("b{}", n),
            "bookings.create",
            json!({
                "guestId": fx.guest_id,
                "paymentStatusId": status,
                "checkin": format!("{}-03-{:02}T12:00:00Z", year, day),
                "checkout": format!("{}-03-{:02}T12:00:00Z", year, day + 1),
                "adults": 1,
                "roomIds": [fx.room_ids[0]],
                "totalAmount": amount
            }),
        );
    }

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "rev",
        "analytics.revenue",
        json!({ "periodType": "daily", "year": year, "month": 3 }),
    );

    assert_eq!(
        report.get("periodType").and_then(|v| v.as_str()),
        Some("daily")
    );
    // March is fully represented, including days with no revenue.
    assert_eq!(
        report
            .get("buckets")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(31)
    );
    assert_eq!(
        report.get("totalRevenue").and_then(|v| v.as_f64()),
        Some(250.0)
    );

    // No revenue the day before, so the first busy day carries no trend.
    let d10 = bucket(&report, &format!("{}-03-10", year));
    assert_eq!(d10.get("revenue").and_then(|v| v.as_f64()), Some(100.0));
    assert_eq!(d10.get("count").and_then(|v| v.as_i64()), Some(1));
    assert!(d10.get("trend").is_none());
    assert_eq!(d10.get("percentage").and_then(|v| v.as_i64()), Some(0));

    // 100 -> 150 is a 50% rise against the immediate predecessor.
    let d11 = bucket(&report, &format!("{}-03-11", year));
    assert_eq!(d11.get("revenue").and_then(|v| v.as_f64()), Some(150.0));
    assert_eq!(d11.get("trend").and_then(|v| v.as_str()), Some("up"));
    assert_eq!(d11.get("percentage").and_then(|v| v.as_i64()), Some(50));

    // The unpaid stay leaves its day empty, which reads as a full drop.
    let d12 = bucket(&report, &format!("{}-03-12", year));
    assert_eq!(d12.get("revenue").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(d12.get("trend").and_then(|v| v.as_str()), Some("down"));
    assert_eq!(d12.get("percentage").and_then(|v| v.as_i64()), Some(100));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
