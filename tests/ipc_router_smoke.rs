
use chrono::{Datelike, Utc};
use serde_json::json;
use test_support::{
    error_code, request, request_err, request_ok, seed_hotel, spawn_daemon, temp_dir,
};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("hoteld-router-smoke");
    let bundle_out = workspace.join("smoke-backup.hotelbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").is_some());
    assert!(health
        .get("workspacePath")
        .map(|v| v.is_null())
        .unwrap_or(true));

    // Everything that touches the database is gated on workspace selection.
    let error = request_err(&mut stdin, &mut reader, "2", "rooms.list", json!({}));
    assert_eq!(error_code(&error), "no_workspace");

    let fx = seed_hotel(&mut stdin, &mut reader, &workspace, 1);
    let year = Utc::now().year() + 1;

    let _ = request_ok(&mut stdin, &mut reader, "3", "floors.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "4", "bedTypes.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "5", "features.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "6", "roomStatuses.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "7", "paymentStatuses.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "8", "roomClasses.list", json!({}));

    let rooms = request_ok(&mut stdin, &mut reader, "9", "rooms.list", json!({}));
    assert_eq!(
        rooms.get("items").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(1)
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "rooms.get",
        json!({ "roomId": fx.room_ids[0] }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "rooms.setStatus",
        json!({ "roomId": fx.room_ids[0], "roomStatusId": fx.available_status_id }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "guests.get",
        json!({ "guestId": fx.guest_id }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "13", "addons.list", json!({}));

    let booking = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-03-10T12:00:00Z", year),
            "checkout": format!("{}-03-12T10:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[0]],
            "addonIds": [fx.addon_id]
        }),
    );
    let booking_id = booking
        .get("id")
        .and_then(|v| v.as_str())
        .expect("booking id")
        .to_string();

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "bookings.list",
        json!({ "guestId": fx.guest_id }),
    );
    let items = listed.get("items").and_then(|v| v.as_array()).expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].get("guestName").and_then(|v| v.as_str()),
        Some("Lovelace, Ada")
    );
    assert_eq!(
        items[0]
            .get("roomNumbers")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(1)
    );

    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "bookings.get",
        json!({ "bookingId": booking_id }),
    );
    assert_eq!(
        fetched
            .get("addons")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(1)
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "analytics.revenue",
        json!({ "periodType": "monthly", "year": year }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "18", "activity.list", json!({}));

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "backup.export",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(exported.get("entryCount").and_then(|v| v.as_i64()), Some(2));
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "backup.import",
        json!({ "inPath": bundle_out.to_string_lossy() }),
    );
    assert!(imported.get("bundleFormat").is_some());

    // The restored database still serves reads.
    let listed = request_ok(&mut stdin, &mut reader, "21", "bookings.list", json!({}));
    assert_eq!(
        listed.get("items").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(1)
    );

    // Unknown methods fall through the whole chain.
    let response = request(&mut stdin, &mut reader, "22", "rooms.paint", json!({}));
    assert_eq!(response.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        response
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
