
use chrono::{Datelike, Utc};
use serde_json::json;
use test_support::{
    error_code, request_err, request_ok, result_id, seed_hotel, spawn_daemon, temp_dir,
};

#[test]
fn guest_search_and_pagination() {
    let workspace = temp_dir("hoteld-guest-crud");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    for (n, (first, last, email)) in [
        ("Grace", "Hopper", "grace@example.test"),
        ("Alan", "Turing", "alan@example.test"),
        ("Annie", "Easley", "annie@example.test"),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("g{}", n),
            "guests.create",
            json!({ "firstName": first, "lastName": last, "email": email }),
        );
    }

    // Case-insensitive match on either name or email.
    let found = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "guests.list",
        json!({ "search": "HOPPER" }),
    );
    let items = found.get("items").and_then(|v| v.as_array()).expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].get("displayName").and_then(|v| v.as_str()),
        Some("Hopper, Grace")
    );

    let found = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "guests.list",
        json!({ "search": "an" }),
    );
    // Alan Turing and Annie Easley.
    assert_eq!(
        found.get("items").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(2)
    );

    let page = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "guests.list",
        json!({ "page": 2, "limit": 2 }),
    );
    assert_eq!(
        page.get("items").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(1)
    );
    let meta = page.get("meta").expect("meta");
    assert_eq!(meta.get("total").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(meta.get("totalPages").and_then(|v| v.as_i64()), Some(2));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "guests.list",
        json!({ "limit": 500 }),
    );
    assert_eq!(error_code(&error), "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn guest_with_bookings_cannot_be_deleted() {
    let workspace = temp_dir("hoteld-guest-guard");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let fx = seed_hotel(&mut stdin, &mut reader, &workspace, 1);
    let year = Utc::now().year() + 1;

    let booking = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-03-10T12:00:00Z", year),
            "checkout": format!("{}-03-12T10:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[0]]
        }),
    );

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "guests.delete",
        json!({ "guestId": fx.guest_id }),
    );
    assert_eq!(error_code(&error), "in_use");

    // Deleting the booking releases the guest and its room attachments.
    let booking_id = booking.get("id").and_then(|v| v.as_str()).expect("id");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "bookings.delete",
        json!({ "bookingId": booking_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "guests.delete",
        json!({ "guestId": fx.guest_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "rooms.delete",
        json!({ "roomId": fx.room_ids[0] }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn addon_prices_are_validated_and_updatable() {
    let workspace = temp_dir("hoteld-addon-crud");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "addons.create",
        json!({ "name": "Minibar", "price": -1.0 }),
    );
    assert_eq!(error_code(&error), "bad_params");

    let addon = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "addons.create",
        json!({ "name": "Minibar", "price": 9.5 }),
    );
    let addon_id = result_id(&addon);

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "addons.update",
        json!({ "addonId": addon_id, "name": "Minibar", "price": 12.0 }),
    );
    assert_eq!(updated.get("price").and_then(|v| v.as_f64()), Some(12.0));

    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "addons.get",
        json!({ "addonId": addon_id }),
    );
    assert_eq!(fetched.get("price").and_then(|v| v.as_f64()), Some(12.0));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "addons.get",
        json!({ "addonId": "missing" }),
    );
    assert_eq!(error_code(&error), "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
