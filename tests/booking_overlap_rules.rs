
use chrono::{Datelike, Utc};
use serde_json::json;
use test_support::{error_code, request_err, request_ok, seed_hotel, spawn_daemon, temp_dir};

#[test]
fn overlapping_stay_on_same_room_is_rejected() {
    let workspace = temp_dir("hoteld-overlap");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let fx = seed_hotel(&mut stdin, &mut reader, &workspace, 2);
    let year = Utc::now().year() + 1;

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-03-10T12:00:00Z", year),
            "checkout": format!("{}-03-15T10:00:00Z", year),
            "adults": 2,
            "roomIds": [fx.room_ids[0]]
        }),
    );
    assert!(first.get("id").is_some());

    // Inside the committed interval on the same room.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-03-12T12:00:00Z", year),
            "checkout": format!("{}-03-14T10:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[0]]
        }),
    );
    assert_eq!(error_code(&error), "validation_failed");
    let conflicts = error
        .get("details")
        .and_then(|d| d.get("conflicts"))
        .and_then(|c| c.as_array())
        .expect("conflict list");
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].get("roomNumber").and_then(|v| v.as_str()),
        Some("101")
    );

    // Same dates on a different room are fine.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-03-12T12:00:00Z", year),
            "checkout": format!("{}-03-14T10:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[1]]
        }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn back_to_back_stays_do_not_conflict() {
    let workspace = temp_dir("hoteld-backtoback");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let fx = seed_hotel(&mut stdin, &mut reader, &workspace, 1);
    let year = Utc::now().year() + 1;

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-06-01T15:00:00Z", year),
            "checkout": format!("{}-06-05T15:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[0]]
        }),
    );

    // New checkin equals the previous checkout; intervals are half-open.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-06-05T15:00:00Z", year),
            "checkout": format!("{}-06-08T15:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[0]]
        }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn check_availability_reports_conflicts_without_writing() {
    let workspace = temp_dir("hoteld-checkavail");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let fx = seed_hotel(&mut stdin, &mut reader, &workspace, 1);
    let year = Utc::now().year() + 1;

    let booked = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-09-01T12:00:00Z", year),
            "checkout": format!("{}-09-04T10:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[0]]
        }),
    );
    let booking_id = booked
        .get("id")
        .and_then(|v| v.as_str())
        .expect("booking id")
        .to_string();

    let probe = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "bookings.checkAvailability",
        json!({
            "roomIds": [fx.room_ids[0]],
            "checkin": format!("{}-09-02T12:00:00Z", year),
            "checkout": format!("{}-09-03T10:00:00Z", year)
        }),
    );
    assert_eq!(probe.get("available").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        probe
            .get("conflicts")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(1)
    );

    // The same probe on behalf of the booking itself sees no conflicts.
    let probe_self = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "bookings.checkAvailability",
        json!({
            "roomIds": [fx.room_ids[0]],
            "checkin": format!("{}-09-02T12:00:00Z", year),
            "checkout": format!("{}-09-03T10:00:00Z", year),
            "excludeBookingId": booking_id
        }),
    );
    assert_eq!(
        probe_self.get("available").and_then(|v| v.as_bool()),
        Some(true)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn update_excludes_the_edited_booking_from_conflicts() {
    let workspace = temp_dir("hoteld-update-self");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let fx = seed_hotel(&mut stdin, &mut reader, &workspace, 2);
    let year = Utc::now().year() + 1;

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-04-10T12:00:00Z", year),
            "checkout": format!("{}-04-15T10:00:00Z", year),
            "adults": 2,
            "roomIds": [fx.room_ids[0]]
        }),
    );
    let first_id = first
        .get("id")
        .and_then(|v| v.as_str())
        .expect("booking id")
        .to_string();

    // Shifting the stay by one day still overlaps its own old interval; the
    // edited booking must not block itself.
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "bookings.update",
        json!({
            "bookingId": first_id,
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-04-11T12:00:00Z", year),
            "checkout": format!("{}-04-16T10:00:00Z", year),
            "adults": 2,
            "roomIds": [fx.room_ids[0]]
        }),
    );
    assert_eq!(
        updated.get("checkin").and_then(|v| v.as_str()),
        Some(format!("{}-04-11T12:00:00+00:00", year).as_str())
    );

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "bookings.create",
        json!({
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-04-20T12:00:00Z", year),
            "checkout": format!("{}-04-22T10:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[1]]
        }),
    );
    let second_id = second
        .get("id")
        .and_then(|v| v.as_str())
        .expect("booking id")
        .to_string();

    // Moving the second booking onto the first one's room and dates fails.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "bookings.update",
        json!({
            "bookingId": second_id,
            "guestId": fx.guest_id,
            "paymentStatusId": fx.paid_status_id,
            "checkin": format!("{}-04-12T12:00:00Z", year),
            "checkout": format!("{}-04-14T10:00:00Z", year),
            "adults": 1,
            "roomIds": [fx.room_ids[0]]
        }),
    );
    assert_eq!(error_code(&error), "validation_failed");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
