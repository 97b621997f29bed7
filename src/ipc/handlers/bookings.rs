use crate::availability;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, id_array, list_meta, optional_f64, optional_str, page_offset, parse_limit,
    parse_page, required_str,
};
use crate::ipc::types::{AppState, Request};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct BookingInput {
    guest_id: String,
    payment_status_id: String,
    checkin: DateTime<Utc>,
    checkout: DateTime<Utc>,
    adults: i64,
    children: i64,
    room_ids: Vec<String>,
    addon_ids: Vec<String>,
    total_amount: Option<f64>,
}

/// Parses and cross-checks the booking payload, collecting every problem
/// into one human-readable list so the dashboard can show them together.
/// Room availability is checked separately, inside the write transaction.
fn parse_booking_input(
    conn: &Connection,
    req: &Request,
    enforce_future_checkin: bool,
) -> Result<Result<BookingInput, Vec<String>>, serde_json::Value> {
    let mut errors: Vec<String> = Vec::new();

    let guest_id = req
        .params
        .get("guestId")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let payment_status_id = req
        .params
        .get("paymentStatusId")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let checkin_raw = req
        .params
        .get("checkin")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let checkout_raw = req
        .params
        .get("checkout")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let adults = req.params.get("adults").and_then(|v| v.as_i64());
    let children = req
        .params
        .get("children")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    let room_ids = match id_array(req, "roomIds") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return Err(e),
    };
    let addon_ids = match id_array(req, "addonIds") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return Err(e),
    };
    let total_amount = match optional_f64(req, "totalAmount") {
        Ok(v) => v,
        Err(e) => return Err(e),
    };

    if guest_id.is_none() {
        errors.push("guestId is required".to_string());
    }
    if payment_status_id.is_none() {
        errors.push("paymentStatusId is required".to_string());
    }
    match adults {
        Some(a) if a >= 1 => {}
        Some(_) => errors.push("adults must be at least 1".to_string()),
        None => errors.push("adults is required".to_string()),
    }
    if children < 0 {
        errors.push("children must not be negative".to_string());
    }
    if room_ids.is_empty() {
        errors.push("at least one room is required".to_string());
    }
    if let Some(amount) = total_amount {
        if amount < 0.0 {
            errors.push("totalAmount must not be negative".to_string());
        }
    }

    let checkin = match checkin_raw.as_deref() {
        Some(raw) => match availability::parse_instant(raw, "checkin") {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(e.message);
                None
            }
        },
        None => {
            errors.push("checkin is required".to_string());
            None
        }
    };
    let checkout = match checkout_raw.as_deref() {
        Some(raw) => match availability::parse_instant(raw, "checkout") {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(e.message);
                None
            }
        },
        None => {
            errors.push("checkout is required".to_string());
            None
        }
    };

    if let (Some(ci), Some(co)) = (checkin, checkout) {
        if co <= ci {
            errors.push("checkout must be after checkin".to_string());
        }
        if enforce_future_checkin && ci.date_naive() < Utc::now().date_naive() {
            errors.push("checkin must not be in the past".to_string());
        }
    }

    if let Some(gid) = guest_id.as_deref() {
        match row_exists(conn, "guests", gid) {
            Ok(true) => {}
            Ok(false) => errors.push("guest not found".to_string()),
            Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        }
    }
    if let Some(pid) = payment_status_id.as_deref() {
        match row_exists(conn, "payment_statuses", pid) {
            Ok(true) => {}
            Ok(false) => errors.push("payment status not found".to_string()),
            Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        }
    }
    for room_id in &room_ids {
        match row_exists(conn, "rooms", room_id) {
            Ok(true) => {}
            Ok(false) => errors.push(format!("room {} not found", room_id)),
            Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        }
    }
    for addon_id in &addon_ids {
        match row_exists(conn, "addons", addon_id) {
            Ok(true) => {}
            Ok(false) => errors.push(format!("addon {} not found", addon_id)),
            Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        }
    }

    if !errors.is_empty() {
        return Ok(Err(errors));
    }

    // All options verified present above.
    let (Some(guest_id), Some(payment_status_id), Some(checkin), Some(checkout), Some(adults)) =
        (guest_id, payment_status_id, checkin, checkout, adults)
    else {
        return Ok(Err(vec!["invalid booking payload".to_string()]));
    };

    Ok(Ok(BookingInput {
        guest_id,
        payment_status_id,
        checkin,
        checkout,
        adults,
        children,
        room_ids,
        addon_ids,
        total_amount,
    }))
}

fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool, rusqlite::Error> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    Ok(conn
        .query_row(&sql, [id], |r| r.get::<_, i64>(0))
        .optional()?
        .is_some())
}

fn sum_over_ids(
    conn: &Connection,
    sql_prefix: &str,
    ids: &[String],
) -> Result<f64, rusqlite::Error> {
    if ids.is_empty() {
        return Ok(0.0);
    }
    let placeholders = std::iter::repeat("?")
        .take(ids.len())
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!("{} ({})", sql_prefix, placeholders);
    let values = ids
        .iter()
        .map(|id| Value::Text(id.clone()))
        .collect::<Vec<_>>();
    conn.query_row(&sql, params_from_iter(values), |r| r.get(0))
}

fn default_total_amount(
    conn: &Connection,
    input: &BookingInput,
) -> Result<f64, rusqlite::Error> {
    let nights = (input.checkout.date_naive() - input.checkin.date_naive())
        .num_days()
        .max(1);
    let room_total = sum_over_ids(
        conn,
        "SELECT COALESCE(SUM(rc.base_price), 0)
         FROM rooms r
         JOIN room_classes rc ON rc.id = r.room_class_id
         WHERE r.id IN",
        &input.room_ids,
    )?;
    let addon_total = sum_over_ids(
        conn,
        "SELECT COALESCE(SUM(price), 0) FROM addons WHERE id IN",
        &input.addon_ids,
    )?;
    Ok(nights as f64 * room_total + addon_total)
}

fn conflict_messages(conflicts: &[availability::RoomConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|c| {
            format!(
                "room {} is not available between {} and {}",
                c.room_number, c.checkin, c.checkout
            )
        })
        .collect()
}

fn booking_json(
    conn: &Connection,
    booking_id: &str,
) -> Result<Option<serde_json::Value>, rusqlite::Error> {
    let row = conn
        .query_row(
            "SELECT b.guest_id, g.first_name, g.last_name,
                    b.payment_status_id, ps.name,
                    b.checkin, b.checkout, b.adults, b.children, b.total_amount, b.created_at
             FROM bookings b
             JOIN guests g ON g.id = b.guest_id
             JOIN payment_statuses ps ON ps.id = b.payment_status_id
             WHERE b.id = ?",
            [booking_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, i64>(7)?,
                    r.get::<_, i64>(8)?,
                    r.get::<_, f64>(9)?,
                    r.get::<_, String>(10)?,
                ))
            },
        )
        .optional()?;
    let Some((
        guest_id,
        first_name,
        last_name,
        payment_status_id,
        payment_status_name,
        checkin,
        checkout,
        adults,
        children,
        total_amount,
        created_at,
    )) = row
    else {
        return Ok(None);
    };

    let mut rooms_stmt = conn.prepare(
        "SELECT r.id, r.number
         FROM booking_rooms br
         JOIN rooms r ON r.id = br.room_id
         WHERE br.booking_id = ?
         ORDER BY r.number",
    )?;
    let rooms = rooms_stmt
        .query_map([booking_id], |r| {
            let id: String = r.get(0)?;
            let number: String = r.get(1)?;
            Ok(json!({ "id": id, "number": number }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    let mut addons_stmt = conn.prepare(
        "SELECT a.id, a.name, a.price
         FROM booking_addons ba
         JOIN addons a ON a.id = ba.addon_id
         WHERE ba.booking_id = ?
         ORDER BY a.name",
    )?;
    let addons = addons_stmt
        .query_map([booking_id], |r| {
            let id: String = r.get(0)?;
            let name: String = r.get(1)?;
            let price: f64 = r.get(2)?;
            Ok(json!({ "id": id, "name": name, "price": price }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    Ok(Some(json!({
        "id": booking_id,
        "guest": {
            "id": guest_id,
            "displayName": format!("{}, {}", last_name, first_name)
        },
        "paymentStatus": { "id": payment_status_id, "name": payment_status_name },
        "checkin": checkin,
        "checkout": checkout,
        "adults": adults,
        "children": children,
        "totalAmount": total_amount,
        "rooms": rooms,
        "addons": addons,
        "createdAt": created_at
    })))
}

fn write_attachments(
    conn: &Connection,
    booking_id: &str,
    input: &BookingInput,
) -> Result<(), (String, String)> {
    for room_id in &input.room_ids {
        conn.execute(
            "INSERT INTO booking_rooms(booking_id, room_id) VALUES(?, ?)",
            (booking_id, room_id),
        )
        .map_err(|e| ("booking_rooms".to_string(), e.to_string()))?;
    }
    for addon_id in &input.addon_ids {
        conn.execute(
            "INSERT INTO booking_addons(booking_id, addon_id) VALUES(?, ?)",
            (booking_id, addon_id),
        )
        .map_err(|e| ("booking_addons".to_string(), e.to_string()))?;
    }
    Ok(())
}

fn handle_check_availability(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_ids = match id_array(req, "roomIds") {
        Ok(Some(v)) if !v.is_empty() => v,
        Ok(_) => return err(&req.id, "bad_params", "missing roomIds", None),
        Err(e) => return e,
    };
    let checkin_raw = match required_str(req, "checkin") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let checkout_raw = match required_str(req, "checkout") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exclude = match optional_str(req, "excludeBookingId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let checkin = match availability::parse_instant(&checkin_raw, "checkin") {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, None),
    };
    let checkout = match availability::parse_instant(&checkout_raw, "checkout") {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, None),
    };
    if checkout <= checkin {
        return err(&req.id, "bad_params", "checkout must be after checkin", None);
    }

    match availability::find_conflicts(conn, &room_ids, checkin, checkout, exclude.as_deref()) {
        Ok(conflicts) => ok(
            &req.id,
            json!({
                "available": conflicts.is_empty(),
                "conflicts": conflicts
            }),
        ),
        Err(e) => err(&req.id, &e.code, e.message, e.details),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let input = match parse_booking_input(conn, req, true) {
        Ok(Ok(v)) => v,
        Ok(Err(errors)) => {
            return err(
                &req.id,
                "validation_failed",
                "booking is not valid",
                Some(json!({ "errors": errors })),
            )
        }
        Err(e) => return e,
    };

    // Conflict probe and inserts share one transaction so a competing
    // create cannot land between the check and the write.
    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    let conflicts = match availability::find_conflicts(
        &tx,
        &input.room_ids,
        input.checkin,
        input.checkout,
        None,
    ) {
        Ok(v) => v,
        Err(e) => {
            let _ = tx.rollback();
            return err(&req.id, &e.code, e.message, e.details);
        }
    };
    if !conflicts.is_empty() {
        let _ = tx.rollback();
        return err(
            &req.id,
            "validation_failed",
            "booking is not valid",
            Some(json!({ "errors": conflict_messages(&conflicts), "conflicts": conflicts })),
        );
    }

    let total_amount = match input.total_amount {
        Some(v) => v,
        None => match default_total_amount(&tx, &input) {
            Ok(v) => v,
            Err(e) => {
                let _ = tx.rollback();
                return err(&req.id, "db_query_failed", e.to_string(), None);
            }
        },
    };

    let booking_id = Uuid::new_v4().to_string();
    if let Err(e) = tx.execute(
        "INSERT INTO bookings(id, guest_id, payment_status_id, checkin, checkout,
                              adults, children, total_amount, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &booking_id,
            &input.guest_id,
            &input.payment_status_id,
            input.checkin.to_rfc3339(),
            input.checkout.to_rfc3339(),
            input.adults,
            input.children,
            total_amount,
            db::now_rfc3339(),
        ),
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "bookings" })),
        );
    }

    if let Err((table, msg)) = write_attachments(&tx, &booking_id, &input) {
        let _ = tx.rollback();
        return err(&req.id, "db_insert_failed", msg, Some(json!({ "table": table })));
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    db::log_activity(
        conn,
        "create",
        "booking",
        &booking_id,
        &format!("{} room(s)", input.room_ids.len()),
    );
    match booking_json(conn, &booking_id) {
        Ok(Some(b)) => ok(&req.id, b),
        Ok(None) => err(&req.id, "not_found", "booking not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let booking_id = match required_str(req, "bookingId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match row_exists(conn, "bookings", &booking_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "booking not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    // Editing an in-progress stay is allowed, so the past-checkin rule only
    // applies at creation time.
    let input = match parse_booking_input(conn, req, false) {
        Ok(Ok(v)) => v,
        Ok(Err(errors)) => {
            return err(
                &req.id,
                "validation_failed",
                "booking is not valid",
                Some(json!({ "errors": errors })),
            )
        }
        Err(e) => return e,
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    let conflicts = match availability::find_conflicts(
        &tx,
        &input.room_ids,
        input.checkin,
        input.checkout,
        Some(&booking_id),
    ) {
        Ok(v) => v,
        Err(e) => {
            let _ = tx.rollback();
            return err(&req.id, &e.code, e.message, e.details);
        }
    };
    if !conflicts.is_empty() {
        let _ = tx.rollback();
        return err(
            &req.id,
            "validation_failed",
            "booking is not valid",
            Some(json!({ "errors": conflict_messages(&conflicts), "conflicts": conflicts })),
        );
    }

    let total_amount = match input.total_amount {
        Some(v) => v,
        None => match default_total_amount(&tx, &input) {
            Ok(v) => v,
            Err(e) => {
                let _ = tx.rollback();
                return err(&req.id, "db_query_failed", e.to_string(), None);
            }
        },
    };

    if let Err(e) = tx.execute(
        "UPDATE bookings
         SET guest_id = ?, payment_status_id = ?, checkin = ?, checkout = ?,
             adults = ?, children = ?, total_amount = ?
         WHERE id = ?",
        (
            &input.guest_id,
            &input.payment_status_id,
            input.checkin.to_rfc3339(),
            input.checkout.to_rfc3339(),
            input.adults,
            input.children,
            total_amount,
            &booking_id,
        ),
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "bookings" })),
        );
    }

    for table in ["booking_rooms", "booking_addons"] {
        let sql = format!("DELETE FROM {} WHERE booking_id = ?", table);
        if let Err(e) = tx.execute(&sql, [&booking_id]) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": table })),
            );
        }
    }
    if let Err((table, msg)) = write_attachments(&tx, &booking_id, &input) {
        let _ = tx.rollback();
        return err(&req.id, "db_insert_failed", msg, Some(json!({ "table": table })));
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    db::log_activity(
        conn,
        "update",
        "booking",
        &booking_id,
        &format!("{} room(s)", input.room_ids.len()),
    );
    match booking_json(conn, &booking_id) {
        Ok(Some(b)) => ok(&req.id, b),
        Ok(None) => err(&req.id, "not_found", "booking not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let booking_id = match required_str(req, "bookingId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match row_exists(conn, "bookings", &booking_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "booking not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    for table in ["booking_rooms", "booking_addons"] {
        let sql = format!("DELETE FROM {} WHERE booking_id = ?", table);
        if let Err(e) = tx.execute(&sql, [&booking_id]) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": table })),
            );
        }
    }
    if let Err(e) = tx.execute("DELETE FROM bookings WHERE id = ?", [&booking_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "bookings" })),
        );
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    db::log_activity(conn, "delete", "booking", &booking_id, "");
    ok(&req.id, json!({ "ok": true }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let booking_id = match required_str(req, "bookingId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match booking_json(conn, &booking_id) {
        Ok(Some(b)) => ok(&req.id, b),
        Ok(None) => err(&req.id, "not_found", "booking not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let page = match parse_page(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let limit = match parse_limit(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut where_clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    for (param, clause) in [
        ("guestId", "b.guest_id = ?"),
        ("paymentStatusId", "b.payment_status_id = ?"),
    ] {
        match optional_str(req, param) {
            Ok(Some(v)) => {
                where_clauses.push(clause);
                values.push(Value::Text(v));
            }
            Ok(None) => {}
            Err(e) => return e,
        }
    }
    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_clauses.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM bookings b{}", where_sql);
    let total: i64 = match conn.query_row(&count_sql, params_from_iter(values.clone()), |r| r.get(0))
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let list_sql = format!(
        "SELECT b.id, g.first_name, g.last_name, ps.name,
                b.checkin, b.checkout, b.adults, b.children, b.total_amount, b.created_at
         FROM bookings b
         JOIN guests g ON g.id = b.guest_id
         JOIN payment_statuses ps ON ps.id = b.payment_status_id{}
         ORDER BY b.checkin DESC
         LIMIT ? OFFSET ?",
        where_sql
    );
    values.push(Value::Integer(limit as i64));
    values.push(Value::Integer(page_offset(page, limit) as i64));

    let mut stmt = match conn.prepare(&list_sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(values), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, i64>(6)?,
                r.get::<_, i64>(7)?,
                r.get::<_, f64>(8)?,
                r.get::<_, String>(9)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut items = Vec::with_capacity(rows.len());
    for (
        id,
        first_name,
        last_name,
        payment_status,
        checkin,
        checkout,
        adults,
        children,
        total_amount,
        created_at,
    ) in rows
    {
        let mut numbers_stmt = match conn.prepare(
            "SELECT r.number
             FROM booking_rooms br
             JOIN rooms r ON r.id = br.room_id
             WHERE br.booking_id = ?
             ORDER BY r.number",
        ) {
            Ok(s) => s,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        let room_numbers = numbers_stmt
            .query_map([&id], |r| r.get::<_, String>(0))
            .and_then(|it| it.collect::<Result<Vec<_>, _>>());
        let room_numbers = match room_numbers {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        items.push(json!({
            "id": id,
            "guestName": format!("{}, {}", last_name, first_name),
            "paymentStatus": payment_status,
            "checkin": checkin,
            "checkout": checkout,
            "adults": adults,
            "children": children,
            "totalAmount": total_amount,
            "roomNumbers": room_numbers,
            "createdAt": created_at
        }));
    }

    ok(
        &req.id,
        json!({ "items": items, "meta": list_meta(page, limit, total as usize) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "bookings.list" => Some(handle_list(state, req)),
        "bookings.get" => Some(handle_get(state, req)),
        "bookings.checkAvailability" => Some(handle_check_availability(state, req)),
        "bookings.create" => Some(handle_create(state, req)),
        "bookings.update" => Some(handle_update(state, req)),
        "bookings.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
