use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, list_meta, optional_str, page_offset, parse_limit, parse_page, required_str,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn guest_row_json(r: &rusqlite::Row<'_>) -> Result<serde_json::Value, rusqlite::Error> {
    let id: String = r.get(0)?;
    let first_name: String = r.get(1)?;
    let last_name: String = r.get(2)?;
    let email: Option<String> = r.get(3)?;
    let phone: Option<String> = r.get(4)?;
    let created_at: String = r.get(5)?;
    Ok(json!({
        "id": id,
        "firstName": first_name,
        "lastName": last_name,
        "displayName": format!("{}, {}", last_name, first_name),
        "email": email,
        "phone": phone,
        "createdAt": created_at
    }))
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
    let search = match optional_str(req, "search") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let like = search
        .as_ref()
        .map(|s| format!("%{}%", s.to_ascii_lowercase()));
    let total: i64 = match conn.query_row(
        "SELECT COUNT(*) FROM guests
         WHERE ?1 IS NULL
            OR lower(first_name) LIKE ?1
            OR lower(last_name) LIKE ?1
            OR lower(COALESCE(email, '')) LIKE ?1",
        [&like],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, first_name, last_name, email, phone, created_at
         FROM guests
         WHERE ?1 IS NULL
            OR lower(first_name) LIKE ?1
            OR lower(last_name) LIKE ?1
            OR lower(COALESCE(email, '')) LIKE ?1
         ORDER BY last_name, first_name
         LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(
            (&like, limit as i64, page_offset(page, limit) as i64),
            guest_row_json,
        )
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(items) => ok(
            &req.id,
            json!({ "items": items, "meta": list_meta(page, limit, total as usize) }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let guest_id = match required_str(req, "guestId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn
        .query_row(
            "SELECT id, first_name, last_name, email, phone, created_at
             FROM guests WHERE id = ?",
            [&guest_id],
            guest_row_json,
        )
        .optional()
    {
        Ok(Some(guest)) => ok(&req.id, guest),
        Ok(None) => err(&req.id, "not_found", "guest not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let first_name = match required_str(req, "firstName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let last_name = match required_str(req, "lastName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let email = match optional_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let phone = match optional_str(req, "phone") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let guest_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO guests(id, first_name, last_name, email, phone, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &guest_id,
            &first_name,
            &last_name,
            &email,
            &phone,
            db::now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "guests" })),
        );
    }

    db::log_activity(
        conn,
        "create",
        "guest",
        &guest_id,
        &format!("{}, {}", last_name, first_name),
    );
    match conn.query_row(
        "SELECT id, first_name, last_name, email, phone, created_at FROM guests WHERE id = ?",
        [&guest_id],
        guest_row_json,
    ) {
        Ok(guest) => ok(&req.id, guest),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let guest_id = match required_str(req, "guestId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let first_name = match required_str(req, "firstName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let last_name = match required_str(req, "lastName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let email = match optional_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let phone = match optional_str(req, "phone") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM guests WHERE id = ?", [&guest_id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "guest not found", None);
    }

    if let Err(e) = conn.execute(
        "UPDATE guests SET first_name = ?, last_name = ?, email = ?, phone = ? WHERE id = ?",
        (&first_name, &last_name, &email, &phone, &guest_id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "guests" })),
        );
    }

    db::log_activity(
        conn,
        "update",
        "guest",
        &guest_id,
        &format!("{}, {}", last_name, first_name),
    );
    match conn.query_row(
        "SELECT id, first_name, last_name, email, phone, created_at FROM guests WHERE id = ?",
        [&guest_id],
        guest_row_json,
    ) {
        Ok(guest) => ok(&req.id, guest),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let guest_id = match required_str(req, "guestId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM guests WHERE id = ?", [&guest_id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "guest not found", None);
    }

    let booked: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM bookings WHERE guest_id = ? LIMIT 1",
            [&guest_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if booked.is_some() {
        return err(
            &req.id,
            "in_use",
            "guest has bookings and cannot be deleted",
            Some(json!({ "referencedBy": "bookings" })),
        );
    }

    if let Err(e) = conn.execute("DELETE FROM guests WHERE id = ?", [&guest_id]) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "guests" })),
        );
    }

    db::log_activity(conn, "delete", "guest", &guest_id, "");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "guests.list" => Some(handle_list(state, req)),
        "guests.get" => Some(handle_get(state, req)),
        "guests.create" => Some(handle_create(state, req)),
        "guests.update" => Some(handle_update(state, req)),
        "guests.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
