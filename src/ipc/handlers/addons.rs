use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, list_meta, optional_str, page_offset, parse_limit, parse_page, required_f64,
    required_str,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn addon_row_json(r: &rusqlite::Row<'_>) -> Result<serde_json::Value, rusqlite::Error> {
    let id: String = r.get(0)?;
    let name: String = r.get(1)?;
    let price: f64 = r.get(2)?;
    Ok(json!({ "id": id, "name": name, "price": price }))
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
        "SELECT COUNT(*) FROM addons WHERE ?1 IS NULL OR lower(name) LIKE ?1",
        [&like],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, name, price
         FROM addons
         WHERE ?1 IS NULL OR lower(name) LIKE ?1
         ORDER BY name
         LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(
            (&like, limit as i64, page_offset(page, limit) as i64),
            addon_row_json,
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
    let addon_id = match required_str(req, "addonId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn
        .query_row(
            "SELECT id, name, price FROM addons WHERE id = ?",
            [&addon_id],
            addon_row_json,
        )
        .optional()
    {
        Ok(Some(addon)) => ok(&req.id, addon),
        Ok(None) => err(&req.id, "not_found", "addon not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let price = match required_f64(req, "price") {
        Ok(v) if v >= 0.0 => v,
        Ok(_) => return err(&req.id, "bad_params", "price must be >= 0", None),
        Err(e) => return e,
    };

    let addon_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO addons(id, name, price) VALUES(?, ?, ?)",
        (&addon_id, &name, price),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "addons" })),
        );
    }

    db::log_activity(conn, "create", "addon", &addon_id, &name);
    ok(&req.id, json!({ "id": addon_id, "name": name, "price": price }))
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let addon_id = match required_str(req, "addonId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let price = match required_f64(req, "price") {
        Ok(v) if v >= 0.0 => v,
        Ok(_) => return err(&req.id, "bad_params", "price must be >= 0", None),
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM addons WHERE id = ?", [&addon_id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "addon not found", None);
    }

    if let Err(e) = conn.execute(
        "UPDATE addons SET name = ?, price = ? WHERE id = ?",
        (&name, price, &addon_id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "addons" })),
        );
    }

    db::log_activity(conn, "update", "addon", &addon_id, &name);
    ok(&req.id, json!({ "id": addon_id, "name": name, "price": price }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let addon_id = match required_str(req, "addonId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM addons WHERE id = ?", [&addon_id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "addon not found", None);
    }

    let referenced: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM booking_addons WHERE addon_id = ? LIMIT 1",
            [&addon_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if referenced.is_some() {
        return err(
            &req.id,
            "in_use",
            "addon is attached to bookings and cannot be deleted",
            Some(json!({ "referencedBy": "booking_addons" })),
        );
    }

    if let Err(e) = conn.execute("DELETE FROM addons WHERE id = ?", [&addon_id]) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "addons" })),
        );
    }

    db::log_activity(conn, "delete", "addon", &addon_id, "");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "addons.list" => Some(handle_list(state, req)),
        "addons.get" => Some(handle_get(state, req)),
        "addons.create" => Some(handle_create(state, req)),
        "addons.update" => Some(handle_update(state, req)),
        "addons.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
