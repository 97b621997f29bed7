use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, list_meta, optional_str, page_offset, parse_limit, parse_page, required_str,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

const ROOM_SELECT: &str = "SELECT r.id, r.number, r.created_at,
       rc.id, rc.name, rc.base_price,
       f.id, f.number,
       rs.id, rs.name
 FROM rooms r
 JOIN room_classes rc ON rc.id = r.room_class_id
 JOIN floors f ON f.id = r.floor_id
 JOIN room_statuses rs ON rs.id = r.room_status_id";

fn room_row_json(r: &rusqlite::Row<'_>) -> Result<serde_json::Value, rusqlite::Error> {
    let id: String = r.get(0)?;
    let number: String = r.get(1)?;
    let created_at: String = r.get(2)?;
    let class_id: String = r.get(3)?;
    let class_name: String = r.get(4)?;
    let base_price: f64 = r.get(5)?;
    let floor_id: String = r.get(6)?;
    let floor_number: i64 = r.get(7)?;
    let status_id: String = r.get(8)?;
    let status_name: String = r.get(9)?;
    Ok(json!({
        "id": id,
        "number": number,
        "createdAt": created_at,
        "roomClass": { "id": class_id, "name": class_name, "basePrice": base_price },
        "floor": { "id": floor_id, "number": floor_number },
        "roomStatus": { "id": status_id, "name": status_name }
    }))
}

fn reference_ok(
    conn: &Connection,
    table: &str,
    id: &str,
) -> Result<bool, rusqlite::Error> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    Ok(conn
        .query_row(&sql, [id], |r| r.get::<_, i64>(0))
        .optional()?
        .is_some())
}

fn check_references(
    conn: &Connection,
    req: &Request,
    room_class_id: &str,
    floor_id: &str,
    room_status_id: &str,
) -> Result<(), serde_json::Value> {
    for (table, id, label) in [
        ("room_classes", room_class_id, "roomClassId"),
        ("floors", floor_id, "floorId"),
        ("room_statuses", room_status_id, "roomStatusId"),
    ] {
        match reference_ok(conn, table, id) {
            Ok(true) => {}
            Ok(false) => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("unknown {}", label),
                    Some(json!({ label: id })),
                ))
            }
            Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        }
    }
    Ok(())
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

    let mut where_clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(s) = search.as_ref() {
        where_clauses.push("lower(r.number) LIKE ?");
        values.push(Value::Text(format!("%{}%", s.to_ascii_lowercase())));
    }
    for (param, clause) in [
        ("floorId", "r.floor_id = ?"),
        ("roomStatusId", "r.room_status_id = ?"),
        ("roomClassId", "r.room_class_id = ?"),
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

    let count_sql = format!(
        "SELECT COUNT(*) FROM rooms r
         JOIN room_classes rc ON rc.id = r.room_class_id
         JOIN floors f ON f.id = r.floor_id
         JOIN room_statuses rs ON rs.id = r.room_status_id{}",
        where_sql
    );
    let total: i64 = match conn.query_row(&count_sql, params_from_iter(values.clone()), |r| r.get(0))
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let list_sql = format!(
        "{}{} ORDER BY r.number LIMIT ? OFFSET ?",
        ROOM_SELECT, where_sql
    );
    values.push(Value::Integer(limit as i64));
    values.push(Value::Integer(page_offset(page, limit) as i64));

    let mut stmt = match conn.prepare(&list_sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(values), room_row_json)
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
    let room_id = match required_str(req, "roomId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let sql = format!("{} WHERE r.id = ?", ROOM_SELECT);
    match conn.query_row(&sql, [&room_id], room_row_json).optional() {
        Ok(Some(room)) => ok(&req.id, room),
        Ok(None) => err(&req.id, "not_found", "room not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let number = match required_str(req, "number") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_class_id = match required_str(req, "roomClassId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let floor_id = match required_str(req, "floorId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_status_id = match required_str(req, "roomStatusId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    if let Err(e) = check_references(conn, req, &room_class_id, &floor_id, &room_status_id) {
        return e;
    }

    let room_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO rooms(id, number, room_class_id, floor_id, room_status_id, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &room_id,
            &number,
            &room_class_id,
            &floor_id,
            &room_status_id,
            db::now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "rooms" })),
        );
    }

    db::log_activity(conn, "create", "room", &room_id, &format!("room {}", number));
    let sql = format!("{} WHERE r.id = ?", ROOM_SELECT);
    match conn.query_row(&sql, [&room_id], room_row_json) {
        Ok(room) => ok(&req.id, room),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_id = match required_str(req, "roomId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let number = match required_str(req, "number") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_class_id = match required_str(req, "roomClassId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let floor_id = match required_str(req, "floorId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_status_id = match required_str(req, "roomStatusId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match reference_ok(conn, "rooms", &room_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "room not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    if let Err(e) = check_references(conn, req, &room_class_id, &floor_id, &room_status_id) {
        return e;
    }

    if let Err(e) = conn.execute(
        "UPDATE rooms SET number = ?, room_class_id = ?, floor_id = ?, room_status_id = ?
         WHERE id = ?",
        (&number, &room_class_id, &floor_id, &room_status_id, &room_id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "rooms" })),
        );
    }

    db::log_activity(conn, "update", "room", &room_id, &format!("room {}", number));
    let sql = format!("{} WHERE r.id = ?", ROOM_SELECT);
    match conn.query_row(&sql, [&room_id], room_row_json) {
        Ok(room) => ok(&req.id, room),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_id = match required_str(req, "roomId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_status_id = match required_str(req, "roomStatusId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match reference_ok(conn, "rooms", &room_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "room not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    match reference_ok(conn, "room_statuses", &room_status_id) {
        Ok(true) => {}
        Ok(false) => {
            return err(
                &req.id,
                "bad_params",
                "unknown roomStatusId",
                Some(json!({ "roomStatusId": room_status_id })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    if let Err(e) = conn.execute(
        "UPDATE rooms SET room_status_id = ? WHERE id = ?",
        (&room_status_id, &room_id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "rooms" })),
        );
    }

    db::log_activity(conn, "set_status", "room", &room_id, &room_status_id);
    let sql = format!("{} WHERE r.id = ?", ROOM_SELECT);
    match conn.query_row(&sql, [&room_id], room_row_json) {
        Ok(room) => ok(&req.id, room),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_id = match required_str(req, "roomId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match reference_ok(conn, "rooms", &room_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "room not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let booked: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM booking_rooms WHERE room_id = ? LIMIT 1",
            [&room_id],
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
            "room has bookings and cannot be deleted",
            Some(json!({ "referencedBy": "booking_rooms" })),
        );
    }

    if let Err(e) = conn.execute("DELETE FROM rooms WHERE id = ?", [&room_id]) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "rooms" })),
        );
    }

    db::log_activity(conn, "delete", "room", &room_id, "");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rooms.list" => Some(handle_list(state, req)),
        "rooms.get" => Some(handle_get(state, req)),
        "rooms.create" => Some(handle_create(state, req)),
        "rooms.update" => Some(handle_update(state, req)),
        "rooms.setStatus" => Some(handle_set_status(state, req)),
        "rooms.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
