use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

/// Name-keyed lookup tables share one CRUD surface; floors carry a numeric
/// level and are handled on their own below.
struct LookupKind {
    prefix: &'static str,
    table: &'static str,
    entity: &'static str,
    id_param: &'static str,
    // (table, column) pairs that make a row undeletable while referenced
    refs: &'static [(&'static str, &'static str)],
}

const KINDS: &[LookupKind] = &[
    LookupKind {
        prefix: "bedTypes.",
        table: "bed_types",
        entity: "bed_type",
        id_param: "bedTypeId",
        refs: &[("room_class_bed_types", "bed_type_id")],
    },
    LookupKind {
        prefix: "features.",
        table: "features",
        entity: "feature",
        id_param: "featureId",
        refs: &[("room_class_features", "feature_id")],
    },
    LookupKind {
        prefix: "roomStatuses.",
        table: "room_statuses",
        entity: "room_status",
        id_param: "roomStatusId",
        refs: &[("rooms", "room_status_id")],
    },
    LookupKind {
        prefix: "paymentStatuses.",
        table: "payment_statuses",
        entity: "payment_status",
        id_param: "paymentStatusId",
        refs: &[("bookings", "payment_status_id")],
    },
];

fn row_exists(
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

fn is_referenced(
    conn: &Connection,
    refs: &[(&str, &str)],
    id: &str,
) -> Result<Option<String>, rusqlite::Error> {
    for (table, column) in refs {
        let sql = format!("SELECT 1 FROM {} WHERE {} = ? LIMIT 1", table, column);
        let hit = conn
            .query_row(&sql, [id], |r| r.get::<_, i64>(0))
            .optional()?;
        if hit.is_some() {
            return Ok(Some((*table).to_string()));
        }
    }
    Ok(None)
}

fn handle_list(kind: &LookupKind, state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let sql = format!("SELECT id, name FROM {} ORDER BY name", kind.table);
    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(json!({ "id": id, "name": name }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(items) => ok(&req.id, json!({ "items": items })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_create(kind: &LookupKind, state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let id = Uuid::new_v4().to_string();
    let sql = format!("INSERT INTO {}(id, name) VALUES(?, ?)", kind.table);
    if let Err(e) = conn.execute(&sql, (&id, &name)) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": kind.table })),
        );
    }
    db::log_activity(conn, "create", kind.entity, &id, &name);
    ok(&req.id, json!({ "id": id, "name": name }))
}

fn handle_update(kind: &LookupKind, state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, kind.id_param) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match row_exists(conn, kind.table, &id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", format!("{} not found", kind.entity), None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let sql = format!("UPDATE {} SET name = ? WHERE id = ?", kind.table);
    if let Err(e) = conn.execute(&sql, (&name, &id)) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": kind.table })),
        );
    }
    db::log_activity(conn, "update", kind.entity, &id, &name);
    ok(&req.id, json!({ "id": id, "name": name }))
}

fn handle_delete(kind: &LookupKind, state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, kind.id_param) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match row_exists(conn, kind.table, &id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", format!("{} not found", kind.entity), None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    match is_referenced(conn, kind.refs, &id) {
        Ok(Some(table)) => {
            return err(
                &req.id,
                "in_use",
                format!("{} is referenced and cannot be deleted", kind.entity),
                Some(json!({ "referencedBy": table })),
            )
        }
        Ok(None) => {}
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let sql = format!("DELETE FROM {} WHERE id = ?", kind.table);
    if let Err(e) = conn.execute(&sql, [&id]) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": kind.table })),
        );
    }
    db::log_activity(conn, "delete", kind.entity, &id, "");
    ok(&req.id, json!({ "ok": true }))
}

fn handle_floors_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut stmt = match conn.prepare(
        "SELECT f.id, f.number, f.name,
           (SELECT COUNT(*) FROM rooms r WHERE r.floor_id = f.id) AS room_count
         FROM floors f
         ORDER BY f.number",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let number: i64 = row.get(1)?;
            let name: Option<String> = row.get(2)?;
            let room_count: i64 = row.get(3)?;
            Ok(json!({
                "id": id,
                "number": number,
                "name": name,
                "roomCount": room_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(items) => ok(&req.id, json!({ "items": items })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_floors_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(number) = req.params.get("number").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing number", None);
    };
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO floors(id, number, name) VALUES(?, ?, ?)",
        (&id, number, &name),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "floors" })),
        );
    }
    db::log_activity(conn, "create", "floor", &id, &format!("floor {}", number));
    ok(&req.id, json!({ "id": id, "number": number, "name": name }))
}

fn handle_floors_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "floorId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(number) = req.params.get("number").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing number", None);
    };
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    match row_exists(conn, "floors", &id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "floor not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    if let Err(e) = conn.execute(
        "UPDATE floors SET number = ?, name = ? WHERE id = ?",
        (number, &name, &id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "floors" })),
        );
    }
    db::log_activity(conn, "update", "floor", &id, &format!("floor {}", number));
    ok(&req.id, json!({ "id": id, "number": number, "name": name }))
}

fn handle_floors_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "floorId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match row_exists(conn, "floors", &id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "floor not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    match is_referenced(conn, &[("rooms", "floor_id")], &id) {
        Ok(Some(table)) => {
            return err(
                &req.id,
                "in_use",
                "floor is referenced and cannot be deleted",
                Some(json!({ "referencedBy": table })),
            )
        }
        Ok(None) => {}
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    if let Err(e) = conn.execute("DELETE FROM floors WHERE id = ?", [&id]) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "floors" })),
        );
    }
    db::log_activity(conn, "delete", "floor", &id, "");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    for kind in KINDS {
        if let Some(op) = req.method.strip_prefix(kind.prefix) {
            return match op {
                "list" => Some(handle_list(kind, state, req)),
                "create" => Some(handle_create(kind, state, req)),
                "update" => Some(handle_update(kind, state, req)),
                "delete" => Some(handle_delete(kind, state, req)),
                _ => None,
            };
        }
    }

    match req.method.as_str() {
        "floors.list" => Some(handle_floors_list(state, req)),
        "floors.create" => Some(handle_floors_create(state, req)),
        "floors.update" => Some(handle_floors_update(state, req)),
        "floors.delete" => Some(handle_floors_delete(state, req)),
        _ => None,
    }
}
