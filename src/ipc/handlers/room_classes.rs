use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, id_array, list_meta, optional_str, page_offset, parse_limit, parse_page, required_f64,
    required_str,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct BedTypeAttach {
    bed_type_id: String,
    count: i64,
}

fn parse_bed_types(req: &Request) -> Result<Option<Vec<BedTypeAttach>>, serde_json::Value> {
    let Some(raw) = req.params.get("bedTypes") else {
        return Ok(None);
    };
    if raw.is_null() {
        return Ok(None);
    }
    let Some(arr) = raw.as_array() else {
        return Err(err(
            &req.id,
            "bad_params",
            "bedTypes must be an array of { bedTypeId, count }",
            None,
        ));
    };
    let mut out = Vec::new();
    for v in arr {
        let Some(bed_type_id) = v.get("bedTypeId").and_then(|b| b.as_str()) else {
            return Err(err(&req.id, "bad_params", "bedTypes entry missing bedTypeId", None));
        };
        let Some(count) = v.get("count").and_then(|c| c.as_i64()) else {
            return Err(err(&req.id, "bad_params", "bedTypes entry missing count", None));
        };
        if count <= 0 {
            return Err(err(&req.id, "bad_params", "bedTypes count must be >= 1", None));
        }
        out.push(BedTypeAttach {
            bed_type_id: bed_type_id.to_string(),
            count,
        });
    }
    Ok(Some(out))
}

fn unknown_ids(
    conn: &Connection,
    table: &str,
    ids: &[String],
) -> Result<Vec<String>, rusqlite::Error> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let mut missing = Vec::new();
    for id in ids {
        let hit = conn
            .query_row(&sql, [id], |r| r.get::<_, i64>(0))
            .optional()?;
        if hit.is_none() {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}

fn class_features_json(
    conn: &Connection,
    room_class_id: &str,
) -> Result<Vec<serde_json::Value>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.name
         FROM room_class_features rcf
         JOIN features f ON f.id = rcf.feature_id
         WHERE rcf.room_class_id = ?
         ORDER BY f.name",
    )?;
    stmt.query_map([room_class_id], |r| {
        let id: String = r.get(0)?;
        let name: String = r.get(1)?;
        Ok(json!({ "id": id, "name": name }))
    })
    .and_then(|it| it.collect())
}

fn class_bed_types_json(
    conn: &Connection,
    room_class_id: &str,
) -> Result<Vec<serde_json::Value>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT bt.id, bt.name, rcbt.count
         FROM room_class_bed_types rcbt
         JOIN bed_types bt ON bt.id = rcbt.bed_type_id
         WHERE rcbt.room_class_id = ?
         ORDER BY bt.name",
    )?;
    stmt.query_map([room_class_id], |r| {
        let id: String = r.get(0)?;
        let name: String = r.get(1)?;
        let count: i64 = r.get(2)?;
        Ok(json!({ "id": id, "name": name, "count": count }))
    })
    .and_then(|it| it.collect())
}

fn class_json(
    conn: &Connection,
    id: &str,
    name: &str,
    base_price: f64,
) -> Result<serde_json::Value, rusqlite::Error> {
    let features = class_features_json(conn, id)?;
    let bed_types = class_bed_types_json(conn, id)?;
    Ok(json!({
        "id": id,
        "name": name,
        "basePrice": base_price,
        "features": features,
        "bedTypes": bed_types
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
        "SELECT COUNT(*) FROM room_classes
         WHERE ? IS NULL OR lower(name) LIKE ?",
        (&like, &like),
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, name, base_price,
           (SELECT COUNT(*) FROM rooms r WHERE r.room_class_id = room_classes.id) AS room_count
         FROM room_classes
         WHERE ? IS NULL OR lower(name) LIKE ?
         ORDER BY name
         LIMIT ? OFFSET ?",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(
            (&like, &like, limit as i64, page_offset(page, limit) as i64),
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, f64>(2)?,
                    r.get::<_, i64>(3)?,
                ))
            },
        )
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut items = Vec::with_capacity(rows.len());
    for (id, name, base_price, room_count) in rows {
        let mut item = match class_json(conn, &id, &name, base_price) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        item["roomCount"] = json!(room_count);
        items.push(item);
    }

    ok(
        &req.id,
        json!({ "items": items, "meta": list_meta(page, limit, total as usize) }),
    )
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_class_id = match required_str(req, "roomClassId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let row: Option<(String, f64)> = match conn
        .query_row(
            "SELECT name, base_price FROM room_classes WHERE id = ?",
            [&room_class_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((name, base_price)) = row else {
        return err(&req.id, "not_found", "room class not found", None);
    };

    match class_json(conn, &room_class_id, &name, base_price) {
        Ok(class) => ok(&req.id, class),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn write_attachments(
    conn: &Connection,
    room_class_id: &str,
    feature_ids: Option<&[String]>,
    bed_types: Option<&[BedTypeAttach]>,
    replace: bool,
) -> Result<(), (String, String)> {
    if let Some(ids) = feature_ids {
        if replace {
            conn.execute(
                "DELETE FROM room_class_features WHERE room_class_id = ?",
                [room_class_id],
            )
            .map_err(|e| ("room_class_features".to_string(), e.to_string()))?;
        }
        for feature_id in ids {
            conn.execute(
                "INSERT INTO room_class_features(room_class_id, feature_id) VALUES(?, ?)",
                (room_class_id, feature_id),
            )
            .map_err(|e| ("room_class_features".to_string(), e.to_string()))?;
        }
    }
    if let Some(beds) = bed_types {
        if replace {
            conn.execute(
                "DELETE FROM room_class_bed_types WHERE room_class_id = ?",
                [room_class_id],
            )
            .map_err(|e| ("room_class_bed_types".to_string(), e.to_string()))?;
        }
        for bed in beds {
            conn.execute(
                "INSERT INTO room_class_bed_types(room_class_id, bed_type_id, count) VALUES(?, ?, ?)",
                (room_class_id, &bed.bed_type_id, bed.count),
            )
            .map_err(|e| ("room_class_bed_types".to_string(), e.to_string()))?;
        }
    }
    Ok(())
}

fn validate_attachment_ids(
    conn: &Connection,
    req: &Request,
    feature_ids: Option<&[String]>,
    bed_types: Option<&[BedTypeAttach]>,
) -> Result<(), serde_json::Value> {
    if let Some(ids) = feature_ids {
        match unknown_ids(conn, "features", ids) {
            Ok(missing) if !missing.is_empty() => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    "featureIds contains unknown feature ids",
                    Some(json!({ "missingFeatureIds": missing })),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        }
    }
    if let Some(beds) = bed_types {
        let ids = beds.iter().map(|b| b.bed_type_id.clone()).collect::<Vec<_>>();
        match unknown_ids(conn, "bed_types", &ids) {
            Ok(missing) if !missing.is_empty() => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    "bedTypes contains unknown bed type ids",
                    Some(json!({ "missingBedTypeIds": missing })),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(err(&req.id, "db_query_failed", e.to_string(), None)),
        }
    }
    Ok(())
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
    let base_price = match required_f64(req, "basePrice") {
        Ok(v) if v >= 0.0 => v,
        Ok(_) => return err(&req.id, "bad_params", "basePrice must be >= 0", None),
        Err(e) => return e,
    };
    let feature_ids = match id_array(req, "featureIds") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let bed_types = match parse_bed_types(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    if let Err(e) = validate_attachment_ids(conn, req, feature_ids.as_deref(), bed_types.as_deref())
    {
        return e;
    }

    let room_class_id = Uuid::new_v4().to_string();
    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    if let Err(e) = tx.execute(
        "INSERT INTO room_classes(id, name, base_price) VALUES(?, ?, ?)",
        (&room_class_id, &name, base_price),
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "room_classes" })),
        );
    }

    if let Err((table, msg)) = write_attachments(
        &tx,
        &room_class_id,
        feature_ids.as_deref(),
        bed_types.as_deref(),
        false,
    ) {
        let _ = tx.rollback();
        return err(&req.id, "db_insert_failed", msg, Some(json!({ "table": table })));
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    db::log_activity(conn, "create", "room_class", &room_class_id, &name);
    match class_json(conn, &room_class_id, &name, base_price) {
        Ok(class) => ok(&req.id, class),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_class_id = match required_str(req, "roomClassId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let base_price = match required_f64(req, "basePrice") {
        Ok(v) if v >= 0.0 => v,
        Ok(_) => return err(&req.id, "bad_params", "basePrice must be >= 0", None),
        Err(e) => return e,
    };
    let feature_ids = match id_array(req, "featureIds") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let bed_types = match parse_bed_types(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM room_classes WHERE id = ?",
            [&room_class_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "room class not found", None);
    }

    if let Err(e) = validate_attachment_ids(conn, req, feature_ids.as_deref(), bed_types.as_deref())
    {
        return e;
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    if let Err(e) = tx.execute(
        "UPDATE room_classes SET name = ?, base_price = ? WHERE id = ?",
        (&name, base_price, &room_class_id),
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "room_classes" })),
        );
    }

    if let Err((table, msg)) = write_attachments(
        &tx,
        &room_class_id,
        feature_ids.as_deref(),
        bed_types.as_deref(),
        true,
    ) {
        let _ = tx.rollback();
        return err(&req.id, "db_update_failed", msg, Some(json!({ "table": table })));
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    db::log_activity(conn, "update", "room_class", &room_class_id, &name);
    match class_json(conn, &room_class_id, &name, base_price) {
        Ok(class) => ok(&req.id, class),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let room_class_id = match required_str(req, "roomClassId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM room_classes WHERE id = ?",
            [&room_class_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "room class not found", None);
    }

    let in_use: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM rooms WHERE room_class_id = ? LIMIT 1",
            [&room_class_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if in_use.is_some() {
        return err(
            &req.id,
            "in_use",
            "room class has rooms and cannot be deleted",
            Some(json!({ "referencedBy": "rooms" })),
        );
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    for table in ["room_class_features", "room_class_bed_types"] {
        let sql = format!("DELETE FROM {} WHERE room_class_id = ?", table);
        if let Err(e) = tx.execute(&sql, [&room_class_id]) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": table })),
            );
        }
    }
    if let Err(e) = tx.execute("DELETE FROM room_classes WHERE id = ?", [&room_class_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "room_classes" })),
        );
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    db::log_activity(conn, "delete", "room_class", &room_class_id, "");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roomClasses.list" => Some(handle_list(state, req)),
        "roomClasses.get" => Some(handle_get(state, req)),
        "roomClasses.create" => Some(handle_create(state, req)),
        "roomClasses.update" => Some(handle_update(state, req)),
        "roomClasses.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
