use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, list_meta, optional_str, page_offset, parse_limit, parse_page};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

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
    let entity = match optional_str(req, "entity") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let total: i64 = match conn.query_row(
        "SELECT COUNT(*) FROM activity_logs WHERE ?1 IS NULL OR entity = ?1",
        [&entity],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, action, entity, entity_id, detail, created_at
         FROM activity_logs
         WHERE ?1 IS NULL OR entity = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(
            (&entity, limit as i64, page_offset(page, limit) as i64),
            |r| {
                let id: i64 = r.get(0)?;
                let action: String = r.get(1)?;
                let entity: String = r.get(2)?;
                let entity_id: String = r.get(3)?;
                let detail: String = r.get(4)?;
                let created_at: String = r.get(5)?;
                Ok(json!({
                    "id": id,
                    "action": action,
                    "entity": entity,
                    "entityId": entity_id,
                    "detail": detail,
                    "createdAt": created_at
                }))
            },
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

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "activity.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
