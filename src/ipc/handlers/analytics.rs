use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use crate::revenue;

fn handle_revenue(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = match revenue::parse_revenue_query(&req.params) {
        Ok(q) => q,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };
    match revenue::compute_revenue(conn, &query) {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(v) => ok(&req.id, v),
            Err(e) => err(&req.id, "internal", e.to_string(), None),
        },
        Err(e) => err(&req.id, &e.code, e.message, e.details),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.revenue" => Some(handle_revenue(state, req)),
        _ => None,
    }
}
