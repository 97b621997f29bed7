use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("{} must be string or null", key),
                    None,
                ));
            };
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_f64(req: &Request, key: &str) -> Result<Option<f64>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a number", key),
                None,
            )
        }),
    }
}

/// Deduplicated list of non-empty string ids, in request order.
pub fn id_array(req: &Request, key: &str) -> Result<Option<Vec<String>>, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Ok(None);
    };
    if raw.is_null() {
        return Ok(None);
    }
    let Some(arr) = raw.as_array() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an array of ids", key),
            None,
        ));
    };
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for v in arr {
        let Some(id) = v.as_str() else {
            return Err(err(
                &req.id,
                "bad_params",
                format!("{} must contain only strings", key),
                None,
            ));
        };
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(err(
                &req.id,
                "bad_params",
                format!("{} must not contain empty ids", key),
                None,
            ));
        }
        let owned = trimmed.to_string();
        if seen.insert(owned.clone()) {
            out.push(owned);
        }
    }
    Ok(Some(out))
}

pub fn parse_page(req: &Request) -> Result<usize, serde_json::Value> {
    let Some(value) = req.params.get("page") else {
        return Ok(1);
    };
    let Some(page) = value.as_u64() else {
        return Err(err(&req.id, "bad_params", "page must be a positive integer", None));
    };
    if page == 0 {
        return Err(err(&req.id, "bad_params", "page must be >= 1", None));
    }
    Ok(page as usize)
}

pub fn parse_limit(req: &Request) -> Result<usize, serde_json::Value> {
    let Some(value) = req.params.get("limit") else {
        return Ok(20);
    };
    let Some(limit) = value.as_u64() else {
        return Err(err(&req.id, "bad_params", "limit must be a positive integer", None));
    };
    if limit == 0 || limit > 100 {
        return Err(err(&req.id, "bad_params", "limit must be in range 1..=100", None));
    }
    Ok(limit as usize)
}

pub fn list_meta(page: usize, limit: usize, total: usize) -> serde_json::Value {
    let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
    json!({
        "page": page,
        "limit": limit,
        "total": total,
        "totalPages": total_pages
    })
}

pub fn page_offset(page: usize, limit: usize) -> usize {
    page.saturating_sub(1) * limit
}
