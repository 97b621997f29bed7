use chrono::{DateTime, Utc};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AvailabilityError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// A committed stay that intersects the candidate interval.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConflict {
    pub room_id: String,
    pub room_number: String,
    pub booking_id: String,
    pub checkin: String,
    pub checkout: String,
}

pub fn parse_instant(raw: &str, field: &str) -> Result<DateTime<Utc>, AvailabilityError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            AvailabilityError::new(
                "bad_params",
                format!("{} must be an RFC 3339 instant", field),
            )
        })
}

/// Half-open interval intersection: `[a_start, a_end)` vs `[b_start, b_end)`.
/// Touching intervals (checkout == next checkin) do not overlap, so
/// back-to-back bookings on the same room are allowed.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Returns every committed stay on the given rooms that overlaps the
/// candidate interval, excluding `exclude_booking_id` when editing an
/// existing booking. An empty result means all rooms are free.
///
/// The SQL mirrors the overlap predicate so the set of candidate rows is
/// already filtered server-side; `intervals_overlap` is kept as the single
/// source of truth for the comparison on the parsed instants.
pub fn find_conflicts(
    conn: &Connection,
    room_ids: &[String],
    checkin: DateTime<Utc>,
    checkout: DateTime<Utc>,
    exclude_booking_id: Option<&str>,
) -> Result<Vec<RoomConflict>, AvailabilityError> {
    if room_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat("?")
        .take(room_ids.len())
        .collect::<Vec<_>>()
        .join(",");
    let mut sql = format!(
        "SELECT br.room_id, r.number, b.id, b.checkin, b.checkout
         FROM booking_rooms br
         JOIN bookings b ON b.id = br.booking_id
         JOIN rooms r ON r.id = br.room_id
         WHERE br.room_id IN ({})
           AND b.checkin < ? AND b.checkout > ?",
        placeholders
    );
    let mut values: Vec<Value> = Vec::with_capacity(room_ids.len() + 3);
    for id in room_ids {
        values.push(Value::Text(id.clone()));
    }
    values.push(Value::Text(checkout.to_rfc3339()));
    values.push(Value::Text(checkin.to_rfc3339()));
    if let Some(excluded) = exclude_booking_id {
        sql.push_str(" AND b.id != ?");
        values.push(Value::Text(excluded.to_string()));
    }
    sql.push_str(" ORDER BY r.number, b.checkin");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AvailabilityError::new("db_query_failed", e.to_string()))?;
    let rows = stmt
        .query_map(params_from_iter(values), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AvailabilityError::new("db_query_failed", e.to_string()))?;

    let mut conflicts = Vec::new();
    for (room_id, room_number, booking_id, existing_in, existing_out) in rows {
        // Stored instants were validated on the way in; rows that fail to
        // parse are treated as conflicting rather than silently free.
        let parsed = parse_instant(&existing_in, "checkin")
            .and_then(|ci| parse_instant(&existing_out, "checkout").map(|co| (ci, co)));
        let overlapping = match parsed {
            Ok((ci, co)) => intervals_overlap(checkin, checkout, ci, co),
            Err(_) => true,
        };
        if overlapping {
            conflicts.push(RoomConflict {
                room_id,
                room_number,
                booking_id,
                checkin: existing_in,
                checkout: existing_out,
            });
        }
    }
    Ok(conflicts)
}
