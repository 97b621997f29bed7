use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("hotel.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS floors(
            id TEXT PRIMARY KEY,
            number INTEGER NOT NULL UNIQUE,
            name TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bed_types(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS features(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS room_statuses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS payment_statuses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS room_classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            base_price REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS room_class_features(
            room_class_id TEXT NOT NULL,
            feature_id TEXT NOT NULL,
            PRIMARY KEY(room_class_id, feature_id),
            FOREIGN KEY(room_class_id) REFERENCES room_classes(id),
            FOREIGN KEY(feature_id) REFERENCES features(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS room_class_bed_types(
            room_class_id TEXT NOT NULL,
            bed_type_id TEXT NOT NULL,
            count INTEGER NOT NULL,
            PRIMARY KEY(room_class_id, bed_type_id),
            FOREIGN KEY(room_class_id) REFERENCES room_classes(id),
            FOREIGN KEY(bed_type_id) REFERENCES bed_types(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rooms(
            id TEXT PRIMARY KEY,
            number TEXT NOT NULL UNIQUE,
            room_class_id TEXT NOT NULL,
            floor_id TEXT NOT NULL,
            room_status_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(room_class_id) REFERENCES room_classes(id),
            FOREIGN KEY(floor_id) REFERENCES floors(id),
            FOREIGN KEY(room_status_id) REFERENCES room_statuses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rooms_room_class ON rooms(room_class_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rooms_floor ON rooms(floor_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS guests(
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS addons(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            price REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bookings(
            id TEXT PRIMARY KEY,
            guest_id TEXT NOT NULL,
            payment_status_id TEXT NOT NULL,
            checkin TEXT NOT NULL,
            checkout TEXT NOT NULL,
            adults INTEGER NOT NULL,
            children INTEGER NOT NULL DEFAULT 0,
            total_amount REAL NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(guest_id) REFERENCES guests(id),
            FOREIGN KEY(payment_status_id) REFERENCES payment_statuses(id)
        )",
        [],
    )?;
    // Older workspaces predate the children column. Add it if needed.
    ensure_bookings_children(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bookings_guest ON bookings(guest_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bookings_payment_status ON bookings(payment_status_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bookings_checkin ON bookings(checkin)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS booking_rooms(
            booking_id TEXT NOT NULL,
            room_id TEXT NOT NULL,
            PRIMARY KEY(booking_id, room_id),
            FOREIGN KEY(booking_id) REFERENCES bookings(id),
            FOREIGN KEY(room_id) REFERENCES rooms(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_booking_rooms_room ON booking_rooms(room_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS booking_addons(
            booking_id TEXT NOT NULL,
            addon_id TEXT NOT NULL,
            PRIMARY KEY(booking_id, addon_id),
            FOREIGN KEY(booking_id) REFERENCES bookings(id),
            FOREIGN KEY(addon_id) REFERENCES addons(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_booking_addons_addon ON booking_addons(addon_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activity_logs(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            entity TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            detail TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_activity_logs_entity ON activity_logs(entity)",
        [],
    )?;

    seed_lookup(&conn, "room_statuses", &[
        "available",
        "occupied",
        "maintenance",
        "out_of_service",
    ])?;
    seed_lookup(&conn, "payment_statuses", &[
        "paid",
        "partially_paid",
        "unpaid",
        "cancelled",
    ])?;

    Ok(conn)
}

fn seed_lookup(conn: &Connection, table: &str, names: &[&str]) -> anyhow::Result<()> {
    let sql = format!("INSERT OR IGNORE INTO {}(id, name) VALUES(?, ?)", table);
    for name in names {
        conn.execute(&sql, (Uuid::new_v4().to_string(), name))?;
    }
    Ok(())
}

fn ensure_bookings_children(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "bookings", "children")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE bookings ADD COLUMN children INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Best-effort audit trail; a failed log insert must not fail the mutation.
pub fn log_activity(conn: &Connection, action: &str, entity: &str, entity_id: &str, detail: &str) {
    let res = conn.execute(
        "INSERT INTO activity_logs(action, entity, entity_id, detail, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (action, entity, entity_id, detail, now_rfc3339()),
    );
    if let Err(e) = res {
        log::warn!("activity log insert failed: {}", e);
    }
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
