mod availability;
mod backup;
mod db;
mod ipc;
mod revenue;

use std::io::{self, BufRead, Write};

fn main() {
    // Logs go to stderr; stdout is reserved for the response stream.
    env_logger::init();

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
    };

    log::info!("hoteld {} ready", env!("CARGO_PKG_VERSION"));

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; emit a bare protocol error. The
                // serde message may contain quotes, so this goes through the
                // serializer like every other response line.
                log::warn!("unparseable request line: {}", e);
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
