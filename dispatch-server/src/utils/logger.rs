//! Logging Infrastructure
//!
//! Structured logging for development and production.
//! - Daily rotating application logs (deleted after 14 days)
//! - Permanent audit logs for dispatch decisions and ledger movements
//! - Permanent security logs for rejected callers

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, filter::filter_fn, fmt, prelude::*};

/// Application logs older than this are removed
pub const APP_LOG_RETENTION_DAYS: i64 = 14;

/// Delete `app.YYYY-MM-DD` files older than the retention window
///
/// Audit and security logs are never touched. Returns the number of files
/// removed.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);
    let mut removed = 0;

    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date) = name
            .strip_prefix("app.")
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            continue;
        };
        if date < cutoff {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }

    Ok(removed)
}

/// Initialize the logging system with daily rotating logs
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug", "warn")
/// * `json_format` - JSON console output (production) or pretty (development)
/// * `log_dir` - Optional directory for file logging (e.g., `Some("./work_dir/logs")`)
///
/// `RUST_LOG`, when set, overrides `level`.
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let files = match log_dir {
        Some(dir) => Some(file_layers(dir)?),
        None => None,
    };

    // File layers are typed against the bare registry
    tracing_subscriber::registry()
        .with(files)
        .with(env_filter)
        .with(console_layer)
        .try_init()?;

    Ok(())
}

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// `app`, `audit` and `security` file layers split by target
fn file_layers(log_dir: &Path) -> anyhow::Result<Vec<BoxedLayer>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    for (name, wants) in [
        ("app", (|t: &str| t != "audit" && t != "security") as fn(&str) -> bool),
        ("audit", |t: &str| t == "audit"),
        ("security", |t: &str| t == "security"),
    ] {
        let dir = log_dir.join(name);
        fs::create_dir_all(&dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, name);
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(appender))
                .with_filter(filter_fn(move |meta| wants(meta.target())))
                .boxed(),
        );
    }

    Ok(layers)
}

/// Console only
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Audit log helper - records dispatch decisions and ledger movements
///
/// Written to the permanent `audit` log files.
///
/// ```ignore
/// audit_log!("admin-1", "order.assign", "order-42", "d7");
/// audit_log!("d7", "wallet.withdraw", tx_id, format!("debit {}", amount));
/// ```
#[macro_export]
macro_rules! audit_log {
    ($user_id:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            user_id = %$user_id,
            action = %$action,
            resource = %$resource,
            timestamp = %chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
    ($user_id:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            user_id = %$user_id,
            action = %$action,
            resource = %$resource,
            details = %$details,
            timestamp = %chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
}

/// Security log helper - records rejected or suspicious callers
///
/// ```ignore
/// security_log!(WARN, "role_denied", user_id = %user.user_id, required = "admin");
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = %chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(
            target: "security",
            event = $event,
            timestamp = %chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = %chrono::Local::now().to_rfc3339(),
            $($arg)*
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_old_logs() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("app");
        fs::create_dir_all(&app_dir).unwrap();

        let today = chrono::Local::now().date_naive();
        let old = today - chrono::Duration::days(30);
        let recent = today - chrono::Duration::days(2);
        fs::write(app_dir.join(format!("app.{}", old.format("%Y-%m-%d"))), "old").unwrap();
        fs::write(app_dir.join(format!("app.{}", recent.format("%Y-%m-%d"))), "new").unwrap();
        fs::write(app_dir.join("notes.txt"), "keep").unwrap();

        let audit_dir = dir.path().join("audit");
        fs::create_dir_all(&audit_dir).unwrap();
        fs::write(audit_dir.join(format!("audit.{}", old.format("%Y-%m-%d"))), "keep").unwrap();

        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 1);
        assert_eq!(fs::read_dir(&app_dir).unwrap().count(), 2);
        assert_eq!(fs::read_dir(&audit_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_cleanup_without_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("missing")).unwrap(), 0);
    }
}
