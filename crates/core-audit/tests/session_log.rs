//! End-to-end audit file behavior: lazy creation, header shape,
//! record escaping, and the numeric round-trip guarantee.

use core_audit::{session_logs, AuditLogger, AuditRecord};

#[test]
fn no_file_until_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let logger = AuditLogger::with_root(true, dir.path());
    assert!(session_logs(dir.path()).is_empty());

    logger.log_put_number("R6", 3.14, "Slider", None);
    let logs = session_logs(dir.path());
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0], logger.log_file_path());
}

#[test]
fn disabled_logger_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let logger = AuditLogger::with_root(false, dir.path());
    logger.log_put("R1", "1", "Slider", None);
    assert!(session_logs(dir.path()).is_empty());
}

#[test]
fn header_and_record_format() {
    let dir = tempfile::tempdir().unwrap();
    let logger = AuditLogger::with_root(true, dir.path());
    logger.log_put_number("R6", 3.14, "Slider", None);
    logger.log_put("SETPOINT", "weird|value\nwith breaks", "TextEntry", Some("main.adl"));

    let content = std::fs::read_to_string(logger.log_file_path()).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("# QtEDM Audit Log"));
    assert!(lines.next().unwrap().starts_with("# Session started: "));
    assert!(lines.next().unwrap().starts_with("# User: "));
    assert_eq!(
        lines.next(),
        Some("# Format: timestamp|user|widgetType|pvName|value|displayFile")
    );
    assert_eq!(lines.next(), Some("#"));

    let first = AuditRecord::parse(lines.next().unwrap()).unwrap();
    assert_eq!(first.widget_type, "Slider");
    assert_eq!(first.pv_name, "R6");
    assert_eq!(first.value.parse::<f64>().unwrap(), 3.14);
    assert_eq!(first.display_file, "-");

    let second = AuditRecord::parse(lines.next().unwrap()).unwrap();
    assert_eq!(second.value, "weird|value\nwith breaks");
    assert_eq!(second.display_file, "main.adl");
    assert!(lines.next().is_none());
}

#[test]
fn records_stay_single_line() {
    let dir = tempfile::tempdir().unwrap();
    let logger = AuditLogger::with_root(true, dir.path());
    logger.log_put("PV", "a\r\nb", "MessageButton", None);
    let content = std::fs::read_to_string(logger.log_file_path()).unwrap();
    let records: Vec<&str> = content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect();
    assert_eq!(records.len(), 1);
}
