//! Append-only audit journal kept inside each document folder.
//!
//! # Responsibility
//! - Append one JSON record per line for every mutating store operation.
//! - Read the journal back newest-first, tolerating damaged lines.
//!
//! # Invariants
//! - Writers only append; prior bytes are never rewritten.
//! - Journal failures never fail the operation being audited.

use crate::model::persisted::{AuditAction, AuditEntry};
use log::{error, warn};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::Path;

/// Journal file name inside a document folder.
pub const AUDIT_FILENAME: &str = "audit.log";

/// Appends one `action` record to the journal in `folder`.
///
/// Failures are logged and swallowed.
pub(crate) fn append(folder: &Path, action: AuditAction, details: Map<String, Value>) {
    let entry = AuditEntry::now(action, details);
    let mut line = match serde_json::to_string(&entry) {
        Ok(line) => line,
        Err(err) => {
            warn!(
                "event=audit_append module=storage status=error action={} error={}",
                action.as_str(),
                err
            );
            return;
        }
    };
    line.push('\n');

    let path = folder.join(AUDIT_FILENAME);
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| file.write_all(line.as_bytes()));
    if let Err(err) = result {
        warn!(
            "event=audit_append module=storage status=error action={} path={} error={}",
            action.as_str(),
            path.display(),
            err
        );
    }
}

/// Reads the journal in `folder`, newest entry first.
///
/// Missing journal yields an empty list. Malformed lines, including ones
/// that are not UTF-8, are skipped and reading continues.
pub(crate) fn read_newest_first(folder: &Path) -> Vec<AuditEntry> {
    let path = folder.join(AUDIT_FILENAME);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            error!(
                "event=audit_read module=storage status=error path={} error={}",
                path.display(),
                err
            );
            return Vec::new();
        }
    };

    let mut reader = BufReader::new(file);
    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => line_no += 1,
            Err(err) => {
                error!(
                    "event=audit_read module=storage status=error path={} line={} error={}",
                    path.display(),
                    line_no + 1,
                    err
                );
                break;
            }
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<AuditEntry>(&buf) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(
                "event=audit_read module=storage status=skip path={} line={} error={}",
                path.display(),
                line_no,
                err
            ),
        }
    }

    entries.reverse();
    entries
}

/// Builds a `details` object from key/value pairs.
pub(crate) fn details<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect()
}
