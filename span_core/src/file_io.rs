//! # File I/O Module
//!
//! Persists span databases as pretty-printed JSON:
//! - **Validated saves**: a database is written only with a passing report
//! - **Atomic saves**: write to `.tmp`, sync, rename over the target
//! - **Version validation**: refuse documents from an incompatible schema
//!
//! ## Example
//!
//! ```rust,no_run
//! use span_core::file_io::{load_database, save_database};
//! use span_core::seed::build_reference_database;
//! use span_core::validation::validate;
//! use std::path::Path;
//!
//! let (db, _) = build_reference_database()?;
//! let report = validate(&db);
//! save_database(&db, &report, Path::new("uk_span_tables.json"))?;
//!
//! let loaded = load_database(Path::new("uk_span_tables.json"))?;
//! assert_eq!(loaded.elements.len(), db.elements.len());
//! # Ok::<(), span_core::errors::SpanError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::database::{SpanDatabase, SCHEMA_VERSION};
use crate::errors::{SpanError, SpanResult};
use crate::validation::ValidationReport;

/// Serialize a database to the document form
pub fn to_json_string(database: &SpanDatabase) -> SpanResult<String> {
    serde_json::to_string_pretty(database).map_err(|e| SpanError::serialization(e.to_string()))
}

/// Parse a document and check its schema version
pub fn from_json_str(json: &str) -> SpanResult<SpanDatabase> {
    let database: SpanDatabase =
        serde_json::from_str(json).map_err(|e| SpanError::serialization(e.to_string()))?;
    validate_version(&database.meta.version)?;
    Ok(database)
}

/// Save a validated database with atomic write semantics.
///
/// Fails with `ValidationFailed` if `report` did not pass; nothing is
/// written in that case. Otherwise the JSON goes to `<path>.tmp`, is synced
/// to disk, and renamed over `path`.
pub fn save_database(database: &SpanDatabase, report: &ValidationReport, path: &Path) -> SpanResult<()> {
    if let Err(e) = report.ensure_passed() {
        warn!(
            path = %path.display(),
            errors = report.errors.len(),
            "refusing to save a database that failed validation"
        );
        return Err(e);
    }

    let json = to_json_string(database)?;

    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| SpanError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| SpanError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .sync_all()
        .map_err(|e| SpanError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SpanError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    info!(
        path = %path.display(),
        elements = database.elements.len(),
        entries = database.entry_count(),
        "span database saved"
    );
    Ok(())
}

/// Load a database from a file.
///
/// # Returns
///
/// * `Ok(SpanDatabase)` - Loaded and version-compatible
/// * `Err(SpanError::VersionMismatch)` - Document schema is incompatible
/// * `Err(SpanError::SerializationError)` - Invalid JSON or document shape
/// * `Err(SpanError::FileError)` - I/O error
pub fn load_database(path: &Path) -> SpanResult<SpanDatabase> {
    let mut file =
        File::open(path).map_err(|e| SpanError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| SpanError::file_error("read", path.display().to_string(), e.to_string()))?;

    let database: SpanDatabase = serde_json::from_str(&contents)
        .map_err(|e| SpanError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    validate_version(&database.meta.version)?;

    Ok(database)
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Check a document version against the current schema.
///
/// Major must match; while the schema is 0.x a newer minor is also refused.
fn validate_version(file_version: &str) -> SpanResult<()> {
    let mismatch = || SpanError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}
