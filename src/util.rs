use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("cannot create output directory {}", path.display()))
}

/// Hex SHA-256 of a file, streamed so large scans are not read into memory.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("cannot open {} to fingerprint it", path.display()))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("cannot fingerprint {}", path.display()))?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// Pretty JSON plus a trailing newline; parent directories are created first.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut data = serde_json::to_string_pretty(value)
        .with_context(|| format!("cannot encode report for {}", path.display()))?;
    data.push('\n');

    fs::write(path, data).with_context(|| format!("cannot write report {}", path.display()))
}

/// First non-empty line an external tool prints for `args` (pdftoppm answers
/// on stderr, tesseract on stdout), or `None` when it cannot be run.
pub fn tool_version(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    [&output.stdout, &output.stderr]
        .into_iter()
        .map(|stream| String::from_utf8_lossy(stream).into_owned())
        .find_map(|text| {
            text.lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(ToOwned::to_owned)
        })
}
