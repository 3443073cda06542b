use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RefreshError, Result};
use crate::types::Candidate;

/// Parse candidate table content into an ordered list of candidates.
///
/// Supported format per line:
/// - comma-separated fields, the first two are host and port
/// - extra columns are ignored
/// - fields are trimmed; double-quoted fields are unquoted
/// - lines without a non-empty host and port (blank lines included) are skipped
pub fn parse_candidates_str(s: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (idx, line) in s.lines().enumerate() {
        let fields = split_row(line);
        let (host, port) = match fields.as_slice() {
            [host, port, ..] if !host.trim().is_empty() && !port.trim().is_empty() => {
                (host.trim(), port.trim())
            }
            _ => {
                if !line.trim().is_empty() {
                    debug!(line = idx + 1, "skipping row without host and port");
                }
                continue;
            }
        };
        out.push(Candidate::new(host, port));
    }
    out
}

/// Load the candidate list. A missing or unreadable file is fatal for the run.
pub fn load_candidates(path: impl AsRef<Path>) -> Result<Vec<Candidate>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| RefreshError::InputMissing {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_candidates_str(&content))
}

/// Sibling path used for the staged copy of the store: the full file name
/// with `.tmp` appended, so it never coincides with the store itself.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `candidates` (host, port only) to the temporary sibling of `path`
/// and flush it to disk. The canonical store is not touched.
pub fn write_temp(path: &Path, candidates: &[Candidate]) -> Result<PathBuf> {
    let temp = temp_path_for(path);
    let write = || -> io::Result<()> {
        let mut file = File::create(&temp)?;
        for c in candidates {
            writeln!(file, "{},{}", quote_field(&c.host), quote_field(&c.port))?;
        }
        file.sync_all()
    };
    write().map_err(|source| RefreshError::StoreWrite {
        path: temp.clone(),
        source,
    })?;
    Ok(temp)
}

/// Atomically move a staged store over the canonical path.
pub fn replace_from_temp(temp: &Path, target: &Path) -> Result<()> {
    replace_from_temp_with(temp, target, |from, to| fs::rename(from, to))
}

pub(crate) fn replace_from_temp_with<F>(temp: &Path, target: &Path, rename: F) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    rename(temp, target).map_err(|source| RefreshError::StoreReplace {
        temp: temp.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })?;
    sync_parent_dir(target);
    Ok(())
}

/// Persist the rename itself. Not every platform can open a directory, so
/// failures here are ignored.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

/// Split one comma-separated row, honouring double-quoted fields.
pub(crate) fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut cur)),
            _ => cur.push(ch),
        }
    }
    if !cur.trim().is_empty() || !fields.is_empty() {
        fields.push(cur);
    }
    fields
}

/// Quote a field if it contains a separator, quote or line break.
pub(crate) fn quote_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
