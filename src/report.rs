//! Read-only reports derived from the alive set.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{RefreshError, Result};
use crate::store::quote_field;
use crate::types::AliveEntry;

/// Key used for entries without a country code.
pub const UNKNOWN_COUNTRY: &str = "unknown";

pub const DETAIL_HEADER: [&str; 4] = ["IP", "Port", "Country Code", "ISP"];

/// Alive addresses grouped by country code.
///
/// Groups keep the order in which their key first appeared, and entries keep
/// alive-sequence order within a group. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedReport {
    groups: Vec<(String, Vec<String>)>,
}

impl GroupedReport {
    pub fn from_alive(alive: &[AliveEntry]) -> Self {
        let mut report = Self::default();
        for entry in alive {
            let key = entry.country_code.as_deref().unwrap_or(UNKNOWN_COUNTRY);
            report.push(key, entry.address());
        }
        report
    }

    fn push(&mut self, key: &str, address: String) {
        match self.groups.iter_mut().find(|(k, _)| k == key) {
            Some((_, list)) => list.push(address),
            None => self.groups.push((key.to_string(), vec![address])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for GroupedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (k, v) in &self.groups {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Write the grouped report as pretty JSON.
pub fn write_grouped_report(path: &Path, alive: &[AliveEntry]) -> Result<()> {
    let report = GroupedReport::from_alive(alive);
    let write = || -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &report)?;
        w.write_all(b"\n")?;
        w.flush()
    };
    write().map_err(|source| report_err(path, source))
}

/// Render the four-column detail table, header first.
pub fn render_detail_csv(alive: &[AliveEntry]) -> String {
    let mut out = DETAIL_HEADER.join(",");
    out.push('\n');
    for e in alive {
        let row = [
            e.host.as_str(),
            e.port.as_str(),
            e.country_code.as_deref().unwrap_or(""),
            e.org_name.as_deref().unwrap_or(""),
        ];
        let row: Vec<String> = row.iter().map(|f| quote_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn write_detail_report(path: &Path, alive: &[AliveEntry]) -> Result<()> {
    fs::write(path, render_detail_csv(alive)).map_err(|source| report_err(path, source))
}

/// Write one line per error. With no errors the file is removed instead, so
/// that a leftover log from an earlier run is not mistaken for this one.
///
/// Returns whether a log was written.
pub fn write_error_log(path: &Path, errors: &[String]) -> Result<bool> {
    if errors.is_empty() {
        return match fs::remove_file(path) {
            Ok(()) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(report_err(path, source)),
        };
    }
    let mut body = errors.join("\n");
    body.push('\n');
    fs::write(path, body).map_err(|source| report_err(path, source))?;
    Ok(true)
}

fn report_err(path: &Path, source: io::Error) -> RefreshError {
    RefreshError::ReportWrite {
        path: path.to_path_buf(),
        source,
    }
}
