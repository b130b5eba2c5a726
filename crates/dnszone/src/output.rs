//! Text rendering for command output
//!
//! Everything here is a pure function of its input so the formats can be
//! tested without a terminal.

use anyhow::Result;
use dnszone_core::{DnsDomain, ZoneDescription, ZoneStatus};
use serde_json::Value;

/// Default columns of `dnszone list`
pub const DEFAULT_COLUMNS: &str = "id,gcp.domain_prefix,gcp.project_id,gcp.network_id";

/// Split a `--columns` value into dotted paths
pub fn parse_columns(spec: &str) -> Result<Vec<String>> {
    let columns: Vec<String> = spec
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        anyhow::bail!("--columns must name at least one column");
    }
    Ok(columns)
}

/// Look up a dotted path in a JSON value
///
/// Strings are printed bare; missing fields and nulls print as empty.
pub fn column_value(value: &Value, path: &str) -> String {
    let found = path
        .split('.')
        .try_fold(value, |current, key| current.get(key));

    match found {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render records as an aligned table
pub fn render_table(records: &[DnsDomain], columns: &[String], headers: bool) -> Result<String> {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(records.len() + 1);
    if headers {
        rows.push(columns.iter().map(|c| c.to_uppercase()).collect());
    }
    for record in records {
        let value = serde_json::to_value(record)?;
        rows.push(columns.iter().map(|c| column_value(&value, c)).collect());
    }

    let mut widths = vec![0; columns.len()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Ok(out)
}

/// Render the describe view of a record
pub fn render_description(description: &ZoneDescription) -> String {
    let record = &description.record;
    let status = match &description.zone {
        ZoneStatus::Present(_) => "present".to_string(),
        ZoneStatus::Missing => "missing".to_string(),
        ZoneStatus::Unknown(reason) => format!("unknown ({})", reason),
    };

    let fields = [
        ("ID|BASE DOMAIN:", record.id.as_str()),
        ("Domain Prefix:", record.gcp.domain_prefix.as_str()),
        ("Project:", record.gcp.project_id.as_str()),
        ("Network:", record.gcp.network_id.as_str()),
        ("Zone Name:", description.zone_name.as_str()),
        ("DNS Name:", description.dns_name.as_str()),
        ("Zone Status:", status.as_str()),
    ];

    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    fields
        .iter()
        .map(|(label, value)| format!("{:<width$}  {}\n", label, value, width = width))
        .collect()
}

/// Render a JSON value, pretty or on one line
pub fn render_json<T: serde::Serialize>(value: &T, single: bool) -> Result<String> {
    let text = if single {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(text)
}
