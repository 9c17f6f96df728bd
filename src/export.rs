use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value};

use crate::table::Table;

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub tables: usize,
    pub out_dir: PathBuf,
}

/// Write every named table as a JSON record array and a CSV file under
/// a staging directory, then swap the staging directory into place.
/// Either the whole set publishes or the previous publication stays
/// untouched.
pub fn publish_tables(target: &Path, tables: &[(&str, &Table)]) -> Result<ExportReport> {
    let staging = staging_dir(target)?;
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("clear stale staging {}", staging.display()))?;
    }
    let json_dir = staging.join("json");
    let csv_dir = staging.join("csv");
    fs::create_dir_all(&json_dir)
        .with_context(|| format!("create {}", json_dir.display()))?;
    fs::create_dir_all(&csv_dir).with_context(|| format!("create {}", csv_dir.display()))?;

    for (name, table) in tables {
        write_json_records(&json_dir.join(format!("{name}.json")), table)
            .with_context(|| format!("export {name} json"))?;
        write_csv_table(&csv_dir.join(format!("{name}.csv")), table)
            .with_context(|| format!("export {name} csv"))?;
    }

    swap_into_place(&staging, target)?;
    Ok(ExportReport {
        tables: tables.len(),
        out_dir: target.to_path_buf(),
    })
}

fn staging_dir(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .and_then(|name| name.to_str())
        .context("publish target has no directory name")?;
    Ok(target.with_file_name(format!("{name}.staging")))
}

/// `fs::rename` refuses to replace a non-empty directory, so the old
/// publication is moved aside first and dropped after the swap.
fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
    let old = target.with_extension("old");
    if old.exists() {
        fs::remove_dir_all(&old).with_context(|| format!("clear {}", old.display()))?;
    }
    if target.exists() {
        fs::rename(target, &old)
            .with_context(|| format!("retire previous {}", target.display()))?;
    }
    fs::rename(staging, target)
        .with_context(|| format!("publish {}", target.display()))?;
    if old.exists() {
        let _ = fs::remove_dir_all(&old);
    }
    Ok(())
}

fn write_json_records(path: &Path, table: &Table) -> Result<()> {
    let mut records = Vec::with_capacity(table.len());
    for row in table.rows() {
        let mut record = Map::new();
        for (header, cell) in table.headers().iter().zip(row) {
            record.insert(header.clone(), cell_value(cell));
        }
        records.push(Value::Object(record));
    }
    let json = serde_json::to_string(&Value::Array(records)).context("serialize records")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Numeric cells stay numbers in the record output; the empty cell is
/// null.
fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = cell.parse::<f64>()
        && let Some(number) = Number::from_f64(float)
    {
        return Value::Number(number);
    }
    Value::String(cell.to_string())
}

fn write_csv_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(table.headers()).context("write header")?;
    for row in table.rows() {
        writer.write_record(row).context("write row")?;
    }
    writer.flush().context("flush table")?;
    Ok(())
}
