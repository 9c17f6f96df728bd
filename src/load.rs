use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rayon::prelude::*;
use reqwest::blocking::Client;

use crate::dates::compact_to_iso;
use crate::http_fetch::{fetch_text_cached, http_client};
use crate::sources::{MatchCategory, SourceSet};
use crate::table::Table;

/// Per-category account of what loaded and what did not. A failed
/// source degrades to nothing in the data but always shows up here.
#[derive(Debug, Clone)]
pub struct CategoryLoadReport {
    pub category: MatchCategory,
    pub sources_total: usize,
    pub sources_loaded: usize,
    pub rows: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub categories: Vec<CategoryLoadReport>,
}

impl LoadReport {
    pub fn failed_sources(&self) -> usize {
        self.categories
            .iter()
            .map(|cat| cat.sources_total - cat.sources_loaded)
            .sum()
    }
}

/// Fetch every category, tag rows with their category label,
/// concatenate the player-schema categories in declared order and
/// normalize `tourney_date` into an ISO `date` column.
pub fn load_raw_table(sources: &SourceSet, cache_dir: &Path) -> Result<(Table, LoadReport)> {
    let client = http_client()?;
    let mut report = LoadReport::default();
    let mut tagged = Vec::with_capacity(sources.categories.len());
    for (category, urls) in &sources.categories {
        let (table, category_report) = load_category(client, cache_dir, *category, urls);
        report.categories.push(category_report);
        tagged.push((*category, table));
    }

    let mut raw = merge_player_categories(tagged);
    attach_iso_dates(&mut raw)?;
    Ok((raw, report))
}

/// Concatenate category tables into the transform input. Doubles rows
/// identify teams (`winner1_*`/`winner2_*`), not single players; they
/// are loaded and reported but stay out of the winner/loser table.
pub fn merge_player_categories(tables: Vec<(MatchCategory, Table)>) -> Table {
    Table::concat(
        tables
            .into_iter()
            .filter(|(category, _)| category.has_player_columns())
            .map(|(_, table)| table),
    )
}

fn load_category(
    client: &Client,
    cache_dir: &Path,
    category: MatchCategory,
    urls: &[String],
) -> (Table, CategoryLoadReport) {
    // par_iter's collect preserves input order, so the concatenation
    // below follows the declared source order.
    let results: Vec<Result<Table>> = with_fetch_pool(|| {
        urls.par_iter()
            .map(|url| fetch_csv_table(client, cache_dir, url))
            .collect()
    });

    let mut tables = Vec::new();
    let mut errors = Vec::new();
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(table) => tables.push(table),
            Err(err) => errors.push(format!("{url}: {err:#}")),
        }
    }

    let sources_loaded = tables.len();
    let mut table = Table::concat(tables);
    table.add_const_column("matchType", category.label());
    let report = CategoryLoadReport {
        category,
        sources_total: urls.len(),
        sources_loaded,
        rows: table.len(),
        errors,
    };
    (table, report)
}

pub fn fetch_csv_table(client: &Client, cache_dir: &Path, url: &str) -> Result<Table> {
    let body = fetch_text_cached(client, cache_dir, url)?;
    parse_csv_table(&body).with_context(|| format!("parse {url}"))
}

/// Parse a headered CSV document into a [`Table`]. Ragged rows are
/// tolerated and padded to the header width.
pub fn parse_csv_table(body: &str) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("read csv header")?
        .iter()
        .map(str::to_string)
        .collect();
    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.context("read csv record")?;
        table.push_row(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

/// Expose `tourney_date` as an ISO `date` column. Bad cells become
/// empty, never an error.
pub fn attach_iso_dates(raw: &mut Table) -> Result<()> {
    let src = raw.require_col("tourney_date")?;
    let values: Vec<String> = raw
        .rows()
        .iter()
        .map(|row| compact_to_iso(&row[src]))
        .collect();
    raw.add_column("date", values)
}

pub fn write_checkpoint(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        writer
            .write_record(table.headers())
            .context("write checkpoint header")?;
        for row in table.rows() {
            writer.write_record(row).context("write checkpoint row")?;
        }
        writer.flush().context("flush checkpoint")?;
    }
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))
}

pub fn read_checkpoint(path: &Path) -> Result<Table> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("read checkpoint {}", path.display()))?;
    parse_csv_table(&body).with_context(|| format!("parse checkpoint {}", path.display()))
}

fn with_fetch_pool<T: Send>(action: impl FnOnce() -> T + Send) -> T {
    let threads = fetch_parallelism();
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

fn fetch_parallelism() -> usize {
    std::env::var("FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(6)
        .clamp(2, 32)
}
