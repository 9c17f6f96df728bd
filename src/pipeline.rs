use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;

use crate::aggregates;
use crate::export;
use crate::load::{self, LoadReport};
use crate::reference::{self, ReferenceTables};
use crate::sources::SourceSet;
use crate::table::Table;
use crate::unpivot;

const CHECKPOINT_FILE: &str = "rawData.csv";
const TABLES_DIR: &str = "tables";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sources: SourceSet,
    pub out_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Reuse the raw-table checkpoint instead of fetching match
    /// sources; an error when no checkpoint exists.
    pub skip_fetch: bool,
}

#[derive(Debug)]
pub struct RunReport {
    pub load: LoadReport,
    pub raw_rows: usize,
    pub player_match_rows: usize,
    pub tables_published: usize,
    pub out_dir: PathBuf,
}

/// The whole batch as an explicit object: construction only captures
/// configuration, `run` does the work. Stages execute strictly in
/// order; only the mutually independent derivations fan out.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<RunReport> {
        let checkpoint = self.config.out_dir.join(CHECKPOINT_FILE);
        let load_report = if self.config.skip_fetch {
            LoadReport::default()
        } else {
            let (raw, report) = load::load_raw_table(&self.config.sources, &self.config.cache_dir)?;
            load::write_checkpoint(&checkpoint, &raw)?;
            report
        };
        // The checkpoint is the boundary between load and transform:
        // both modes read the raw table back from disk.
        let raw = load::read_checkpoint(&checkpoint)?;

        let mut player_matches =
            unpivot::unpivot_player_matches(&raw).context("unpivot match table")?;
        player_matches.canonicalize_column("player_id")?;

        let refs = reference::load_reference_tables(&self.config.sources, &self.config.cache_dir)?;
        let profiles = reference::build_player_profiles(&refs.players, &player_matches)
            .context("build player profiles")?;

        let [current_rank, player_rank, trophies, surface, losing, serve] =
            derive_tables(&raw, &player_matches, &refs)?;

        let named: Vec<(&str, &Table)> = vec![
            ("currentRank", &current_rank),
            ("playerRank", &player_rank),
            ("playerInfo", &profiles),
            ("Trophee", &trophies),
            ("surface", &surface),
            ("loser", &losing),
            ("PlayerStats", &serve),
            ("allMatches", &player_matches),
        ];
        let export_report = export::publish_tables(&self.config.out_dir.join(TABLES_DIR), &named)?;

        Ok(RunReport {
            load: load_report,
            raw_rows: raw.len(),
            player_match_rows: player_matches.len(),
            tables_published: export_report.tables,
            out_dir: self.config.out_dir.clone(),
        })
    }
}

/// Run the independent derivations together and collect them in
/// declared order.
fn derive_tables(
    raw: &Table,
    player_matches: &Table,
    refs: &ReferenceTables,
) -> Result<[Table; 6]> {
    type Derivation<'a> = (&'static str, Box<dyn Fn() -> Result<Table> + Send + Sync + 'a>);
    let jobs: Vec<Derivation> = vec![
        ("currentRank", Box::new(|| aggregates::current_rank_table(&refs.rankings))),
        (
            "playerRank",
            Box::new(|| aggregates::last_known_rank(player_matches, &refs.rankings)),
        ),
        ("Trophee", Box::new(|| aggregates::trophy_counts(raw))),
        ("surface", Box::new(|| aggregates::surface_stats(player_matches))),
        ("loser", Box::new(|| aggregates::losing_stats(raw))),
        ("PlayerStats", Box::new(|| aggregates::serve_stats(player_matches))),
    ];

    let results: Vec<(&'static str, Result<Table>)> =
        jobs.par_iter().map(|(name, job)| (*name, job())).collect();

    let mut tables = Vec::with_capacity(results.len());
    for (name, result) in results {
        tables.push(result.with_context(|| format!("derive {name}"))?);
    }
    tables
        .try_into()
        .map_err(|_| anyhow!("derivation count mismatch"))
}
