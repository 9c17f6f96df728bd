use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::aggregates;
use crate::dates::compact_to_iso;
use crate::http_fetch::http_client;
use crate::load;
use crate::sources::SourceSet;
use crate::table::{Table, canonical_id};

/// The two external reference tables, identifier- and
/// date-normalized and ready to join.
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    pub players: Table,
    pub rankings: Table,
}

pub fn load_reference_tables(sources: &SourceSet, cache_dir: &Path) -> Result<ReferenceTables> {
    let client = http_client()?;

    let mut players = load::fetch_csv_table(client, cache_dir, &sources.players_url)
        .context("load player reference table")?;
    players.map_column("dob", compact_to_iso)?;
    players.canonicalize_column("player_id")?;

    let mut rankings = load::fetch_csv_table(client, cache_dir, &sources.rankings_url)
        .context("load current rankings table")?;
    rankings.map_column("ranking_date", compact_to_iso)?;
    rankings.canonicalize_column("player")?;

    Ok(ReferenceTables { players, rankings })
}

/// The playerInfo table: every bio row survives, enriched with a
/// display name, win/loss totals and the best rank on record. Players
/// with no match history keep empty aggregate cells; players with
/// matches but without one of the outcomes get an explicit 0 from the
/// totals pivot.
pub fn build_player_profiles(players: &Table, player_matches: &Table) -> Result<Table> {
    let totals = aggregates::win_loss_totals(player_matches)?;
    let ranks = aggregates::highest_rank(player_matches)?;

    let mut totals_by_id: HashMap<String, (String, String)> = HashMap::new();
    {
        let id = totals.require_col("player_id")?;
        let lost = totals.require_col("allLost")?;
        let win = totals.require_col("allWin")?;
        for row in totals.rows() {
            totals_by_id.insert(row[id].clone(), (row[lost].clone(), row[win].clone()));
        }
    }

    let mut rank_by_id: HashMap<String, String> = HashMap::new();
    {
        let id = ranks.require_col("player_id")?;
        let rank = ranks.require_col("highestRank")?;
        for row in ranks.rows() {
            rank_by_id.insert(row[id].clone(), row[rank].clone());
        }
    }

    let id_col = players.require_col("player_id")?;
    let first_col = players.require_col("name_first")?;
    let last_col = players.require_col("name_last")?;

    let mut headers = players.headers().to_vec();
    headers.extend(["allLost", "allWin", "player", "highestRank"].map(String::from));

    let mut out = Table::new(headers);
    for row in players.rows() {
        let key = canonical_id(&row[id_col]);
        let (lost, win) = totals_by_id.get(&key).cloned().unwrap_or_default();
        let best = rank_by_id.get(&key).cloned().unwrap_or_default();
        let display = format!("{} {}", row[first_col], row[last_col]);

        let mut cells = row.clone();
        cells.push(lost);
        cells.push(win);
        cells.push(display.trim().to_string());
        cells.push(best);
        out.push_row(cells);
    }
    Ok(out)
}
