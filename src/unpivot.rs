use std::collections::HashMap;

use anyhow::{Result, bail, ensure};

use crate::table::{Table, canonical_id};

/// Per-match metadata carried onto both player perspectives.
pub const MATCH_META_COLUMNS: [&str; 6] = [
    "tourney_id",
    "tourney_name",
    "surface",
    "matchType",
    "tourney_level",
    "date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Winner,
    Loser,
}

impl Side {
    fn word(self) -> &'static str {
        match self {
            Side::Winner => "winner",
            Side::Loser => "loser",
        }
    }

    fn stat_prefix(self) -> &'static str {
        match self {
            Side::Winner => "w_",
            Side::Loser => "l_",
        }
    }

    fn outcome(self) -> &'static str {
        match self {
            Side::Winner => "win",
            Side::Loser => "lost",
        }
    }
}

/// Player-centric name for a header owned by `side`, or `None` when
/// the header is not part of that side's column group. Matching is
/// anchored at the start of the header: `winner` -> `player`,
/// `winner_x` -> `player_x`, `w_x` -> `p_x` (same for the loser
/// side). An interior occurrence, as in `draw_size`, is not a match.
pub fn player_column_name(header: &str, side: Side) -> Option<String> {
    if header == side.word() {
        return Some("player".to_string());
    }
    if let Some(suffix) = header.strip_prefix(side.word()) {
        // `winnerish` is not a token match; only `winner_x` is.
        return suffix
            .strip_prefix('_')
            .map(|rest| format!("player_{rest}"));
    }
    if let Some(rest) = header.strip_prefix(side.stat_prefix()) {
        return Some(format!("p_{rest}"));
    }
    None
}

/// Split each match row into a winner and a loser perspective sharing
/// one player-centric schema: the side's columns renamed per
/// [`player_column_name`], the shared metadata columns, and an
/// `outcome` cell (`win`/`lost`). A record carrying both identities
/// yields exactly two rows; a perspective whose player identifier is
/// empty is dropped rather than aggregated under an empty key. The
/// column mapping is computed from the live header list, so
/// category-specific schema differences come along for free.
pub fn unpivot_player_matches(raw: &Table) -> Result<Table> {
    let winner = side_columns(raw, Side::Winner);
    let loser = side_columns(raw, Side::Loser);
    ensure!(
        winner.len() == loser.len(),
        "asymmetric schema: {} winner columns vs {} loser columns",
        winner.len(),
        loser.len()
    );

    let loser_by_name: HashMap<&str, usize> = loser
        .iter()
        .map(|(name, idx)| (name.as_str(), *idx))
        .collect();

    let mut player_headers = Vec::with_capacity(winner.len());
    let mut winner_cols = Vec::with_capacity(winner.len());
    let mut loser_cols = Vec::with_capacity(winner.len());
    for (name, winner_idx) in &winner {
        let Some(&loser_idx) = loser_by_name.get(name.as_str()) else {
            bail!("asymmetric schema: loser column group is missing `{name}`");
        };
        player_headers.push(name.clone());
        winner_cols.push(*winner_idx);
        loser_cols.push(loser_idx);
    }

    let meta_cols: Vec<usize> = MATCH_META_COLUMNS
        .iter()
        .map(|name| raw.require_col(name))
        .collect::<Result<_>>()?;

    let id_slot = player_headers.iter().position(|name| name == "player_id");

    let mut headers = player_headers;
    headers.extend(MATCH_META_COLUMNS.iter().map(|name| name.to_string()));
    headers.push("outcome".to_string());

    let mut out = Table::new(headers);
    for row in raw.rows() {
        for (cols, side) in [(&winner_cols, Side::Winner), (&loser_cols, Side::Loser)] {
            let cells = project(row, cols, &meta_cols, side);
            if let Some(slot) = id_slot
                && canonical_id(&cells[slot]).is_empty()
            {
                continue;
            }
            out.push_row(cells);
        }
    }
    Ok(out)
}

fn side_columns(raw: &Table, side: Side) -> Vec<(String, usize)> {
    raw.headers()
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            player_column_name(header, side).map(|renamed| (renamed, idx))
        })
        .collect()
}

fn project(
    row: &[String],
    side_cols: &[usize],
    meta_cols: &[usize],
    side: Side,
) -> Vec<String> {
    let mut out = Vec::with_capacity(side_cols.len() + meta_cols.len() + 1);
    for &idx in side_cols {
        out.push(row[idx].clone());
    }
    for &idx in meta_cols {
        out.push(row[idx].clone());
    }
    out.push(side.outcome().to_string());
    out
}
