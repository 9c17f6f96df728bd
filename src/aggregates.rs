use std::collections::{BTreeMap, HashSet};

use anyhow::Result;

use crate::sources::MatchCategory;
use crate::table::{Table, canonical_id, cell_f64, compare_numeric_cells, format_number};

/// Count of wins and losses per player, both outcomes always present
/// (0 where a player never had one). Rows are ordered by player
/// identifier.
pub fn win_loss_totals(player_matches: &Table) -> Result<Table> {
    let id_col = player_matches.require_col("player_id")?;
    let outcome_col = player_matches.require_col("outcome")?;

    let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for row in player_matches.rows() {
        let entry = counts.entry(canonical_id(&row[id_col])).or_insert((0, 0));
        match row[outcome_col].as_str() {
            "win" => entry.0 += 1,
            "lost" => entry.1 += 1,
            _ => {}
        }
    }

    let mut out = Table::new(["player_id", "allLost", "allWin"]);
    for (id, (wins, losses)) in counts {
        out.push_row(vec![id, losses.to_string(), wins.to_string()]);
    }
    Ok(out)
}

/// Best (numerically lowest) rank each player ever held in a match.
pub fn highest_rank(player_matches: &Table) -> Result<Table> {
    let id_col = player_matches.require_col("player_id")?;
    let rank_col = player_matches.require_col("player_rank")?;

    let mut best: BTreeMap<String, f64> = BTreeMap::new();
    for row in player_matches.rows() {
        let Some(rank) = cell_f64(&row[rank_col]) else {
            continue;
        };
        best.entry(canonical_id(&row[id_col]))
            .and_modify(|current| *current = current.min(rank))
            .or_insert(rank);
    }

    let mut out = Table::new(["player_id", "highestRank"]);
    for (id, rank) in best {
        out.push_row(vec![id, format_number(rank)]);
    }
    Ok(out)
}

/// The rankings snapshot re-exposed under the dashboard column names.
pub fn current_rank_table(rankings: &Table) -> Result<Table> {
    rankings.require_col("player")?;
    rankings.require_col("rank")?;
    Ok(rankings.with_renamed_columns(&[("player", "player_id"), ("rank", "currentRank")]))
}

/// One row per player seen anywhere: the latest ranking snapshot when
/// available, otherwise the player's most recent in-match rank and
/// points. Snapshot rows are ordered by rank ascending and preceded by
/// the gap-fill rows. Ties on a date keep the first row in input
/// order.
pub fn last_known_rank(player_matches: &Table, rankings: &Table) -> Result<Table> {
    let player_col = rankings.require_col("player")?;
    let date_col = rankings.require_col("ranking_date")?;
    let rank_col = rankings.require_col("rank")?;
    let points_col = rankings.require_col("points")?;

    let mut snapshot: Vec<&Vec<String>> = rankings.rows().iter().collect();
    snapshot.sort_by(|a, b| {
        a[player_col]
            .cmp(&b[player_col])
            .then_with(|| b[date_col].cmp(&a[date_col]))
    });

    let mut latest: Vec<Vec<String>> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for row in snapshot {
        let id = canonical_id(&row[player_col]);
        if seen.insert(id.clone()) {
            latest.push(vec![
                id,
                row[date_col].clone(),
                row[rank_col].clone(),
                row[points_col].clone(),
            ]);
        }
    }
    latest.sort_by(|a, b| compare_numeric_cells(&a[2], &b[2]));

    let pm_id = player_matches.require_col("player_id")?;
    let pm_date = player_matches.require_col("date")?;
    let pm_rank = player_matches.require_col("player_rank")?;
    let pm_points = player_matches.require_col("player_rank_points")?;

    // ISO date strings sort lexicographically, so a plain descending
    // sort puts each player's most recent match first.
    let mut match_rows: Vec<&Vec<String>> = player_matches.rows().iter().collect();
    match_rows.sort_by(|a, b| b[pm_date].cmp(&a[pm_date]));

    let mut fill: Vec<Vec<String>> = Vec::new();
    for row in match_rows {
        let id = canonical_id(&row[pm_id]);
        if !seen.insert(id.clone()) {
            continue;
        }
        fill.push(vec![
            id,
            row[pm_date].clone(),
            row[pm_rank].clone(),
            row[pm_points].clone(),
        ]);
    }

    let mut out = Table::new(["player", "ranking_date", "rank", "points"]);
    for row in fill.into_iter().chain(latest) {
        out.push_row(row);
    }
    Ok(out)
}

/// Trophy counts per (winner, tournament level), restricted to the
/// solo category. The final of a tournament is the row with the
/// highest match number; earlier rows of the same tournament never
/// count.
pub fn trophy_counts(raw: &Table) -> Result<Table> {
    let category_col = raw.require_col("matchType")?;
    let tourney_col = raw.require_col("tourney_id")?;
    let match_num_col = raw.require_col("match_num")?;
    let winner_col = raw.require_col("winner_id")?;
    let level_col = raw.require_col("tourney_level")?;

    let mut finals: BTreeMap<String, &Vec<String>> = BTreeMap::new();
    for row in raw.rows() {
        if row[category_col] != MatchCategory::Solo.label() {
            continue;
        }
        finals
            .entry(row[tourney_col].clone())
            .and_modify(|current| {
                // Strictly greater: a tie keeps the earlier row.
                if compare_numeric_cells(&row[match_num_col], &current[match_num_col])
                    == std::cmp::Ordering::Greater
                {
                    *current = row;
                }
            })
            .or_insert(row);
    }

    let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
    for row in finals.values() {
        let key = (canonical_id(&row[winner_col]), row[level_col].clone());
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut out = Table::new(["winner_id", "tourneyLevel", "numberOfTrophee"]);
    for ((winner, level), trophies) in counts {
        out.push_row(vec![winner, level, trophies.to_string()]);
    }
    Ok(out)
}

/// Match counts per (player, surface, outcome). The count column is
/// named `winMatch` for both outcomes; the `outcome` cell tells them
/// apart.
pub fn surface_stats(player_matches: &Table) -> Result<Table> {
    let id_col = player_matches.require_col("player_id")?;
    let surface_col = player_matches.require_col("surface")?;
    let outcome_col = player_matches.require_col("outcome")?;

    let mut counts: BTreeMap<(String, String, String), u64> = BTreeMap::new();
    for row in player_matches.rows() {
        let key = (
            canonical_id(&row[id_col]),
            row[surface_col].clone(),
            row[outcome_col].clone(),
        );
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut out = Table::new(["player_id", "surface", "outcome", "winMatch"]);
    for ((id, surface, outcome), matches) in counts {
        out.push_row(vec![id, surface, outcome, matches.to_string()]);
    }
    Ok(out)
}

/// Head-to-head pattern counts from the match perspective: how often a
/// player lost to a given opponent, and how often they beat one, in a
/// single table distinguished by the `outcome` cell. The won block
/// reuses the losing-block schema with the roles swapped in.
pub fn losing_stats(raw: &Table) -> Result<Table> {
    let loser_col = raw.require_col("loser_id")?;
    let winner_name_col = raw.require_col("winner_name")?;
    let winner_col = raw.require_col("winner_id")?;
    let loser_name_col = raw.require_col("loser_name")?;

    let mut lost: BTreeMap<(String, String), u64> = BTreeMap::new();
    let mut won: BTreeMap<(String, String), u64> = BTreeMap::new();
    for row in raw.rows() {
        let lost_key = (canonical_id(&row[loser_col]), row[winner_name_col].clone());
        *lost.entry(lost_key).or_insert(0) += 1;
        let won_key = (canonical_id(&row[winner_col]), row[loser_name_col].clone());
        *won.entry(won_key).or_insert(0) += 1;
    }

    let mut out = Table::new(["loser_id", "winner_name", "timeLosing", "outcome"]);
    for ((player, opponent), times) in lost {
        out.push_row(vec![player, opponent, times.to_string(), "lost".into()]);
    }
    for ((player, opponent), times) in won {
        out.push_row(vec![player, opponent, times.to_string(), "win".into()]);
    }
    Ok(out)
}

const SERVE_MEANS: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
struct ServeAccumulator {
    sums: [f64; SERVE_MEANS],
    counts: [u64; SERVE_MEANS],
}

impl ServeAccumulator {
    fn add(&mut self, slot: usize, value: Option<f64>) {
        if let Some(value) = value {
            self.sums[slot] += value;
            self.counts[slot] += 1;
        }
    }

    fn mean(&self, slot: usize) -> f64 {
        if self.counts[slot] == 0 {
            return 0.0;
        }
        self.sums[slot] / self.counts[slot] as f64
    }
}

/// Per-player serve performance: mean first-serve-in, first/second
/// serve points won and break-points-saved percentages, plus mean aces
/// and double faults. A row with a missing operand or a zero
/// denominator contributes nothing to that ratio's mean but still
/// feeds every other mean; a mean with no samples at all is 0.
pub fn serve_stats(player_matches: &Table) -> Result<Table> {
    let id_col = player_matches.require_col("player_id")?;
    let svpt_col = player_matches.require_col("p_svpt")?;
    let first_in_col = player_matches.require_col("p_1stIn")?;
    let first_won_col = player_matches.require_col("p_1stWon")?;
    let second_won_col = player_matches.require_col("p_2ndWon")?;
    let bp_saved_col = player_matches.require_col("p_bpSaved")?;
    let bp_faced_col = player_matches.require_col("p_bpFaced")?;
    let ace_col = player_matches.require_col("p_ace")?;
    let df_col = player_matches.require_col("p_df")?;

    let mut players: BTreeMap<String, ServeAccumulator> = BTreeMap::new();
    for row in player_matches.rows() {
        let acc = players.entry(canonical_id(&row[id_col])).or_default();
        let svpt = cell_f64(&row[svpt_col]);
        let first_in = cell_f64(&row[first_in_col]);
        acc.add(0, ratio(first_in, svpt));
        acc.add(1, ratio(cell_f64(&row[first_won_col]), first_in));
        let second_serves = match (svpt, first_in) {
            (Some(total), Some(first)) => Some(total - first),
            _ => None,
        };
        acc.add(2, ratio(cell_f64(&row[second_won_col]), second_serves));
        acc.add(3, ratio(cell_f64(&row[bp_saved_col]), cell_f64(&row[bp_faced_col])));
        acc.add(4, cell_f64(&row[ace_col]));
        acc.add(5, cell_f64(&row[df_col]));
    }

    let mut out = Table::new([
        "player_id",
        "first_serve_percentage",
        "first_serve_points_won_percentage",
        "second_serve_points_won_percentage",
        "break_points_saved_percentage",
        "number_of_aces",
        "number_of_double_faults",
    ]);
    for (id, acc) in players {
        let mut cells = Vec::with_capacity(SERVE_MEANS + 1);
        cells.push(id);
        for slot in 0..SERVE_MEANS {
            cells.push(format_number(acc.mean(slot)));
        }
        out.push_row(cells);
    }
    Ok(out)
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let numerator = numerator?;
    let denominator = denominator?;
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}
