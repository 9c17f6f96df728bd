use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use atp_dashboard::aggregates::{
    losing_stats, serve_stats, surface_stats, trophy_counts, win_loss_totals,
};
use atp_dashboard::load::{attach_iso_dates, parse_csv_table};
use atp_dashboard::table::{Table, cell_f64};
use atp_dashboard::unpivot::unpivot_player_matches;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn sample_raw_table() -> Table {
    let mut raw =
        parse_csv_table(&read_fixture("atp_matches_sample.csv")).expect("fixture should parse");
    raw.add_const_column("matchType", "solo");
    attach_iso_dates(&mut raw).expect("fixture has tourney_date");
    raw
}

fn sample_player_matches() -> Table {
    let mut matches =
        unpivot_player_matches(&sample_raw_table()).expect("fixture should unpivot");
    matches.canonicalize_column("player_id").unwrap();
    matches
}

fn row_map(table: &Table, key_col: &str) -> HashMap<String, Vec<String>> {
    let key = table.col(key_col).unwrap();
    table
        .rows()
        .iter()
        .map(|row| (row[key].clone(), row.clone()))
        .collect()
}

#[test]
fn totals_account_for_every_player_match_row() {
    let matches = sample_player_matches();
    let totals = win_loss_totals(&matches).expect("totals should derive");

    let id = matches.col("player_id").unwrap();
    let mut per_player: HashMap<String, u64> = HashMap::new();
    for row in matches.rows() {
        *per_player.entry(row[id].clone()).or_insert(0) += 1;
    }

    let win_col = totals.col("allWin").unwrap();
    let lost_col = totals.col("allLost").unwrap();
    let key = totals.col("player_id").unwrap();
    assert_eq!(totals.len(), per_player.len());
    for row in totals.rows() {
        let wins: u64 = row[win_col].parse().unwrap();
        let losses: u64 = row[lost_col].parse().unwrap();
        assert_eq!(wins + losses, per_player[&row[key]]);
    }

    let by_id = row_map(&totals, "player_id");
    assert_eq!(by_id["104925"][lost_col], "1");
    assert_eq!(by_id["104925"][win_col], "2");
    // The float-encoded identifier collapses onto the same key.
    assert_eq!(by_id["105223"][win_col], "1");
    assert_eq!(by_id["105223"][lost_col], "1");
    // A player who never won still gets an explicit zero.
    assert_eq!(by_id["107000"][win_col], "0");
    assert_eq!(by_id["107000"][lost_col], "1");
}

#[test]
fn trophies_count_only_the_tournament_final() {
    let raw = sample_raw_table();
    let trophies = trophy_counts(&raw).expect("trophies should derive");

    let level = trophies.col("tourneyLevel").unwrap();
    let count = trophies.col("numberOfTrophee").unwrap();

    // Tournament 2024-888 has match numbers 5 and 7; only 7 counts,
    // so the winner takes one trophy there, not two.
    let by_id = row_map(&trophies, "winner_id");
    assert_eq!(trophies.len(), 3);
    assert_eq!(by_id["104925"][level], "G");
    assert_eq!(by_id["104925"][count], "1");
    assert_eq!(by_id["105223"][level], "M");
    assert_eq!(by_id["105223"][count], "1");
    assert_eq!(by_id["106000"][level], "A");
    assert_eq!(by_id["106000"][count], "1");

    assert!(
        !by_id.contains_key("107000"),
        "a player with no tournament win must not appear"
    );
}

#[test]
fn trophies_ignore_other_categories() {
    let mut raw =
        parse_csv_table(&read_fixture("atp_matches_sample.csv")).expect("fixture should parse");
    raw.add_const_column("matchType", "futures");
    attach_iso_dates(&mut raw).expect("fixture has tourney_date");
    let trophies = trophy_counts(&raw).expect("trophies should derive");
    assert!(trophies.is_empty());
}

#[test]
fn surface_stats_round_trip_a_single_match() {
    let csv = "tourney_id,tourney_name,surface,tourney_level,tourney_date,match_num,\
winner_id,winner_name,winner_rank,winner_rank_points,loser_id,loser_name,loser_rank,loser_rank_points,\
w_ace,w_df,w_svpt,w_1stIn,w_1stWon,w_2ndWon,w_bpSaved,w_bpFaced,\
l_ace,l_df,l_svpt,l_1stIn,l_1stWon,l_2ndWon,l_bpSaved,l_bpFaced\n\
2024-001,Test Open,Hard,G,20240101,1,A,Ann Ace,1,1000,B,Bo Break,2,900,1,0,10,5,4,2,1,1,0,1,12,6,4,2,0,2\n";
    let mut raw = parse_csv_table(csv).expect("inline csv should parse");
    raw.add_const_column("matchType", "solo");
    attach_iso_dates(&mut raw).unwrap();

    let matches = unpivot_player_matches(&raw).unwrap();
    let stats = surface_stats(&matches).expect("surface stats should derive");

    assert_eq!(stats.len(), 2);
    assert_eq!(stats.headers(), &["player_id", "surface", "outcome", "winMatch"]);
    assert!(
        stats
            .rows()
            .iter()
            .any(|row| row == &vec!["A", "Hard", "win", "1"])
    );
    assert!(
        stats
            .rows()
            .iter()
            .any(|row| row == &vec!["B", "Hard", "lost", "1"])
    );
}

#[test]
fn surface_stats_split_by_surface_and_outcome() {
    let stats = surface_stats(&sample_player_matches()).unwrap();
    let surface = stats.col("surface").unwrap();
    let outcome = stats.col("outcome").unwrap();
    let count = stats.col("winMatch").unwrap();
    let id = stats.col("player_id").unwrap();

    let find = |player: &str, surf: &str, out: &str| {
        stats
            .rows()
            .iter()
            .find(|row| row[id] == player && row[surface] == surf && row[outcome] == out)
            .map(|row| row[count].clone())
    };
    assert_eq!(find("104925", "Hard", "win").as_deref(), Some("2"));
    assert_eq!(find("104925", "Clay", "lost").as_deref(), Some("1"));
    assert_eq!(find("104925", "Clay", "win"), None);
    assert_eq!(find("105223", "Clay", "win").as_deref(), Some("1"));
}

#[test]
fn losing_stats_pair_each_player_with_opponent_names() {
    let stats = losing_stats(&sample_raw_table()).unwrap();
    assert_eq!(
        stats.headers(),
        &["loser_id", "winner_name", "timeLosing", "outcome"]
    );

    let id = stats.col("loser_id").unwrap();
    let opponent = stats.col("winner_name").unwrap();
    let times = stats.col("timeLosing").unwrap();
    let outcome = stats.col("outcome").unwrap();

    let find = |player: &str, name: &str, out: &str| {
        stats
            .rows()
            .iter()
            .find(|row| row[id] == player && row[opponent] == name && row[outcome] == out)
            .map(|row| row[times].clone())
    };

    assert_eq!(find("105223", "Aleks Vukov", "lost").as_deref(), Some("1"));
    assert_eq!(find("104925", "Boris Baseline", "lost").as_deref(), Some("1"));
    // The win block reuses the schema with roles swapped in; the
    // float-encoded winner id collapses onto the canonical key.
    assert_eq!(find("105223", "Aleks Vukov", "win").as_deref(), Some("1"));
    assert_eq!(find("104925", "Casper Clay", "win").as_deref(), Some("1"));
    assert_eq!(find("104925", "Boris Baseline", "win").as_deref(), Some("1"));

    // Lost rows precede win rows.
    let first_win = stats.rows().iter().position(|r| r[outcome] == "win").unwrap();
    assert!(stats.rows()[..first_win].iter().all(|r| r[outcome] == "lost"));
}

#[test]
fn serve_stats_skip_undefined_ratios_but_keep_the_row() {
    let stats = serve_stats(&sample_player_matches()).unwrap();
    let by_id = row_map(&stats, "player_id");

    let first_serve = stats.col("first_serve_percentage").unwrap();
    let aces = stats.col("number_of_aces").unwrap();
    let faults = stats.col("number_of_double_faults").unwrap();
    let bp = stats.col("break_points_saved_percentage").unwrap();

    // Casper's winning row has p_svpt = 0 and p_1stIn = 0: every serve
    // ratio there is undefined, so only the other match feeds the
    // percentage, while aces and faults still average over both rows.
    let casper = &by_id["106000"];
    let pct = cell_f64(&casper[first_serve]).unwrap();
    assert!((pct - 35.0 / 55.0).abs() < 1e-12);
    assert_eq!(casper[aces], "2.5");
    assert_eq!(casper[faults], "1");
    let saved = cell_f64(&casper[bp]).unwrap();
    assert!((saved - 2.0 / 5.0).abs() < 1e-12);

    // Dylan only ever lost; his single row defines every mean.
    let dylan = &by_id["107000"];
    let pct = cell_f64(&dylan[first_serve]).unwrap();
    assert!((pct - 20.0 / 30.0).abs() < 1e-12);
    assert_eq!(dylan[aces], "1");
}

#[test]
fn serve_stats_fill_sampleless_means_with_zero() {
    let csv = "tourney_id,tourney_name,surface,tourney_level,tourney_date,match_num,\
winner_id,winner_name,winner_rank,winner_rank_points,loser_id,loser_name,loser_rank,loser_rank_points,\
w_ace,w_df,w_svpt,w_1stIn,w_1stWon,w_2ndWon,w_bpSaved,w_bpFaced,\
l_ace,l_df,l_svpt,l_1stIn,l_1stWon,l_2ndWon,l_bpSaved,l_bpFaced\n\
2024-001,Test Open,Hard,G,20240101,1,A,Ann Ace,1,1000,B,Bo Break,2,900,2,1,0,0,0,0,0,0,1,2,12,6,4,2,0,2\n";
    let mut raw = parse_csv_table(csv).unwrap();
    raw.add_const_column("matchType", "solo");
    attach_iso_dates(&mut raw).unwrap();
    let matches = unpivot_player_matches(&raw).unwrap();

    let stats = serve_stats(&matches).unwrap();
    let by_id = row_map(&stats, "player_id");
    let ann = &by_id["A"];
    let first_serve = stats.col("first_serve_percentage").unwrap();
    let bp = stats.col("break_points_saved_percentage").unwrap();
    let aces = stats.col("number_of_aces").unwrap();
    assert_eq!(ann[first_serve], "0");
    assert_eq!(ann[bp], "0");
    assert_eq!(ann[aces], "2");
}
