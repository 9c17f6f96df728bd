use std::env;

const DEFAULT_SOURCE_BASE: &str =
    "https://raw.githubusercontent.com/JeffSackmann/tennis_atp/master";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchCategory {
    Solo,
    Doubles,
    Futures,
    QualChall,
}

impl MatchCategory {
    pub const ALL: [MatchCategory; 4] = [
        MatchCategory::Solo,
        MatchCategory::Doubles,
        MatchCategory::Futures,
        MatchCategory::QualChall,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MatchCategory::Solo => "solo",
            MatchCategory::Doubles => "doubles",
            MatchCategory::Futures => "futures",
            MatchCategory::QualChall => "qual_chall",
        }
    }

    /// Whether the category's files carry the single `winner`/`loser`
    /// column groups. The doubles files identify teams as
    /// `winner1_*`/`winner2_*` instead, which the player-centric
    /// transform cannot consume.
    pub fn has_player_columns(self) -> bool {
        !matches!(self, MatchCategory::Doubles)
    }

    fn file_stem(self) -> &'static str {
        match self {
            MatchCategory::Solo => "atp_matches",
            MatchCategory::Doubles => "atp_matches_doubles",
            MatchCategory::Futures => "atp_matches_futures",
            MatchCategory::QualChall => "atp_matches_qual_chall",
        }
    }

    /// Year span the public corpus actually publishes per category.
    fn published_span(self) -> (i32, i32) {
        match self {
            MatchCategory::Solo => (1968, 2024),
            MatchCategory::Doubles => (2000, 2019),
            MatchCategory::Futures => (1991, 2024),
            MatchCategory::QualChall => (1978, 2024),
        }
    }
}

/// Ordered source locations per match category plus the two reference
/// tables. Category order here is the concatenation order of the raw
/// table.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub categories: Vec<(MatchCategory, Vec<String>)>,
    pub players_url: String,
    pub rankings_url: String,
}

impl SourceSet {
    /// Default locations for the public corpus. `from_year`/`to_year`
    /// narrow every category to the intersection with its published
    /// span; a category whose intersection is empty gets no sources
    /// (and loads as an empty table).
    pub fn defaults(from_year: Option<i32>, to_year: Option<i32>) -> Self {
        let base = source_base();
        let categories = MatchCategory::ALL
            .into_iter()
            .map(|category| {
                let (first, last) = category.published_span();
                let first = from_year.map_or(first, |y| y.max(first));
                let last = to_year.map_or(last, |y| y.min(last));
                let urls = (first..=last)
                    .map(|year| format!("{base}/{}_{year}.csv", category.file_stem()))
                    .collect();
                (category, urls)
            })
            .collect();
        Self {
            categories,
            players_url: format!("{base}/atp_players.csv"),
            rankings_url: format!("{base}/atp_rankings_current.csv"),
        }
    }
}

fn source_base() -> String {
    match env::var("ATP_SOURCE_BASE") {
        Ok(base) if !base.trim().is_empty() => base.trim().trim_end_matches('/').to_string(),
        _ => DEFAULT_SOURCE_BASE.to_string(),
    }
}
