// Columnar stat table: the common shape for actual-outcome and projection
// data after CSV ingestion.
//
// Identity (player id and name) lives in dedicated string vectors; every
// stat column is a named vector of optional f64. A `None` cell means the
// value was missing or unparseable in the source; a column absent from the
// map means the source never provided that field at all. Derivation rules
// distinguish the two cases.

use std::collections::BTreeMap;

/// Batting or pitching side of the dataset. Carries the stat catalogs and
/// column conventions that differ between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayerType {
    Batting,
    Pitching,
}

impl PlayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerType::Batting => "batting",
            PlayerType::Pitching => "pitching",
        }
    }

    /// File name suffix used by the stats and projections directories.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            PlayerType::Batting => "bat",
            PlayerType::Pitching => "pit",
        }
    }

    /// The playing-time column used as the weight for league averages.
    pub fn playing_time_col(&self) -> &'static str {
        match self {
            PlayerType::Batting => "PA",
            PlayerType::Pitching => "BF",
        }
    }

    /// Volume (playing-time) stats evaluated with raw metrics only.
    pub fn volume_stats(&self) -> &'static [&'static str] {
        match self {
            PlayerType::Batting => &["PA"],
            PlayerType::Pitching => &["BF"],
        }
    }

    /// Rate stats evaluated in raw, league-adjusted, and weighted
    /// league-adjusted variants.
    pub fn rate_stats(&self) -> &'static [&'static str] {
        match self {
            PlayerType::Batting => &[
                "wOBA",
                "SO/PA",
                "BB/PA",
                "HBP/PA",
                "HR/BIP",
                "BABIP",
                "1B/(BIP-HR)",
                "2B/(BIP-HR)",
                "3B/(BIP-HR)",
                "R/PA",
                "RBI/PA",
                "SB/TOF",
                "AVG",
                "OBP",
                "SLG",
            ],
            PlayerType::Pitching => &[
                "wOBA",
                "SO/BF",
                "BB/BF",
                "HBP/BF",
                "HR/BIP",
                "BABIP",
                "1B/(BIP-HR)",
                "2B/(BIP-HR)",
                "3B/(BIP-HR)",
                "R/BF",
                "ER/BF",
                "W/G",
                "L/G",
                "SV/G",
                "HLD/G",
                "ERA",
                "WHIP",
            ],
        }
    }

    /// Counting-stat columns carried into the per-player export alongside
    /// the rate stats.
    pub fn export_cols(&self) -> &'static [&'static str] {
        match self {
            PlayerType::Batting => &[
                "PA", "AB", "H", "1B", "2B", "3B", "HR", "BB", "SO", "HBP", "R", "RBI", "SB",
                "BIP", "TOF",
            ],
            PlayerType::Pitching => &[
                "BF", "IP", "H", "1B", "2B", "3B", "HR", "BB", "SO", "HBP", "ER", "R", "W", "L",
                "SV", "HLD", "G", "BIP",
            ],
        }
    }
}

/// A single optional-numeric column.
pub type Column = Vec<Option<f64>>;

/// In-memory stat table. Row order is the source row order (or, for merged
/// frames, the actual-side row order).
#[derive(Debug, Clone, Default)]
pub struct Table {
    ids: Vec<String>,
    names: Vec<String>,
    columns: BTreeMap<String, Column>,
}

impl Table {
    pub fn new(ids: Vec<String>, names: Vec<String>) -> Self {
        debug_assert_eq!(ids.len(), names.len());
        Table {
            ids,
            names,
            columns: BTreeMap::new(),
        }
    }

    /// An empty table, used as the non-fatal "missing input" result.
    pub fn empty() -> Self {
        Table::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Insert or replace a column. Panics if the length does not match the
    /// table's row count (construction bug, not a data condition).
    pub fn set_column(&mut self, name: impl Into<String>, values: Column) {
        assert_eq!(values.len(), self.len(), "column length mismatch");
        self.columns.insert(name.into(), values);
    }

    /// Ensure a column exists, creating it filled with `fill` when absent.
    pub fn ensure_column(&mut self, name: &str, fill: f64) {
        if !self.columns.contains_key(name) {
            let col = vec![Some(fill); self.len()];
            self.columns.insert(name.to_string(), col);
        }
    }

    /// Replace null cells with `fill` in an existing column. No-op when the
    /// column is absent (schema gap, not an error).
    pub fn fill_nulls(&mut self, name: &str, fill: f64) {
        if let Some(col) = self.columns.get_mut(name) {
            for cell in col.iter_mut() {
                if cell.is_none() {
                    *cell = Some(fill);
                }
            }
        }
    }

    /// Sum of the non-null cells in a column; 0.0 when absent or all-null.
    pub fn column_sum(&self, name: &str) -> f64 {
        self.column(name)
            .map(|col| col.iter().flatten().sum())
            .unwrap_or(0.0)
    }

    /// Keep only the rows where `keep` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Table {
        debug_assert_eq!(keep.len(), self.len());
        let pick =
            |v: &[String]| -> Vec<String> {
                v.iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(s, _)| s.clone())
                    .collect()
            };
        let mut out = Table::new(pick(&self.ids), pick(&self.names));
        for (name, col) in &self.columns {
            let filtered: Column = col
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(c, _)| *c)
                .collect();
            out.columns.insert(name.clone(), filtered);
        }
        out
    }
}

/// Normalize a raw identifier cell to the canonical cross-source key:
/// digits only, float artifacts ("660271.0") stripped. Values that do not
/// parse as a finite number normalize to "0", matching the coerce-to-zero
/// policy of the source data pipeline.
pub fn normalize_player_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => format!("{}", v.trunc() as i64),
        _ => "0".to_string(),
    }
}
