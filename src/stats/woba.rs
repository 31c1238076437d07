// Season-indexed wOBA weight constants.
//
// Loaded once at startup and passed immutably into the derivation engine;
// never ambient state. A year missing from the table makes wOBA undefined
// for that year without affecting any other statistic.

use crate::table::{PlayerType, Table};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WobaError {
    #[error("failed to read wOBA constants {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in wOBA constants {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// Linear-weight coefficients for one season.
#[derive(Debug, Clone, Copy)]
pub struct WobaWeights {
    pub bb: f64,
    pub hbp: f64,
    pub single: f64,
    pub double: f64,
    pub triple: f64,
    pub hr: f64,
}

/// wOBA constants CSV row. Column names follow the FanGraphs guts table.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawWobaRow {
    Season: i32,
    wBB: f64,
    wHBP: f64,
    w1B: f64,
    w2B: f64,
    w3B: f64,
    wHR: f64,
}

/// All seasons' wOBA weights, keyed by year.
#[derive(Debug, Clone, Default)]
pub struct WobaTable {
    by_season: BTreeMap<i32, WobaWeights>,
}

impl WobaTable {
    /// An empty table: every lookup misses, so wOBA is undefined everywhere.
    /// Used as the degraded mode when the constants file is unreadable.
    pub fn empty() -> Self {
        WobaTable::default()
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, csv::Error> {
        let mut reader = csv::Reader::from_reader(rdr);
        let mut by_season = BTreeMap::new();
        for row in reader.deserialize::<RawWobaRow>() {
            let raw = row?;
            by_season.insert(
                raw.Season,
                WobaWeights {
                    bb: raw.wBB,
                    hbp: raw.wHBP,
                    single: raw.w1B,
                    double: raw.w2B,
                    triple: raw.w3B,
                    hr: raw.wHR,
                },
            );
        }
        Ok(WobaTable { by_season })
    }

    pub fn load(path: &Path) -> Result<Self, WobaError> {
        let file = std::fs::File::open(path).map_err(|e| WobaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file).map_err(|e| WobaError::Csv {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn get(&self, year: i32) -> Option<&WobaWeights> {
        self.by_season.get(&year)
    }

    pub fn seasons(&self) -> usize {
        self.by_season.len()
    }
}

/// Compute the wOBA column for a table.
///
/// The linear-weight numerator uses BB, HBP, 1B, 2B, 3B, HR (each created
/// as all-zero when absent, nulls filled with 0). The denominator is PA for
/// batting and the BF/TBF/derived-BF chain for pitching. Any non-finite
/// quotient (including 0/0) maps to 0. A year missing from the constants
/// table, or a table missing the columns needed for the denominator, yields
/// an all-null column.
pub fn calculate_woba(
    table: &mut Table,
    constants: &WobaTable,
    year: i32,
    player_type: PlayerType,
) -> Vec<Option<f64>> {
    let n = table.len();
    let weights = match constants.get(year) {
        Some(w) => *w,
        None => return vec![None; n],
    };

    for stat in ["BB", "HBP", "1B", "2B", "3B", "HR"] {
        table.ensure_column(stat, 0.0);
        table.fill_nulls(stat, 0.0);
    }

    let denom = match woba_denominator(table, player_type) {
        Some(d) => d,
        None => return vec![None; n],
    };

    let get = |name: &str| table.column(name).unwrap();
    let (bb, hbp) = (get("BB"), get("HBP"));
    let (b1, b2, b3, hr) = (get("1B"), get("2B"), get("3B"), get("HR"));

    (0..n)
        .map(|i| {
            let numerator = weights.bb * bb[i].unwrap_or(0.0)
                + weights.hbp * hbp[i].unwrap_or(0.0)
                + weights.single * b1[i].unwrap_or(0.0)
                + weights.double * b2[i].unwrap_or(0.0)
                + weights.triple * b3[i].unwrap_or(0.0)
                + weights.hr * hr[i].unwrap_or(0.0);
            let value = match denom[i] {
                Some(d) => numerator / d,
                None => f64::NAN,
            };
            // Division by zero and missing denominators both collapse to 0.
            if value.is_finite() {
                Some(value)
            } else {
                Some(0.0)
            }
        })
        .collect()
}

/// Plate appearances (batting) or batters faced (pitching), derived when
/// the direct column is absent. Returns `None` when the table cannot supply
/// a denominator at all.
fn woba_denominator(table: &Table, player_type: PlayerType) -> Option<Vec<Option<f64>>> {
    match player_type {
        PlayerType::Batting => {
            if let Some(pa) = table.column("PA") {
                return Some(pa.to_vec());
            }
            let cols = ["AB", "BB", "HBP", "SF", "SH"]
                .iter()
                .map(|c| table.column(c))
                .collect::<Option<Vec<_>>>()?;
            Some(sum_rows(&cols, table.len()))
        }
        PlayerType::Pitching => {
            if let Some(bf) = table.column("BF") {
                return Some(bf.to_vec());
            }
            if let Some(tbf) = table.column("TBF") {
                return Some(tbf.to_vec());
            }
            let ip = table.column("IP")?;
            let h = table.column("H")?;
            let bb = table.column("BB")?;
            let hbp = table.column("HBP")?;
            Some(
                (0..table.len())
                    .map(|i| {
                        Some(
                            ip[i]? * 3.0 + h[i].unwrap_or(0.0) + bb[i].unwrap_or(0.0)
                                + hbp[i].unwrap_or(0.0),
                        )
                    })
                    .collect(),
            )
        }
    }
}

fn sum_rows(cols: &[&[Option<f64>]], n: usize) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| cols.iter().try_fold(0.0, |acc, col| Some(acc + col[i]?)))
        .collect()
}
