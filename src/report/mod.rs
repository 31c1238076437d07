// Aggregation and export of evaluation results.
//
// Produces the three output artifacts: the run summary (site.json), the
// per-year metric records (years.json), and the chunked per-player time
// series (players/). All floating-point NaN and Infinity values serialize
// as null.

pub mod players;

use crate::config::EvalConfig;
use crate::eval::{Miss, ProjectionResult};
use crate::table::PlayerType;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Mean metrics for one (system, player-type) group across all evaluated
/// (year, stat) combinations.
#[derive(Debug, Clone, Copy)]
pub struct SummaryEntry {
    pub avg_rmse: f64,
    pub avg_mae: f64,
    pub avg_r2: f64,
    pub avg_la_rmse: f64,
    pub avg_la_mae: f64,
    pub avg_la_r2: f64,
    pub avg_wla_rmse: f64,
    pub avg_wla_mae: f64,
    pub avg_wla_r2: f64,
    pub n_evaluations: usize,
}

/// Group results by (system, player-type) and average each metric,
/// ignoring undefined (NaN) values. Empty groups are absent.
pub fn summarize(results: &[ProjectionResult]) -> BTreeMap<(String, PlayerType), SummaryEntry> {
    let mut groups: BTreeMap<(String, PlayerType), Vec<&ProjectionResult>> = BTreeMap::new();
    for r in results {
        groups
            .entry((r.system.clone(), r.player_type))
            .or_default()
            .push(r);
    }

    groups
        .into_iter()
        .map(|(key, group)| {
            let entry = SummaryEntry {
                avg_rmse: mean_defined(group.iter().map(|r| r.raw.rmse)),
                avg_mae: mean_defined(group.iter().map(|r| r.raw.mae)),
                avg_r2: mean_defined(group.iter().map(|r| r.raw.r_squared)),
                avg_la_rmse: mean_defined(group.iter().map(|r| r.la.rmse)),
                avg_la_mae: mean_defined(group.iter().map(|r| r.la.mae)),
                avg_la_r2: mean_defined(group.iter().map(|r| r.la.r_squared)),
                avg_wla_rmse: mean_defined(group.iter().map(|r| r.wla.rmse)),
                avg_wla_mae: mean_defined(group.iter().map(|r| r.wla.mae)),
                avg_wla_r2: mean_defined(group.iter().map(|r| r.wla.r_squared)),
                n_evaluations: group.len(),
            };
            (key, entry)
        })
        .collect()
}

fn mean_defined(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        if !v.is_nan() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// A JSON number, or null when the value is NaN or infinite.
pub fn num(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Optional cell variant of [`num`].
pub fn num_opt(v: Option<f64>) -> Value {
    v.map(num).unwrap_or(Value::Null)
}

/// The summary artifact: run metadata plus per-system mean metrics.
pub fn site_data(config: &EvalConfig, results: &[ProjectionResult]) -> Value {
    let mut years: Vec<i32> = results.iter().map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();

    let summary = summarize(results);
    let mut summary_obj = Map::new();
    for system in &config.systems {
        let mut system_obj = Map::new();
        for player_type in [PlayerType::Batting, PlayerType::Pitching] {
            if let Some(entry) = summary.get(&(system.clone(), player_type)) {
                system_obj.insert(
                    player_type.as_str().to_string(),
                    json!({
                        "avg_rmse": num(entry.avg_rmse),
                        "avg_mae": num(entry.avg_mae),
                        "avg_r2": num(entry.avg_r2),
                        "avg_la_rmse": num(entry.avg_la_rmse),
                        "avg_la_mae": num(entry.avg_la_mae),
                        "avg_la_r2": num(entry.avg_la_r2),
                        "avg_wla_rmse": num(entry.avg_wla_rmse),
                        "avg_wla_mae": num(entry.avg_wla_mae),
                        "avg_wla_r2": num(entry.avg_wla_r2),
                        "n_evaluations": entry.n_evaluations,
                    }),
                );
            }
        }
        if !system_obj.is_empty() {
            summary_obj.insert(system.clone(), Value::Object(system_obj));
        }
    }

    json!({
        "meta": {
            "years": years,
            "projection_systems": config.systems,
            "generated_at": Utc::now().to_rfc3339(),
        },
        "years": years,
        "summary": Value::Object(summary_obj),
    })
}

/// The per-year artifact: every per-stat record, split by player type.
pub fn years_data(results: &[ProjectionResult]) -> Value {
    let mut years: Vec<i32> = results.iter().map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();

    let mut out = Map::new();
    for year in years {
        let batting: Vec<Value> = results
            .iter()
            .filter(|r| r.year == year && r.player_type == PlayerType::Batting)
            .map(result_to_json)
            .collect();
        let pitching: Vec<Value> = results
            .iter()
            .filter(|r| r.year == year && r.player_type == PlayerType::Pitching)
            .map(result_to_json)
            .collect();
        out.insert(
            year.to_string(),
            json!({ "batting": batting, "pitching": pitching }),
        );
    }
    Value::Object(out)
}

fn result_to_json(result: &ProjectionResult) -> Value {
    json!({
        "system": result.system,
        "player_type": result.player_type.as_str(),
        "stat": result.stat,
        "rmse": num(result.raw.rmse),
        "mae": num(result.raw.mae),
        "bias": num(result.raw.bias),
        "r_squared": num(result.raw.r_squared),
        "la_rmse": num(result.la.rmse),
        "la_mae": num(result.la.mae),
        "la_bias": num(result.la.bias),
        "la_r_squared": num(result.la.r_squared),
        "wla_rmse": num(result.wla.rmse),
        "wla_mae": num(result.wla.mae),
        "wla_bias": num(result.wla.bias),
        "wla_r_squared": num(result.wla.r_squared),
        "n_players": result.n_players,
        "biggest_misses": result.biggest_misses.iter().map(miss_to_json).collect::<Vec<_>>(),
    })
}

fn miss_to_json(miss: &Miss) -> Value {
    json!({
        "player_id": miss.player_id,
        "player_name": miss.player_name,
        "actual": num(miss.actual),
        "projected": num(miss.projected),
        "error": num(miss.error),
    })
}

/// Write a JSON value, creating parent directories as needed.
pub fn write_json(path: &Path, value: &Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}
