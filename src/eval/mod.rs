// Evaluation Orchestrator.
//
// For every (year, system, player-type) combination: load both tables,
// left-join actual onto projections, fill unmatched projections with
// league-average fallbacks, league-adjust every rate stat, and emit one
// result per statistic with raw / league-adjusted / weighted bundles plus
// the largest misses. Combinations are independent; a missing input skips
// the combination and the run continues.

pub mod metrics;

use crate::config::EvalConfig;
use crate::eval::metrics::{compute_metrics, Metrics};
use crate::load::{load_actual, load_projection};
use crate::stats::WobaTable;
use crate::table::{Column, PlayerType, Table};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Identifies one evaluated combination.
pub type CombinationKey = (i32, String, PlayerType);

/// One large projection miss, retained for reporting.
#[derive(Debug, Clone)]
pub struct Miss {
    pub player_id: String,
    pub player_name: String,
    pub actual: f64,
    pub projected: f64,
    pub error: f64,
}

/// Immutable record of one (year, system, player-type, stat) evaluation.
#[derive(Debug, Clone)]
pub struct ProjectionResult {
    pub year: i32,
    pub system: String,
    pub player_type: PlayerType,
    pub stat: String,
    pub raw: Metrics,
    pub la: Metrics,
    pub wla: Metrics,
    pub n_players: usize,
    pub biggest_misses: Vec<Miss>,
}

/// The full run output: all per-stat results plus the merged frames
/// retained for the per-player export.
#[derive(Debug, Default)]
pub struct EvaluationRun {
    pub results: Vec<ProjectionResult>,
    pub merged: BTreeMap<CombinationKey, Table>,
}

/// Evaluate every (year, system, player-type) combination in the
/// configured order. Emission order is deterministic: year ascending as
/// configured, then system, then batting before pitching.
pub fn run_evaluation(config: &EvalConfig, woba: &WobaTable) -> EvaluationRun {
    let mut run = EvaluationRun::default();
    let total = config.years.len() * config.systems.len() * 2;
    let mut current = 0usize;

    for &year in &config.years {
        for system in &config.systems {
            for player_type in [PlayerType::Batting, PlayerType::Pitching] {
                current += 1;
                debug!("combination {current}/{total}");
                if let Some((results, merged)) =
                    evaluate_combination(config, woba, year, system, player_type)
                {
                    run.results.extend(results);
                    run.merged.insert((year, system.clone(), player_type), merged);
                }
            }
        }
    }
    run
}

/// Evaluate one combination. Returns `None` when either input table is
/// empty (a recorded gap, not an error).
pub fn evaluate_combination(
    config: &EvalConfig,
    woba: &WobaTable,
    year: i32,
    system: &str,
    player_type: PlayerType,
) -> Option<(Vec<ProjectionResult>, Table)> {
    let actual = load_actual(&config.stats_dir, year, player_type, woba);
    let projection = load_projection(&config.projections_dir, year, system, player_type, woba);

    if actual.is_empty() || projection.is_empty() {
        info!("skipping {system} {year} {}: missing data", player_type.as_str());
        return None;
    }

    let result = evaluate_tables(config, year, system, player_type, &actual, &projection);
    info!(
        "evaluated {system} {year} {}: {} players, {} stats",
        player_type.as_str(),
        result.1.len(),
        result.0.len()
    );
    Some(result)
}

/// Core of the orchestrator, operating on already-loaded tables.
pub fn evaluate_tables(
    config: &EvalConfig,
    year: i32,
    system: &str,
    player_type: PlayerType,
    actual: &Table,
    projection: &Table,
) -> (Vec<ProjectionResult>, Table) {
    let rate_stats = player_type.rate_stats();
    let volume_stats = player_type.volume_stats();
    let pt_col = player_type.playing_time_col();

    // Playing-time-weighted league averages over the actual population.
    let actual_avgs = league_averages(actual, rate_stats, pt_col);

    let mut merged = merge_left(actual, projection);

    // Unmatched projected rate stats take the actual league average; an
    // unmatched projection's playing time takes the configured fallback.
    for stat in rate_stats {
        if let Some(avg) = actual_avgs.get(*stat) {
            merged.fill_nulls(&format!("{stat}_y"), *avg);
        }
    }
    for stat in volume_stats {
        merged.fill_nulls(&format!("{stat}_y"), config.playing_time_fallback);
    }

    // League averages of the projected side, weighted by projected playing
    // time, computed after the fallback fills.
    let proj_avgs = projected_league_averages(&merged, rate_stats, pt_col);

    attach_league_adjusted_columns(&mut merged, rate_stats, &actual_avgs, &proj_avgs);

    let weights_col = merged
        .column(&format!("{pt_col}_x"))
        .or_else(|| merged.column(pt_col))
        .map(|c| c.to_vec());

    let mut results = Vec::new();
    for stat in rate_stats.iter().chain(volume_stats) {
        let Some(actual_col) = merged.column(&format!("{stat}_x")) else {
            continue;
        };
        let Some(proj_col) = merged.column(&format!("{stat}_y")) else {
            continue;
        };

        // Keep only rows where both sides are defined.
        let mut actual_clean = Vec::new();
        let mut proj_clean = Vec::new();
        let mut weights = Vec::new();
        let mut row_indices = Vec::new();
        for i in 0..merged.len() {
            if let (Some(a), Some(p)) = (actual_col[i], proj_col[i]) {
                actual_clean.push(a);
                proj_clean.push(p);
                weights.push(
                    weights_col
                        .as_ref()
                        .map_or(1.0, |w| w[i].unwrap_or(0.0)),
                );
                row_indices.push(i);
            }
        }
        if actual_clean.is_empty() {
            continue;
        }

        let adjusted = actual_avgs.get(*stat).zip(proj_avgs.get(*stat));
        let (raw, la, wla, miss_errors) = match adjusted {
            Some((a_avg, p_avg)) => {
                let actual_la: Vec<f64> = actual_clean.iter().map(|a| a - a_avg).collect();
                let proj_la: Vec<f64> = proj_clean.iter().map(|p| p - p_avg).collect();
                let raw = compute_metrics(&actual_clean, &proj_clean, None);
                let la = compute_metrics(&actual_la, &proj_la, None);
                let wla = compute_metrics(&actual_la, &proj_la, Some(&weights));
                // Rank misses by playing-time-weighted league-adjusted error.
                let errors: Vec<f64> = actual_la
                    .iter()
                    .zip(&proj_la)
                    .zip(&weights)
                    .map(|((a, p), w)| (a - p).abs() * w)
                    .collect();
                (raw, la, wla, errors)
            }
            None => {
                // Volume stats (and rate stats with no computable league
                // average) have no adjustment concept; LA and WLA degenerate
                // to the raw bundle and misses rank by raw error.
                let raw = compute_metrics(&actual_clean, &proj_clean, None);
                let errors: Vec<f64> = actual_clean
                    .iter()
                    .zip(&proj_clean)
                    .map(|(a, p)| (a - p).abs())
                    .collect();
                (raw, raw, raw, errors)
            }
        };

        let biggest_misses = find_biggest_misses(
            &merged,
            &row_indices,
            &actual_clean,
            &proj_clean,
            &miss_errors,
            config.n_misses,
        );

        results.push(ProjectionResult {
            year,
            system: system.to_string(),
            player_type,
            stat: stat.to_string(),
            raw,
            la,
            wla,
            n_players: actual_clean.len(),
            biggest_misses,
        });
    }

    (results, merged)
}

/// Left-join actual onto projection on the canonical identifier. Every
/// actual row appears exactly once; actual columns take the `_x` suffix,
/// projection columns `_y`. Duplicate projection ids keep the first row.
pub fn merge_left(actual: &Table, projection: &Table) -> Table {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, id) in projection.ids().iter().enumerate() {
        index.entry(id.as_str()).or_insert(i);
    }

    let mut merged = Table::new(actual.ids().to_vec(), actual.names().to_vec());
    for name in actual.column_names() {
        merged.set_column(format!("{name}_x"), actual.column(name).unwrap().to_vec());
    }
    for name in projection.column_names() {
        let src = projection.column(name).unwrap();
        let col: Column = actual
            .ids()
            .iter()
            .map(|id| index.get(id.as_str()).and_then(|&j| src[j]))
            .collect();
        merged.set_column(format!("{name}_y"), col);
    }
    merged
}

/// Playing-time-weighted mean per rate stat over the actual table. A stat
/// with no defined rows (or zero total weight) has no average and falls
/// back to raw-only evaluation.
fn league_averages(
    table: &Table,
    rate_stats: &[&str],
    weight_col: &str,
) -> BTreeMap<String, f64> {
    let mut avgs = BTreeMap::new();
    let Some(weights) = table.column(weight_col) else {
        return avgs;
    };
    for stat in rate_stats {
        if let Some(values) = table.column(stat) {
            if let Some(avg) = weighted_mean(values, weights) {
                avgs.insert(stat.to_string(), avg);
            }
        }
    }
    avgs
}

fn projected_league_averages(
    merged: &Table,
    rate_stats: &[&str],
    pt_col: &str,
) -> BTreeMap<String, f64> {
    let mut avgs = BTreeMap::new();
    let Some(weights) = merged.column(&format!("{pt_col}_y")) else {
        return avgs;
    };
    for stat in rate_stats {
        if let Some(values) = merged.column(&format!("{stat}_y")) {
            if let Some(avg) = weighted_mean(values, weights) {
                avgs.insert(stat.to_string(), avg);
            }
        }
    }
    avgs
}

/// Weighted mean over rows where both value and weight are defined.
fn weighted_mean(values: &[Option<f64>], weights: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut total = 0.0;
    for (v, w) in values.iter().zip(weights) {
        if let (Some(v), Some(w)) = (v, w) {
            sum += v * w;
            total += w;
        }
    }
    if total > 0.0 {
        Some(sum / total)
    } else {
        None
    }
}

/// Add `<stat>_actual_la` / `<stat>_proj_la` columns for every rate stat
/// with computable averages on both sides.
fn attach_league_adjusted_columns(
    merged: &mut Table,
    rate_stats: &[&str],
    actual_avgs: &BTreeMap<String, f64>,
    proj_avgs: &BTreeMap<String, f64>,
) {
    let mut new_columns: Vec<(String, Column)> = Vec::new();
    for stat in rate_stats {
        let (Some(a_avg), Some(p_avg)) = (actual_avgs.get(*stat), proj_avgs.get(*stat)) else {
            continue;
        };
        let (Some(actual_col), Some(proj_col)) = (
            merged.column(&format!("{stat}_x")),
            merged.column(&format!("{stat}_y")),
        ) else {
            continue;
        };
        new_columns.push((
            format!("{stat}_actual_la"),
            actual_col.iter().map(|c| c.map(|v| v - a_avg)).collect(),
        ));
        new_columns.push((
            format!("{stat}_proj_la"),
            proj_col.iter().map(|c| c.map(|v| v - p_avg)).collect(),
        ));
    }
    for (name, col) in new_columns {
        merged.set_column(name, col);
    }
}

/// The `n` rows with the largest error, descending.
fn find_biggest_misses(
    merged: &Table,
    row_indices: &[usize],
    actual: &[f64],
    projected: &[f64],
    errors: &[f64],
    n: usize,
) -> Vec<Miss> {
    let mut order: Vec<usize> = (0..errors.len()).collect();
    order.sort_by(|&a, &b| {
        errors[b]
            .partial_cmp(&errors[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(n);

    order
        .into_iter()
        .map(|k| {
            let row = row_indices[k];
            Miss {
                player_id: merged.ids()[row].clone(),
                player_name: merged.names()[row].clone(),
                actual: actual[k],
                projected: projected[k],
                error: errors[k],
            }
        })
        .collect()
}
