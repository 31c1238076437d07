// Loading and normalization of actual-outcome and projection tables.
//
// Sources are heterogeneous: the stats files key players by `playerId`,
// while projection systems use any of `xMLBAMID`, `MLBID`, `player_id`, or
// `playerId`, sometimes with float artifacts in the values. Everything is
// normalized to the canonical digit-string key before the tables reach the
// orchestrator. Missing or unreadable files degrade to an empty table with
// a warning; they never abort the run.

use crate::stats::{derive_stats, WobaTable};
use crate::table::{normalize_player_id, Column, PlayerType, Table};
use std::io::Read;
use std::path::Path;
use tracing::warn;

const ACTUAL_ID_COLUMNS: &[&str] = &["playerId"];
const PROJECTION_ID_COLUMNS: &[&str] = &["xMLBAMID", "MLBID", "player_id", "playerId"];
const NAME_COLUMNS: &[&str] = &["playerName", "Name", "Player"];

/// Load the canonical actual-stats table for one (year, player type).
pub fn load_actual(stats_dir: &Path, year: i32, player_type: PlayerType, woba: &WobaTable) -> Table {
    let path = stats_dir.join(format!("{year}_{}.csv", player_type.file_suffix()));
    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(_) => {
            warn!("actual stats file not found: {}", path.display());
            return Table::empty();
        }
    };
    match load_actual_from_reader(file, year, player_type, woba) {
        Ok(table) => table,
        Err(e) => {
            warn!("error reading {}: {e}", path.display());
            Table::empty()
        }
    }
}

/// Load one system's projection table for one (year, player type).
pub fn load_projection(
    projections_dir: &Path,
    year: i32,
    system: &str,
    player_type: PlayerType,
    woba: &WobaTable,
) -> Table {
    let path = projections_dir.join(format!(
        "{}_{year}_{}.csv",
        system.to_lowercase(),
        player_type.file_suffix()
    ));
    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(_) => {
            warn!("projection file not found: {}", path.display());
            return Table::empty();
        }
    };
    match load_projection_from_reader(file, year, player_type, woba) {
        Ok(table) => table,
        Err(e) => {
            warn!("error reading {}: {e}", path.display());
            Table::empty()
        }
    }
}

fn load_actual_from_reader<R: Read>(
    rdr: R,
    year: i32,
    player_type: PlayerType,
    woba: &WobaTable,
) -> Result<Table, csv::Error> {
    let (mut table, positions) = read_table(rdr, ACTUAL_ID_COLUMNS)?;

    // Position filtering: pitchers are excluded from the batting table and
    // are the only rows kept in the pitching table.
    if let Some(positions) = positions {
        let keep: Vec<bool> = positions
            .iter()
            .map(|p| match player_type {
                PlayerType::Batting => p != "P",
                PlayerType::Pitching => p == "P",
            })
            .collect();
        table = table.filter_rows(&keep);
    }

    // MLB stats report IP with fractional-out notation (x.1 = one out).
    if player_type == PlayerType::Pitching {
        if let Some(ip) = table.column("IP") {
            let converted: Column = ip
                .iter()
                .map(|cell| cell.map(convert_ip_to_decimal))
                .collect();
            table.set_column("IP", converted);
        }
    }

    derive_stats(&mut table, player_type, Some(year), woba);
    Ok(table)
}

fn load_projection_from_reader<R: Read>(
    rdr: R,
    year: i32,
    player_type: PlayerType,
    woba: &WobaTable,
) -> Result<Table, csv::Error> {
    let (mut table, _) = read_table(rdr, PROJECTION_ID_COLUMNS)?;

    // Backfill for systems that omit PA (Davenport): PA = AB + BB plus
    // whichever of HBP/SF/SH the system provides.
    if player_type == PlayerType::Batting
        && !table.has_column("PA")
        && table.has_column("AB")
        && table.has_column("BB")
    {
        let optional: Vec<&str> = ["HBP", "SF", "SH"]
            .into_iter()
            .filter(|c| table.has_column(c))
            .collect();
        let ab = table.column("AB").unwrap();
        let bb = table.column("BB").unwrap();
        let extras: Vec<&[Option<f64>]> =
            optional.iter().map(|c| table.column(c).unwrap()).collect();
        let pa: Column = (0..table.len())
            .map(|i| {
                extras
                    .iter()
                    .try_fold(ab[i]? + bb[i]?, |acc, col| Some(acc + col[i]?))
            })
            .collect();
        table.set_column("PA", pa);
    }
    if player_type == PlayerType::Batting {
        table.ensure_column("HBP", 0.0);
    }

    derive_stats(&mut table, player_type, Some(year), woba);
    Ok(table)
}

/// Read a CSV into a table: identifier normalized to the canonical key,
/// player name captured, position column (if any) returned separately as
/// strings, every other column parsed as optional numerics.
fn read_table<R: Read>(
    rdr: R,
    id_candidates: &[&str],
) -> Result<(Table, Option<Vec<String>>), csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let id_idx = match id_candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
    {
        Some(idx) => idx,
        None => {
            warn!("no identifier column found (looked for {id_candidates:?})");
            return Ok((Table::empty(), None));
        }
    };
    let name_idx = NAME_COLUMNS
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c));
    let position_idx = headers.iter().position(|h| h == "position");

    let stat_indices: Vec<usize> = (0..headers.len())
        .filter(|i| *i != id_idx && Some(*i) != name_idx && Some(*i) != position_idx)
        .collect();

    let mut ids = Vec::new();
    let mut names = Vec::new();
    let mut positions = Vec::new();
    let mut columns: Vec<Column> = vec![Vec::new(); stat_indices.len()];

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed row: {e}");
                continue;
            }
        };
        ids.push(normalize_player_id(record.get(id_idx).unwrap_or("")));
        names.push(
            name_idx
                .and_then(|i| record.get(i))
                .unwrap_or("Unknown")
                .trim()
                .to_string(),
        );
        if let Some(i) = position_idx {
            positions.push(record.get(i).unwrap_or("").trim().to_string());
        }
        for (slot, idx) in stat_indices.iter().enumerate() {
            let cell = record.get(*idx).unwrap_or("").trim();
            columns[slot].push(cell.parse::<f64>().ok().filter(|v| v.is_finite()));
        }
    }

    let mut table = Table::new(ids, names);
    for (slot, idx) in stat_indices.iter().enumerate() {
        table.set_column(headers[*idx].clone(), std::mem::take(&mut columns[slot]));
    }

    let positions = position_idx.map(|_| positions);
    Ok((table, positions))
}

/// Convert fractional-out IP notation (x.1, x.2) to decimal thirds.
fn convert_ip_to_decimal(ip: f64) -> f64 {
    let integer = ip.trunc();
    let fractional = ((ip - integer) * 10.0).round();
    match fractional as i64 {
        1 => integer + 1.0 / 3.0,
        2 => integer + 2.0 / 3.0,
        _ => ip,
    }
}
