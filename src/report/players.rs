// Per-player time-series export.
//
// Reshapes the retained merged frames into one nested record per player
// (player -> year -> player-type -> {Actual, <system>...}), partitions the
// sorted player list into fixed-size chunks, and builds a manifest mapping
// each player to its chunk for lookup without loading every chunk.

use crate::config::EvalConfig;
use crate::eval::CombinationKey;
use crate::report::num_opt;
use crate::table::{PlayerType, Table};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

/// The chunked player export: chunk payloads (arrays of player records)
/// plus the manifest.
#[derive(Debug)]
pub struct PlayerExport {
    pub chunks: Vec<Value>,
    pub manifest: Value,
}

struct PlayerRecord {
    name: String,
    batting_years: usize,
    pitching_years: usize,
    years: Map<String, Value>,
}

/// Explode the merged frames into per-player records and chunk them.
pub fn explode_players(
    config: &EvalConfig,
    merged: &BTreeMap<CombinationKey, Table>,
) -> PlayerExport {
    // Row lookup per frame, and the id -> name roster across all frames.
    let mut row_index: HashMap<&CombinationKey, HashMap<&str, usize>> = HashMap::new();
    let mut roster: BTreeMap<String, String> = BTreeMap::new();
    for (key, frame) in merged {
        let mut index = HashMap::new();
        for (row, id) in frame.ids().iter().enumerate() {
            index.entry(id.as_str()).or_insert(row);
            roster
                .entry(id.clone())
                .or_insert_with(|| frame.names()[row].clone());
        }
        row_index.insert(key, index);
    }

    // BTreeMap iteration keeps players sorted by id for stable chunking.
    let mut players: Vec<(String, PlayerRecord)> = Vec::new();
    for (id, name) in &roster {
        let mut record = PlayerRecord {
            name: name.clone(),
            batting_years: 0,
            pitching_years: 0,
            years: Map::new(),
        };

        for &year in &config.years {
            let mut year_obj = Map::new();
            for player_type in [PlayerType::Batting, PlayerType::Pitching] {
                let mut type_obj = Map::new();
                for system in &config.systems {
                    let key = (year, system.clone(), player_type);
                    let Some(frame) = merged.get(&key) else {
                        continue;
                    };
                    let Some(&row) = row_index[&key].get(id.as_str()) else {
                        continue;
                    };

                    // The actual side is identical across systems; take it
                    // from the first frame containing the player.
                    if !type_obj.contains_key("Actual") {
                        type_obj.insert(
                            "Actual".to_string(),
                            stat_block(frame, row, player_type, "_x", "_actual_la"),
                        );
                    }
                    type_obj.insert(
                        system.clone(),
                        stat_block(frame, row, player_type, "_y", "_proj_la"),
                    );
                }
                if !type_obj.is_empty() {
                    match player_type {
                        PlayerType::Batting => record.batting_years += 1,
                        PlayerType::Pitching => record.pitching_years += 1,
                    }
                    year_obj.insert(player_type.as_str().to_string(), Value::Object(type_obj));
                }
            }
            if !year_obj.is_empty() {
                record.years.insert(year.to_string(), Value::Object(year_obj));
            }
        }

        if !record.years.is_empty() {
            players.push((id.clone(), record));
        }
    }

    build_chunks(config.chunk_size, players)
}

/// One side's stat block for a player row: counting and rate stats from the
/// suffixed columns, plus `<stat>_la` entries from the league-adjusted
/// columns where present.
fn stat_block(
    frame: &Table,
    row: usize,
    player_type: PlayerType,
    suffix: &str,
    la_suffix: &str,
) -> Value {
    let mut block = Map::new();
    for stat in player_type
        .export_cols()
        .iter()
        .chain(player_type.rate_stats())
    {
        if let Some(col) = frame.column(&format!("{stat}{suffix}")) {
            block.insert(stat.to_string(), num_opt(col[row]));
        }
    }
    for stat in player_type.rate_stats() {
        if let Some(col) = frame.column(&format!("{stat}{la_suffix}")) {
            block.insert(format!("{stat}_la"), num_opt(col[row]));
        }
    }
    Value::Object(block)
}

fn build_chunks(chunk_size: usize, players: Vec<(String, PlayerRecord)>) -> PlayerExport {
    let total_players = players.len();
    let mut chunks = Vec::new();
    let mut manifest_players = Map::new();
    let mut current = Vec::new();

    for (idx, (id, record)) in players.into_iter().enumerate() {
        let primary_type = if record.batting_years >= record.pitching_years {
            PlayerType::Batting
        } else {
            PlayerType::Pitching
        };
        manifest_players.insert(
            id.clone(),
            json!({
                "name": record.name,
                "primary_type": primary_type.as_str(),
                "chunk": idx / chunk_size,
            }),
        );
        current.push(json!({
            "id": id,
            "name": record.name,
            "primary_type": primary_type.as_str(),
            "years": Value::Object(record.years),
        }));
        if current.len() == chunk_size {
            chunks.push(Value::Array(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        chunks.push(Value::Array(current));
    }

    let manifest = json!({
        "total_players": total_players,
        "chunk_size": chunk_size,
        "total_chunks": chunks.len(),
        "players": Value::Object(manifest_players),
    });

    PlayerExport { chunks, manifest }
}
