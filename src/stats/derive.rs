// Stat Derivation Engine.
//
// Given a raw table of counting stats, fills nulls in the required columns,
// derives missing fields (PA, BF, singles, R/ER), and computes the full
// rate-stat catalog for the player type. Every rate formula yields 0 when
// its denominator is 0. A rule whose input columns are wholly absent is
// skipped, leaving the derived column absent (silent schema-gap degrade).

use crate::stats::woba::{calculate_woba, WobaTable};
use crate::table::{Column, PlayerType, Table};

const BATTING_REQUIRED: &[&str] = &[
    "PA", "AB", "H", "BB", "SO", "HBP", "HR", "2B", "3B", "SF", "SH",
];
const PITCHING_REQUIRED: &[&str] = &[
    "BF", "H", "BB", "SO", "HBP", "HR", "2B", "3B", "IP", "ER", "G",
];

/// Derive all rate stats in place. `year` enables wOBA via the constants
/// table; without it wOBA is left uncomputed.
pub fn derive_stats(
    table: &mut Table,
    player_type: PlayerType,
    year: Option<i32>,
    woba: &WobaTable,
) {
    table.ensure_column("HBP", 0.0);

    let required = match player_type {
        PlayerType::Batting => BATTING_REQUIRED,
        PlayerType::Pitching => PITCHING_REQUIRED,
    };
    for col in required {
        table.fill_nulls(col, 0.0);
    }

    derive_singles(table);

    match player_type {
        PlayerType::Batting => derive_batting(table, year, woba),
        PlayerType::Pitching => derive_pitching(table, year, woba),
    }
}

/// 1B = H - 2B - 3B - HR, when all four are present.
fn derive_singles(table: &mut Table) {
    if let Some(col) = combine4(table, "H", "2B", "3B", "HR", |h, d, t, hr| h - d - t - hr) {
        table.set_column("1B", col);
    }
}

fn derive_batting(table: &mut Table, year: Option<i32>, woba: &WobaTable) {
    // PA = AB + BB + HBP + SF + SH when PA is absent and all operands exist.
    if !table.has_column("PA") {
        let operands = ["AB", "BB", "HBP", "SF", "SH"];
        if operands.iter().all(|c| table.has_column(c)) {
            let cols: Vec<&[Option<f64>]> =
                operands.iter().map(|c| table.column(c).unwrap()).collect();
            let pa: Column = (0..table.len())
                .map(|i| cols.iter().try_fold(0.0, |acc, col| Some(acc + col[i]?)))
                .collect();
            table.set_column("PA", pa);
        }
    }

    if !table.has_column("PA") {
        return;
    }

    derive_ratio(table, "SO/PA", "SO", "PA");
    derive_ratio(table, "BB/PA", "BB", "PA");
    derive_ratio(table, "HBP/PA", "HBP", "PA");

    if let Some(bip) = combine4(table, "PA", "SO", "BB", "HBP", |pa, so, bb, hbp| {
        pa - so - bb - hbp
    }) {
        table.set_column("BIP", bip);
    }
    derive_ratio(table, "HR/BIP", "HR", "BIP");

    derive_ratio(table, "AVG", "H", "AB");
    derive_obp(table);
    derive_slg(table);

    if let Some(year) = year {
        let col = calculate_woba(table, woba, year, PlayerType::Batting);
        table.set_column("wOBA", col);
    }

    derive_ratio(table, "R/PA", "R", "PA");
    derive_ratio(table, "RBI/PA", "RBI", "PA");

    derive_bip_minus_hr_rates(table);
    derive_sb_tof(table);
}

fn derive_pitching(table: &mut Table, year: Option<i32>, woba: &WobaTable) {
    // Some projection sources label strikeouts K instead of SO.
    if !table.has_column("SO") {
        if let Some(k) = table.column("K") {
            let k = k.to_vec();
            table.set_column("SO", k);
        }
    }

    // Back-derive runs and earned runs from rate forms when only those exist.
    if !table.has_column("R") {
        if let Some(r) = combine2(table, "RA", "IP", |ra, ip| {
            if ip == 0.0 {
                0.0
            } else {
                ra * ip / 9.0
            }
        }) {
            table.set_column("R", r);
        }
    }
    if !table.has_column("ER") {
        if let Some(er) = combine2(table, "ERA", "IP", |era, ip| {
            if ip == 0.0 {
                0.0
            } else {
                era * ip / 9.0
            }
        }) {
            table.set_column("ER", er);
        }
    }

    derive_bf(table);

    if !table.has_column("BF") {
        return;
    }

    derive_ratio(table, "SO/BF", "SO", "BF");
    derive_ratio(table, "BB/BF", "BB", "BF");
    derive_ratio(table, "HBP/BF", "HBP", "BF");

    if let Some(bip) = combine4(table, "BF", "SO", "BB", "HBP", |bf, so, bb, hbp| {
        bf - so - bb - hbp
    }) {
        table.set_column("BIP", bip);
    }
    derive_ratio(table, "HR/BIP", "HR", "BIP");

    if table.has_column("IP") && table.has_column("ER") {
        if let Some(era) = combine2(table, "ER", "IP", |er, ip| {
            if ip == 0.0 {
                0.0
            } else {
                er * 9.0 / ip
            }
        }) {
            table.set_column("ERA", era);
        }
        if let Some(whip) = combine3(table, "BB", "H", "IP", |bb, h, ip| {
            if ip == 0.0 {
                0.0
            } else {
                (bb + h) / ip
            }
        }) {
            table.set_column("WHIP", whip);
        }
    }

    if let Some(year) = year {
        let col = calculate_woba(table, woba, year, PlayerType::Pitching);
        table.set_column("wOBA", col);
    }

    derive_ratio(table, "R/BF", "R", "BF");
    derive_ratio(table, "ER/BF", "ER", "BF");

    derive_bip_minus_hr_rates(table);

    if table.has_column("G") {
        for stat in ["W", "L", "SV", "HLD"] {
            if table.has_column(stat) {
                table.fill_nulls(stat, 0.0);
                derive_ratio(table, &format!("{stat}/G"), stat, "G");
            }
        }
    }
}

/// BF preference chain: keep BF when it carries data, fall back to TBF,
/// else derive from IP*3 + H + BB + HBP.
fn derive_bf(table: &mut Table) {
    if table.has_column("BF") && table.column_sum("BF") > 0.0 {
        return;
    }
    if table.has_column("TBF") && table.column_sum("TBF") > 0.0 {
        let tbf = table.column("TBF").unwrap().to_vec();
        table.set_column("BF", tbf);
        return;
    }
    if let Some(bf) = combine4(table, "IP", "H", "BB", "HBP", |ip, h, bb, hbp| {
        ip * 3.0 + h + bb + hbp
    }) {
        table.set_column("BF", bf);
    }
}

/// OBP = (H + BB + HBP) / (AB + BB + HBP + SF). SF contributes 0 when the
/// column is absent entirely.
fn derive_obp(table: &mut Table) {
    let (h, bb, hbp, ab) = match (
        table.column("H"),
        table.column("BB"),
        table.column("HBP"),
        table.column("AB"),
    ) {
        (Some(h), Some(bb), Some(hbp), Some(ab)) => (h, bb, hbp, ab),
        _ => return,
    };
    let sf = table.column("SF");
    let obp: Column = (0..h.len())
        .map(|i| {
            let sf_i = sf.map_or(0.0, |col| col[i].unwrap_or(0.0));
            let (h, bb, hbp, ab) = (h[i]?, bb[i]?, hbp[i]?, ab[i]?);
            let den = ab + bb + hbp + sf_i;
            Some(if den == 0.0 { 0.0 } else { (h + bb + hbp) / den })
        })
        .collect();
    table.set_column("OBP", obp);
}

/// SLG = (1B + 2*2B + 3*3B + 4*HR) / AB.
fn derive_slg(table: &mut Table) {
    let cols = ["1B", "2B", "3B", "HR", "AB"];
    if !cols.iter().all(|c| table.has_column(c)) {
        return;
    }
    let get = |c: &str| table.column(c).unwrap();
    let (b1, b2, b3, hr, ab) = (get("1B"), get("2B"), get("3B"), get("HR"), get("AB"));
    let slg: Column = (0..b1.len())
        .map(|i| {
            let (b1, b2, b3, hr, ab) = (b1[i]?, b2[i]?, b3[i]?, hr[i]?, ab[i]?);
            Some(if ab == 0.0 {
                0.0
            } else {
                (b1 + 2.0 * b2 + 3.0 * b3 + 4.0 * hr) / ab
            })
        })
        .collect();
    table.set_column("SLG", slg);
}

/// BABIP and the per-hit-type rates over (BIP - HR).
fn derive_bip_minus_hr_rates(table: &mut Table) {
    let cols = ["H", "2B", "3B", "HR", "BIP", "1B"];
    if !cols.iter().all(|c| table.has_column(c)) {
        return;
    }
    let n = table.len();
    let get = |c: &str| table.column(c).unwrap();
    let (h, hr, bip) = (get("H"), get("HR"), get("BIP"));
    let den: Vec<Option<f64>> = (0..n).map(|i| Some(bip[i]? - hr[i]?)).collect();

    let babip: Column = (0..n)
        .map(|i| {
            let d = den[i]?;
            Some(if d == 0.0 { 0.0 } else { (h[i]? - hr[i]?) / d })
        })
        .collect();
    table.set_column("BABIP", babip);

    for (out, num) in [
        ("1B/(BIP-HR)", "1B"),
        ("2B/(BIP-HR)", "2B"),
        ("3B/(BIP-HR)", "3B"),
    ] {
        let num_col = table.column(num).unwrap();
        let col: Column = (0..n)
            .map(|i| {
                let d = den[i]?;
                Some(if d == 0.0 { 0.0 } else { num_col[i]? / d })
            })
            .collect();
        table.set_column(out, col);
    }
}

/// SB / TOF, where TOF = BB + HBP + H - 2B - 3B - HR (times on first).
fn derive_sb_tof(table: &mut Table) {
    let cols = ["SB", "BB", "HBP", "H", "2B", "3B", "HR"];
    if !cols.iter().all(|c| table.has_column(c)) {
        return;
    }
    table.fill_nulls("SB", 0.0);
    let get = |c: &str| table.column(c).unwrap();
    let (bb, hbp, h) = (get("BB"), get("HBP"), get("H"));
    let (b2, b3, hr, sb) = (get("2B"), get("3B"), get("HR"), get("SB"));
    let n = table.len();
    let tof: Column = (0..n)
        .map(|i| Some(bb[i]? + hbp[i]? + h[i]? - b2[i]? - b3[i]? - hr[i]?))
        .collect();
    let ratio: Column = (0..n)
        .map(|i| {
            let t = tof[i]?;
            Some(if t == 0.0 { 0.0 } else { sb[i]? / t })
        })
        .collect();
    table.set_column("TOF", tof);
    table.set_column("SB/TOF", ratio);
}

// ---------------------------------------------------------------------------
// Column combinators
// ---------------------------------------------------------------------------

/// out = num / den with the zero-denominator -> 0 policy; skipped when
/// either column is absent. Null operands propagate as null.
fn derive_ratio(table: &mut Table, out: &str, num: &str, den: &str) {
    let col = match (table.column(num), table.column(den)) {
        (Some(num), Some(den)) => num
            .iter()
            .zip(den)
            .map(|(n, d)| {
                let (n, d) = ((*n)?, (*d)?);
                Some(if d == 0.0 { 0.0 } else { n / d })
            })
            .collect::<Column>(),
        _ => return,
    };
    table.set_column(out, col);
}

fn combine2(table: &Table, a: &str, b: &str, f: impl Fn(f64, f64) -> f64) -> Option<Column> {
    let (a, b) = (table.column(a)?, table.column(b)?);
    Some(
        a.iter()
            .zip(b)
            .map(|(x, y)| Some(f((*x)?, (*y)?)))
            .collect(),
    )
}

fn combine3(
    table: &Table,
    a: &str,
    b: &str,
    c: &str,
    f: impl Fn(f64, f64, f64) -> f64,
) -> Option<Column> {
    let (a, b, c) = (table.column(a)?, table.column(b)?, table.column(c)?);
    Some(
        (0..a.len())
            .map(|i| Some(f(a[i]?, b[i]?, c[i]?)))
            .collect(),
    )
}

fn combine4(
    table: &Table,
    a: &str,
    b: &str,
    c: &str,
    d: &str,
    f: impl Fn(f64, f64, f64, f64) -> f64,
) -> Option<Column> {
    let (a, b, c, d) = (
        table.column(a)?,
        table.column(b)?,
        table.column(c)?,
        table.column(d)?,
    );
    Some(
        (0..a.len())
            .map(|i| Some(f(a[i]?, b[i]?, c[i]?, d[i]?)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::woba::WobaTable;

    fn set(t: &mut Table, name: &str, vals: &[f64]) {
        t.set_column(name, vals.iter().map(|v| Some(*v)).collect());
    }

    fn cell(t: &Table, name: &str, i: usize) -> f64 {
        t.column(name).unwrap()[i].unwrap()
    }

    fn batter_row() -> Table {
        // The worked example: PA=560, BIP=405, AVG=.300, OBP~.366, SLG=.488.
        let mut t = Table::new(vec!["1".into()], vec!["A".into()]);
        set(&mut t, "AB", &[500.0]);
        set(&mut t, "H", &[150.0]);
        set(&mut t, "BB", &[50.0]);
        set(&mut t, "HBP", &[5.0]);
        set(&mut t, "SF", &[5.0]);
        set(&mut t, "SH", &[0.0]);
        set(&mut t, "SO", &[100.0]);
        set(&mut t, "HR", &[20.0]);
        set(&mut t, "2B", &[30.0]);
        set(&mut t, "3B", &[2.0]);
        t
    }

    // -- Singles derivation --

    #[test]
    fn singles_from_hit_breakdown() {
        let mut t = Table::new(vec!["1".into()], vec!["A".into()]);
        set(&mut t, "H", &[100.0]);
        set(&mut t, "2B", &[20.0]);
        set(&mut t, "3B", &[5.0]);
        set(&mut t, "HR", &[10.0]);
        derive_singles(&mut t);
        assert_eq!(cell(&t, "1B", 0), 65.0);
    }

    // -- Batting derivation, worked example --

    #[test]
    fn batting_example_scenario() {
        let mut t = batter_row();
        derive_stats(&mut t, PlayerType::Batting, None, &WobaTable::empty());

        assert_eq!(cell(&t, "PA", 0), 560.0);
        assert_eq!(cell(&t, "BIP", 0), 405.0);
        assert!((cell(&t, "AVG", 0) - 0.300).abs() < 1e-12);
        assert!((cell(&t, "OBP", 0) - 205.0 / 560.0).abs() < 1e-12);
        assert!((cell(&t, "SLG", 0) - 0.488).abs() < 1e-12);
        assert_eq!(cell(&t, "1B", 0), 98.0);
        assert!((cell(&t, "SO/PA", 0) - 100.0 / 560.0).abs() < 1e-12);
        // BABIP = (150-20)/(405-20)
        assert!((cell(&t, "BABIP", 0) - 130.0 / 385.0).abs() < 1e-12);
        // No year: wOBA not computed.
        assert!(!t.has_column("wOBA"));
    }

    #[test]
    fn batting_pa_kept_when_present() {
        let mut t = batter_row();
        set(&mut t, "PA", &[600.0]);
        derive_stats(&mut t, PlayerType::Batting, None, &WobaTable::empty());
        assert_eq!(cell(&t, "PA", 0), 600.0);
    }

    // -- Zero-denominator policy --

    #[test]
    fn zero_denominators_yield_zero_not_nan() {
        let mut t = Table::new(vec!["1".into()], vec!["A".into()]);
        for col in ["AB", "H", "BB", "HBP", "SF", "SH", "SO", "HR", "2B", "3B", "SB", "R", "RBI"] {
            set(&mut t, col, &[0.0]);
        }
        derive_stats(&mut t, PlayerType::Batting, None, &WobaTable::empty());
        for stat in [
            "SO/PA", "BB/PA", "HBP/PA", "HR/BIP", "AVG", "OBP", "SLG", "R/PA", "RBI/PA",
            "BABIP", "1B/(BIP-HR)", "SB/TOF",
        ] {
            assert_eq!(cell(&t, stat, 0), 0.0, "{stat} should be 0, not NaN");
        }
    }

    // -- Null fill --

    #[test]
    fn required_nulls_filled_with_zero() {
        let mut t = batter_row();
        t.set_column("SO", vec![None]);
        derive_stats(&mut t, PlayerType::Batting, None, &WobaTable::empty());
        assert_eq!(cell(&t, "SO", 0), 0.0);
        // BIP now excludes no strikeouts: 560 - 0 - 50 - 5.
        assert_eq!(cell(&t, "BIP", 0), 505.0);
    }

    // -- Schema gaps --

    #[test]
    fn absent_optional_columns_skip_their_stats() {
        let mut t = batter_row();
        derive_stats(&mut t, PlayerType::Batting, None, &WobaTable::empty());
        // R, RBI, SB were never provided.
        assert!(!t.has_column("R/PA"));
        assert!(!t.has_column("RBI/PA"));
        assert!(!t.has_column("SB/TOF"));
    }

    #[test]
    fn hbp_created_when_absent() {
        let mut t = batter_row();
        // Rebuild without HBP.
        let mut stripped = Table::new(vec!["1".into()], vec!["A".into()]);
        for col in ["AB", "H", "BB", "SF", "SH", "SO", "HR", "2B", "3B"] {
            stripped.set_column(col, t.column(col).unwrap().to_vec());
        }
        t = stripped;
        derive_stats(&mut t, PlayerType::Batting, None, &WobaTable::empty());
        assert_eq!(cell(&t, "HBP", 0), 0.0);
        assert_eq!(cell(&t, "PA", 0), 555.0);
    }

    // -- Pitching --

    fn pitcher_row() -> Table {
        let mut t = Table::new(vec!["1".into()], vec!["P".into()]);
        set(&mut t, "IP", &[180.0]);
        set(&mut t, "H", &[160.0]);
        set(&mut t, "BB", &[50.0]);
        set(&mut t, "HBP", &[5.0]);
        set(&mut t, "SO", &[190.0]);
        set(&mut t, "HR", &[22.0]);
        set(&mut t, "2B", &[30.0]);
        set(&mut t, "3B", &[3.0]);
        set(&mut t, "ER", &[70.0]);
        set(&mut t, "G", &[32.0]);
        set(&mut t, "W", &[12.0]);
        set(&mut t, "L", &[8.0]);
        set(&mut t, "SV", &[0.0]);
        set(&mut t, "HLD", &[0.0]);
        t
    }

    #[test]
    fn pitching_bf_derived_from_ip() {
        let mut t = pitcher_row();
        derive_stats(&mut t, PlayerType::Pitching, None, &WobaTable::empty());
        // 180*3 + 160 + 50 + 5 = 755
        assert_eq!(cell(&t, "BF", 0), 755.0);
        assert!((cell(&t, "SO/BF", 0) - 190.0 / 755.0).abs() < 1e-12);
        assert!((cell(&t, "ERA", 0) - 70.0 * 9.0 / 180.0).abs() < 1e-12);
        assert!((cell(&t, "WHIP", 0) - 210.0 / 180.0).abs() < 1e-12);
        assert!((cell(&t, "W/G", 0) - 12.0 / 32.0).abs() < 1e-12);
        assert_eq!(cell(&t, "SV/G", 0), 0.0);
    }

    #[test]
    fn pitching_bf_prefers_existing_over_tbf_and_derived() {
        let mut t = pitcher_row();
        set(&mut t, "TBF", &[760.0]);
        set(&mut t, "BF", &[765.0]);
        derive_stats(&mut t, PlayerType::Pitching, None, &WobaTable::empty());
        assert_eq!(cell(&t, "BF", 0), 765.0);

        let mut t = pitcher_row();
        set(&mut t, "TBF", &[760.0]);
        derive_stats(&mut t, PlayerType::Pitching, None, &WobaTable::empty());
        assert_eq!(cell(&t, "BF", 0), 760.0);
    }

    #[test]
    fn pitching_all_zero_bf_falls_through_chain() {
        let mut t = pitcher_row();
        set(&mut t, "BF", &[0.0]);
        derive_stats(&mut t, PlayerType::Pitching, None, &WobaTable::empty());
        assert_eq!(cell(&t, "BF", 0), 755.0);
    }

    #[test]
    fn pitching_k_aliased_to_so() {
        let mut t = Table::new(vec!["1".into()], vec!["P".into()]);
        set(&mut t, "IP", &[60.0]);
        set(&mut t, "H", &[50.0]);
        set(&mut t, "BB", &[20.0]);
        set(&mut t, "K", &[70.0]);
        set(&mut t, "HR", &[6.0]);
        set(&mut t, "2B", &[10.0]);
        set(&mut t, "3B", &[1.0]);
        set(&mut t, "ER", &[20.0]);
        derive_stats(&mut t, PlayerType::Pitching, None, &WobaTable::empty());
        assert_eq!(cell(&t, "SO", 0), 70.0);
        // BF = 180 + 50 + 20 + 0 = 250
        assert!((cell(&t, "SO/BF", 0) - 70.0 / 250.0).abs() < 1e-12);
    }

    #[test]
    fn pitching_er_back_derived_from_era() {
        let mut t = Table::new(vec!["1".into()], vec!["P".into()]);
        set(&mut t, "IP", &[90.0]);
        set(&mut t, "H", &[80.0]);
        set(&mut t, "BB", &[30.0]);
        set(&mut t, "SO", &[95.0]);
        set(&mut t, "HR", &[10.0]);
        set(&mut t, "2B", &[15.0]);
        set(&mut t, "3B", &[2.0]);
        set(&mut t, "ERA", &[3.60]);
        set(&mut t, "RA", &[4.20]);
        derive_stats(&mut t, PlayerType::Pitching, None, &WobaTable::empty());
        assert!((cell(&t, "ER", 0) - 36.0).abs() < 1e-9);
        assert!((cell(&t, "R", 0) - 42.0).abs() < 1e-9);
        assert!((cell(&t, "ER/BF", 0) - 36.0 / cell(&t, "BF", 0)).abs() < 1e-12);
    }

    #[test]
    fn pitching_zero_game_rates_are_zero() {
        let mut t = pitcher_row();
        set(&mut t, "G", &[0.0]);
        derive_stats(&mut t, PlayerType::Pitching, None, &WobaTable::empty());
        assert_eq!(cell(&t, "W/G", 0), 0.0);
        assert_eq!(cell(&t, "L/G", 0), 0.0);
    }

    // -- wOBA wiring --

    #[test]
    fn woba_computed_when_year_and_constants_present() {
        let constants = WobaTable::from_reader(
            "Season,wBB,wHBP,w1B,w2B,w3B,wHR\n2023,0.696,0.726,0.883,1.244,1.569,2.004"
                .as_bytes(),
        )
        .unwrap();
        let mut t = batter_row();
        derive_stats(&mut t, PlayerType::Batting, Some(2023), &constants);
        let expected = (0.696 * 50.0 + 0.726 * 5.0 + 0.883 * 98.0 + 1.244 * 30.0
            + 1.569 * 2.0
            + 2.004 * 20.0)
            / 560.0;
        assert!((cell(&t, "wOBA", 0) - expected).abs() < 1e-12);
    }

    #[test]
    fn woba_missing_year_is_null_but_other_stats_survive() {
        let mut t = batter_row();
        derive_stats(&mut t, PlayerType::Batting, Some(1875), &WobaTable::empty());
        assert_eq!(t.column("wOBA").unwrap()[0], None);
        assert!((cell(&t, "AVG", 0) - 0.300).abs() < 1e-12);
    }
}
