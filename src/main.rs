// Projection evaluation entry point.
//
// Batch pipeline:
// 1. Initialize tracing (stderr)
// 2. Load config (optional TOML path as the first argument)
// 3. Load wOBA constants (degraded mode if unreadable)
// 4. Evaluate every (year, system, player-type) combination
// 5. Write site.json, years.json, and the chunked player export

use anyhow::Context;
use projection_eval::{config, eval, report, stats};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("projection evaluation starting");

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config =
        config::load_config(config_path.as_deref()).context("failed to load configuration")?;
    info!(
        "Config loaded: {} years, {} systems, output to {}",
        config.years.len(),
        config.systems.len(),
        config.output_dir.display()
    );

    // An unreadable constants table blocks wOBA everywhere but nothing
    // else; the run continues in degraded mode.
    let woba = match stats::WobaTable::load(&config.woba_constants) {
        Ok(table) => {
            info!("wOBA constants loaded for {} seasons", table.seasons());
            table
        }
        Err(e) => {
            error!("unreadable wOBA constants ({e}); wOBA will be undefined for this run");
            stats::WobaTable::empty()
        }
    };

    let run = eval::run_evaluation(&config, &woba);
    info!(
        "Evaluation complete: {} results from {} combinations",
        run.results.len(),
        run.merged.len()
    );

    let site = report::site_data(&config, &run.results);
    report::write_json(&config.output_dir.join("site.json"), &site)
        .context("failed to write site.json")?;

    let years = report::years_data(&run.results);
    report::write_json(&config.output_dir.join("years.json"), &years)
        .context("failed to write years.json")?;

    let export = report::players::explode_players(&config, &run.merged);
    let players_dir = config.output_dir.join("players");
    for (i, chunk) in export.chunks.iter().enumerate() {
        report::write_json(&players_dir.join(format!("chunk_{i}.json")), chunk)
            .with_context(|| format!("failed to write player chunk {i}"))?;
    }
    report::write_json(&players_dir.join("manifest.json"), &export.manifest)
        .context("failed to write player manifest")?;
    info!(
        "Wrote {} player chunks to {}",
        export.chunks.len(),
        players_dir.display()
    );

    info!("projection evaluation finished");
    Ok(())
}

/// Initialize tracing to stderr so artifact output stays clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("projection_eval=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
