use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use market_structure::loader::{candle_files, load_candles, load_config};
use market_structure::structure::{analyze, Candle, EngineConfig, StructureSnapshot};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "market-structure")]
#[command(about = "Swing, BOS/CHoCH and order-block detection over OHLCV candles")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config bag (JSON, UI key names)
    #[arg(short, long, global = true, env = "MARKET_STRUCTURE_CONFIG")]
    config: Option<PathBuf>,

    /// Start from the conservative preset instead of the defaults
    #[arg(long, global = true)]
    conservative: bool,

    /// Confirm breaks on wicks
    #[arg(long, global = true)]
    with_move: bool,

    /// Require counter-trend breaks to reach the protected extremum
    #[arg(long, global = true)]
    by_trend: bool,

    /// Drop swept but unconfirmed crosses
    #[arg(long, global = true)]
    hide_fake: bool,

    /// Run the stages one after another instead of a single pass
    #[arg(long, global = true)]
    legacy: bool,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one candle file and write the snapshot as JSON
    Analyze {
        /// Candle file (.json or .csv)
        input: PathBuf,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Print confirmed breaks and open zones of one candle file
    Summary {
        /// Candle file (.json or .csv)
        input: PathBuf,
    },

    /// Analyze every candle file in a directory in parallel
    Batch {
        /// Directory with .json/.csv candle files
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Directory for the snapshot files
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None if self.conservative => EngineConfig::conservative(),
            None => EngineConfig::default(),
        };
        config.with_move |= self.with_move;
        config.by_trend |= self.by_trend;
        config.show_fake &= !self.hide_fake;
        config.one_iteration &= !self.legacy;
        Ok(config)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = if args.verbose { "market_structure=debug" } else { "market_structure=info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.parse()?))
        .init();

    let config = args.engine_config()?;

    match &args.command {
        Commands::Analyze {
            input,
            output,
            pretty,
        } => run_analyze(input, output.as_deref(), *pretty, config),
        Commands::Summary { input } => run_summary(input, config),
        Commands::Batch {
            data_dir,
            output_dir,
        } => run_batch(data_dir, output_dir, config),
    }
}

fn write_snapshot(snapshot: &StructureSnapshot, output: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(snapshot)?
    } else {
        serde_json::to_string(snapshot)?
    };
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_analyze(input: &Path, output: Option<&Path>, pretty: bool, config: EngineConfig) -> Result<()> {
    let candles = load_candles(input)?;
    let snapshot = analyze(&candles, config).with_context(|| format!("analyzing {}", input.display()))?;
    info!(
        "{} swings, {} crosses, {} pois",
        snapshot.swing_count(),
        snapshot.cross_count(),
        snapshot.pois.len()
    );
    write_snapshot(&snapshot, output, pretty)
}

fn format_time(candles: &[Candle], index: usize) -> String {
    candles
        .get(index)
        .and_then(|c| DateTime::from_timestamp(c.time, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| format!("#{}", index))
}

fn run_summary(input: &Path, config: EngineConfig) -> Result<()> {
    let candles = load_candles(input)?;
    let snapshot = analyze(&candles, config).with_context(|| format!("analyzing {}", input.display()))?;

    println!("\n{}", input.display());
    println!("  Candles: {}", candles.len());
    println!("  Swings:  {}", snapshot.swing_count());
    println!("  Crosses: {}", snapshot.cross_count());

    println!("\nConfirmed breaks:");
    for cross in snapshot.confirmed() {
        let to = cross.to.unwrap_or(cross.from);
        println!(
            "  {:<8} from {} to {}  level {:.2}",
            cross.label(),
            format_time(&candles, cross.from),
            format_time(&candles, to),
            cross.level(&candles)
        );
    }

    println!("\nOpen zones:");
    for poi in snapshot.open_pois() {
        println!(
            "  {:<10} {:?} {:.2}-{:.2}  from {}  tp {:.2}  {:?}{}",
            poi.poi_type.to_string(),
            poi.side,
            poi.bottom,
            poi.top,
            format_time(&candles, poi.last_orderblock_index),
            poi.take_profit,
            poi.order_type(),
            if poi.can_trade { "" } else { "  (no trade)" }
        );
    }
    Ok(())
}

fn run_batch(data_dir: &Path, output_dir: &Path, config: EngineConfig) -> Result<()> {
    let files = candle_files(data_dir)?;
    if files.is_empty() {
        info!("No candle files in {}", data_dir.display());
        return Ok(());
    }
    std::fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;
    info!("Analyzing {} files from {}", files.len(), data_dir.display());

    let results: Vec<(PathBuf, Result<StructureSnapshot>)> = files
        .par_iter()
        .map(|path| {
            let result = load_candles(path).and_then(|candles| {
                analyze(&candles, config).with_context(|| format!("analyzing {}", path.display()))
            });
            (path.clone(), result)
        })
        .collect();

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(snapshot) => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("candles");
                let target = output_dir.join(format!("{}.structure.json", stem));
                write_snapshot(&snapshot, Some(&target), false)?;
            }
            Err(e) => {
                error!("{}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    info!("Done: {} ok, {} failed", files.len() - failed, failed);
    Ok(())
}
