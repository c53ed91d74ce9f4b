use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cost_of_living::{
    run_pipeline, ConsoleResolver, FileTableReader, GapResolver, IngestPaths, RunReport,
    ScriptedResolver, SourceStatus, StateRegistry,
};

/// Build the per-state cost-of-living dataset from raw sources, history and operator input
#[derive(Parser, Debug)]
#[command(name = "col-ingest", version)]
struct Args {
    /// Project root containing config/, data/ and raw_data/
    #[arg(long, default_value = ".", env = "COL_ROOT")]
    root: PathBuf,

    /// Source map (default: <root>/config/sources_map.json)
    #[arg(long)]
    sources: Option<PathBuf>,

    /// State registry (default: <root>/config/states.json)
    #[arg(long)]
    states: Option<PathBuf>,

    /// Output dataset (default: <root>/data/geo_stats.json)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Manual audit log (default: <root>/data/manual_audit_log.json)
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Directory holding raw source files (default: <root>/raw_data)
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Answer gaps from a JSON file instead of prompting
    #[arg(long, conflicts_with = "no_prompt")]
    answers: Option<PathBuf>,

    /// Leave every gap empty instead of prompting
    #[arg(long)]
    no_prompt: bool,
}

impl Args {
    fn paths(&self) -> IngestPaths {
        let mut paths = IngestPaths::from_root(&self.root);
        if let Some(p) = &self.sources {
            paths.source_map = p.clone();
        }
        if let Some(p) = &self.states {
            paths.states = p.clone();
        }
        if let Some(p) = &self.output {
            paths.output = p.clone();
        }
        if let Some(p) = &self.audit_log {
            paths.audit_log = p.clone();
        }
        if let Some(p) = &self.raw_dir {
            paths.raw_dir = p.clone();
        }
        paths
    }

    fn resolver(&self, paths: &IngestPaths) -> Result<Box<dyn GapResolver>> {
        if let Some(path) = &self.answers {
            let registry = StateRegistry::load(&paths.states)?;
            return Ok(Box::new(ScriptedResolver::load(path, &registry)?));
        }
        if self.no_prompt {
            return Ok(Box::new(ScriptedResolver::new()));
        }
        Ok(Box::new(ConsoleResolver::stdio()))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cost_of_living=info,col_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let paths = args.paths();
    let mut resolver = args.resolver(&paths)?;

    println!("🗂️  Cost of Living Ingest - sources → history → manual entry");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let report = run_pipeline(&paths, &FileTableReader::new(), resolver.as_mut())?;
    print_report(&report, &paths);

    Ok(())
}

fn print_report(report: &RunReport, paths: &IngestPaths) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for outcome in &report.sources {
        match &outcome.status {
            SourceStatus::Loaded { state_records, stored } => println!(
                "✅ {}: {} state records ({} stored)",
                outcome.key, state_records, stored
            ),
            SourceStatus::Skipped { reason } => println!("❌ {}: {}", outcome.key, reason),
        }
    }

    println!("\n✓ {}", report.summary());
    println!("✓ Data compiled to {}", paths.output.display());
    if report.ledger_written {
        println!(
            "📝 Audit log updated with {} new entries",
            report.new_audit_entries
        );
    } else {
        println!("📝 No new manual entries to log");
    }
}
