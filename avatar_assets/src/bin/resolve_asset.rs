use std::path::PathBuf;

use anyhow::{Result, bail};
use avatar_assets::resolve::entry_matches;
use avatar_assets::{AssetKind, Cascade, Catalog, MatchQuery, Resolver};
use clap::{Parser, ValueEnum};
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Lookup {
    Model,
    Texture,
    Eye,
    Mouth,
}

impl Lookup {
    fn target(self) -> (AssetKind, Cascade) {
        match self {
            Lookup::Model => (AssetKind::Model, Cascade::MODEL),
            Lookup::Texture => (AssetKind::Texture, Cascade::TEXTURE),
            Lookup::Eye => (AssetKind::Eye, Cascade::DIRECT),
            Lookup::Mouth => (AssetKind::Mouth, Cascade::DIRECT),
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run one asset lookup cascade against a catalog", version)]
struct Args {
    /// Directory containing the Models and Textures folders
    #[arg(long, value_name = "DIR", default_value = ".")]
    asset_root: PathBuf,

    /// Catalog folder and cascade to use
    #[arg(long, value_enum, default_value = "model")]
    kind: Lookup,

    /// Substrings that disqualify a match (may repeat)
    #[arg(long = "exclude", value_name = "TEXT")]
    excludes: Vec<String>,

    /// Substrings of which a match must contain at least one (may repeat)
    #[arg(long = "include", value_name = "TEXT")]
    includes: Vec<String>,

    /// Use <NAME>.<ext> verbatim instead of searching
    #[arg(long)]
    exact: bool,

    /// Emit the resolution as JSON instead of a stage trace
    #[arg(long)]
    json: bool,

    /// Symbolic name to resolve, e.g. Hair_Buzzed
    name: String,
}

#[derive(Serialize)]
struct StageReport {
    stage: usize,
    query: String,
    matches: usize,
}

#[derive(Serialize)]
struct LookupReport<'a> {
    name: &'a str,
    kind: AssetKind,
    stage: Option<usize>,
    query: &'a str,
    matches: &'a [String],
    stages: Vec<StageReport>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.exact && (!args.excludes.is_empty() || !args.includes.is_empty()) {
        bail!("--exact cannot be combined with --exclude or --include");
    }

    let catalog = Catalog::load_from_root(&args.asset_root)?;
    let resolver = Resolver::new(&catalog);
    let (kind, cascade) = args.kind.target();

    let query = MatchQuery::new(args.name.as_str())
        .excluding(args.excludes.iter().cloned())
        .including(args.includes.iter().cloned())
        .exact(args.exact);
    let resolution = resolver.resolve(kind, &cascade, &query);

    // Unfiltered match counts for each stage, for diagnosing naming drift.
    let entries = catalog.entries(kind);
    let stages: Vec<StageReport> = (0..cascade.stage_count())
        .filter_map(|stage| cascade.stage_query(&args.name, stage).map(|q| (stage, q)))
        .map(|(stage, query)| StageReport {
            stage,
            matches: entries
                .iter()
                .filter(|entry| entry_matches(entry, &query))
                .count(),
            query,
        })
        .collect();

    if args.json {
        let report = LookupReport {
            name: &args.name,
            kind,
            stage: resolution.stage,
            query: &resolution.query,
            matches: &resolution.matches,
            stages,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !args.exact {
        for report in &stages {
            let marker = if Some(report.stage) == resolution.stage {
                "*"
            } else {
                " "
            };
            println!(
                "{marker} stage {stage}: {query:<40} {matches:>4} match(es)",
                stage = report.stage,
                query = report.query,
                matches = report.matches
            );
        }
    }

    match resolution.require(kind, &args.name) {
        Ok(resolution) => {
            for name in &resolution.matches {
                println!("{}", catalog.path_of(kind, name).display());
            }
        }
        Err(miss) => println!("{miss}"),
    }
    Ok(())
}
