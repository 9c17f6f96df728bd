use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};

use atp_dashboard::http_fetch::default_cache_dir;
use atp_dashboard::pipeline::{Pipeline, PipelineConfig, RunReport};
use atp_dashboard::sources::SourceSet;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let out_dir = parse_value_arg(&args, "--out-dir")
        .map(PathBuf::from)
        .or_else(|| env_path("ATP_OUT_DIR"))
        .unwrap_or_else(|| PathBuf::from("dashboardData"));
    let cache_dir = parse_value_arg(&args, "--cache-dir")
        .map(PathBuf::from)
        .or_else(|| env_path("ATP_CACHE_DIR"))
        .or_else(default_cache_dir)
        .context("unable to resolve a cache directory")?;
    let skip_fetch = args.iter().any(|arg| arg == "--skip-fetch");
    let from_year = parse_value_arg(&args, "--from-year").and_then(|raw| raw.parse().ok());
    let to_year = parse_value_arg(&args, "--to-year").and_then(|raw| raw.parse().ok());

    let pipeline = Pipeline::new(PipelineConfig {
        sources: SourceSet::defaults(from_year, to_year),
        out_dir,
        cache_dir,
        skip_fetch,
    });
    let report = pipeline.run()?;
    print_report(&report);
    Ok(())
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&format!("{flag}=")) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn env_path(key: &str) -> Option<PathBuf> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn print_report(report: &RunReport) {
    println!("Dashboard refresh complete");
    println!("Output: {}", report.out_dir.display());
    println!("Raw match rows: {}", report.raw_rows);
    println!("Player match rows: {}", report.player_match_rows);
    println!("Tables published: {}", report.tables_published);
    let failed = report.load.failed_sources();
    if failed > 0 {
        println!("Sources failed: {failed}");
    }
    for category in &report.load.categories {
        println!(
            "category {}: sources {}/{} rows={}",
            category.category.label(),
            category.sources_loaded,
            category.sources_total,
            category.rows
        );
        if !category.errors.is_empty() {
            println!("  errors: {}", category.errors.len());
            for err in category.errors.iter().take(6) {
                println!("   - {err}");
            }
        }
    }
}

fn print_usage() {
    println!("atp_dashboard - rebuild the dashboard datasets from the match corpus");
    println!();
    println!("USAGE: atp_dashboard [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --out-dir DIR     output directory (default: dashboardData)");
    println!("  --cache-dir DIR   http cache directory (default: XDG cache)");
    println!("  --skip-fetch      reuse the rawData.csv checkpoint instead of fetching");
    println!("  --from-year N     first season to load");
    println!("  --to-year N       last season to load");
}
