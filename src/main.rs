use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::{Duration, Local};
use clap::{Args, Parser, Subcommand};
use tracing::Level;

use rive_gallery::config::{load_config, GalleryConfig};
use rive_gallery::error_codes::find_coded_error;
use rive_gallery::publish::{
    commit_message, publish, resolve_repo_path, PublishOutcome, PublishRequest,
};
use rive_gallery::site::{check_site, generate_site};
use rive_gallery::sync::{sync_assets, SyncReport};

#[derive(Debug, Parser)]
#[command(name = "rive-gallery")]
#[command(about = "Generate a static gallery of Rive animations from a CSV table")]
#[command(version = env!("RIVE_GALLERY_VERSION"))]
struct Cli {
    /// Increase log output (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct SiteArgs {
    /// Site root holding the table, head template and output tree.
    #[arg(long = "root", default_value = ".")]
    root: PathBuf,
    /// Config file (defaults to <root>/gallery.yaml when present).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write index pages and per-asset detail pages.
    Generate {
        #[command(flatten)]
        site: SiteArgs,
        /// Sync recently modified assets before generating.
        #[arg(long = "sync")]
        sync: bool,
    },
    /// Parse the table and report what would be generated.
    Check {
        #[command(flatten)]
        site: SiteArgs,
        #[arg(long = "json")]
        json: bool,
    },
    /// Copy recently modified asset files into the site.
    Sync {
        #[command(flatten)]
        site: SiteArgs,
        #[arg(long = "source")]
        source: Option<PathBuf>,
        #[arg(long = "max-age-hours")]
        max_age_hours: Option<u32>,
    },
    /// Stage, commit and push the site repository.
    Publish {
        #[command(flatten)]
        site: SiteArgs,
        #[arg(long = "repo")]
        repo: Option<PathBuf>,
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let json = cli.command.wants_json();
    if let Err(error) = run(cli.command) {
        report_error(&error, json, cli.verbose);
        process::exit(1);
    }
}

impl Commands {
    fn wants_json(&self) -> bool {
        matches!(self, Self::Check { json: true, .. })
    }
}

/// Coded errors print as `error[CODE]: message`; JSON callers also get the
/// error envelope on stdout, and `-v` adds the attached details.
fn report_error(error: &anyhow::Error, json: bool, verbose: u8) {
    let Some(coded) = find_coded_error(error) else {
        eprintln!("error: {error:#}");
        return;
    };
    eprintln!("error[{}]: {}", coded.code, coded.message);
    if json {
        match serde_json::to_string_pretty(&coded.envelope()) {
            Ok(text) => println!("{text}"),
            Err(serialize_error) => {
                eprintln!("error: failed to serialize error envelope: {serialize_error}")
            }
        }
    } else if verbose > 0 {
        if let Some(details) = &coded.details {
            eprintln!("  details: {details}");
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate { site, sync } => run_generate(&site, sync),
        Commands::Check { site, json } => run_check(&site, json),
        Commands::Sync {
            site,
            source,
            max_age_hours,
        } => {
            let config = load_site_config(&site)?;
            let report = run_sync(&site.root, &config, source.as_deref(), max_age_hours)?;
            print_sync_report(&report);
            Ok(())
        }
        Commands::Publish {
            site,
            repo,
            message,
            dry_run,
        } => run_publish(&site, repo.as_deref(), message.as_deref(), dry_run),
    }
}

fn load_site_config(site: &SiteArgs) -> Result<GalleryConfig> {
    load_config(&site.root, site.config.as_deref())
}

fn run_generate(site: &SiteArgs, sync: bool) -> Result<()> {
    let config = load_site_config(site)?;
    if sync {
        let report = run_sync(&site.root, &config, None, None)?;
        print_sync_report(&report);
    }

    let summary = generate_site(&site.root, &config)
        .with_context(|| format!("failed to generate site in {}", site.root.display()))?;
    println!(
        "Generated {} index page(s) and {} detail page(s) in {}",
        summary.index_pages.len(),
        summary.detail_pages.len(),
        site.root.display()
    );
    if summary.previews > 0 {
        println!("Preview variants: {}", summary.previews);
    }
    Ok(())
}

fn run_check(site: &SiteArgs, json: bool) -> Result<()> {
    let config = load_site_config(site)?;
    let report = check_site(&site.root, &config)?;

    if json {
        let text = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "OK: {} ({} asset(s), {} page(s))",
        report.table.display(),
        report.assets.len(),
        report.page_count
    );
    for check in &report.assets {
        let preview = if check.has_preview { ", preview" } else { "" };
        println!(
            "  [page {}] {} - {} control(s), {} binding(s){}",
            check.page + 1,
            check.asset.source,
            check.controls.controls.len(),
            check.controls.bindings.len(),
            preview
        );
        for input in &check.inputs {
            println!("      input{}: {}", input.column, input.spec.to_source());
        }
    }
    Ok(())
}

fn run_sync(
    root: &Path,
    config: &GalleryConfig,
    source: Option<&Path>,
    max_age_hours: Option<u32>,
) -> Result<SyncReport> {
    let hours = max_age_hours.unwrap_or(config.sync.max_age_hours);
    let source = config.sync_source(source);
    sync_assets(
        source.as_deref(),
        &config.assets_path(root),
        Duration::hours(i64::from(hours)),
        &config.sync.extension,
        Local::now(),
    )
}

fn print_sync_report(report: &SyncReport) {
    if let Some(reason) = &report.skipped_reason {
        println!("Sync skipped: {reason}");
        return;
    }
    println!(
        "Copied {} file(s) into {} ({} older than {})",
        report.copied.len(),
        report.destination.display(),
        report.stale,
        report.cutoff
    );
}

fn run_publish(
    site: &SiteArgs,
    repo: Option<&Path>,
    message: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let config = load_site_config(site)?;
    let request = PublishRequest {
        repo: resolve_repo_path(repo, &site.root),
        message: commit_message(message, &config.publish),
        remote: config.publish.remote.clone(),
        dry_run,
    };

    match publish(&request)? {
        PublishOutcome::DryRun { commands } => {
            for command in commands {
                println!("[dry-run] {}", command.join(" "));
            }
        }
        PublishOutcome::NothingToCommit => println!("No changes to commit."),
        PublishOutcome::Pushed { branch } => {
            println!(
                "Changes pushed to {} (branch: {}).",
                request.remote, branch
            );
        }
    }
    Ok(())
}
