use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use lock_patcher::config::{load_from_path, Spec};
use lock_patcher::{LockError, RegistryLock, TargetReport};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const LOCK_FILE_NAME: &str = ".terraform.lock.hcl";

#[derive(Parser)]
#[command(name = "lock-patcher")]
#[command(about = "Keep Terraform lock files pinned to a provider version", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a lock file records the desired version and hashes
    Check {
        #[command(flatten)]
        spec: SpecArgs,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite lock files to the desired version and hashes
    Apply {
        #[command(flatten)]
        spec: SpecArgs,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Also manage every .terraform.lock.hcl below this directory
        #[arg(long, value_name = "DIR", conflicts_with = "config")]
        discover: Option<PathBuf>,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what each lock file currently records for the provider
    Show {
        #[command(flatten)]
        spec: SpecArgs,
    },
}

#[derive(Args, Clone)]
struct SpecArgs {
    /// Lock file to manage (repeatable)
    #[arg(short, long = "file", value_name = "PATH")]
    files: Vec<String>,

    /// Provider address, e.g. hashicorp/kubernetes
    #[arg(short, long)]
    provider: Option<String>,

    /// Platform to request hashes for, e.g. linux_amd64 (repeatable, defaults to this host)
    #[arg(long = "platform", value_name = "OS_ARCH")]
    platforms: Vec<String>,

    /// Desired provider version; overrides --source
    #[arg(long)]
    value: Option<String>,

    /// Leave existing `constraints` attributes untouched
    #[arg(long)]
    skip_constraints: bool,

    /// Lock manifest (TOML with [[locks]] tables)
    #[arg(short, long, conflicts_with_all = ["files", "provider", "platforms", "value", "skip_constraints"])]
    config: Option<PathBuf>,

    /// Only run the manifest lock with this id
    #[arg(long, requires = "config")]
    lock: Option<String>,

    /// Upstream version, used when no explicit value is set
    #[arg(long, default_value = "")]
    source: String,

    /// Directory relative lock file paths are resolved against
    #[arg(short, long)]
    workdir: Option<String>,
}

/// One spec to run, with the id it is reported under.
struct Job {
    id: String,
    spec: Spec,
}

#[derive(Serialize)]
struct JobReport<'a, T: Serialize> {
    id: &'a str,
    #[serde(flatten)]
    report: &'a T,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { spec, json } => cmd_check(spec, json),

        Commands::Apply {
            spec,
            dry_run,
            diff,
            discover,
            json,
        } => cmd_apply(spec, dry_run, diff, discover, json),

        Commands::Show { spec } => cmd_show(spec),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Helper: Terraform-style name of the platform this binary runs on.
fn host_platform() -> String {
    let arch = match env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "arm" => "arm",
        other => other,
    };
    format!("{}_{}", env::consts::OS, arch)
}

/// Helper: Build the jobs to run from flags or from a manifest.
///
/// Returns the jobs and the working directory paths are resolved against.
/// An explicit `--workdir` wins over the manifest's `workdir`.
fn resolve_jobs(args: &SpecArgs, extra_files: Vec<String>) -> Result<(Vec<Job>, String)> {
    if let Some(path) = &args.config {
        let manifest = load_from_path(path)?;
        let workdir = args
            .workdir
            .clone()
            .or(manifest.workdir)
            .unwrap_or_default();

        let jobs: Vec<Job> = manifest
            .locks
            .into_iter()
            .filter(|lock| args.lock.as_deref().map_or(true, |id| id == lock.id))
            .map(|lock| Job {
                id: lock.id,
                spec: lock.spec,
            })
            .collect();

        if jobs.is_empty() {
            anyhow::bail!(
                "No lock with id {:?} in {}",
                args.lock.as_deref().unwrap_or_default(),
                path.display()
            );
        }
        return Ok((jobs, workdir));
    }

    let mut files = args.files.clone();
    files.extend(extra_files);

    let platforms = if args.platforms.is_empty() {
        vec![host_platform()]
    } else {
        args.platforms.clone()
    };

    let (file, files) = if files.len() == 1 {
        (files.remove(0), Vec::new())
    } else {
        (String::new(), files)
    };

    let spec = Spec {
        file,
        files,
        value: args.value.clone().unwrap_or_default(),
        provider: args.provider.clone().unwrap_or_default(),
        platforms,
        skipconstraints: args.skip_constraints,
    };

    let id = if spec.provider.is_empty() {
        "terraform/lock".to_string()
    } else {
        spec.provider.clone()
    };

    Ok((vec![Job { id, spec }], args.workdir.clone().unwrap_or_default()))
}

/// Helper: Find every lock file below `dir`, skipping provider caches.
fn discover_lock_files(dir: &Path) -> Result<Vec<String>> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Cannot access {}", dir.display()))?;

    let mut files = Vec::new();
    let walker = WalkDir::new(&dir).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.file_type().is_dir() && (name == ".terraform" || name == ".git"))
    });
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == LOCK_FILE_NAME {
            files.push(entry.path().to_string_lossy().into_owned());
        }
    }

    files.sort();

    if files.is_empty() {
        anyhow::bail!("No {} files found below {}", LOCK_FILE_NAME, dir.display());
    }

    Ok(files)
}

/// Display a unified diff between two strings
fn display_diff(file: &str, original: &str, modified: &str) {
    let diff = TextDiff::from_lines(original, modified);

    println!("\n{}", format!("--- {}", file).dimmed());
    println!("{}", format!("+++ {}", file).dimmed());

    for change in diff.iter_all_changes() {
        let (sign, color_fn): (&str, fn(&str) -> colored::ColoredString) = match change.tag() {
            ChangeTag::Delete => ("-", |s| s.red()),
            ChangeTag::Insert => ("+", |s| s.green()),
            ChangeTag::Equal => (" ", |s| s.normal()),
        };

        if change.tag() != ChangeTag::Equal {
            print!("{}", color_fn(&format!("{}{}", sign, change)));
        }
    }
    println!();
}

/// Report an error for one job, with hints for the conflicts users hit most.
fn report_error(id: &str, error: &LockError) {
    eprintln!("{} {}: Error - {}", "✗".red(), id, error);

    match error {
        LockError::LockFile(lock_patcher::LockFileError::ProviderBlockNotFound { .. }) => {
            eprintln!("  {}", "CONFLICT: No provider block for this address".red());
            eprintln!("  Possible causes:");
            eprintln!("    - Provider not yet used by this configuration (run terraform init)");
            eprintln!("    - Provider hosted on a different registry");
        }
        LockError::LockFile(lock_patcher::LockFileError::AmbiguousMatch { count, .. }) => {
            eprintln!(
                "  {}",
                format!("CONFLICT: Address matched {} provider blocks (expected 1)", count).red()
            );
        }
        LockError::Config(_) | LockError::Address(_) | LockError::Platform(_) => {
            eprintln!("  Action: Fix the lock definition and retry");
        }
        _ => {}
    }
}

fn cmd_check(args: SpecArgs, json: bool) -> Result<()> {
    let (jobs, workdir) = resolve_jobs(&args, Vec::new())?;

    let mut passed = 0;
    let mut failed = 0;
    let mut outcomes = Vec::new();

    for job in &jobs {
        let result = RegistryLock::from_spec(job.spec.clone())
            .and_then(|lock| lock.condition(&args.source, &workdir));

        match result {
            Ok(outcome) => {
                if outcome.pass {
                    passed += 1;
                    if !json {
                        println!("{} {}: {}", "✓".green(), job.id, outcome.message);
                    }
                } else {
                    failed += 1;
                    if !json {
                        println!("{} {}: {}", "✗".red(), job.id, outcome.message);
                    }
                }
                outcomes.push((job.id.as_str(), outcome));
            }
            Err(e) => {
                report_error(&job.id, &e);
                failed += 1;
            }
        }
    }

    if json {
        let reports: Vec<_> = outcomes
            .iter()
            .map(|(id, outcome)| JobReport { id, report: outcome })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else if jobs.len() > 1 {
        println!();
        println!("{}", "Summary:".bold());
        println!("  {} passed", format!("{}", passed).green());
        println!("  {} failed", format!("{}", failed).red());
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_apply(
    args: SpecArgs,
    dry_run: bool,
    show_diff: bool,
    discover: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let extra_files = match &discover {
        Some(dir) => discover_lock_files(dir)?,
        None => Vec::new(),
    };
    let (jobs, workdir) = resolve_jobs(&args, extra_files)?;

    if dry_run && !json {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
    }

    let mut total_updated = 0;
    let mut total_current = 0;
    let mut total_failed = 0;
    let mut reports: Vec<(String, TargetReport)> = Vec::new();

    for job in jobs {
        let result = RegistryLock::from_spec(job.spec)
            .and_then(|lock| lock.target(&args.source, &workdir, dry_run));

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                report_error(&job.id, &e);
                total_failed += 1;
                continue;
            }
        };

        for change in &report.files {
            if change.changed {
                total_updated += 1;
                if json {
                    continue;
                }
                let verb = if dry_run { "Would update" } else { "Updated" };
                println!(
                    "{} {}: {} {} ({} -> {})",
                    "✓".green(),
                    job.id,
                    verb,
                    change.path,
                    change.old_version,
                    change.new_version
                );
                if show_diff {
                    display_diff(&change.resolved_path, &change.before, &change.after);
                }
            } else {
                total_current += 1;
                if !json {
                    println!(
                        "{} {}: Already up to date in {} ({})",
                        "⊙".yellow(),
                        job.id,
                        change.path,
                        change.new_version
                    );
                }
            }
        }

        reports.push((job.id, report));
    }

    if json {
        let rendered: Vec<_> = reports
            .iter()
            .map(|(id, report)| JobReport { id, report })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        println!();
        println!("{}", "Summary:".bold());
        let updated_label = if dry_run { "would be updated" } else { "updated" };
        println!("  {} {}", format!("{}", total_updated).green(), updated_label);
        println!("  {} already up to date", format!("{}", total_current).yellow());
        println!("  {} failed", format!("{}", total_failed).red());
    }

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_show(args: SpecArgs) -> Result<()> {
    let (jobs, workdir) = resolve_jobs(&args, Vec::new())?;
    let mut failed = 0;

    for job in jobs {
        let lock = match RegistryLock::from_spec(job.spec) {
            Ok(lock) => lock,
            Err(e) => {
                report_error(&job.id, &e);
                failed += 1;
                continue;
            }
        };

        for path in lock.paths() {
            match lock.query(path, &workdir) {
                Ok(state) => {
                    println!("{} {}", path.bold(), format!("({})", state.address).dimmed());
                    println!("  version:     {}", state.version);
                    if let Some(constraints) = &state.constraints {
                        println!("  constraints: {}", constraints);
                    }
                    println!("  hashes:      {}", state.hashes.len());
                    for hash in &state.hashes {
                        println!("    {}", hash.dimmed());
                    }
                }
                Err(e) => {
                    report_error(&job.id, &e);
                    failed += 1;
                }
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
