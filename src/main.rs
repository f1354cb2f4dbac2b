pub mod backend;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::backend::audio::{self, HttpAudioUploader};
use crate::backend::export::{self, ExportFormat};
use crate::backend::remote::BackendClient;
use crate::backend::session::{self, SourceStatus, SubmitStatus};
use crate::backend::settings::Settings;

#[derive(Parser, Debug)]
#[command(version, about = "Bulk importer for reading articles", long_about = None)]
struct Args {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend deployment URL, overrides the saved setting
    #[arg(long, env = "READING_IMPORT_BACKEND_URL", global = true)]
    backend_url: Option<String>,

    /// Bearer token for the backend, overrides the saved setting
    #[arg(long, env = "READING_IMPORT_TOKEN", global = true, hide_env_values = true)]
    auth_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a table and print the items it would import
    Parse {
        /// .csv, .txt, .xlsx or .xls file
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which article each audio file in a directory maps to
    Audio {
        dir: PathBuf,
    },

    /// Parse a table, upload matching audio and submit everything to a course
    Import {
        file: PathBuf,

        /// Target course identifier
        #[arg(long)]
        course: String,

        /// Directory of audio files named {unit}-{article}.ext
        #[arg(long)]
        audio_dir: Option<PathBuf>,

        /// Parse and match only; nothing is uploaded or submitted
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set { key: String, value: String },
    Reset,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = Settings::load().with_overrides(args.backend_url, args.auth_token);

    match args.command {
        Command::Parse { file, format, output } => run_parse(&file, format, output.as_deref()),
        Command::Audio { dir } => run_audio(&dir),
        Command::Import {
            file,
            course,
            audio_dir,
            dry_run,
        } => run_import(&settings, &file, &course, audio_dir.as_deref(), dry_run),
        Command::Config { action } => run_config(action),
    }
}

fn run_parse(file: &Path, format: ExportFormat, output: Option<&Path>) -> Result<ExitCode> {
    let status = session::read_import_file(file);
    eprintln!("{}", status.message());
    if !matches!(status, SourceStatus::Parsed(_)) {
        return Ok(ExitCode::FAILURE);
    }

    let items = status.into_items();
    match output {
        Some(path) => {
            let out = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            export::write_items(&items, format, BufWriter::new(out))?;
            eprintln!("Wrote {} items to {:?}", items.len(), path);
        }
        None => export::write_items(&items, format, io::stdout().lock())?,
    }
    Ok(ExitCode::SUCCESS)
}

fn run_audio(dir: &Path) -> Result<ExitCode> {
    let files = audio::scan_audio_dir(dir).with_context(|| format!("Failed to read {:?}", dir))?;
    let (pending, excluded) = audio::pending_entries(&files);

    for entry in &pending {
        println!(
            "{}\tunit {}, article {}",
            entry.file_name, entry.unit_index, entry.article_index
        );
    }
    for path in &excluded {
        println!("{}\tignored (no unit number)", path.display());
    }
    println!("{} audio files ready, {} ignored", pending.len(), excluded.len());
    Ok(ExitCode::SUCCESS)
}

fn run_import(
    settings: &Settings,
    file: &Path,
    course: &str,
    audio_dir: Option<&Path>,
    dry_run: bool,
) -> Result<ExitCode> {
    let status = session::read_import_file(file);
    println!("{}", status.message());
    if !matches!(status, SourceStatus::Parsed(_)) {
        return Ok(ExitCode::FAILURE);
    }

    if let Err(e) = Settings::remember_recent_file(&file.to_string_lossy()) {
        tracing::warn!("could not save recent files: {e:#}");
    }

    let mut items = status.into_items();

    let audio_files = match audio_dir {
        Some(dir) => {
            audio::scan_audio_dir(dir).with_context(|| format!("Failed to read {:?}", dir))?
        }
        None => Vec::new(),
    };

    if dry_run {
        let (pending, excluded) = audio::pending_entries(&audio_files);
        let matching = items
            .iter()
            .filter(|item| pending.iter().any(|e| e.coordinate() == item.coordinate()))
            .count();
        println!(
            "Dry run: {} items for course {}, {} audio files would match {} articles ({} ignored)",
            items.len(),
            course,
            pending.len(),
            matching,
            excluded.len()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let backend = BackendClient::from_settings(settings)
        .context("Set backend_url with `config set backend_url <URL>` or --backend-url")?;

    if !audio_files.is_empty() {
        let uploader =
            HttpAudioUploader::new(&backend, backend.http().clone(), settings.audio_folder.clone());
        let summary = session::upload_and_attach(&mut items, &audio_files, &uploader, |entry| {
            println!("  {:<10} {}", format!("{:?}", entry.status), entry.file_name);
        });
        println!("{}", summary.message());
    }

    let status = session::submit(&backend, course, &items);
    println!("{}", status.message());

    Ok(match status {
        SubmitStatus::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn run_config(action: ConfigAction) -> Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load();
            if let Some(path) = Settings::config_path() {
                println!("# {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
        }
        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load();
            settings.set(&key, &value)?;
            settings.save()?;
            println!("{key} updated");
        }
        ConfigAction::Reset => {
            Settings::reset()?;
            println!("Settings reset to defaults");
        }
    }
    Ok(ExitCode::SUCCESS)
}
