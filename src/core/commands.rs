use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use super::aggregator;
use super::errors::CoreError;
use super::job_posting::JobPosting;
use super::models::{ResultBatch, RuntimeSettings};
use super::secret_store::{ApiCredential, ApiKeyStore};
use super::service::ScreeningService;
use super::settings_store::SettingsStore;

#[derive(Debug, Parser)]
#[command(name = "resume-screener")]
#[command(about = "Assess PDF/DOCX resumes against a job description with a language model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Screen resumes and write the result table
    Screen(ScreenArgs),
    /// Show or update runtime settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Manage the API key stored in the OS keychain
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
}

#[derive(Debug, Args)]
pub struct ScreenArgs {
    /// Resume files (.pdf or .docx), processed in the given order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub job: JobSource,

    /// Write CSV here instead of stdout
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Also write the full batch (records and skipped files) as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Add the raw model reply as a CSV column
    #[arg(long)]
    pub include_raw: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct JobSource {
    /// Plain-text job description file
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Job description given inline
    #[arg(long)]
    pub job_text: Option<String>,

    /// Structured job posting (JSON)
    #[arg(long)]
    pub job_posting: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the effective settings as JSON
    Show,
    /// Apply overrides and persist the settings file
    Save(SettingsOverrides),
}

#[derive(Debug, Args)]
pub struct SettingsOverrides {
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub temperature: Option<f32>,
    #[arg(long)]
    pub api_base_url: Option<String>,
    #[arg(long)]
    pub tesseract_path: Option<String>,
    #[arg(long)]
    pub pdftoppm_path: Option<String>,
    #[arg(long)]
    pub ocr_language: Option<String>,
    #[arg(long)]
    pub ocr_dpi: Option<u32>,
    #[arg(long)]
    pub max_attempts: Option<usize>,
    #[arg(long)]
    pub retry_delay_seconds: Option<f64>,
    #[arg(long)]
    pub request_timeout_seconds: Option<u64>,
}

impl SettingsOverrides {
    fn apply(self, mut settings: RuntimeSettings) -> RuntimeSettings {
        if let Some(v) = self.model {
            settings.model = v;
        }
        if let Some(v) = self.temperature {
            settings.temperature = v;
        }
        if let Some(v) = self.api_base_url {
            settings.api_base_url = v;
        }
        if let Some(v) = self.tesseract_path {
            settings.tesseract_path = v;
        }
        if let Some(v) = self.pdftoppm_path {
            settings.pdftoppm_path = v;
        }
        if let Some(v) = self.ocr_language {
            settings.ocr_language = v;
        }
        if let Some(v) = self.ocr_dpi {
            settings.ocr_dpi = v;
        }
        if let Some(v) = self.max_attempts {
            settings.max_attempts = v;
        }
        if let Some(v) = self.retry_delay_seconds {
            settings.retry_delay_seconds = v;
        }
        if let Some(v) = self.request_timeout_seconds {
            settings.request_timeout_seconds = v;
        }
        settings.sanitized()
    }
}

#[derive(Debug, Subcommand)]
pub enum CredentialAction {
    /// Store the API key (read from stdin when --key is omitted)
    Set {
        #[arg(long)]
        key: Option<String>,
    },
    /// Remove the stored API key
    Clear,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_store = match cli.settings {
        Some(path) => SettingsStore::with_path(path),
        None => SettingsStore::new(),
    };

    match cli.command {
        Command::Screen(args) => screen(&settings_store, args).await,
        Command::Settings { action } => settings(&settings_store, action).await,
        Command::Credential { action } => credential(action),
    }
}

async fn screen(settings_store: &SettingsStore, args: ScreenArgs) -> anyhow::Result<()> {
    let settings = settings_store.load().await?;
    let credential = ApiCredential::resolve(&ApiKeyStore::new())?;
    let service = ScreeningService::from_settings(&settings, credential)?;

    let job_description = load_job_description(&args.job).await?;

    let batch = service.screen_files(&args.files, &job_description).await?;
    write_outputs(&batch, &args).await?;
    Ok(())
}

async fn load_job_description(source: &JobSource) -> anyhow::Result<String> {
    if let Some(text) = &source.job_text {
        return Ok(text.clone());
    }

    if let Some(path) = &source.job {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read job description {}", path.display()));
    }

    if let Some(path) = &source.job_posting {
        return Ok(JobPosting::load(path).await?.to_job_description());
    }

    Err(CoreError::InvalidRequest("a job description is required".to_string()).into())
}

async fn write_outputs(batch: &ResultBatch, args: &ScreenArgs) -> anyhow::Result<()> {
    let csv = aggregator::to_csv(batch, args.include_raw)?;
    match &args.csv {
        Some(path) => {
            tokio::fs::write(path, &csv)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), rows = batch.records.len(), "wrote CSV");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&csv)?;
            stdout.flush()?;
        }
    }

    if let Some(path) = &args.json {
        tokio::fs::write(path, aggregator::to_json(batch)?)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote JSON");
    }

    for skipped in &batch.skipped {
        eprintln!("Skipped {}: {}", skipped.file_name, skipped.reason);
    }

    Ok(())
}

async fn settings(store: &SettingsStore, action: SettingsAction) -> anyhow::Result<()> {
    let current = store.load().await?;
    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        SettingsAction::Save(overrides) => {
            let updated = overrides.apply(current);
            store.save(&updated).await?;
            info!(path = %store.path().display(), "saved settings");
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}

fn credential(action: CredentialAction) -> anyhow::Result<()> {
    let store = ApiKeyStore::new();
    match action {
        CredentialAction::Set { key } => {
            let key = match key {
                Some(key) => key,
                None => {
                    let mut input = String::new();
                    std::io::stdin()
                        .read_to_string(&mut input)
                        .context("failed to read API key from stdin")?;
                    input
                }
            };
            store.save(&key)?;
            info!("stored API key in OS keychain");
        }
        CredentialAction::Clear => {
            store.clear()?;
            info!("removed API key from OS keychain");
        }
    }
    Ok(())
}
