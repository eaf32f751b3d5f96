// Entrypoint for the CLI application.
// - Loads `.env`, sets up logging on stderr and parses the command line.
// - Without a subcommand it hands the client to the interactive menu.
// - Returns `anyhow::Result`; a failed `validate` or a partial `import`
//   exits non-zero.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nakala_cli::converter::{self, ConvertedRecord};
use nakala_cli::demos::{self, Demo};
use nakala_cli::metadata::{Dataset, DatasetStatus};
use nakala_cli::ui::{self, Narrator};
use nakala_cli::{ApiClient, Config};

#[derive(Parser, Debug)]
#[command(name = "nakala-cli", version, about = "NAKALA repository client: CSV conversion, imports and API demonstrations")]
struct Cli {
    #[arg(long, global = true, help = "API root (overrides NAKALA_API_URL)")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "API key (overrides NAKALA_API_KEY)")]
    api_key: Option<String>,
    #[arg(long, global = true, help = "Never wait for ENTER between steps")]
    non_interactive: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a CSV file to NAKALA dataset payloads.
    Convert {
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = DatasetStatus::Pending)]
        status: DatasetStatus,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check dataset payloads against the publication requirements.
    Validate { json: PathBuf },
    /// Convert a CSV file, upload its files and create one dataset per row.
    Import {
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = DatasetStatus::Pending)]
        status: DatasetStatus,
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one guided API demonstration.
    Demo {
        #[arg(value_enum)]
        name: Demo,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(url) = &self.api_url {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = &self.api_key {
            config.api_key = key.clone();
        }
        if self.non_interactive {
            config.interactive = false;
        }
        config
    }
}

/// Whatever `validate` is given: the output of `convert`, an array of
/// dataset payloads, or a single payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum ValidateInput {
    Records(Vec<ConvertedRecord>),
    Datasets(Vec<Dataset>),
    Single(Dataset),
}

impl ValidateInput {
    fn into_datasets(self) -> Vec<Dataset> {
        match self {
            ValidateInput::Records(records) => records.into_iter().map(|r| r.dataset).collect(),
            ValidateInput::Datasets(datasets) => datasets,
            ValidateInput::Single(dataset) => vec![dataset],
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nakala_cli=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Some(Commands::Convert { csv, status, output }) => convert(&csv, status, output.as_deref()),
        Some(Commands::Validate { json }) => validate(&json),
        Some(Commands::Import { csv, status, dry_run }) => import(&config, &csv, status, dry_run),
        Some(Commands::Demo { name }) => {
            let api = ApiClient::from_config(&config)?;
            demos::run(name, &api, &Narrator::new(&config))
        }
        None => {
            let api = ApiClient::from_config(&config)?;
            ui::main_menu(&api, &Narrator::new(&config))
        }
    }
}

fn report_errors(records: &[ConvertedRecord]) -> usize {
    let mut invalid = 0;
    for record in records {
        let (ok, errors) = converter::validate_dataset(&record.dataset);
        if !ok {
            invalid += 1;
            for error in errors {
                eprintln!("Row {}: {}", record.row, error);
            }
        }
    }
    invalid
}

fn convert(csv: &Path, status: DatasetStatus, output: Option<&Path>) -> Result<()> {
    let records = converter::convert_csv(csv, status)
        .with_context(|| format!("failed to convert {}", csv.display()))?;
    report_errors(&records);

    let json = serde_json::to_string_pretty(&records)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            ui::print_success(&format!("{} record(s) written to {}", records.len(), path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let input: ValidateInput =
        serde_json::from_str(&text).with_context(|| format!("{} is not a dataset payload", path.display()))?;

    let mut invalid = 0;
    for (i, dataset) in input.into_datasets().iter().enumerate() {
        let (ok, errors) = converter::validate_dataset(dataset);
        if ok {
            ui::print_success(&format!("Dataset {} is valid ({})", i + 1, dataset.status));
        } else {
            invalid += 1;
            for error in errors {
                ui::print_error(&format!("Dataset {}: {}", i + 1, error));
            }
        }
    }

    if invalid > 0 {
        bail!("{} invalid dataset(s)", invalid);
    }
    Ok(())
}

fn import(config: &Config, csv: &Path, status: DatasetStatus, dry_run: bool) -> Result<()> {
    let records = converter::convert_csv(csv, status)
        .with_context(|| format!("failed to convert {}", csv.display()))?;

    let mut invalid = report_errors(&records);
    for record in records.iter().filter(|r| r.files.is_empty()) {
        eprintln!("Row {}: no files to upload (NAKALA needs at least one)", record.row);
        invalid += 1;
    }
    if invalid > 0 {
        bail!("{} row(s) failed validation, nothing was imported", invalid);
    }
    if dry_run {
        ui::print_success(&format!("{} row(s) ready to import (dry run)", records.len()));
        return Ok(());
    }

    let api = ApiClient::from_config(config)?;
    let narrator = Narrator::new(config);

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut created = Vec::new();
    let mut failed = 0;
    for record in records {
        let row = record.row;
        pb.set_message(format!("row {}", row));
        match import_row(&api, &narrator, record) {
            Ok(id) => {
                info!(row, %id, "dataset created");
                pb.suspend(|| ui::print_success(&format!("Row {}: {}", row, id)));
                created.push(id);
            }
            Err(e) => {
                warn!(row, error = %format!("{:#}", e), "row not imported");
                pb.suspend(|| ui::print_error(&format!("Row {}: {:#}", row, e)));
                failed += 1;
            }
        }
        pb.inc(1);
        narrator.rate_limit();
    }
    pb.finish_and_clear();

    ui::print_success(&format!("{} dataset(s) created, {} row(s) failed", created.len(), failed));
    if failed > 0 {
        bail!("{} row(s) could not be imported", failed);
    }
    Ok(())
}

/// Upload one row's files and create its dataset. Returns the new id.
fn import_row(api: &ApiClient, narrator: &Narrator, record: ConvertedRecord) -> Result<String> {
    let mut files = Vec::with_capacity(record.files.len());
    for path in &record.files {
        let file = api
            .upload_file(path)
            .with_context(|| format!("upload of {} failed", path.display()))?;
        files.push(file);
        narrator.rate_limit();
    }

    let dataset = Dataset { files, ..record.dataset };
    let response = api.create_dataset(&dataset).context("dataset creation failed")?;
    match response.created_id() {
        Some(id) if response.code() == 201 => Ok(id),
        _ => bail!("creation failed ({}) {}", response.code(), response.body_excerpt(200)),
    }
}
