//! The archive-query command line: write a default configuration, or translate a request
//! file with one.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Subcommand;
use query_engine_dsl::dsl;
use query_engine_translation::translation;

/// The commands supported by the CLI.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write a default configuration, and its JSON schema, to a directory.
    Initialize {
        /// The directory to write to. It is created if missing.
        dir: PathBuf,
    },
    /// Translate a request and print the compiled plan.
    Translate {
        /// The configuration directory.
        #[arg(long, env = "ARCHIVE_QUERY_CONFIGURATION", default_value = ".")]
        configuration: PathBuf,
        /// The kind of request: select, insert, update or delete.
        #[arg(long, value_parser = parse_kind)]
        kind: dsl::request::RequestKind,
        /// The JSON file holding the request.
        request: PathBuf,
    },
}

fn parse_kind(kind: &str) -> Result<dsl::request::RequestKind, String> {
    dsl::request::RequestKind::from_name(kind)
        .ok_or_else(|| format!("{kind} is not one of select, insert, update or delete"))
}

/// Run a command, writing its output to `output`.
pub async fn run(command: Command, output: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Initialize { dir } => initialize(dir).await,
        Command::Translate {
            configuration,
            kind,
            request,
        } => translate(configuration, kind, request, output).await,
    }
}

async fn initialize(dir: PathBuf) -> anyhow::Result<()> {
    let configuration_file = dir.join(archive_query_configuration::version1::CONFIGURATION_FILENAME);
    if tokio::fs::try_exists(&configuration_file).await? {
        anyhow::bail!(
            "{} already exists, refusing to overwrite it",
            configuration_file.display()
        );
    }
    archive_query_configuration::write_parsed_configuration(
        archive_query_configuration::ParsedConfiguration::initial(),
        &dir,
    )
    .await?;
    tracing::info!(dir = %dir.display(), "configuration initialized");
    Ok(())
}

async fn translate(
    configuration_dir: PathBuf,
    kind: dsl::request::RequestKind,
    request_file: PathBuf,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    let parsed = archive_query_configuration::parse_configuration(&configuration_dir).await?;
    let configuration = archive_query_configuration::make_runtime_configuration(parsed)?;

    let contents = tokio::fs::read_to_string(&request_file)
        .await
        .with_context(|| format!("reading {}", request_file.display()))?;
    let request: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", request_file.display()))?;
    let request = dsl::parse::request(kind, &request)?;

    let plan = translation::query::translate(&configuration, &request)?;
    serde_json::to_writer_pretty(&mut *output, &plan.to_json())?;
    writeln!(output)?;
    Ok(())
}
