//! Subcommand handling.

use crate::formatter::Formatter;
use clap::Subcommand;
use relmap_core::{Schema, SchemaDocument};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// relmap subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a schema document
    Check {
        /// Schema document (JSON)
        file: PathBuf,
    },
    /// Describe tables, relationships, and write-time data
    Describe {
        /// Schema document (JSON)
        file: PathBuf,
        /// Only describe this table
        #[arg(short, long)]
        table: Option<String>,
    },
    /// Write a binary snapshot of a validated schema
    Snapshot {
        /// Schema document (JSON)
        file: PathBuf,
        /// Snapshot output path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Summarize a binary snapshot
    Inspect {
        /// Snapshot file
        snapshot: PathBuf,
    },
}

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Schema could not be loaded or validated.
    #[error("{0}")]
    Schema(#[from] relmap_core::Error),

    /// Requested table is not in the schema.
    #[error("unknown table `{0}`")]
    UnknownTable(String),

    /// IO error.
    #[error("cannot access {path:?}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result of executing a command.
pub enum CommandResult {
    /// Output to display.
    Output(String),
    /// Validation failed; output lists the violations.
    Invalid(String),
}

/// Execute a command.
pub fn execute(command: &Command, formatter: &dyn Formatter) -> Result<CommandResult, CliError> {
    match command {
        Command::Check { file } => match load(file) {
            Ok(schema) => Ok(CommandResult::Output(formatter.format_summary(&schema))),
            Err(CliError::Schema(relmap_core::Error::Validation(err))) => {
                tracing::warn!(
                    file = %file.display(),
                    violations = err.len(),
                    "schema is invalid"
                );
                Ok(CommandResult::Invalid(formatter.format_violations(&err)))
            }
            Err(e) => Err(e),
        },

        Command::Describe { file, table } => {
            let schema = load(file)?;
            let definitions = match table {
                Some(name) => vec![schema
                    .by_table(name)
                    .ok_or_else(|| CliError::UnknownTable(name.clone()))?],
                None => schema.definitions().iter().collect(),
            };
            Ok(CommandResult::Output(
                formatter.format_definitions(&schema, &definitions),
            ))
        }

        Command::Snapshot { file, output } => {
            let schema = load(file)?;
            let bytes = schema.to_bytes()?;
            std::fs::write(output, &bytes).map_err(|source| CliError::Io {
                path: output.clone(),
                source,
            })?;
            tracing::info!(output = %output.display(), bytes = bytes.len(), "snapshot written");
            Ok(CommandResult::Output(formatter.format_message(&format!(
                "wrote {} bytes to {} (fingerprint {})",
                bytes.len(),
                output.display(),
                schema.fingerprint()
            ))))
        }

        Command::Inspect { snapshot } => {
            let bytes = std::fs::read(snapshot).map_err(|source| CliError::Io {
                path: snapshot.clone(),
                source,
            })?;
            let schema = Schema::from_bytes(&bytes)?;
            Ok(CommandResult::Output(formatter.format_summary(&schema)))
        }
    }
}

fn load(file: &Path) -> Result<Schema, CliError> {
    let json = std::fs::read_to_string(file).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let schema = SchemaDocument::from_json_str(&json)?.build()?;
    tracing::debug!(file = %file.display(), tables = schema.len(), "schema loaded");
    Ok(schema)
}
