//! relmap Command-Line Tool
//!
//! Checks, describes, and snapshots relmap schema documents.

mod commands;
mod formatter;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use commands::{Command, CommandResult};
use formatter::OutputFormat;

/// relmap Command-Line Tool
#[derive(Parser, Debug)]
#[command(name = "relmap")]
#[command(version, about = "Check and inspect relmap schema documents")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relmap=info,relmap_core=info".into()),
        )
        .init();

    let args = Args::parse();
    let formatter = formatter::create_formatter(args.format);

    match commands::execute(&args.command, &*formatter) {
        Ok(CommandResult::Output(output)) => println!("{}", output),
        Ok(CommandResult::Invalid(output)) => {
            eprintln!("{}", output);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        let args = Args::try_parse_from(["relmap", "check", "schema.json"]).unwrap();
        assert_eq!(args.format, OutputFormat::Table);

        let args =
            Args::try_parse_from(["relmap", "describe", "schema.json", "--format", "json"]).unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(OutputFormat::Json.to_string(), "json");

        let text = Args::try_parse_from(["relmap", "--format", "text", "check", "schema.json"]);
        assert!(text.is_err());
    }
}
