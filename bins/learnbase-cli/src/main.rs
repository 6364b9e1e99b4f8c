mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "learnbase-cli")]
#[command(about = "Learnbase CLI - Validate solutions locally and inspect runtimes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a solution file against a set of test cases
    Validate {
        /// Source file defining solve()
        #[arg(short, long)]
        code: PathBuf,

        /// JSON file with test cases: an array of {input, output} or an exercise document
        #[arg(short = 't', long)]
        cases: PathBuf,

        /// Language tag (defaults to python)
        #[arg(short, long)]
        language: Option<String>,

        /// Per-test-case deadline in milliseconds (defaults to the language config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_ms: Option<u64>,

        /// Number of test cases to run at once
        #[arg(
            short,
            long,
            default_value = "1",
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        parallel: usize,

        /// Print the verdict as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print the built-in exercise for a topic and level as JSON
    Exercise {
        /// Topic name
        #[arg(long)]
        topic: String,

        /// basic, intermediate or advanced
        #[arg(short, long, default_value = "basic")]
        level: String,
    },

    /// List configured language runtimes
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            code,
            cases,
            language,
            timeout_ms,
            parallel,
            json,
        } => {
            let passed = commands::validate(
                &code,
                &cases,
                language.as_deref(),
                timeout_ms,
                parallel,
                json,
            )
            .await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Exercise { topic, level } => {
            commands::show_exercise(&topic, &level)?;
        }
        Commands::Languages => {
            commands::list_languages()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
        let mut args = vec![
            "learnbase-cli",
            "validate",
            "--code",
            "solution.py",
            "--cases",
            "cases.json",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args)
    }

    #[test]
    fn test_validate_defaults() {
        let cli = parse(&[]).unwrap();
        match cli.command {
            Commands::Validate {
                timeout_ms,
                parallel,
                json,
                ..
            } => {
                assert_eq!(timeout_ms, None);
                assert_eq!(parallel, 1);
                assert!(!json);
            }
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_positive_timeout_is_accepted() {
        let cli = parse(&["--timeout-ms", "500"]).unwrap();
        match cli.command {
            Commands::Validate { timeout_ms, .. } => assert_eq!(timeout_ms, Some(500)),
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(parse(&["--timeout-ms", "0"]).is_err());
    }

    #[test]
    fn test_zero_parallelism_is_rejected() {
        assert!(parse(&["--parallel", "0"]).is_err());
    }
}
