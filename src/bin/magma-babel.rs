//! magma-babel CLI - evaluate a Magma block from a file or stdin
//!
//! Runs the block in a local session (default) or through the online
//! calculator and prints the result.

use anyhow::Context;
use clap::Parser;
use magma_babel::{Babel, Config, HeaderArgs, Value};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "magma-babel")]
#[command(about = "Evaluate Magma code blocks in a session or on the online calculator", long_about = None)]
struct Cli {
    /// Source file (reads stdin when omitted)
    file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluate through the online calculator instead of a local session
    #[arg(long)]
    remote: bool,

    /// Session name
    #[arg(short, long, default_value = "none")]
    session: String,

    /// Variable binding as name=value (repeatable)
    #[arg(short, long = "var")]
    vars: Vec<String>,

    /// Result collection mode: output, value or eval
    #[arg(short, long, default_value = "value")]
    result_type: String,

    /// Wrap the block in isolated evaluation
    #[arg(long)]
    magma_eval: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn header_args(&self) -> HeaderArgs {
        let mut args: HeaderArgs = vec![
            (":session".to_string(), Value::string(&self.session)),
            (":result-type".to_string(), Value::string(&self.result_type)),
            (":magma-eval".to_string(), Value::Boolean(self.magma_eval)),
        ];
        for var in &self.vars {
            args.push((":var".to_string(), Value::string(var)));
        }
        args
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let config = config.with_env(|key| std::env::var(key).ok());

    let source = match &cli.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let args = cli.header_args();
    let mut babel = Babel::new(config)?;
    let value = if cli.remote {
        babel.execute_remote(&source, &args)?
    } else {
        babel.execute(&source, &args)?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&value.to_json())?);
    } else {
        print_value(&value);
    }

    Ok(())
}

fn print_value(value: &Value) {
    match value {
        Value::List(rows) if value.is_table() => {
            for row in rows {
                match row {
                    Value::List(cells) => {
                        let cells: Vec<String> = cells.iter().map(Value::to_string).collect();
                        println!("{}", cells.join("\t"));
                    }
                    _ => println!("-"),
                }
            }
        }
        other => println!("{other}"),
    }
}
