// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

use swarmlet::accessor::{AccessorEvent, EventKind};
use swarmlet::backends::local::LibrarySourceProvider;
use swarmlet::backends::timers::TokioTimers;
use swarmlet::config::consts::DEFAULT_RUN_DURATION_MS;
use swarmlet::config::{load_and_validate_config, SwarmletBuilder};
use swarmlet::engine::Runtime;
use swarmlet::traits::SourceProvider;

const USAGE: &str = "Usage: swarmlet <swarmlet.yaml|swarmlet.toml> [--duration-ms N] [--input name=value]...
       swarmlet --classes";

struct Options {
    config: String,
    duration: Duration,
    inputs: Vec<(String, Value)>,
}

enum Command {
    Run(Options),
    ListClasses,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut config = None;
    let mut duration = Duration::from_millis(DEFAULT_RUN_DURATION_MS);
    let mut inputs = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--classes" => return Ok(Command::ListClasses),
            "--duration-ms" => {
                let value = iter.next().context("--duration-ms needs a value")?;
                let millis = value
                    .parse()
                    .with_context(|| format!("invalid duration '{}'", value))?;
                duration = Duration::from_millis(millis);
            }
            "--input" => {
                let value = iter.next().context("--input needs name=value")?;
                inputs.push(parse_input(value)?);
            }
            other if other.starts_with("--") => bail!("unknown option '{}'", other),
            path => {
                if config.replace(path.to_string()).is_some() {
                    bail!("only one swarmlet file can be run at a time");
                }
            }
        }
    }

    Ok(Command::Run(Options {
        config: config.context("missing swarmlet file")?,
        duration,
        inputs,
    }))
}

/// `name=value` where the value is JSON. Anything that is not valid JSON is taken as a string.
fn parse_input(text: &str) -> Result<(String, Value)> {
    let (name, raw) = text
        .split_once('=')
        .with_context(|| format!("expected name=value, got '{}'", text))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(error) => {
            eprintln!("{}\n\n{}", error, USAGE);
            std::process::exit(2);
        }
    };

    match command {
        Command::ListClasses => {
            for class in LibrarySourceProvider::new().classes() {
                println!("{}", class);
            }
            Ok(())
        }
        // Accessors are single-threaded; timer tasks run on the local set.
        Command::Run(options) => LocalSet::new().run_until(run(options)).await,
    }
}

async fn run(options: Options) -> Result<()> {
    let provider = Rc::new(LibrarySourceProvider::new());
    let source: &dyn SourceProvider = &*provider;
    let config = load_and_validate_config(&options.config, Some(source))?;

    let mut runtime = Runtime::new(provider.clone(), Rc::new(TokioTimers::new()));
    let swarmlet = SwarmletBuilder::build(&config, &mut runtime)?;

    swarmlet.on(EventKind::Output, |event| {
        if let AccessorEvent::Output { name, value } = event {
            println!("{} = {}", name, value);
        }
    });
    swarmlet
        .initialize()
        .with_context(|| format!("failed to initialize swarmlet '{}'", config.name))?;

    for (name, value) in options.inputs {
        swarmlet
            .provide_input(&name, value)
            .with_context(|| format!("failed to provide input '{}'", name))?;
    }

    tokio::time::sleep(options.duration).await;

    let wrapup = runtime.wrapup_all();
    let reported = runtime.take_errors();
    wrapup.with_context(|| format!("failed to wrap up swarmlet '{}'", config.name))?;
    if !reported.is_empty() {
        bail!(
            "{} errors reported while running swarmlet '{}'",
            reported.len(),
            config.name
        );
    }
    Ok(())
}
