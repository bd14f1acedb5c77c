//! Dispatch console
//!
//! Reads command strings from stdin (or `--exec`) and runs them through a
//! `CommandDispatcher` with a few demo commands bound:
//!
//! ```text
//! vget /console/echo [str]
//! vget /console/add [float] [float]
//! vget /console/sleep [uint]        (pending until the timer fires)
//! ```
//!
//! Type `help` for the command listing, `quit` to exit.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use command_dispatcher::{
    CommandArgs, CommandDispatcher, CommandError, DispatcherConfig, ExecStatus, Promise,
};

#[derive(Debug, Parser)]
#[command(name = "dispatch_console", about = "Run dispatcher commands interactively")]
struct Cli {
    /// YAML file of aliases to define at startup
    #[arg(long, env = "DISPATCH_ALIAS_FILE")]
    alias_file: Option<PathBuf>,

    /// Run this command and exit (repeatable)
    #[arg(long = "exec", value_name = "COMMAND")]
    exec: Vec<String>,

    /// Dispatch through the async watcher instead of synchronously
    #[arg(long = "async")]
    async_mode: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "command_dispatcher=info,dispatch_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    let mut config = DispatcherConfig::from_env();
    if let Some(path) = cli.alias_file.clone() {
        config = config.with_alias_file(path);
    }
    let mut dispatcher = CommandDispatcher::with_runtime(config, runtime.handle())
        .context("Failed to build dispatcher")?;
    register_demo_commands(&mut dispatcher, runtime.handle().clone())?;

    tracing::info!("Dispatch console ready");

    if !cli.exec.is_empty() {
        for command in &cli.exec {
            run_line(&mut dispatcher, command, cli.async_mode);
            drain(&mut dispatcher);
        }
        dispatcher.shutdown();
        return Ok(());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let command = line.trim();
        dispatcher.pump_completions();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => print!("{}", dispatcher.help_text()),
            _ => run_line(&mut dispatcher, command, cli.async_mode),
        }
        dispatcher.pump_completions();
    }

    drain(&mut dispatcher);
    dispatcher.shutdown();
    Ok(())
}

fn register_demo_commands(
    dispatcher: &mut CommandDispatcher,
    runtime: tokio::runtime::Handle,
) -> Result<()> {
    dispatcher.bind(
        "vget /console/echo [str]",
        |args: &CommandArgs| ExecStatus::from(args.str(0).map(str::to_string)),
        "Echo the argument back",
    )?;

    dispatcher.bind(
        "vget /console/add [float] [float]",
        |args: &CommandArgs| {
            let sum = args.float(0).and_then(|a| args.float(1).map(|b| a + b));
            ExecStatus::from(sum.map(|total| total.to_string()))
        },
        "Add two decimal numbers",
    )?;

    dispatcher.bind(
        "vget /console/sleep [uint]",
        move |args: &CommandArgs| {
            let millis = match args.uint(0) {
                Ok(millis) => millis,
                Err(err) => return ExecStatus::Error(err),
            };
            let (tx, rx) = tokio::sync::oneshot::channel();
            runtime.spawn(async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                let _ = tx.send(ExecStatus::ok(format!("slept {} ms", millis)));
            });
            ExecStatus::pending(Promise::from_oneshot(rx))
        },
        "Resolve after the given number of milliseconds",
    )?;

    Ok(())
}

fn run_line(dispatcher: &mut CommandDispatcher, command: &str, async_mode: bool) {
    if !async_mode {
        print_status(command, &dispatcher.exec(command));
        return;
    }

    let label = command.to_string();
    match dispatcher.exec_async(command, move |status| print_status(&label, &status)) {
        Ok(()) if dispatcher.is_busy() => println!("{} ... pending", command),
        Ok(()) => {}
        Err(CommandError::WatcherBusy) => {
            println!("{} rejected: a command is still pending", command)
        }
        Err(err) => println!("{} rejected: {}", command, err),
    }
}

fn drain(dispatcher: &mut CommandDispatcher) {
    while dispatcher.is_busy() {
        if !dispatcher.wait_for_completion(Duration::from_secs(30)) {
            tracing::warn!("Gave up waiting for a pending command");
            break;
        }
    }
}

fn print_status(command: &str, status: &ExecStatus) {
    println!("{} [{}] {}", command, status.kind(), status.message());
}
