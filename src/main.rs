//! release-relay CLI entrypoint.
//!
//! Loads `.env`, installs the logger, builds the configuration once, and
//! dispatches to a one-off run or the trigger server.

use clap::Parser;
use log::warn;
use release_relay::cli::{Cli, Command, RunArgs, ServeArgs};
use release_relay::config::{RelayConfig, Secret};
use release_relay::error::Result;
use release_relay::output::{success_message, warning_lines, write_stderr_line};
use release_relay::pipeline::{TransferJob, run_job};
use release_relay::server::serve;
use std::io::Write;

fn main() {
    let dotenv_result = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = dotenv_result
        && !err.not_found()
    {
        warn!("Ignoring unreadable .env file: {err}");
    }

    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = RelayConfig::from_env()?;
    match &cli.command {
        Command::Run(args) => run_once(config, args, stderr),
        Command::Serve(args) => serve(configure_server(config, args)),
    }
}

fn run_once(base: RelayConfig, args: &RunArgs, stderr: &mut dyn Write) -> Result<()> {
    let config = args
        .download_dir
        .clone()
        .into_iter()
        .fold(base, RelayConfig::with_download_dir);
    let job = TransferJob {
        repo: args.repo.clone(),
        remote_path: args.remote_path.clone(),
        token_override: args.token.clone().map(Secret::new),
    };
    let report = run_job(&config, &job)?;
    for line in warning_lines(&report) {
        write_stderr_line(stderr, line);
    }
    write_stderr_line(stderr, success_message(&report, &job.remote_path));
    Ok(())
}

fn configure_server(base: RelayConfig, args: &ServeArgs) -> RelayConfig {
    let with_dir = args
        .download_dir
        .clone()
        .into_iter()
        .fold(base, RelayConfig::with_download_dir);
    args.bind
        .clone()
        .into_iter()
        .fold(with_dir, RelayConfig::with_bind_address)
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
