use clap::ArgMatches;
use commands::command_argument_builder;
use indicatif::{ProgressBar, ProgressStyle};
use roadflow::handlers::{
    handle_authorities, handle_flows, load_config, parse_format, print_error, print_success,
    save_report,
};
use roadflow_core::logging::{Verbosity, init_logging};
use roadflow_core::report::ReportFormat;
use roadflow_core::state::DEFAULT_YEAR;
use roadflow_core::{AppController, Config, print_banner};
use roadflow_gateway::{FlowQuery, TrafficDataGateway};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();

    // Global flags are propagated down, so the subcommand sees them wherever they were typed
    let globals = chosen_command
        .subcommand()
        .map(|(_, sub)| sub)
        .unwrap_or(&chosen_command);
    let quiet = globals.get_flag("quiet");
    let verbosity = Verbosity::from_flags(quiet, globals.get_count("verbose"));

    let json_output = globals
        .try_get_one::<String>("format")
        .ok()
        .flatten()
        .is_some_and(|f| f == "json");
    if !quiet && !json_output && chosen_command.subcommand_name() != Some("ui") {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    let config = match load_config(
        globals.get_one::<PathBuf>("config"),
        globals.get_one::<Url>("base-url"),
    ) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };

    match chosen_command.subcommand() {
        Some(("ui", _)) => handle_ui(config, verbosity).await,
        Some((name, sub_matches)) => {
            if let Err(e) = init_logging(verbosity, None) {
                exit_with(e.into());
            }
            let gateway = match config.build_gateway() {
                Ok(gateway) => gateway,
                Err(e) => exit_with(e.into()),
            };
            let result = match name {
                "authorities" => run_authorities(&gateway, sub_matches, quiet).await,
                "flows" => run_flows(&gateway, &config, sub_matches, quiet).await,
                _ => unreachable!("clap should ensure we don't get here"),
            };
            if let Err(e) = result {
                exit_with(e);
            }
        }
        None => unreachable!("checked above"),
    }
}

fn exit_with(err: anyhow::Error) -> ! {
    print_error(&err);
    std::process::exit(1);
}

fn spinner(message: String, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message);
    spinner
}

async fn run_authorities(
    gateway: &dyn TrafficDataGateway,
    args: &ArgMatches,
    quiet: bool,
) -> anyhow::Result<()> {
    let filter = args.get_one::<String>("filter").map(String::as_str);
    let format = parse_format(args.get_one::<String>("format"));

    let progress = spinner("Loading local authorities...".to_string(), quiet);
    let result = handle_authorities(gateway, filter, format).await;
    progress.finish_and_clear();

    println!("{}", result?);
    Ok(())
}

async fn run_flows(
    gateway: &dyn TrafficDataGateway,
    config: &Config,
    args: &ArgMatches,
    quiet: bool,
) -> anyhow::Result<()> {
    let authority = args
        .get_one::<String>("authority")
        .ok_or_else(|| anyhow::anyhow!("--authority is required"))?;
    let year = args
        .get_one::<u16>("year")
        .copied()
        .or(config.selection.default_year)
        .unwrap_or(DEFAULT_YEAR);
    let format = parse_format(args.get_one::<String>("format"));
    let top = args.get_one::<usize>("top").copied();
    let query = FlowQuery::new(authority.as_str(), year);

    let progress = spinner(format!("Fetching flows for {}...", query), quiet);
    let result = handle_flows(gateway, &query, format, top).await;
    progress.finish_and_clear();
    let report = result?;

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(path, &report)?;
            if !quiet {
                print_success(&format!("Report saved to {}", path.display()));
            }
        }
        None => println!("{}", report),
    }
    Ok(())
}

async fn handle_ui(config: Config, verbosity: Verbosity) {
    // The UI owns the screen, so logs go to a file
    let log_file = config.log_file_path();
    if let Err(e) = init_logging(verbosity, Some(&log_file)) {
        exit_with(anyhow::Error::from(e).context(format!("Cannot open log file {}", log_file.display())));
    }

    let gateway: Arc<dyn TrafficDataGateway> = match config.build_gateway() {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => exit_with(e.into()),
    };
    let controller = AppController::with_state(gateway, config.initial_state());

    match tokio::task::spawn_blocking(move || roadflow_tui::run(controller)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => exit_with(e.context("Error running UI")),
        Err(e) => exit_with(e.into()),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
