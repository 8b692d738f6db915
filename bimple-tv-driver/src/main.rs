// SPDX-License-Identifier: Apache-2.0

//! Command line driver for the bimple translation-validation harness.
//!
//! Runs the equivalence suite (`alive-tests/`) and then the behavioral suite
//! (`output-tests/`) against the transpiler plugin, printing a progress line
//! per test file and a summary at the end.
//!
//! Sample usage, from the plugin's build directory:
//!
//! ```shell
//! $ bimple-tv-driver --test_root=../tests
//! $ bimple-tv-driver --toolchain=$HOME/bimple-tv-toolchain.toml \
//!     --on_failure=continue --json_summary=summary.json
//! ```
//!
//! Exit status is 1 when the run aborted on a failing test or could not be
//! configured, 0 otherwise.

mod console_reporter;
mod report_cli_error;
mod run_config;

use std::path::PathBuf;

use bimple_tv::{Harness, PhraseVerdictParser, SuiteSelection, SystemToolRunner};
use clap::{Arg, ArgAction};
use console_reporter::ConsoleReporter;
use report_cli_error::report_cli_error_and_exit;

trait AppExt {
    fn add_bool_arg(self, long: &'static str, help: &'static str) -> Self;
}

impl AppExt for clap::Command {
    fn add_bool_arg(self, long: &'static str, help: &'static str) -> Self {
        (self as clap::Command).arg(
            Arg::new(long)
                .long(long)
                .value_name("BOOL")
                .action(ArgAction::Set)
                .value_parser(["true", "false"])
                .num_args(1)
                .help(help),
        )
    }
}

fn command() -> clap::Command {
    clap::Command::new("bimple-tv-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translation-validation harness for the bimple transpiler plugin")
        .arg(
            Arg::new("toolchain")
                .long("toolchain")
                .value_name("TOOLCHAIN")
                .help("Path to a bimple-tv-toolchain.toml file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("test_root")
                .long("test_root")
                .value_name("DIR")
                .help("Directory containing alive-tests/ and output-tests/")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("on_failure")
                .long("on_failure")
                .value_name("POLICY")
                .help("Whether a failing test stops the run")
                .value_parser(["abort", "continue"])
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("suite")
                .long("suite")
                .value_name("SUITE")
                .help("Which suites to run")
                .value_parser(["all", "equivalence", "behavioral"])
                .default_value("all")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("timeout_secs")
                .long("timeout_secs")
                .value_name("SECONDS")
                .help("Per-tool-invocation time limit; 0 disables it")
                .value_parser(clap::value_parser!(u64))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("json_summary")
                .long("json_summary")
                .value_name("PATH")
                .help("Also write the run summary and per-test reports as JSON")
                .action(ArgAction::Set),
        )
        .add_bool_arg("keep_temps", "Keep each test's scratch directory")
        .add_bool_arg(
            "verbose",
            "Dump captured tool output for unsupported and inconclusive tests too",
        )
}

fn main() {
    let _ = env_logger::try_init();

    log::info!(
        "bimple-tv-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = command().get_matches();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => report_cli_error_and_exit(
            "cannot determine current directory",
            None,
            vec![("error", e.to_string().as_str())],
        ),
    };

    let toml_path = run_config::find_toolchain_toml(matches.get_one::<String>("toolchain"), &cwd);
    if let Some(path) = &toml_path {
        if !path.exists() {
            report_cli_error_and_exit(
                "toolchain toml file does not exist",
                None,
                vec![("path", path.display().to_string().as_str())],
            );
        }
    }
    let mut config = match run_config::load_config(toml_path.as_deref(), &cwd) {
        Ok(config) => config,
        Err(e) => report_cli_error_and_exit(
            "could not load toolchain config",
            None,
            vec![("error", e.to_string().as_str())],
        ),
    };
    if let Err(e) = run_config::apply_overrides(&mut config.harness, &matches, &cwd) {
        report_cli_error_and_exit(&e, None, vec![]);
    }
    log::info!("toolchain: {:?}", config.toolchain);
    log::info!("harness: {:?}", config.harness);

    let problems = run_config::preflight(&config.toolchain);
    if !problems.is_empty() {
        let details: Vec<(&str, &str)> = problems
            .iter()
            .map(|(what, problem)| (what.as_str(), problem.as_str()))
            .collect();
        report_cli_error_and_exit("required tools are not available", None, details);
    }

    let selection = match matches
        .get_one::<String>("suite")
        .map(|s| s.parse::<SuiteSelection>())
    {
        Some(Ok(selection)) => selection,
        Some(Err(e)) => report_cli_error_and_exit(&e, None, vec![]),
        None => SuiteSelection::All,
    };
    let verbose = matches
        .get_one::<String>("verbose")
        .map(|v| v == "true")
        .unwrap_or(false);

    let runner = SystemToolRunner::new(config.harness.tool_timeout());
    let parser = PhraseVerdictParser::new(config.toolchain.verdict.clone());
    let harness = Harness::new(&config.toolchain, &config.harness, &runner, &parser);
    let mut reporter = ConsoleReporter::new(std::io::stdout(), verbose);
    let run = match harness.run(selection, &mut reporter) {
        Ok(run) => run,
        Err(e) => report_cli_error_and_exit(&e.to_string(), None, vec![]),
    };

    println!("{}", run.summary);

    if let Some(path) = matches.get_one::<String>("json_summary") {
        let path = cwd.join(PathBuf::from(path));
        if let Err(e) = run_config::write_json_summary(&path, &run) {
            report_cli_error_and_exit(
                "could not write json summary",
                None,
                vec![("error", format!("{:#}", e).as_str())],
            );
        }
    }

    if let Some(aborted_on) = &run.aborted_on {
        log::error!("run aborted on {}", aborted_on.display());
        std::process::exit(1);
    }
}
