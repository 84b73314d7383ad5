//! # Command Line Interface / 命令行接口
//!
//! Builds the `runner-matrix` command with localized help and hands the
//! parsed arguments to [`commands::run::execute`].
//!
//! 构建带有本地化帮助信息的 `runner-matrix` 命令，
//! 并将解析后的参数交给 [`commands::run::execute`]。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::models::PhaseSelector;
use crate::t;

/// Parsed command line of a batch run.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub repositories_dir: PathBuf,
    pub report_file: PathBuf,
    pub maven_home: Option<String>,
    pub jobs: Option<usize>,
    pub runs: u32,
    pub max_runs: u32,
    pub verbose: bool,
    pub kill_on_fail: bool,
    pub phase: PhaseSelector,
    pub config: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub log_dir: PathBuf,
    pub log_file: PathBuf,
    /// Set only when `--lang` was given explicitly.
    pub lang: Option<String>,
}

impl RunArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            repositories_dir: path_arg(matches, "repositories-dir"),
            report_file: path_arg(matches, "report-file"),
            maven_home: matches.get_one::<String>("maven-home").cloned(),
            jobs: matches.get_one::<usize>("jobs").copied(),
            runs: matches.get_one::<u32>("runs").copied().unwrap_or(1),
            max_runs: matches.get_one::<u32>("max-runs").copied().unwrap_or(20),
            verbose: matches.get_flag("verbose"),
            kill_on_fail: matches.get_flag("kill-on-fail"),
            phase: matches
                .get_one::<PhaseSelector>("phase")
                .copied()
                .unwrap_or_default(),
            config: matches.get_one::<PathBuf>("config").cloned(),
            timeout_secs: matches.get_one::<u64>("timeout-secs").copied(),
            log_dir: path_arg(matches, "log-dir"),
            log_file: path_arg(matches, "log-file"),
            lang: matches.get_one::<String>("lang").cloned(),
        }
    }
}

fn path_arg(matches: &ArgMatches, id: &str) -> PathBuf {
    matches.get_one::<PathBuf>(id).cloned().unwrap_or_default()
}

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang="))
        .map(str::to_string)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("runner-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .arg(
            Arg::new("repositories-dir")
                .help(t!("arg_repositories_dir", locale = locale).to_string())
                .value_name("REPOSITORIES_DIR")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("report-file")
                .help(t!("arg_report_file", locale = locale).to_string())
                .value_name("REPORT_FILE")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("maven-home")
                .short('m')
                .long("maven-home")
                .help(t!("arg_maven_home", locale = locale).to_string())
                .value_name("DIR")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help(t!("arg_jobs", locale = locale).to_string())
                .value_name("JOBS")
                .value_parser(clap::value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("runs")
                .short('r')
                .long("runs")
                .help(t!("arg_runs", locale = locale).to_string())
                .value_name("N")
                .default_value("1")
                .value_parser(clap::value_parser!(u32).range(1..))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("max-runs")
                .short('x')
                .long("max-runs")
                .help(t!("arg_max_runs", locale = locale).to_string())
                .value_name("N")
                .default_value("20")
                .value_parser(clap::value_parser!(u32).range(1..))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('s')
                .long("verbose")
                .help(t!("arg_verbose", locale = locale).to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("kill-on-fail")
                .short('k')
                .long("kill-on-fail")
                .help(t!("arg_kill_on_fail", locale = locale).to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("phase")
                .short('p')
                .long("phase")
                .help(t!("arg_phase", locale = locale).to_string())
                .value_name("PHASE")
                .default_value("ALL")
                .value_parser(|s: &str| s.parse::<PhaseSelector>())
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(t!("arg_config", locale = locale).to_string())
                .value_name("CONFIG")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .help(t!("arg_timeout_secs", locale = locale).to_string())
                .value_name("SECS")
                .value_parser(clap::value_parser!(u64).range(1..))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .help(t!("arg_log_dir", locale = locale).to_string())
                .value_name("DIR")
                .default_value("batch-logs")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help(t!("arg_log_file", locale = locale).to_string())
                .value_name("FILE")
                .default_value("runner-matrix.log")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .action(ArgAction::Set),
        )
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let language = crate::init_locale(pre_parse_language().as_deref());

    let matches = build_cli(&language).get_matches();
    let args = RunArgs::from_matches(&matches);

    commands::run::execute(args, language).await
}
