//! DAL command line tool
//!
//! Lists the applications of a session with their disabled state, prints
//! parent paths of a component and checks a database for containment cycles.

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dal_core::{ConfigStore, ResolverConfig};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;

fn db_arg() -> Arg {
    Arg::new("db")
        .long("db")
        .short('d')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON configuration database")
}

fn session_arg() -> Arg {
    Arg::new("session")
        .long("session")
        .short('s')
        .help("Session uid (defaults to the only session of the database)")
}

fn cli() -> Command {
    Command::new("dal-cli")
        .version(dal_core::VERSION)
        .about("Disabled-component queries over configuration databases")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Resolver limits (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Raise log level (-v debug, -vv trace)"),
        )
        .subcommand(
            Command::new("list-apps")
                .about("List session applications and their disabled state")
                .arg(db_arg())
                .arg(session_arg())
                .arg(
                    Arg::new("enable-disabled")
                        .long("enable-disabled")
                        .short('e')
                        .action(ArgAction::SetTrue)
                        .help("Enable the components disabled by the session"),
                ),
        )
        .subcommand(
            Command::new("parents")
                .about("Print every containment path to a component")
                .arg(db_arg())
                .arg(session_arg())
                .arg(
                    Arg::new("component")
                        .required(true)
                        .help("Uid of the component"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Report containment cycles")
                .arg(db_arg()),
        )
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolver_config(args: &ArgMatches) -> anyhow::Result<ResolverConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => ResolverConfig::from_toml_file(path)
            .with_context(|| format!("cannot read resolver config {}", path.display())),
        None => Ok(ResolverConfig::default()),
    }
}

fn open_store(args: &ArgMatches) -> anyhow::Result<Arc<ConfigStore>> {
    let path = args
        .get_one::<PathBuf>("db")
        .context("missing --db argument")?;
    let store = ConfigStore::new();
    store
        .load_file(path)
        .with_context(|| format!("cannot load database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn run(matches: &ArgMatches, out: &mut impl Write) -> anyhow::Result<ExitCode> {
    let config = resolver_config(matches)?;

    match matches.subcommand() {
        Some(("list-apps", args)) => {
            let store = open_store(args)?;
            let session = commands::open_session(store, args.get_one::<String>("session"), config)?;
            commands::list_apps(&session, args.get_flag("enable-disabled"), out)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("parents", args)) => {
            let store = open_store(args)?;
            let session = commands::open_session(store, args.get_one::<String>("session"), config)?;
            let component = args
                .get_one::<String>("component")
                .context("missing component argument")?;
            commands::parents(&session, component, out)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("check", args)) => {
            let store = open_store(args)?;
            let clean = commands::check(&store.snapshot(), out)?;
            Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        _ => anyhow::bail!("unknown subcommand"),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let stdout = std::io::stdout();
    match run(&matches, &mut stdout.lock()) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(args: &[&str]) -> (anyhow::Result<ExitCode>, String) {
        let matches = cli().try_get_matches_from(args).unwrap();
        let mut out = Vec::new();
        let code = run(&matches, &mut out);
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn list_apps_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db.json");
        std::fs::write(&db, dal_test_utils::SCENARIO_JSON).unwrap();
        let db = db.to_str().unwrap();

        let (code, out) = run_args(&["dal-cli", "list-apps", "--db", db]);
        assert_eq!(code.unwrap(), ExitCode::SUCCESS);
        assert!(out.contains("'N@ResourceSetAND'"));
        assert!(out.contains("'O@ResourceSetOR' <disabled>"));
    }

    #[test]
    fn config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db.json");
        let config = dir.path().join("dal.toml");
        std::fs::write(&db, dal_test_utils::SCENARIO_JSON).unwrap();
        std::fs::write(&config, "max_recursion_depth = 2\n").unwrap();

        let (code, _) = run_args(&[
            "dal-cli",
            "--config",
            config.to_str().unwrap(),
            "list-apps",
            "--db",
            db.to_str().unwrap(),
        ]);
        let err = code.unwrap_err();
        assert!(format!("{err:#}").contains("circular dependency"));
    }

    #[test]
    fn missing_database_is_reported() {
        let (code, _) = run_args(&["dal-cli", "check", "--db", "/nonexistent/db.json"]);
        assert!(format!("{:#}", code.unwrap_err()).contains("cannot load database"));
    }
}
