//! # Cable Calc CLI
//!
//! Command-line front end over `cable_core`: create projects, edit
//! calculations field by field, search, and export.
//!
//! ```text
//! cablecalc init --number 24-017 --title "Pump House"
//! cablecalc --project 24-017 set 0001 SystemVoltageLL_V=400 EquipmentRating_kW=75
//! cablecalc --project 24-017 summary 0001
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cable_core::export;
use cable_core::project::info;
use cable_core::schema;
use cable_core::{find_projects, AppConfig, CalcRecord, CalcSession, ProjectLocator, ProjectStore};

#[derive(Debug, Parser)]
#[command(name = "cablecalc", version, about = "Cable sizing calculations")]
struct Cli {
    /// Projects directory (overrides config and CABLECALC_PROJECTS_DIR)
    #[arg(long, global = true)]
    projects_dir: Option<PathBuf>,

    /// Config file (default: cablecalc.toml in the projects directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project number, resolved to `<projects_dir>/<number>.ccp`
    #[arg(long, short, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a project (or update its header) and its first calculation
    Init {
        #[arg(long)]
        number: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        document: String,
        #[arg(long, default_value = "")]
        rev: String,
    },
    /// Print the project header
    Info,
    /// List calculation numbers in stored order
    List,
    /// Print every field of a calculation
    Show {
        calc: String,
        #[arg(long)]
        json: bool,
    },
    /// Add a calculation with the next free number
    New,
    /// Edit input fields and save, e.g. `set 0001 PowerFactor=0.85`
    Set {
        calc: String,
        #[arg(required = true, value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },
    /// Calculations whose text contains the query
    Search { query: String },
    /// Write a calculation to `<project>_<calc>.csv`
    Export {
        calc: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the text summary of a calculation
    Summary { calc: String },
    /// Project files whose name contains the query
    Find {
        #[arg(default_value = "")]
        query: String,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::load().context("loading config")?,
    };
    if let Some(dir) = &cli.projects_dir {
        config.projects_dir = dir.clone();
    }
    debug!(projects_dir = %config.projects_dir.display(), "configuration loaded");
    Ok(config)
}

fn locator(cli: &Cli, config: &AppConfig) -> Result<ProjectLocator> {
    match &cli.project {
        Some(number) => Ok(ProjectLocator::for_project_number(&config.projects_dir, number)),
        None => bail!("no project given, pass --project <NUMBER>"),
    }
}

fn open_store(cli: &Cli, config: &AppConfig, locked: bool) -> Result<ProjectStore> {
    let locator = locator(cli, config)?;
    let store = if locked {
        ProjectStore::open_locked(&locator, &config.user_id)
    } else {
        ProjectStore::open_or_create(&locator)
    }
    .with_context(|| format!("opening project {}", locator.path().display()))?;

    if !store.migrated_columns().is_empty() {
        eprintln!("Added columns: {}", store.migrated_columns().join(", "));
    }
    Ok(store)
}

fn fetch(store: &ProjectStore, calc: &str) -> Result<CalcRecord> {
    match store.read_by_key(calc) {
        Some((_, mut record)) => {
            cable_core::recompute(&mut record);
            Ok(record)
        }
        None => bail!("calculation {} not found in {}", calc, store.locator().name()),
    }
}

fn print_record(record: &CalcRecord) {
    let width = record.names().map(str::len).max().unwrap_or(0);
    for (name, value) in record.iter() {
        let marker = if schema::is_derived(name) { "=" } else { ":" };
        println!("{:<width$} {} {}", name, marker, value, width = width);
    }
}

fn record_json(record: &CalcRecord) -> Result<String> {
    let mut map = serde_json::Map::new();
    for (name, value) in record.iter() {
        map.insert(name.to_string(), serde_json::to_value(value)?);
    }
    Ok(serde_json::to_string_pretty(&serde_json::Value::Object(map))?)
}

fn split_assignment(text: &str) -> Result<(&str, &str)> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => bail!("expected FIELD=VALUE, got {:?}", text),
    }
}

fn init(config: &AppConfig, number: &str, header: [(&str, &str); 5]) -> Result<PathBuf> {
    let locator = ProjectLocator::for_project_number(&config.projects_dir, number);
    let mut store = ProjectStore::open_locked(&locator, &config.user_id)
        .with_context(|| format!("creating project {}", locator.path().display()))?;

    let mut project = store.read_project_info().clone();
    for (key, value) in header {
        if !value.is_empty() || project.get(key).is_none() {
            project.set(key, value);
        }
    }
    store.write_project_info(project)?;

    let mut session = CalcSession::from_config(config);
    session.attach(&mut store)?;
    Ok(store.path())
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    match &cli.command {
        Command::Init {
            number,
            title,
            location,
            document,
            rev,
        } => {
            let header = [
                (info::PROJECT_NUMBER, number.as_str()),
                (info::PROJECT_TITLE, title.as_str()),
                (info::LOCATION, location.as_str()),
                (info::DOCUMENT_NUMBER, document.as_str()),
                (info::REV_NO, rev.as_str()),
            ];
            let path = init(&config, number, header)?;
            println!("{}", path.display());
        }
        Command::Info => {
            let store = open_store(cli, &config, false)?;
            for (key, value) in store.read_project_info().iter() {
                println!("{}: {}", key, value);
            }
        }
        Command::List => {
            let store = open_store(cli, &config, false)?;
            for key in store.list_calculation_keys() {
                println!("{}", key);
            }
        }
        Command::Show { calc, json } => {
            let store = open_store(cli, &config, false)?;
            let record = fetch(&store, calc)?;
            if *json {
                println!("{}", record_json(&record)?);
            } else {
                print_record(&record);
            }
        }
        Command::New => {
            let mut store = open_store(cli, &config, true)?;
            let mut session = CalcSession::from_config(&config);
            session.attach(&mut store)?;
            let key = session.new_calculation(&store);
            session.save(&mut store)?;
            println!("{}", key);
        }
        Command::Set { calc, assignments } => {
            let mut store = open_store(cli, &config, true)?;
            let mut session = CalcSession::from_config(&config);
            session.attach(&mut store)?;
            if !session.load_key(&store, calc) {
                bail!("calculation {} not found in {}", calc, store.locator().name());
            }
            for assignment in assignments {
                let (name, value) = split_assignment(assignment)?;
                session
                    .set_input(name, value)
                    .with_context(|| format!("setting {}", name))?;
            }
            for miss in session.derived().lookup_misses() {
                eprintln!("warning: {}", miss);
            }
            session.save(&mut store)?;
            print_record(session.record());
        }
        Command::Search { query } => {
            let store = open_store(cli, &config, false)?;
            for (_, record) in store.search(query) {
                println!(
                    "{}\t{}\t{}",
                    record.key(),
                    record.text(schema::field::CABLE_TAG),
                    record.text(schema::field::CIRCUIT_ID)
                );
            }
        }
        Command::Export { calc, out } => {
            let store = open_store(cli, &config, false)?;
            let record = fetch(&store, calc)?;
            let dir: &Path = out.as_deref().unwrap_or(config.projects_dir.as_path());
            let path = export::export_csv(&record, store.read_project_info(), dir)?;
            println!("{}", path.display());
        }
        Command::Summary { calc } => {
            let store = open_store(cli, &config, false)?;
            let record = fetch(&store, calc)?;
            println!("{}", export::summary(store.read_project_info(), &record));
        }
        Command::Find { query } => {
            for path in find_projects(&config.projects_dir, query)? {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("PowerFactor=0.85").unwrap(), ("PowerFactor", "0.85"));
        assert_eq!(split_assignment("CableTag=").unwrap(), ("CableTag", ""));
        assert_eq!(split_assignment("Note=a=b").unwrap(), ("Note", "a=b"));
        assert!(split_assignment("PowerFactor").is_err());
        assert!(split_assignment("=1").is_err());
    }

    #[test]
    fn test_cli_parses_set() {
        let cli = Cli::try_parse_from(["cablecalc", "-p", "24-017", "set", "0001", "Phase=1"]).unwrap();
        assert_eq!(cli.project.as_deref(), Some("24-017"));
        match cli.command {
            Command::Set { calc, assignments } => {
                assert_eq!(calc, "0001");
                assert_eq!(assignments, vec!["Phase=1"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_record_json_keeps_numbers() {
        let record = CalcRecord::new("0001").with(schema::field::SYSTEM_VOLTAGE_LL, 400.0);
        let json: serde_json::Value = serde_json::from_str(&record_json(&record).unwrap()).unwrap();
        assert_eq!(json["CalculationNumber"], "0001");
        assert_eq!(json["SystemVoltageLL_V"], 400.0);
    }
}
