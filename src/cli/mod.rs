use crate::app_error::AppError;
use crate::catalog;
use crate::config::{self, Config, Settings, StoreSettings};
use crate::envfile;
use crate::model::{ExecutionStatus, Outcome};
use crate::output::{self, HistoryRow, RunRow};
use crate::store::{ExecutionFilter, FileStore};
use crate::tracker::{RunReport, Tracker};
use crate::version;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Generator, generate};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "./directit.yml";

const DEFAULT_CONFIG_TEMPLATE: &str = r#"version: 1

store:
  backend: file          # file | rest
  path: ".directit"      # directory holding the tables (file backend)
  # url: "https://example.supabase.co"
  # api_key_env: DIRECTIT_API_KEY   # read from the environment or .env
  # timeout: "10s"

simulation:
  min_duration: "2s"     # shortest simulated run
  max_duration: "5s"     # runs last less than this
  success_rate: 0.8

tracker:
  overlap: reject        # reject | allow
"#;

#[derive(Debug, Parser)]
#[command(
    name = "directit",
    version = version::VALUE,
    about = "Automation script catalog with simulated runs",
    styles = clap_styles()
)]
struct Cli {
    #[arg(long = "no-color", global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a config template
    Init(InitArgs),
    /// List categories and their scripts
    Scripts(ScriptsArgs),
    /// Start simulated runs and wait for them to settle
    Run(RunArgs),
    /// Show recorded executions
    History(HistoryArgs),
    Validate(ValidateArgs),
    Version,
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
struct StoreArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long = "env-file")]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    force: bool,
    /// Also write a sample catalog into the file store
    #[arg(long)]
    seed: bool,
}

#[derive(Debug, Args)]
struct ScriptsArgs {
    #[command(flatten)]
    store: StoreArgs,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Script ids or names
    #[arg(required = true)]
    scripts: Vec<String>,
    #[command(flatten)]
    store: StoreArgs,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    #[command(flatten)]
    store: StoreArgs,
    #[arg(long, default_value_t = 20)]
    limit: usize,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    script: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct CompletionArgs {
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn clap_styles() -> Styles {
    Styles::plain()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Cyan.on_default())
        .context(AnsiColor::White.on_default())
        .context_value(AnsiColor::Cyan.on_default())
}

pub fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    output::configure(cli.no_color);

    match cli.command {
        Commands::Init(args) => run_init(args),
        Commands::Scripts(args) => run_scripts(args),
        Commands::Run(args) => run_run(args),
        Commands::History(args) => run_history(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Version => {
            println!("{}", version::VALUE);
            Ok(())
        }
        Commands::Completion(args) => run_completion(args),
    }
}

fn run_init(args: InitArgs) -> Result<(), AppError> {
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if config_path.exists() && !args.force {
        return Err(AppError::usage(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
        .map_err(|e| AppError::internal(format!("write {}: {e}", config_path.display())))?;

    println!(
        "created {}",
        output::info(&config_path.display().to_string())
    );

    if !args.seed {
        return Ok(());
    }

    let cfg = load_config_classified(&config_path)?;
    let settings = cfg.resolve(&HashMap::new()).map_err(AppError::usage)?;
    let StoreSettings::File { dir } = &settings.store else {
        return Err(AppError::usage("--seed only supports the file backend"));
    };

    let store = FileStore::new(dir);
    if store.seed_sample()? {
        println!(
            "seeded sample catalog in {}",
            output::info(&dir.display().to_string())
        );
    } else {
        println!(
            "{} catalog already present in {}, left untouched",
            output::info("i"),
            dir.display()
        );
    }

    Ok(())
}

fn run_scripts(args: ScriptsArgs) -> Result<(), AppError> {
    let settings = open_settings(&args.store)?;
    let store = settings.store.open()?;
    let entries = catalog::load(store.as_ref())?;
    let summary = catalog::summarize(&entries);

    if args.json {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &entries)
            .map_err(|e| AppError::internal(format!("encode scripts json: {e}")))?;
        writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))?;
        return Ok(());
    }

    output::print_catalog(io::stdout().lock(), &entries, summary)
        .map_err(|e| AppError::internal(format!("print scripts: {e}")))
}

fn run_run(args: RunArgs) -> Result<(), AppError> {
    let settings = open_settings(&args.store)?;
    let store = settings.store.open()?;
    let entries = catalog::load(store.as_ref())?;

    let mut targets = Vec::with_capacity(args.scripts.len());
    for key in &args.scripts {
        let script = catalog::find_script(&entries, key)
            .ok_or_else(|| AppError::usage(format!("script {key:?} not found")))?;
        targets.push((script.id.clone(), script.name.clone()));
    }

    let tracker = Tracker::new(store, settings.simulation, settings.overlap);
    let mut handles = Vec::with_capacity(targets.len());

    for (id, name) in targets {
        match tracker.start(&id) {
            Ok(handle) => {
                if !args.json {
                    eprintln!(
                        "{} \"{}\" {}",
                        output::info("->"),
                        name,
                        output::state(tracker.state(&id))
                    );
                }
                handles.push((name, handle));
            }
            Err(err) => {
                eprintln!("{} {err}, skipping", output::warning("warn"));
            }
        }
    }

    let rows: Vec<RunRow> = handles
        .into_iter()
        .map(|(name, handle)| RunRow {
            name,
            report: handle.wait(),
        })
        .collect();

    if args.json {
        let reports: Vec<&RunReport> = rows.iter().map(|row| &row.report).collect();
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &reports)
            .map_err(|e| AppError::internal(format!("encode run json: {e}")))?;
        writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))?;
    } else {
        output::print_runs(io::stdout().lock(), &rows)
            .map_err(|e| AppError::internal(format!("print runs: {e}")))?;
    }

    let failed = rows
        .iter()
        .filter(|row| row.report.outcome == Outcome::Failed)
        .count();

    if failed > 0 {
        return Err(AppError::runtime(format!(
            "{failed} of {} runs failed",
            rows.len()
        )));
    }

    Ok(())
}

fn run_history(args: HistoryArgs) -> Result<(), AppError> {
    let status = match args.status.as_deref() {
        None => None,
        Some(text) => Some(ExecutionStatus::parse(text).ok_or_else(|| {
            AppError::usage("--status must be pending, running, completed, or failed")
        })?),
    };

    let settings = open_settings(&args.store)?;
    let store = settings.store.open()?;
    let rows = store.list_executions(&ExecutionFilter {
        limit: Some(args.limit),
        status,
        script_id: args.script.clone(),
    })?;

    if args.json {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &rows)
            .map_err(|e| AppError::internal(format!("encode history json: {e}")))?;
        writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))?;
        return Ok(());
    }

    let names = script_names(&settings)?;
    let display_rows: Vec<HistoryRow> = rows
        .into_iter()
        .map(|row| HistoryRow {
            script: names
                .get(&row.script_id)
                .cloned()
                .unwrap_or_else(|| row.script_id.clone()),
            execution_id: row.id,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            message: row.error_message.or(row.output_log),
        })
        .collect();

    output::print_history(io::stdout().lock(), &display_rows)
        .map_err(|e| AppError::internal(format!("print history: {e}")))
}

/// Script names for display; falls back to bare ids when the catalog is
/// unavailable.
fn script_names(settings: &Settings) -> Result<HashMap<String, String>, AppError> {
    let store = settings.store.open()?;
    match catalog::load(store.as_ref()) {
        Ok(entries) => Ok(entries
            .into_iter()
            .flat_map(|entry| entry.scripts)
            .map(|script| (script.id, script.name))
            .collect()),
        Err(err) => {
            tracing::warn!("history without script names: {err}");
            Ok(HashMap::new())
        }
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    #[derive(Serialize)]
    struct Issue<'a> {
        field: &'a str,
        message: &'a str,
    }

    #[derive(Serialize)]
    struct ValidateOutput<'a> {
        valid: bool,
        config: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        store: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        issues: Option<Vec<Issue<'a>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    }

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config_path_text = config_path.display().to_string();

    let print_json = |output: &ValidateOutput<'_>| -> Result<(), AppError> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, output)
            .map_err(|e| AppError::internal(format!("encode validate json: {e}")))?;
        writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))
    };

    let cfg = match config::parse(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            if args.json {
                print_json(&ValidateOutput {
                    valid: false,
                    config: &config_path_text,
                    store: None,
                    issues: None,
                    error: Some(&err),
                })?;
            }
            return Err(AppError::usage(err));
        }
    };

    match config::validate(&cfg) {
        Ok(()) => {
            let store = resolved_store(&cfg);
            if args.json {
                print_json(&ValidateOutput {
                    valid: true,
                    config: &config_path_text,
                    store: store.as_deref(),
                    issues: None,
                    error: None,
                })?;
            } else {
                println!("valid {}", output::info(&config_path_text));
                if let Some(store) = &store {
                    println!("store {}", output::muted(store));
                }
            }
            Ok(())
        }
        Err(err) => {
            if args.json {
                let issues: Vec<Issue<'_>> = err
                    .issues
                    .iter()
                    .map(|issue| Issue {
                        field: &issue.field,
                        message: &issue.message,
                    })
                    .collect();
                print_json(&ValidateOutput {
                    valid: false,
                    config: &config_path_text,
                    store: None,
                    issues: Some(issues),
                    error: Some(&err.to_string()),
                })?;
            }
            Err(AppError::usage(err.to_string()))
        }
    }
}

/// Store the config resolves to, if its credentials are available here.
fn resolved_store(cfg: &Config) -> Option<String> {
    let env = envfile::merged_env(Path::new(envfile::DEFAULT_PATH)).unwrap_or_default();
    match cfg.resolve(&env) {
        Ok(settings) => Some(settings.store.describe()),
        Err(err) => {
            tracing::debug!("store not resolved: {err}");
            None
        }
    }
}

fn open_settings(args: &StoreArgs) -> Result<Settings, AppError> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let cfg = if config_path.exists() {
        load_config_classified(&config_path)?
    } else if args.config.is_some() {
        return Err(AppError::usage(format!(
            "config file {} not found",
            output::info(&config_path.display().to_string())
        )));
    } else {
        Config::default()
    };

    let env_path = args
        .env_file
        .as_deref()
        .unwrap_or_else(|| Path::new(envfile::DEFAULT_PATH));

    if args.env_file.is_some() && !env_path.exists() {
        return Err(AppError::usage(format!(
            "dotenv file {} not found",
            output::info(&env_path.display().to_string())
        )));
    }

    let env = envfile::merged_env(env_path).map_err(|err| {
        AppError::usage(format!(
            "load dotenv file {}: {err}",
            output::info(&env_path.display().to_string())
        ))
    })?;

    let settings = cfg.resolve(&env).map_err(AppError::usage)?;
    tracing::debug!("using {}", settings.store.describe());
    Ok(settings)
}

fn load_config_classified(path: &Path) -> Result<Config, AppError> {
    config::load(path).map_err(|err| {
        if err.starts_with("read config:") && !err.contains("No such file") {
            AppError::internal(err)
        } else {
            AppError::usage(err)
        }
    })
}

fn run_completion(args: CompletionArgs) -> Result<(), AppError> {
    let mut cmd = Cli::command();
    let mut stdout = io::stdout().lock();

    match args.shell {
        Shell::Bash => generate_completion(clap_complete::shells::Bash, &mut cmd, &mut stdout),
        Shell::Zsh => generate_completion(clap_complete::shells::Zsh, &mut cmd, &mut stdout),
        Shell::Fish => generate_completion(clap_complete::shells::Fish, &mut cmd, &mut stdout),
        Shell::Powershell => {
            generate_completion(clap_complete::shells::PowerShell, &mut cmd, &mut stdout)
        }
    }
    .map_err(|e| AppError::internal(format!("generate completion: {e}")))
}

fn generate_completion<G: Generator>(
    generator: G,
    cmd: &mut clap::Command,
    writer: &mut impl Write,
) -> Result<(), io::Error> {
    generate(generator, cmd, "directit", writer);
    writer.flush()
}
