use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use itest_runner::config::{self, DatabaseType, GlobalSettings, SettingsLoader, validate};
use itest_runner::harness::{LogAnalyzer, ResultFormatter};
use itest_runner::runner::ShellKind;
use itest_runner::{BuildContext, Error, Result, TestStepBuilder};

/// Run Spirent iTest test cases as a build step
#[derive(Parser, Debug)]
#[command(name = "itest-runner", version, about, long_about = None)]
struct Cli {
    /// Global settings file
    #[arg(long, global = true, default_value = config::DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Job workspace (defaults to $WORKSPACE, then the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Build identifier (defaults to $BUILD_ID, then "0")
    #[arg(long, global = true)]
    build_id: Option<String>,

    /// Build log the runtime output is appended to
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Shell family used to run the runtime (posix or batch)
    #[arg(long, global = true)]
    shell: Option<ShellKind>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the test cases of a job file and report the verdict
    Run {
        /// Job description (TOML)
        job: PathBuf,

        /// Only write runtime output to the build log
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print the runtime command line for a job file without running it
    Command {
        /// Job description (TOML)
        job: PathBuf,
    },
    /// Analyze an existing build log
    Scan {
        /// Build log to scan
        log: PathBuf,

        /// Rule set applied to the log
        #[arg(long, value_enum, default_value_t = ScanMode::Verdict)]
        mode: ScanMode,
    },
    /// Export the job workspace as an iTAR archive
    Export {
        /// Job description (TOML)
        job: PathBuf,
    },
    /// Probe the configured endpoints
    Check {
        #[arg(value_enum)]
        target: CheckTarget,
    },
    /// Update the global settings file
    Configure(ConfigureArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScanMode {
    Verdict,
    Validity,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CheckTarget {
    Runner,
    License,
    Database,
}

#[derive(clap::Args, Debug)]
struct ConfigureArgs {
    /// Path to the itestrt executable
    #[arg(long)]
    rt_path: Option<String>,

    /// Runtime timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    license_host: Option<String>,

    #[arg(long)]
    license_port: Option<String>,

    #[arg(long)]
    db_uri: Option<String>,

    #[arg(long)]
    db_host: Option<String>,

    #[arg(long)]
    db_port: Option<String>,

    /// Database (catalog) name
    #[arg(long)]
    db_name: Option<String>,

    /// MySQL or PostgreSQL
    #[arg(long)]
    db_type: Option<DatabaseType>,

    #[arg(long)]
    db_username: Option<String>,

    #[arg(long)]
    db_password: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "warn"
    }))
    .init();

    match dispatch(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn dispatch(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Run { job, quiet } => run(cli, job, *quiet),
        Commands::Command { job } => {
            let step = step_builder(cli)?.from_job_file(job)?.build()?;
            println!("{}", step.command().render());
            Ok(true)
        }
        Commands::Scan { log, mode } => {
            let analyzer = match mode {
                ScanMode::Verdict => LogAnalyzer::verdict()?,
                ScanMode::Validity => LogAnalyzer::validity()?,
            };
            let outcome = analyzer.scan_file(log);
            ResultFormatter::new().report(&outcome, None);
            Ok(outcome.succeeded)
        }
        Commands::Export { job } => {
            let step = step_builder(cli)?.from_job_file(job)?.build()?;
            let outcome = step.export_itar()?;
            ResultFormatter::new().report(&outcome, None);
            Ok(outcome.succeeded)
        }
        Commands::Check { target } => check(cli, *target),
        Commands::Configure(args) => configure(&cli.settings, args),
    }
}

fn run(cli: &Cli, job: &Path, quiet: bool) -> Result<bool> {
    let mut builder = step_builder(cli)?.from_job_file(job)?;
    if quiet {
        builder = builder.quiet();
    }
    let outcome = builder.run()?;
    ResultFormatter::new().report(&outcome.analysis, Some(&outcome.run));
    Ok(outcome.succeeded())
}

fn load_settings(cli: &Cli) -> Result<GlobalSettings> {
    SettingsLoader::new()
        .config_file(&cli.settings)
        .allow_missing()
        .load()
}

fn step_builder(cli: &Cli) -> Result<TestStepBuilder> {
    Ok(TestStepBuilder::new()
        .with_settings(load_settings(cli)?)
        .context(build_context(cli)?))
}

fn build_context(cli: &Cli) -> Result<BuildContext> {
    let workspace = match cli.workspace.clone() {
        Some(dir) => dir,
        None => match config::env::workspace_from_env() {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        },
    };
    let build_id = cli
        .build_id
        .clone()
        .or_else(config::env::build_id_from_env)
        .unwrap_or_else(|| "0".to_string());

    let mut ctx = BuildContext::new(workspace, build_id);
    if let Some(ref log) = cli.log {
        ctx = ctx.log_path(log);
    }
    if let Some(shell) = cli.shell {
        ctx = ctx.shell(shell);
    }
    Ok(ctx)
}

fn check(cli: &Cli, target: CheckTarget) -> Result<bool> {
    for (key, value) in config::env::detect_active_overrides() {
        println!("{key}={value}");
    }

    let settings = load_settings(cli)?;
    let result = match target {
        CheckTarget::Runner => validate::check_runner_path(&settings.runner.path),
        CheckTarget::License => validate::check_license_server(
            &settings.license_server.host,
            settings.license_server.port.as_deref().unwrap_or_default(),
        ),
        CheckTarget::Database => match settings.database {
            Some(ref db) => validate::check_database(db),
            None => return Err(Error::MissingConfig("database".to_string())),
        },
    };
    println!("{result}");
    Ok(result.is_ok())
}

fn configure(path: &Path, args: &ConfigureArgs) -> Result<bool> {
    let mut settings = SettingsLoader::new()
        .config_file(path)
        .allow_missing()
        .no_env_overrides()
        .load()?;

    if let Some(ref val) = args.rt_path {
        settings.runner.path = val.clone();
    }
    if let Some(val) = args.timeout {
        if val == 0 {
            return Err(Error::invalid("runner.timeout", "0"));
        }
        settings.runner.timeout = Some(val);
    }
    if let Some(ref val) = args.license_host {
        settings.license_server.host = val.clone();
    }
    if let Some(ref val) = args.license_port {
        if !val.trim().is_empty() && val.trim().parse::<u16>().is_err() {
            return Err(Error::invalid("license-server.port", val.as_str()));
        }
        settings.license_server.port = Some(val.clone());
    }

    let touches_db = args.db_uri.is_some()
        || args.db_host.is_some()
        || args.db_port.is_some()
        || args.db_name.is_some()
        || args.db_type.is_some()
        || args.db_username.is_some()
        || args.db_password.is_some();
    if touches_db {
        let db = settings.database.get_or_insert_with(Default::default);
        if let Some(ref val) = args.db_uri {
            db.uri = val.clone();
        }
        if let Some(ref val) = args.db_host {
            db.host = val.clone();
        }
        if let Some(ref val) = args.db_port {
            db.port = val.clone();
        }
        if let Some(ref val) = args.db_name {
            db.name = val.clone();
        }
        if args.db_type.is_some() {
            db.db_type = args.db_type;
        }
        if let Some(ref val) = args.db_username {
            db.username = val.clone();
        }
        if let Some(ref val) = args.db_password {
            db.password = val.clone();
        }
    }

    SettingsLoader::save(path, &settings)?;
    println!("settings written to {}", path.display());
    Ok(true)
}
