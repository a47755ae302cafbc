use std::process::ExitCode;
use std::sync::Arc;

use butler_core::choco::{ChocoSource, ProcessChocoSource};
use butler_core::engine::{StatusModel, UpdateCheckEngine, UpgradeEngine};
use butler_core::execution::TokioProcessExecutor;
use butler_core::models::{CheckOutcome, PackageUpdate, UpgradeOutcome};
use butler_core::scheduler::SchedulerLoop;
use butler_core::settings::{SettingsSource, SettingsStore};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
butler - keeps chocolatey packages up to date

USAGE:
    butler check [--json]     run one update check and print the result
    butler upgrade --all      upgrade every outdated package
    butler upgrade NAME...    upgrade the named outdated packages
    butler watch              check on a schedule until interrupted
    butler version            print agent and tool versions
";

enum Command {
    Check { json: bool },
    Upgrade { all: bool, names: Vec<String> },
    Watch,
    Version,
    Help,
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "check" => match args.get(1).map(String::as_str) {
            None => Ok(Command::Check { json: false }),
            Some("--json") if args.len() == 2 => Ok(Command::Check { json: true }),
            Some(other) => Err(format!("unexpected argument: {other}")),
        },
        "upgrade" => {
            let rest = &args[1..];
            if rest.iter().any(|arg| arg == "--all") {
                if rest.len() > 1 {
                    return Err("--all cannot be combined with package names".to_string());
                }
                return Ok(Command::Upgrade {
                    all: true,
                    names: Vec::new(),
                });
            }
            if rest.is_empty() {
                return Err("upgrade needs --all or at least one package name".to_string());
            }
            if let Some(flag) = rest.iter().find(|arg| arg.starts_with('-')) {
                return Err(format!("unknown flag: {flag}"));
            }
            Ok(Command::Upgrade {
                all: false,
                names: rest.to_vec(),
            })
        }
        "watch" if args.len() == 1 => Ok(Command::Watch),
        "version" if args.len() == 1 => Ok(Command::Version),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command: {other}")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Command::Help = command {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("error: failed to start runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(command))
}

struct Agent {
    source: Arc<ProcessChocoSource>,
    status: Arc<StatusModel>,
    check: UpdateCheckEngine<ProcessChocoSource>,
    upgrade: UpgradeEngine<ProcessChocoSource>,
}

fn build_agent() -> Agent {
    let executor = Arc::new(TokioProcessExecutor::new());
    let source = Arc::new(ProcessChocoSource::new(executor));
    let status = Arc::new(StatusModel::new());
    let check = UpdateCheckEngine::new(source.clone(), status.clone());
    let upgrade = UpgradeEngine::new(source.clone(), status.clone(), check.clone());
    Agent {
        source,
        status,
        check,
        upgrade,
    }
}

async fn run(command: Command) -> ExitCode {
    let agent = build_agent();

    let tool_version = match agent.source.detect().await {
        Ok(version) => version,
        Err(error) => {
            eprintln!("error: chocolatey is not available: {error}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(%tool_version, "tool detected");

    match command {
        Command::Check { json } => run_one_check(&agent, json).await,
        Command::Upgrade { all, names } => run_upgrade(&agent, all, &names).await,
        Command::Watch => run_watch(agent).await,
        Command::Version => {
            println!("butler {}", env!("CARGO_PKG_VERSION"));
            println!("chocolatey {tool_version}");
            ExitCode::SUCCESS
        }
        Command::Help => unreachable!("handled before the runtime starts"),
    }
}

async fn run_one_check(agent: &Agent, json: bool) -> ExitCode {
    let cycle = agent.check.run_check().await;

    if json {
        let snapshot = agent.status.snapshot();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => {
                println!("{text}");
                return ExitCode::SUCCESS;
            }
            Err(error) => {
                eprintln!("error: could not serialize status: {error}");
                return ExitCode::FAILURE;
            }
        }
    }

    match cycle.outcome {
        Some(CheckOutcome::Success(packages)) if packages.is_empty() => {
            println!("all packages are up to date");
            ExitCode::SUCCESS
        }
        Some(CheckOutcome::Success(packages)) => {
            println!("{} outdated package(s):", packages.len());
            for package in &packages {
                print_package(package);
            }
            ExitCode::SUCCESS
        }
        Some(CheckOutcome::NetworkFailure) => {
            eprintln!("error: the package source is unreachable; try again later");
            ExitCode::FAILURE
        }
        Some(CheckOutcome::ToolError(message)) => {
            eprintln!("error: check failed: {message}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("error: another cycle was already running");
            ExitCode::FAILURE
        }
    }
}

async fn run_upgrade(agent: &Agent, all: bool, names: &[String]) -> ExitCode {
    let cycle = agent.check.run_check().await;
    if !matches!(cycle.outcome, Some(CheckOutcome::Success(_))) {
        eprintln!("error: could not determine outdated packages; not upgrading");
        return ExitCode::FAILURE;
    }

    let outdated = agent.status.packages();
    let targets: Vec<PackageUpdate> = if all {
        outdated
    } else {
        let mut targets = Vec::new();
        for name in names {
            match outdated
                .iter()
                .find(|package| package.name.eq_ignore_ascii_case(name))
            {
                Some(package) => targets.push(package.clone()),
                None => {
                    eprintln!("error: {name} is not in the outdated list");
                    return ExitCode::FAILURE;
                }
            }
        }
        targets
    };

    if targets.is_empty() {
        println!("all packages are up to date");
        return ExitCode::SUCCESS;
    }

    println!("upgrading {} package(s):", targets.len());
    for package in &targets {
        print_package(package);
    }

    let report = match agent.upgrade.run_upgrade(&targets).await {
        Ok(report) => report,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    match report.outcome {
        UpgradeOutcome::Success => {
            println!("upgrade finished");
            ExitCode::SUCCESS
        }
        UpgradeOutcome::SuccessRebootInitiated
        | UpgradeOutcome::SuccessRebootRequired
        | UpgradeOutcome::SuccessPendingReboot => {
            println!("upgrade finished; a reboot is needed to complete it");
            ExitCode::SUCCESS
        }
        UpgradeOutcome::NoTargets => {
            println!("nothing to upgrade");
            ExitCode::SUCCESS
        }
        UpgradeOutcome::ErrorElevationDenied => {
            eprintln!("error: elevation was not granted; no packages were changed");
            ExitCode::FAILURE
        }
        UpgradeOutcome::ErrorIncompleteInstall => {
            eprintln!("error: the upgrade did not complete cleanly (exit code 1604)");
            ExitCode::FAILURE
        }
        UpgradeOutcome::ErrorGeneric => {
            eprintln!("error: the upgrade failed");
            ExitCode::FAILURE
        }
        UpgradeOutcome::ErrorUnknown(code) => {
            eprintln!("error: the upgrade exited with unexpected code {code}");
            ExitCode::FAILURE
        }
    }
}

async fn run_watch(agent: Agent) -> ExitCode {
    let store = Arc::new(SettingsStore::new(SettingsStore::default_path()));
    let settings = store.load();
    tracing::info!(
        path = %store.path().display(),
        interval_hours = settings.check_interval_hours,
        "watching for outdated packages"
    );

    let cycle = agent.check.run_check().await;
    if let Some(CheckOutcome::Success(packages)) = cycle.outcome {
        if settings.show_notifications && !packages.is_empty() {
            tracing::info!(count = packages.len(), "updates are available");
        }
    }

    let scheduler = SchedulerLoop::new(agent.check.clone(), store as Arc<dyn SettingsSource>);
    scheduler.arm();

    if let Err(error) = tokio::signal::ctrl_c().await {
        eprintln!("error: failed to listen for shutdown: {error}");
        scheduler.disarm();
        return ExitCode::FAILURE;
    }

    tracing::info!("shutting down");
    scheduler.disarm();
    ExitCode::SUCCESS
}

fn print_package(package: &PackageUpdate) {
    if package.display_name == package.name {
        println!(
            "  {} {} -> {}",
            package.name, package.installed_version, package.available_version
        );
    } else {
        println!(
            "  {} ({}) {} -> {}",
            package.display_name,
            package.name,
            package.installed_version,
            package.available_version
        );
    }
}
