//! Grid-walking robot navigator.
//!
//! Compiles instruction files into validated routes stored in SQLite and
//! replays them. The compile and replay loops can run as separate processes
//! against one store (`watch` and `drive`) or together (`run`).

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use navigator::compile::{CompileOutcome, compile_file};
use navigator::core::types::RouteSummary;
use navigator::exit_codes;
use navigator::io::config::{DEFAULT_CONFIG_PATH, NavigatorConfig, load_config};
use navigator::io::landmarks::load_catalog;
use navigator::io::route_store::{RouteStore, SqliteRouteStore};
use navigator::logging;
use navigator::looping::{LoopControl, LoopSummary, run_compile_loop, run_replay_loop};
use navigator::replay::{ReplayOutcome, replay_next};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "navigator",
    version,
    about = "Compile robot route instructions and replay them"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile one instruction batch into a validated route.
    Compile {
        instructions: PathBuf,
        landmarks: PathBuf,
    },
    /// Replay the oldest pending route.
    Replay,
    /// Recompile the instruction file whenever it changes.
    Watch {
        instructions: PathBuf,
        landmarks: PathBuf,
        /// Stop after this many cycles.
        #[arg(long)]
        max_cycles: Option<u32>,
    },
    /// Replay pending routes on a fixed interval.
    Drive {
        /// Stop after this many cycles.
        #[arg(long)]
        max_cycles: Option<u32>,
    },
    /// Run the compile and replay loops together on two threads.
    Run {
        instructions: PathBuf,
        landmarks: PathBuf,
        /// Stop each loop after this many cycles.
        #[arg(long)]
        max_cycles: Option<u32>,
    },
    /// List stored routes with their flags and step counts.
    Routes {
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Compile {
            instructions,
            landmarks,
        } => cmd_compile(&config, &instructions, &landmarks),
        Command::Replay => cmd_replay(&config),
        Command::Watch {
            instructions,
            landmarks,
            max_cycles,
        } => cmd_watch(&config, &instructions, &landmarks, interruptible(max_cycles)?),
        Command::Drive { max_cycles } => cmd_drive(&config, interruptible(max_cycles)?),
        Command::Run {
            instructions,
            landmarks,
            max_cycles,
        } => cmd_run(&config, &instructions, &landmarks, interruptible(max_cycles)?),
        Command::Routes { json } => cmd_routes(&config, json),
    }
}

fn open_store(config: &NavigatorConfig) -> Result<SqliteRouteStore> {
    SqliteRouteStore::open(&config.store_path)
}

/// Loop control whose stop flag is raised by SIGINT/SIGTERM, so a loop
/// finishes its current cycle before exiting.
fn interruptible(max_cycles: Option<u32>) -> Result<LoopControl> {
    let control = match max_cycles {
        Some(max) => LoopControl::new().with_max_cycles(max),
        None => LoopControl::new(),
    };
    let handle = control.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received; stopping after the current cycle");
        handle.request_stop();
    })
    .context("install interrupt handler")?;
    Ok(control)
}

fn cmd_compile(config: &NavigatorConfig, instructions: &Path, landmarks: &Path) -> Result<i32> {
    let catalog = load_catalog(landmarks)?;
    let mut store = open_store(config)?;
    store.replace_landmarks(&catalog).context("store landmark catalog")?;
    let outcome = compile_file(&mut store, &catalog, instructions)?;
    report_compile(&outcome);
    Ok(match outcome {
        CompileOutcome::Rejected { .. } => exit_codes::REJECTED,
        CompileOutcome::Empty | CompileOutcome::Validated { .. } => exit_codes::OK,
    })
}

fn cmd_replay(config: &NavigatorConfig) -> Result<i32> {
    let mut store = open_store(config)?;
    let outcome = replay_next(&mut store)?;
    report_replay(&outcome);
    Ok(match outcome {
        ReplayOutcome::Completed { .. } => exit_codes::OK,
        ReplayOutcome::Idle { .. } => exit_codes::IDLE,
    })
}

fn cmd_watch(
    config: &NavigatorConfig,
    instructions: &Path,
    landmarks: &Path,
    control: LoopControl,
) -> Result<i32> {
    let mut store = open_store(config)?;
    let summary = run_compile_loop(
        &mut store,
        instructions,
        landmarks,
        config.compile_delay(),
        &control,
        report_compile,
    )?;
    report_loop("compile", summary);
    Ok(exit_codes::OK)
}

fn cmd_drive(config: &NavigatorConfig, control: LoopControl) -> Result<i32> {
    let mut store = open_store(config)?;
    let summary = run_replay_loop(&mut store, config.replay_delay(), &control, report_replay)?;
    report_loop("replay", summary);
    Ok(exit_codes::OK)
}

/// Both loops in one process. Each thread opens its own store handle; a
/// loop that fails to start stops the other.
fn cmd_run(
    config: &NavigatorConfig,
    instructions: &Path,
    landmarks: &Path,
    control: LoopControl,
) -> Result<i32> {
    let (compiled, replayed) = thread::scope(|scope| {
        let compile_control = control.clone();
        let compiler = scope.spawn(move || {
            let result = cmd_watch(config, instructions, landmarks, compile_control.clone());
            if result.is_err() {
                compile_control.request_stop();
            }
            result
        });
        let replay_control = control.clone();
        let executor = scope.spawn(move || {
            let result = cmd_drive(config, replay_control.clone());
            if result.is_err() {
                replay_control.request_stop();
            }
            result
        });
        (join(compiler.join()), join(executor.join()))
    });
    compiled.context("compile loop")?;
    replayed.context("replay loop")?;
    Ok(exit_codes::OK)
}

fn join(result: thread::Result<Result<i32>>) -> Result<i32> {
    result.map_err(|_| anyhow!("loop thread panicked"))?
}

fn cmd_routes(config: &NavigatorConfig, json: bool) -> Result<i32> {
    let store = open_store(config)?;
    let routes = store.routes().context("list routes")?;
    if json {
        let payload = serde_json::to_string_pretty(&routes).context("serialize routes")?;
        println!("{payload}");
    } else {
        for summary in &routes {
            println!("{}", format_route(summary));
        }
    }
    Ok(exit_codes::OK)
}

fn format_route(summary: &RouteSummary) -> String {
    let route = &summary.route;
    let state = match (route.validated, route.completed) {
        (true, true) => "completed",
        (true, false) => "pending",
        (false, _) => "compiling",
    };
    format!(
        "route {}\t{}\tsteps={}\tcreated={}",
        route.id,
        state,
        summary.step_count,
        route.created_at.to_rfc3339()
    )
}

fn report_compile(outcome: &CompileOutcome) {
    match outcome {
        CompileOutcome::Empty => println!("instruction batch is empty"),
        CompileOutcome::Validated {
            route_id,
            steps,
            end,
        } => println!("route {route_id} validated: {steps} steps, ends at {end}"),
        CompileOutcome::Rejected {
            route_id,
            rejection,
        } => println!(
            "route {route_id} rejected: {}: {rejection}",
            rejection.error.kind()
        ),
    }
}

fn report_replay(outcome: &ReplayOutcome) {
    for route_id in outcome.skipped() {
        println!("route {route_id} skipped");
    }
    match outcome {
        ReplayOutcome::Idle { .. } => println!("no route to replay"),
        ReplayOutcome::Completed {
            route_id,
            steps,
            end,
            ..
        } => println!("route {route_id} completed after {steps} steps at {end}"),
    }
}

fn report_loop(name: &str, summary: LoopSummary) {
    info!(
        cycles = summary.cycles,
        failures = summary.failures,
        "{name} loop finished"
    );
}
