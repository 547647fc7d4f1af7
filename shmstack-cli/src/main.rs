//! shmstack - run a stack machine program on a fixed cycle
//!
//! Loads a program file, attaches its shared-memory regions and executes it
//! once per cycle until the configured cycle count is reached or a
//! termination signal arrives.

mod exit;
mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use shmstack_runtime::{CancelToken, Machine, MachineConfig, RunStats, Scheduler};
use shmstack_spec::{DEFAULT_STACK_SIZE, MIN_STACK_SIZE};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "shmstack")]
#[command(version, about = "Cyclic stack machine with shared-memory I/O")]
struct Cli {
    /// Program file
    #[arg(required_unless_present = "license")]
    file: Option<PathBuf>,

    /// Stack capacity in words
    #[arg(short, long, default_value_t = DEFAULT_STACK_SIZE, value_parser = parse_stack_size)]
    stack_size: usize,

    /// Log load and scheduler progress
    #[arg(short, long)]
    verbose: bool,

    /// Trace every executed instruction
    #[arg(short, long)]
    debug: bool,

    /// Abort a cycle after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print license information and exit
    #[arg(long)]
    license: bool,
}

fn parse_stack_size(s: &str) -> std::result::Result<usize, String> {
    let size: usize = s.parse().map_err(|e| format!("{}", e))?;
    if size < MIN_STACK_SIZE {
        return Err(format!("must be at least {}", MIN_STACK_SIZE));
    }
    Ok(size)
}

impl Cli {
    fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            stack_size: self.stack_size,
            trace: self.debug,
            max_steps: self.max_steps,
        }
    }

    fn default_log_level(&self) -> &'static str {
        if self.debug {
            "trace"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

fn init_tracing(cli: &Cli) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.default_log_level().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn license() -> String {
    format!(
        "shmstack {}\nLicensed under the {} license.",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_LICENSE"),
    )
}

fn run(cli: &Cli, path: &Path) -> Result<RunStats> {
    let program = shmstack_loader::load_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let mut machine = Machine::new(program, cli.machine_config()).context("failed to create machine")?;
    machine.init().context("failed to initialize variables")?;
    info!(
        cycle_ms = machine.cycle_time_ms(),
        cycles = machine.cycles(),
        "program ready"
    );

    signals::install().context("failed to install signal handlers")?;
    let token = CancelToken::new();
    let watcher = signals::watch(token.clone());

    let result = Scheduler::for_machine(&machine, token.clone())
        .run(&mut machine)
        .context("program aborted");

    token.cancel();
    if watcher.join().is_err() {
        debug!("signal watcher panicked");
    }
    result
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { exit::EX_USAGE } else { exit::EX_OK };
            // nothing useful left to report if stderr itself fails
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    if cli.license {
        println!("{}", license());
        return ExitCode::from(exit::EX_OK);
    }

    init_tracing(&cli);

    let Some(path) = cli.file.clone() else {
        eprintln!("shmstack: no program file given");
        return ExitCode::from(exit::EX_USAGE);
    };

    match run(&cli, &path) {
        Ok(stats) => {
            debug!(?stats, "finished");
            ExitCode::from(exit::EX_OK)
        }
        Err(err) => {
            eprintln!("shmstack: {:#}", err);
            ExitCode::from(exit::code_for(&err))
        }
    }
}
