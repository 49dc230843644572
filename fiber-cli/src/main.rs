mod file_store;
mod reports;
mod scenarios;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fiber_vitality::{
    ActivityKind, CachedStore, VitalityConfig, VitalityTracker, creation_notice_key, streak_bonus,
};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use file_store::FileStore;
use reports::{ActivityEntry, CommandReport};
use scenarios::{SCENARIOS, ScenarioResult, ScenarioRunner, find_scenario};

type Tracker = VitalityTracker<CachedStore<FileStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable colored output
    Console,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "fiber-cli", version = "0.1.0")]
#[command(about = "Drive the Fiber Friends monster vitality engine from the command line")]
struct Args {
    /// JSON document store holding every user's vitality record
    #[arg(long, default_value = "fiber-store.json")]
    store: PathBuf,

    /// User whose monster the command acts on
    #[arg(long, default_value = "local-user")]
    user: String,

    /// Calendar day to act on (YYYY-MM-DD); defaults to the local date
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Optional JSON tuning file; defaults apply when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for recovery rolls; random when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Generate a monster for the user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: String,
    },
    /// Show the active monster and lifecycle status
    Status,
    /// Apply today's passive recovery
    Recover,
    /// Complete an activity and damage the monster
    Complete {
        activity: ActivityKind,
        /// Override the configured base damage
        #[arg(long)]
        base: Option<f64>,
    },
    /// Retire the active monster into the tomb
    Retire {
        #[arg(long, default_value = "released by user")]
        cause: String,
    },
    /// Show the streak for one activity
    Streak { activity: ActivityKind },
    /// List retired monsters
    Tombs,
    /// List activity categories and their base damage
    Activities,
    /// Run the built-in verification scenarios against an in-memory store
    Scenarios {
        /// List available scenarios and exit
        #[arg(long)]
        list: bool,
        /// Scenarios to run (comma-separated); all when absent
        #[arg(long)]
        only: Option<String>,
        /// Iterations per scenario, each with its own seed
        #[arg(long, default_value_t = 10)]
        iterations: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut output_target = OutputTarget::new(args.output.clone())?;

    let passed = run(&args, &mut output_target)?;
    output_target.flush_inner()?;

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Execute the selected command. Returns `false` when scenarios failed.
fn run(args: &Args, out: &mut OutputTarget) -> Result<bool> {
    let cfg = load_config(args.config.as_deref())?;
    let seed = args.seed.unwrap_or_else(rand::random);

    if let Command::Scenarios {
        list,
        only,
        iterations,
    } = &args.command
    {
        return run_scenarios(args, out, *list, only.as_deref(), *iterations, seed);
    }
    if matches!(args.command, Command::Activities) {
        let activities = ActivityKind::ALL
            .iter()
            .map(|&name| ActivityEntry {
                name,
                base_damage: cfg.base_damage(name),
            })
            .collect();
        write_command(args, out, &CommandReport::Activities { activities })?;
        return Ok(true);
    }

    let file_store = FileStore::new(&args.store);
    info!("using store {} with seed {seed}", file_store.path().display());
    let store = CachedStore::new(file_store);
    let mut tracker: Tracker =
        VitalityTracker::with_config(store, ChaCha20Rng::seed_from_u64(seed), cfg)?;
    let today = args
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let report = execute(&mut tracker, &args.user, &args.command, today)?;
    write_command(args, out, &report)?;
    Ok(true)
}

fn load_config(path: Option<&Path>) -> Result<VitalityConfig> {
    let Some(path) = path else {
        return Ok(VitalityConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    VitalityConfig::from_json(&raw)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn execute(
    tracker: &mut Tracker,
    user: &str,
    command: &Command,
    today: NaiveDate,
) -> Result<CommandReport> {
    let user_id = user.to_string();
    let report = match command {
        Command::Create { name, image } => CommandReport::Create {
            monster: tracker.create_monster(user, name, image, today)?,
            notice: creation_notice_key(),
            user_id,
        },
        Command::Status => CommandReport::Status {
            status: tracker.status(user)?,
            monster: tracker.active_monster(user)?,
            tombs: tracker.tombs(user)?.len(),
            user_id,
        },
        Command::Recover => {
            let outcome = tracker.apply_daily_recovery(user, today)?;
            CommandReport::Recover {
                notice: outcome.notice_key(),
                outcome,
                user_id,
            }
        }
        Command::Complete { activity, base } => {
            let outcome = match base {
                Some(base) => tracker.complete_activity_with_base(user, *activity, *base, today)?,
                None => tracker.complete_activity(user, *activity, today)?,
            };
            CommandReport::Complete {
                notice: outcome.notice_key(),
                outcome,
                user_id,
            }
        }
        Command::Retire { cause } => CommandReport::Retire {
            tomb: tracker.retire_monster(user, cause)?,
            user_id,
        },
        Command::Streak { activity } => {
            let streak = tracker.streak(user, *activity)?;
            let bonus = streak.map_or(0, |s| streak_bonus(s.count, tracker.config()));
            CommandReport::Streak {
                activity: *activity,
                streak,
                bonus,
                user_id,
            }
        }
        Command::Tombs => CommandReport::Tombs {
            tombs: tracker.tombs(user)?,
            user_id,
        },
        Command::Activities | Command::Scenarios { .. } => {
            bail!("command does not act on a user record")
        }
    };
    Ok(report)
}

fn write_command(args: &Args, out: &mut OutputTarget, report: &CommandReport) -> Result<()> {
    match args.report {
        ReportFormat::Json => reports::generate_json(out.writer(), report),
        ReportFormat::Console => reports::generate_console_command(out.writer(), report),
    }
}

fn run_scenarios(
    args: &Args,
    out: &mut OutputTarget,
    list: bool,
    only: Option<&str>,
    iterations: usize,
    seed: u64,
) -> Result<bool> {
    if list {
        writeln!(out.writer(), "Available scenarios:")?;
        for scenario in SCENARIOS {
            writeln!(
                out.writer(),
                "  {:25} - {}",
                scenario.name,
                scenario.description
            )?;
        }
        return Ok(true);
    }

    let selected = match only {
        Some(names) => split_csv(names)
            .iter()
            .map(|name| {
                find_scenario(name).with_context(|| format!("unknown scenario '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?,
        None => SCENARIOS.iter().collect(),
    };

    if args.report == ReportFormat::Console {
        announce_banner();
    }
    let start_time = Instant::now();
    let runner = ScenarioRunner::new(args.verbose);
    let results: Vec<ScenarioResult> = selected
        .into_iter()
        .map(|scenario| runner.run(scenario, seed, iterations))
        .collect();

    match args.report {
        ReportFormat::Json => reports::generate_json(out.writer(), &results)?,
        ReportFormat::Console => {
            reports::generate_console_scenarios(out.writer(), &results, start_time.elapsed())?;
        }
    }
    Ok(results.iter().all(|r| r.passed))
}

fn announce_banner() {
    println!("{}", "🐾 Fiber Friends Vitality Checks".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
