mod assets;
mod logic;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use flashback_game::{Catalog, GameConfig, GameSession, SessionNotice};
use logic::{
    GameTester, GameplayStrategy, LogicTester, ScenarioResult, get_scenario, list_scenarios,
};
use util::split_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "flashback-tester", version)]
#[command(about = "Automated logic testing for the Flashback chronology quiz")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Event catalog JSON file; the bundled catalog is used when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Game config JSON file for `--link` and `--share`; the bundled config is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inspect a share link and print the events it carries, then exit
    #[arg(long)]
    link: Option<String>,

    /// Print a share link to BASE_URL for a fresh game on the first seed, then exit
    #[arg(long, value_name = "BASE_URL")]
    share: Option<String>,

    /// Reveal dates of placed events in timelines
    #[arg(long)]
    show_dates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let catalog = Arc::new(assets::load_catalog(args.catalog.as_deref()).await?);

    if let Some(link) = args.link.as_deref() {
        let config = assets::load_config(args.config.as_deref()).await?;
        return inspect_link(&args, catalog, config, link);
    }

    if let Some(base_url) = args.share.as_deref() {
        let config = assets::load_config(args.config.as_deref()).await?;
        return emit_share_link(&args, catalog, config, base_url);
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = logic::resolve_seed_inputs(&split_csv(&args.seeds))?;
    let game_tester = GameTester::new(catalog, args.show_dates, args.verbose);

    let results = run_logic_scenarios(&args, &scenarios, &seeds, game_tester);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    let strategies: Vec<_> = GameplayStrategy::ALL.iter().map(|s| s.label()).collect();
    writeln!(output_target.writer(), "Player strategies: {}", strategies.join(", "))?;
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🕰️  Flashback Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for name in logic::all_scenario_names() {
            if !scenarios.contains(&name) {
                scenarios.push(name);
            }
        }
    }
    scenarios
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    game_tester: GameTester,
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(game_tester);
    let mut results = Vec::new();

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(logic_tester.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

/// Open `link` against the catalog and describe what it restores.
fn inspect_link(
    args: &Args,
    catalog: Arc<Catalog>,
    config: GameConfig,
    link: &str,
) -> Result<()> {
    let (mut session, cleaned) = GameSession::from_url(catalog, config, 0, link);
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let out = output_target.writer();

    let notices = session.drain_notices();
    if let Some(reason) = notices.iter().find_map(|notice| match notice {
        SessionNotice::CorruptShareLink(reason) => Some(*reason),
        _ => None,
    }) {
        writeln!(out, "{} {reason}", "❌ Share link rejected:".red())?;
    } else {
        writeln!(
            out,
            "{} {} events",
            "✅ Share link carries".green(),
            session.progress().total
        )?;
        for event in session.state().unplaced() {
            if args.show_dates {
                writeln!(out, "  {} ({})", event.name(), event.date())?;
            } else {
                writeln!(out, "  {}", event.name())?;
            }
        }
    }
    writeln!(out, "Cleaned URL: {cleaned}")?;
    output_target.flush_inner()?;
    Ok(())
}

fn emit_share_link(
    args: &Args,
    catalog: Arc<Catalog>,
    config: GameConfig,
    base_url: &str,
) -> Result<()> {
    let seeds = logic::resolve_seed_inputs(&split_csv(&args.seeds))?;
    let seed = seeds.first().copied().unwrap_or(logic::seeds::DEFAULT_SEED);
    let mut session = GameSession::new(catalog, config, seed);
    for notice in session.drain_notices() {
        log::warn!("{notice:?}");
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "{}", session.share_url(base_url))?;
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => logic::reports::generate_json_report(&mut output_target, results)?,
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Flashback Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
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
