use clap::{Parser, Subcommand, ValueEnum};
use combat_engine::ai::{evaluate_matchup, should_swap, team_swap_pressure, MatchupReport};
use combat_engine::core::battle::{simulate, Combatant, SimulationSummary, Team};
use combat_engine::core::config::{EngineConfig, ResolutionMode};
use combat_engine::core::events::apply_outcome;
use combat_engine::core::export::write_records_to_path;
use combat_engine::core::factory::{move_database_from_raw, raw_moves_from_csv};
use combat_engine::core::replay::replay_iteration;
use combat_engine::core::resolver::{resolve_move_seeded, ResolveContext};
use combat_engine::core::state::CreatureSnapshot;
use combat_engine::data::moves::{MoveDatabase, MoveDescriptor};
use combat_engine::data::species::Roster;
use combat_engine::data::type_chart::TypeChart;
use inquire::Select;
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "battle-sim")]
#[command(about = "Resolve moves and run batch battle simulations")]
struct Cli {
    /// Engine settings (YAML). Falls back to $BATTLE_SIM_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Move database (YAML map or list). Defaults to a small built-in set.
    #[arg(long, global = true)]
    moves: Option<PathBuf>,

    /// Type table (YAML) replacing the built-in one.
    #[arg(long, global = true)]
    chart: Option<PathBuf>,

    /// Resolution mode, overriding the config file.
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run many battles between two rosters and summarise them.
    Simulate {
        #[arg(long)]
        team_a: PathBuf,
        #[arg(long)]
        team_b: PathBuf,
        #[arg(long)]
        iterations: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        parallel: bool,
        /// Let sides switch creatures when the matchup advises it.
        #[arg(long)]
        swaps: bool,
        /// Higher-priority moves act before faster creatures.
        #[arg(long)]
        priority_order: bool,
        /// Pick each creature's move up front.
        #[arg(long, short = 'i')]
        interactive: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Write one row per iteration.
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the full timeline of one iteration instead of the summary.
        #[arg(long)]
        replay: Option<u32>,
    },
    /// Resolve a single move between the lead creatures of two rosters.
    Resolve {
        #[arg(long)]
        attacker: PathBuf,
        #[arg(long)]
        defender: PathBuf,
        #[arg(long = "move")]
        move_id: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, short = 'i')]
        interactive: bool,
    },
    /// Estimate both directions of a matchup and the swap advice.
    Matchup {
        #[arg(long)]
        attacker: PathBuf,
        #[arg(long)]
        defender: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Convert a CSV move table into an engine move file.
    ImportMoves {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Tactical,
    Simulated,
}

impl From<ModeArg> for ResolutionMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Tactical => ResolutionMode::Tactical,
            ModeArg::Simulated => ResolutionMode::Simulated,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn load_config(cli: &Cli) -> Result<EngineConfig, Box<dyn Error>> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("BATTLE_SIM_CONFIG").ok().map(PathBuf::from));
    let mut config = match path {
        Some(path) => EngineConfig::load_from_yaml_file(&path)?,
        None => EngineConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    Ok(config)
}

fn load_moves(path: Option<&Path>) -> Result<MoveDatabase, Box<dyn Error>> {
    match path {
        Some(path) => Ok(MoveDatabase::load_from_yaml_file(path)?),
        None => Ok(MoveDatabase::minimal()),
    }
}

fn load_chart(path: Option<&Path>) -> Result<TypeChart, Box<dyn Error>> {
    match path {
        Some(path) => Ok(TypeChart::load_from_yaml_file(path)?),
        None => Ok(TypeChart::new()),
    }
}

fn load_team(path: &Path, config: &EngineConfig) -> Result<Team, Box<dyn Error>> {
    let roster = Roster::load_from_json_file(path)?;
    Ok(Team::from_snapshots(&roster.name, roster.snapshots(config)?))
}

fn lead(path: &Path, config: &EngineConfig) -> Result<CreatureSnapshot, Box<dyn Error>> {
    let mut team = load_team(path, config)?;
    Ok(team.members.remove(0).creature)
}

fn move_label(descriptor: &MoveDescriptor) -> String {
    format!(
        "{} [{} {}] {}",
        descriptor.display_name(),
        descriptor.element,
        descriptor.class.as_str(),
        if descriptor.power.is_empty() { "-" } else { descriptor.power.as_str() }
    )
}

fn prompt_move(creature: &CreatureSnapshot, moves: &MoveDatabase, allow_auto: bool) -> Result<Option<String>, Box<dyn Error>> {
    let mut options = Vec::new();
    let mut ids = Vec::new();
    if allow_auto {
        options.push("(auto: best matchup move)".to_string());
        ids.push(None);
    }
    for move_id in &creature.moves {
        if let Some(descriptor) = moves.get(move_id) {
            options.push(move_label(descriptor));
            ids.push(Some(move_id.clone()));
        }
    }
    if options.is_empty() {
        return Err(format!("{} has no known moves", creature.name).into());
    }
    let choice = Select::new(&format!("Move for {}:", creature.name), options.clone())
        .with_page_size(10)
        .prompt()?;
    let index = options.iter().position(|o| *o == choice).unwrap_or(0);
    Ok(ids[index].clone())
}

fn print_summary(summary: &SimulationSummary) {
    println!("Iterations: {} ({} completed, {} exceeded, {} faulted)",
        summary.iterations, summary.completed, summary.exceeded, summary.faulted);
    for side in [&summary.team_a, &summary.team_b] {
        println!(
            "  {:<16} wins {:>5}  losses {:>5}  accuracy {:>5.1}%  dmg/round {:>6.2}",
            side.name,
            side.wins,
            side.losses,
            side.mean_accuracy * 100.0,
            side.mean_damage_per_round
        );
    }
    println!("Duration: mean {:.2} turns, median {:.1}", summary.mean_duration, summary.median_duration);
    for (turns, count) in &summary.duration_histogram {
        println!("  {:>3} turns | {}", turns, count);
    }
    if let Some(longest) = &summary.longest {
        println!("Longest battle: iteration {} ({} turns)", longest.index, longest.duration);
    }
    println!("Winner: {}", summary.winner_label());
}

fn print_report(label: &str, report: &MatchupReport) {
    println!("{}: {} -> {}", label, report.attacker_id, report.defender_id);
    for summary in &report.moves {
        match summary.expected_damage {
            Some(expected) => println!(
                "  {:<16} {:>7.2} expected (x{}{}){}",
                summary.move_id,
                expected,
                summary.effectiveness.percent,
                if summary.stab { ", stab" } else { "" },
                if summary.usable { "" } else { " [no uses]" }
            ),
            None => println!("  {:<16} status", summary.move_id),
        }
    }
    let turns = if report.turns_to_ko == u32::MAX {
        "never".to_string()
    } else {
        report.turns_to_ko.to_string()
    };
    println!(
        "  best: {} | turns to KO: {} | goes first: {}",
        report.best_move.as_deref().unwrap_or("-"),
        turns,
        report.goes_first
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    let moves = load_moves(cli.moves.as_deref())?;
    let chart = load_chart(cli.chart.as_deref())?;

    match &cli.command {
        Command::Simulate {
            team_a,
            team_b,
            iterations,
            seed,
            parallel,
            swaps,
            priority_order,
            interactive,
            format,
            csv,
            replay,
        } => {
            if let Some(iterations) = iterations {
                config.iterations = *iterations;
            }
            if let Some(seed) = seed {
                config.seed = *seed;
            }
            config.parallel |= *parallel;
            config.swaps |= *swaps;
            config.priority_order |= *priority_order;

            let mut a = load_team(team_a, &config)?;
            let mut b = load_team(team_b, &config)?;
            if *interactive {
                for team in [&mut a, &mut b] {
                    for member in team.members.iter_mut() {
                        let Combatant { creature, preferred_move } = member;
                        *preferred_move = prompt_move(creature, &moves, true)?;
                    }
                }
            }

            if let Some(index) = replay {
                let record = replay_iteration(&a, &b, &moves, &chart, &config, *index)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
                    OutputFormat::Text => {
                        for line in &record.timeline {
                            println!("{}", line);
                        }
                        println!("Status: {:?}, turns: {}", record.status, record.duration);
                    }
                }
                return Ok(());
            }

            let summary = simulate(&a, &b, &moves, &chart, &config)?;
            if let Some(path) = csv {
                write_records_to_path(path, &summary.records, &a.name, &b.name)?;
            }
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => print_summary(&summary),
            }
        }
        Command::Resolve {
            attacker,
            defender,
            move_id,
            seed,
            interactive,
        } => {
            let attacker = lead(attacker, &config)?;
            let defender = lead(defender, &config)?;
            let move_id = match move_id {
                Some(id) => id.clone(),
                None if *interactive => prompt_move(&attacker, &moves, false)?
                    .ok_or("no move selected")?,
                None => attacker.moves.first().cloned().ok_or("attacker knows no moves")?,
            };
            let descriptor = moves.require(&move_id)?;
            let ctx = ResolveContext::new(&moves, &chart, &config);
            let outcome = resolve_move_seeded(&attacker, &defender, descriptor, &ctx, *seed)?;
            for line in &outcome.log {
                println!("{}", line);
            }
            let (_, defender_after) = apply_outcome(&attacker, &defender, descriptor, &outcome);
            println!(
                "{} HP: {} -> {} / {}",
                defender.name, defender.hp.current, defender_after.hp.current, defender.hp.max
            );
        }
        Command::Matchup {
            attacker,
            defender,
            format,
        } => {
            let attacker = lead(attacker, &config)?;
            let defender = lead(defender, &config)?;
            let ctx = ResolveContext::new(&moves, &chart, &config);
            let forward = evaluate_matchup(&attacker, &defender, &ctx);
            let backward = evaluate_matchup(&defender, &attacker, &ctx);
            let swap = should_swap(&forward, &backward);
            let pressure = team_swap_pressure(&forward, &backward);
            match format {
                OutputFormat::Json => {
                    let body = serde_json::json!({
                        "forward": forward,
                        "backward": backward,
                        "defender_should_swap": swap,
                        "team_swap_pressure": pressure,
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                OutputFormat::Text => {
                    print_report("Attacker", &forward);
                    print_report("Defender", &backward);
                    println!("{} should swap out: {} (team pressure: {})", defender.name, swap, pressure);
                }
            }
        }
        Command::ImportMoves { csv, out } => {
            let raw = raw_moves_from_csv(File::open(csv)?)?;
            let db = move_database_from_raw(&raw, config.mode);
            let mut descriptors: Vec<&MoveDescriptor> = db.as_map().values().collect();
            descriptors.sort_by(|a, b| a.id.cmp(&b.id));
            fs::write(out, serde_yaml::to_string(&descriptors)?)?;
            println!("Wrote {} moves to {}", descriptors.len(), out.display());
        }
    }
    Ok(())
}
