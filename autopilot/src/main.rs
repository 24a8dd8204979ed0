use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use ptsp_autopilot::benchmark::{resolve_maps, run_benchmark, BenchmarkConfig};
use ptsp_autopilot::config::ControllerConfig;
use ptsp_autopilot::controller::MacroController;
use ptsp_autopilot::maps::{describe_maps, load_map, FILE_PREFIX};
use ptsp_autopilot::runner::{read_action_log, run_match, write_action_log, RunPolicy};
use ptsp_autopilot::util::{parse_seed, parse_seed_csv, parse_seed_file, seed_to_hex};
use ptsp_core::{replay_with_checkpoints, GameState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ptsp-autopilot")]
#[command(about = "Deadline-bounded macro-action autopilot for physical travelling salesman maps")]
struct Cli {
    /// Controller config JSON; missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List built-in maps
    ListMaps,
    /// Solve and print the fixed waypoint visiting order for a map
    SolveOrder {
        #[arg(long)]
        map: String,
        /// Cap on branch-and-bound expansions
        #[arg(long)]
        expansion_limit: Option<u64>,
    },
    /// Play one match and write its action log
    Run {
        #[arg(long)]
        map: String,
        #[arg(long)]
        seed: Option<String>,
        /// Overrides PTSP_MAX_TICKS
        #[arg(long)]
        max_ticks: Option<u32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay an action log and check it reaches the recorded final state
    Replay {
        #[arg(long)]
        input: PathBuf,
        /// Map to replay on; defaults to the map id stored in the log
        #[arg(long)]
        map: Option<String>,
        /// Print a checkpoint every N ticks
        #[arg(long)]
        checkpoint_every: Option<u32>,
    },
    /// Run every map against a set of search seeds
    Benchmark {
        #[arg(long)]
        maps: Option<String>,
        #[arg(long)]
        seeds: Option<String>,
        #[arg(long)]
        seed_file: Option<PathBuf>,
        #[arg(long)]
        seed_start: Option<String>,
        #[arg(long, default_value_t = 8)]
        seed_count: u32,
        /// Overrides PTSP_MAX_TICKS
        #[arg(long)]
        max_ticks: Option<u32>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value_t = true)]
        save_best: bool,
        /// Matches run at once. Every match plays against the wall clock, so
        /// more than one can turn CPU contention into late replies.
        #[arg(long, default_value_t = 1)]
        jobs: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let Cli { config, command } = Cli::parse();
    let controller_config = load_config(config.as_deref())?;

    match command {
        Commands::ListMaps => {
            for (id, description) in describe_maps() {
                println!("{id:12} {description}");
            }
        }
        Commands::SolveOrder {
            map,
            expansion_limit,
        } => {
            let tiles = Arc::new(load_map(&map)?);
            let config = ControllerConfig {
                tsp_expansion_limit: expansion_limit.or(controller_config.tsp_expansion_limit),
                ..controller_config
            };
            let game = GameState::new(tiles);
            let controller = MacroController::initialize(&game, config)
                .with_context(|| format!("failed solving visiting order on map '{map}'"))?;
            let order = controller.order();
            let stats = controller.solve_stats();

            println!("map={map}");
            println!("waypoints={}", order.len());
            println!(
                "order={}",
                order
                    .order
                    .iter()
                    .map(|index| index.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            );
            println!("cost={:.3}", order.cost);
            println!("expansions={}", stats.expansions);
            println!("improvements={}", stats.incumbent_costs.len().saturating_sub(1));
            println!("complete={}", stats.complete);
        }
        Commands::Run {
            map,
            seed,
            max_ticks,
            output,
        } => {
            let tiles = Arc::new(load_map(&map)?);
            let config = match seed {
                Some(seed) => controller_config.with_seed(parse_seed(&seed)?),
                None => controller_config,
            };
            let policy = policy_with(max_ticks);
            let artifact = run_match(&map, tiles, &config, &policy)?;
            let metrics = &artifact.metrics;

            let output_path = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "runs/{}-{}-wp{}-ticks{}.actions.json",
                    safe_name(&map),
                    seed_to_hex(config.seed).replace("0x", "seed"),
                    metrics.waypoints_visited,
                    metrics.ticks
                ))
            });
            write_action_log(&output_path, &artifact.log)?;

            println!("map={}", metrics.map_id);
            println!("seed={}", seed_to_hex(metrics.seed));
            println!("outcome={}", metrics.outcome.as_str());
            println!("ticks={}", metrics.ticks);
            println!(
                "waypoints={}/{}",
                metrics.waypoints_visited, metrics.waypoints_total
            );
            println!("fuel_tanks={}", metrics.fuel_tanks_collected);
            println!("fuel_spent={}", metrics.fuel_spent);
            println!("damage={}", metrics.damage);
            println!("late_replies={}", metrics.late_replies);
            println!("disqualified={}", metrics.disqualified);
            println!("tsp_cost={:.3}", metrics.tsp_cost);
            println!("rollouts={}", metrics.rollouts);
            println!("output={}", output_path.display());
        }
        Commands::Replay {
            input,
            map,
            checkpoint_every,
        } => {
            let log = read_action_log(&input)?;
            let map_id = map.unwrap_or_else(|| log.map_id.clone());
            let tiles = Arc::new(load_map(&map_id)?);

            if let Some(every) = checkpoint_every {
                let checkpoints =
                    replay_with_checkpoints(Arc::clone(&tiles), &log.actions, every)?;
                for checkpoint in checkpoints {
                    println!(
                        "tick={} pos=({:.2},{:.2}) vel=({:.3},{:.3}) fuel={} damage={} waypoints={} outcome={}",
                        checkpoint.tick,
                        checkpoint.position.x,
                        checkpoint.position.y,
                        checkpoint.velocity.x,
                        checkpoint.velocity.y,
                        checkpoint.fuel,
                        checkpoint.damage,
                        checkpoint.waypoints_visited,
                        checkpoint.outcome.as_str()
                    );
                }
            }

            let game = log
                .verify(tiles)
                .with_context(|| format!("replay of {} failed", input.display()))?;
            println!("input={}", input.display());
            println!("map={map_id}");
            println!("actions={}", log.actions.len());
            println!("ticks={}", game.elapsed_ticks());
            println!(
                "waypoints={}/{}",
                game.waypoints_visited(),
                game.waypoints().len()
            );
            println!("damage={}", game.ship().damage());
            println!("outcome={}", game.outcome().as_str());
            println!("verified_final_state={}", log.final_state.is_some());
        }
        Commands::Benchmark {
            maps,
            seeds,
            seed_file,
            seed_start,
            seed_count,
            max_ticks,
            out_dir,
            save_best,
            jobs,
        } => {
            let maps = resolve_maps(maps.as_deref())?;
            let seeds = resolve_seeds(
                seeds.as_deref(),
                seed_file.as_deref(),
                seed_start.as_deref(),
                seed_count,
            )?;
            let out_dir = out_dir.unwrap_or_else(|| {
                PathBuf::from(format!("benchmarks/ptsp-{}", timestamp_suffix()))
            });

            let report = run_benchmark(BenchmarkConfig {
                maps,
                seeds,
                controller: controller_config,
                policy: policy_with(max_ticks),
                out_dir: out_dir.clone(),
                save_best,
                jobs: Some(jobs),
            })?;

            println!("runs={}", report.run_count);
            println!(
                "jobs={}",
                report
                    .jobs
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "auto".to_string())
            );
            println!("out_dir={}", out_dir.display());
            println!("maps:");
            for (idx, row) in report.map_rankings.iter().enumerate() {
                println!(
                    "{:>2}. {:12} completion={:.2} avg_wp={:.2}/{} avg_ticks={:.1} avg_damage={:.1} best={}",
                    idx + 1,
                    row.map_id,
                    row.completion_rate,
                    row.avg_waypoints,
                    row.waypoints_total,
                    row.avg_ticks,
                    row.avg_damage,
                    row.best_seed_hex
                );
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ControllerConfig> {
    let config = match path {
        Some(path) => ControllerConfig::from_file(path)?,
        None => ControllerConfig::default(),
    };
    config
        .validate()
        .map_err(|err| anyhow!("controller config rejected: {err}"))?;
    Ok(config)
}

fn policy_with(max_ticks: Option<u32>) -> RunPolicy {
    let policy = RunPolicy::from_env();
    match max_ticks {
        Some(max_ticks) => RunPolicy {
            max_ticks,
            ..policy
        },
        None => policy,
    }
}

/// File-name-safe form of a map id; `file:` ids keep only the file stem.
fn safe_name(map_id: &str) -> String {
    let name = match map_id.strip_prefix(FILE_PREFIX) {
        Some(path) => Path::new(path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "map".to_string()),
        None => map_id.to_string(),
    };
    name.replace(|ch: char| !ch.is_ascii_alphanumeric() && ch != '-', "-")
}

fn resolve_seeds(
    seeds: Option<&str>,
    seed_file: Option<&Path>,
    seed_start: Option<&str>,
    seed_count: u32,
) -> Result<Vec<u64>> {
    if let Some(path) = seed_file {
        return parse_seed_file(path);
    }

    if let Some(csv) = seeds {
        return parse_seed_csv(csv);
    }

    let start = if let Some(start) = seed_start {
        parse_seed(start)?
    } else {
        ptsp_autopilot::config::DEFAULT_SEED
    };

    let mut out = Vec::with_capacity(seed_count as usize);
    let mut cur = start;
    for _ in 0..seed_count {
        out.push(cur);
        cur = cur.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    }
    Ok(out)
}

fn timestamp_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{now}")
}
