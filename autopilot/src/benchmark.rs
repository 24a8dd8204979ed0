use crate::config::ControllerConfig;
use crate::maps::{load_map, map_ids};
use crate::runner::{run_match, write_action_log, RunMetrics, RunPolicy};
use crate::util::seed_to_hex;
use anyhow::{anyhow, Context, Result};
use ptsp_core::{ActionLog, GameOutcome};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub maps: Vec<String>,
    pub seeds: Vec<u64>,
    pub controller: ControllerConfig,
    pub policy: RunPolicy,
    pub out_dir: PathBuf,
    pub save_best: bool,
    /// Worker threads; `None` uses every core. Matches race the wall clock,
    /// so parallel runs can pick up late replies a serial run would not.
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub map_id: String,
    pub seed: u64,
    pub seed_hex: String,
    pub ticks: u32,
    pub waypoints_visited: usize,
    pub waypoints_total: usize,
    pub fuel_tanks_collected: u32,
    pub fuel_spent: u32,
    pub damage: u32,
    pub outcome: GameOutcome,
    pub disqualified: bool,
    pub late_replies: u32,
    pub thrust_ticks: u32,
    pub turn_ticks: u32,
    pub tsp_cost: f64,
    pub rollouts: u64,
    pub run_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapAggregate {
    pub map_id: String,
    pub runs: usize,
    pub waypoints_total: usize,
    pub avg_waypoints: f64,
    pub completion_rate: f64,
    pub avg_ticks: f64,
    pub min_completed_ticks: Option<u32>,
    pub avg_damage: f64,
    pub late_replies: u64,
    pub disqualified: usize,
    pub avg_run_value: f64,
    pub best_seed: u64,
    pub best_seed_hex: String,
    pub best_run_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedLogRecord {
    pub map_id: String,
    pub seed: u64,
    pub seed_hex: String,
    pub ticks: u32,
    pub waypoints_visited: usize,
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub action_time_ms: u64,
    pub disqualify_ms: u64,
    pub max_ticks: u32,
    pub jobs: Option<usize>,
    pub controller: ControllerConfig,
    pub maps: Vec<String>,
    pub seeds: Vec<u64>,
    pub run_count: usize,
    pub map_rankings: Vec<MapAggregate>,
    pub runs: Vec<RunRecord>,
    pub saved_logs: Vec<SavedLogRecord>,
}

#[derive(Clone, Debug)]
struct InternalRun {
    metrics: RunMetrics,
    run_value: f64,
    log: ActionLog,
}

/// Single number for comparing runs on the same map: waypoints dominate,
/// then speed, then damage. Disqualified runs only keep their waypoints.
pub fn run_value(metrics: &RunMetrics) -> f64 {
    let waypoints = metrics.waypoints_visited as f64 * 10_000.0;
    if metrics.disqualified {
        return waypoints - metrics.max_ticks as f64;
    }
    waypoints - metrics.ticks as f64 - 0.25 * metrics.damage as f64
}

pub fn resolve_maps(input: Option<&str>) -> Result<Vec<String>> {
    match input {
        None => Ok(map_ids().iter().map(|id| (*id).to_string()).collect()),
        Some(raw) => {
            let mut maps = Vec::new();
            for token in raw.split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                maps.push(token.to_string());
            }
            if maps.is_empty() {
                return Err(anyhow!("--maps resolved to empty list"));
            }
            Ok(maps)
        }
    }
}

pub fn run_benchmark(config: BenchmarkConfig) -> Result<BenchmarkReport> {
    if config.seeds.is_empty() {
        return Err(anyhow!("benchmark requires at least one seed"));
    }
    if config.maps.is_empty() {
        return Err(anyhow!("benchmark requires at least one map"));
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    if let Some(jobs) = config.jobs {
        if jobs == 0 {
            return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
        }
    }

    // Parse every map up front so a bad id fails before any run starts.
    let mut loaded = HashMap::new();
    for map_id in &config.maps {
        let map = load_map(map_id)?;
        loaded.insert(map_id.clone(), Arc::new(map));
    }

    let run_jobs: Vec<(String, u64)> = config
        .maps
        .iter()
        .flat_map(|map| config.seeds.iter().map(move |seed| (map.clone(), *seed)))
        .collect();

    let run_one = |(map_id, seed): &(String, u64)| -> Result<InternalRun> {
        let map = loaded
            .get(map_id)
            .cloned()
            .ok_or_else(|| anyhow!("map '{map_id}' was not loaded"))?;
        let controller = config.controller.clone().with_seed(*seed);
        let artifact = run_match(map_id, map, &controller, &config.policy)
            .with_context(|| format!("benchmark run failed for map={map_id} seed={seed:#x}"))?;
        Ok(InternalRun {
            run_value: run_value(&artifact.metrics),
            metrics: artifact.metrics,
            log: artifact.log,
        })
    };

    let run_results: Vec<Result<InternalRun>> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| run_jobs.par_iter().map(run_one).collect())
    } else {
        run_jobs.par_iter().map(run_one).collect()
    };

    let mut runs = Vec::with_capacity(run_results.len());
    for result in run_results {
        runs.push(result?);
    }

    let mut grouped: HashMap<String, Vec<&InternalRun>> = HashMap::new();
    for run in &runs {
        grouped
            .entry(run.metrics.map_id.clone())
            .or_default()
            .push(run);
    }

    let mut rankings = Vec::new();
    let mut saved_logs = Vec::new();
    for (map_id, map_runs) in grouped {
        let runs_count = map_runs.len() as f64;
        let Some(best) = map_runs
            .iter()
            .copied()
            .max_by(|a, b| a.run_value.total_cmp(&b.run_value))
        else {
            continue;
        };

        let sum_waypoints: usize = map_runs.iter().map(|r| r.metrics.waypoints_visited).sum();
        let sum_ticks: u64 = map_runs.iter().map(|r| r.metrics.ticks as u64).sum();
        let sum_damage: u64 = map_runs.iter().map(|r| r.metrics.damage as u64).sum();
        let late_replies: u64 = map_runs.iter().map(|r| r.metrics.late_replies as u64).sum();
        let completed = map_runs.iter().filter(|r| r.metrics.completed()).count();
        let disqualified = map_runs.iter().filter(|r| r.metrics.disqualified).count();
        let min_completed_ticks = map_runs
            .iter()
            .filter(|r| r.metrics.completed())
            .map(|r| r.metrics.ticks)
            .min();
        let avg_run_value = map_runs.iter().map(|r| r.run_value).sum::<f64>() / runs_count;

        if config.save_best {
            saved_logs.push(save_best_log(&config.out_dir, best)?);
        }

        rankings.push(MapAggregate {
            map_id,
            runs: map_runs.len(),
            waypoints_total: best.metrics.waypoints_total,
            avg_waypoints: sum_waypoints as f64 / runs_count,
            completion_rate: completed as f64 / runs_count,
            avg_ticks: sum_ticks as f64 / runs_count,
            min_completed_ticks,
            avg_damage: sum_damage as f64 / runs_count,
            late_replies,
            disqualified,
            avg_run_value,
            best_seed: best.metrics.seed,
            best_seed_hex: seed_to_hex(best.metrics.seed),
            best_run_value: best.run_value,
        });
    }

    rankings.sort_by(|a, b| {
        b.completion_rate
            .total_cmp(&a.completion_rate)
            .then_with(|| b.avg_run_value.total_cmp(&a.avg_run_value))
            .then_with(|| a.map_id.cmp(&b.map_id))
    });
    saved_logs.sort_by(|a, b| a.map_id.cmp(&b.map_id));

    let mut run_records: Vec<RunRecord> = runs
        .iter()
        .map(|run| RunRecord {
            map_id: run.metrics.map_id.clone(),
            seed: run.metrics.seed,
            seed_hex: seed_to_hex(run.metrics.seed),
            ticks: run.metrics.ticks,
            waypoints_visited: run.metrics.waypoints_visited,
            waypoints_total: run.metrics.waypoints_total,
            fuel_tanks_collected: run.metrics.fuel_tanks_collected,
            fuel_spent: run.metrics.fuel_spent,
            damage: run.metrics.damage,
            outcome: run.metrics.outcome,
            disqualified: run.metrics.disqualified,
            late_replies: run.metrics.late_replies,
            thrust_ticks: run.metrics.thrust_ticks,
            turn_ticks: run.metrics.turn_ticks,
            tsp_cost: run.metrics.tsp_cost,
            rollouts: run.metrics.rollouts,
            run_value: run.run_value,
        })
        .collect();

    run_records.sort_by(|a, b| {
        a.map_id
            .cmp(&b.map_id)
            .then_with(|| b.run_value.total_cmp(&a.run_value))
            .then_with(|| a.seed.cmp(&b.seed))
    });

    write_runs_csv(&config.out_dir.join("runs.csv"), &run_records)?;
    write_maps_csv(&config.out_dir.join("maps.csv"), &rankings)?;

    let report = BenchmarkReport {
        generated_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        action_time_ms: config.policy.action_time.as_millis() as u64,
        disqualify_ms: config.policy.disqualify_after.as_millis() as u64,
        max_ticks: config.policy.max_ticks,
        jobs: config.jobs,
        controller: config.controller,
        maps: config.maps,
        seeds: config.seeds,
        run_count: run_records.len(),
        map_rankings: rankings,
        runs: run_records,
        saved_logs,
    };

    let report_path = config.out_dir.join("summary.json");
    fs::write(
        &report_path,
        serde_json::to_vec_pretty(&report).context("failed to serialize summary json")?,
    )
    .with_context(|| format!("failed writing {}", report_path.display()))?;

    tracing::info!(
        runs = report.run_count,
        out_dir = %config.out_dir.display(),
        "benchmark complete"
    );

    Ok(report)
}

fn save_best_log(out_dir: &Path, run: &InternalRun) -> Result<SavedLogRecord> {
    let save_dir = out_dir.join("best");
    let safe_map = run
        .metrics
        .map_id
        .replace(|ch: char| !ch.is_ascii_alphanumeric() && ch != '-', "-");
    let base = format!(
        "{safe_map}-seed{:08x}-wp{}-ticks{}",
        run.metrics.seed, run.metrics.waypoints_visited, run.metrics.ticks
    );

    let log_path = save_dir.join(format!("{base}.actions.json"));
    write_action_log(&log_path, &run.log)?;

    let meta = serde_json::json!({
        "map_id": run.metrics.map_id,
        "seed": run.metrics.seed,
        "seed_hex": seed_to_hex(run.metrics.seed),
        "ticks": run.metrics.ticks,
        "waypoints_visited": run.metrics.waypoints_visited,
        "waypoints_total": run.metrics.waypoints_total,
        "damage": run.metrics.damage,
        "outcome": run.metrics.outcome,
        "run_value": run.run_value,
        "tsp_cost": run.metrics.tsp_cost,
    });
    let meta_path = save_dir.join(format!("{base}.json"));
    fs::write(
        &meta_path,
        serde_json::to_vec_pretty(&meta).context("failed to serialize best run metadata")?,
    )
    .with_context(|| format!("failed writing {}", meta_path.display()))?;

    Ok(SavedLogRecord {
        map_id: run.metrics.map_id.clone(),
        seed: run.metrics.seed,
        seed_hex: seed_to_hex(run.metrics.seed),
        ticks: run.metrics.ticks,
        waypoints_visited: run.metrics.waypoints_visited,
        path: log_path.to_string_lossy().into_owned(),
    })
}

fn write_runs_csv(path: &Path, rows: &[RunRecord]) -> Result<()> {
    let mut csv = String::from(
        "map_id,seed_hex,seed,ticks,waypoints_visited,waypoints_total,fuel_tanks_collected,fuel_spent,damage,outcome,disqualified,late_replies,thrust_ticks,turn_ticks,tsp_cost,rollouts,run_value\n",
    );
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:.2},{},{:.2}\n",
            row.map_id,
            row.seed_hex,
            row.seed,
            row.ticks,
            row.waypoints_visited,
            row.waypoints_total,
            row.fuel_tanks_collected,
            row.fuel_spent,
            row.damage,
            row.outcome.as_str(),
            row.disqualified,
            row.late_replies,
            row.thrust_ticks,
            row.turn_ticks,
            row.tsp_cost,
            row.rollouts,
            row.run_value
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}

fn write_maps_csv(path: &Path, rows: &[MapAggregate]) -> Result<()> {
    let mut csv = String::from(
        "rank,map_id,runs,waypoints_total,avg_waypoints,completion_rate,avg_ticks,min_completed_ticks,avg_damage,late_replies,disqualified,avg_run_value,best_seed_hex,best_run_value\n",
    );
    for (idx, row) in rows.iter().enumerate() {
        let min_ticks = row
            .min_completed_ticks
            .map(|ticks| ticks.to_string())
            .unwrap_or_default();
        csv.push_str(&format!(
            "{},{},{},{},{:.2},{:.4},{:.2},{},{:.2},{},{},{:.2},{},{:.2}\n",
            idx + 1,
            row.map_id,
            row.runs,
            row.waypoints_total,
            row.avg_waypoints,
            row.completion_rate,
            row.avg_ticks,
            min_ticks,
            row.avg_damage,
            row.late_replies,
            row.disqualified,
            row.avg_run_value,
            row.best_seed_hex,
            row.best_run_value
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(visited: usize, ticks: u32, damage: u32, disqualified: bool) -> RunMetrics {
        RunMetrics {
            map_id: "open".to_string(),
            seed: 1,
            max_ticks: 1_000,
            ticks,
            waypoints_visited: visited,
            waypoints_total: 5,
            fuel_tanks_collected: 0,
            fuel_spent: 0,
            final_fuel: 0,
            damage,
            outcome: GameOutcome::Running,
            disqualified,
            late_replies: 0,
            thrust_ticks: 0,
            turn_ticks: 0,
            tsp_cost: 0.0,
            rollouts: 0,
            init_ms: 0,
            wall_ms: 0,
        }
    }

    #[test]
    fn waypoints_outrank_speed_and_damage() {
        assert!(run_value(&metrics(3, 900, 400, false)) > run_value(&metrics(2, 100, 0, false)));
        assert!(run_value(&metrics(2, 100, 0, false)) > run_value(&metrics(2, 200, 0, false)));
        assert!(run_value(&metrics(2, 100, 0, false)) > run_value(&metrics(2, 100, 40, false)));
        assert!(run_value(&metrics(2, 100, 0, false)) > run_value(&metrics(2, 100, 0, true)));
    }

    #[test]
    fn map_lists_default_to_every_builtin() -> Result<()> {
        assert_eq!(resolve_maps(None)?.len(), map_ids().len());
        assert_eq!(resolve_maps(Some("maze, open,"))?, vec!["maze", "open"]);
        assert!(resolve_maps(Some(" , ")).is_err());
        Ok(())
    }
}
