use anyhow::Result;
use ptsp_autopilot::benchmark::{run_benchmark, BenchmarkConfig, BenchmarkReport};
use ptsp_autopilot::config::ControllerConfig;
use ptsp_autopilot::maps::load_map;
use ptsp_autopilot::runner::{read_action_log, RunPolicy};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn small_benchmark(out_dir: &Path, maps: &[&str], seeds: Vec<u64>) -> BenchmarkConfig {
    BenchmarkConfig {
        maps: maps.iter().map(|id| id.to_string()).collect(),
        seeds,
        controller: ControllerConfig {
            slack_ms: 2,
            ..ControllerConfig::default()
        },
        policy: RunPolicy {
            action_time: Duration::from_millis(6),
            disqualify_after: Duration::from_secs(5),
            max_ticks: 24,
        },
        out_dir: out_dir.to_path_buf(),
        save_best: true,
        jobs: Some(2),
    }
}

#[test]
fn benchmark_writes_summary_tables_and_best_logs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let report = run_benchmark(small_benchmark(dir.path(), &["open", "maze"], vec![1, 2]))?;

    assert_eq!(report.run_count, 4);
    assert_eq!(report.map_rankings.len(), 2);
    assert_eq!(report.saved_logs.len(), 2);
    assert!(report.runs.iter().all(|run| run.ticks == 24));

    for file in ["summary.json", "runs.csv", "maps.csv"] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }

    let raw = fs::read(dir.path().join("summary.json"))?;
    let summary: BenchmarkReport = serde_json::from_slice(&raw)?;
    assert_eq!(summary.seeds, vec![1, 2]);
    assert_eq!(summary.max_ticks, 24);

    let runs_csv = fs::read_to_string(dir.path().join("runs.csv"))?;
    assert_eq!(runs_csv.lines().count(), 1 + 4);
    let maps_csv = fs::read_to_string(dir.path().join("maps.csv"))?;
    assert_eq!(maps_csv.lines().count(), 1 + 2);

    for saved in &report.saved_logs {
        let log = read_action_log(Path::new(&saved.path))?;
        assert_eq!(log.map_id, saved.map_id);
        log.verify(Arc::new(load_map(&saved.map_id)?))?;
    }
    Ok(())
}

#[test]
fn benchmark_rejects_bad_inputs_before_running() -> Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(run_benchmark(small_benchmark(dir.path(), &["open"], Vec::new())).is_err());
    assert!(run_benchmark(small_benchmark(dir.path(), &["no-such-map"], vec![1])).is_err());

    let mut zero_jobs = small_benchmark(dir.path(), &["open"], vec![1]);
    zero_jobs.jobs = Some(0);
    assert!(run_benchmark(zero_jobs).is_err());
    Ok(())
}
