use std::{collections::BTreeMap, fs::File, io::Write, path::PathBuf, sync::Arc};

use clap::Parser;
use env_logger::Builder;
use log::error;
use manet_mr::{
    allocation_result::AllocationResult,
    config::HeuristicConfig,
    connection::ConnectionSet,
    context::PhaseContext,
    error::Result,
    heuristics::resolve_heuristic,
    history::FailureRateTable,
    parser::read_yaml,
    placement_heuristic::PlacementHeuristic,
    profile::{CommType, JobProfile, PhaseProfile},
    replay::HopReplaySimulator,
    static_trace::StaticTrace,
    task::{Task, TaskIdGenerator, Tid},
    topology::{HistoryStat, ReplaySimulator, Trace},
};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct Config {
    #[serde(default = "default_seed")]
    seed: u64,
    traces: Vec<PathBuf>,
    failure_rates: PathBuf,
    job: PathBuf,
    #[serde(default)]
    heuristic_config: Option<PathBuf>,
    replay: HopReplaySimulator,
    /// Simulated time between consecutive phases.
    phase_duration: f64,
    heuristics: Vec<String>,
}

fn default_seed() -> u64 {
    123
}

/// Runs every heuristic over every phase of a job on every trace.
#[derive(Parser, Debug)]
struct Args {
    /// Path to config.
    #[arg(short, long)]
    config: PathBuf,

    /// Path to file with results.
    #[arg(short, long, default_value = None)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct PhaseRecord {
    heuristic: String,
    trace_id: usize,
    phase: usize,
    result: AllocationResult,
}

struct Collaborators {
    history: Arc<dyn HistoryStat>,
    replay: Arc<dyn ReplaySimulator>,
}

/// Tasks of the next phase: one per destination, carrying everything sent to it.
fn next_tasks(
    connections: &ConnectionSet,
    tasks: &BTreeMap<Tid, Task>,
    phase: &PhaseProfile,
    tids: &TaskIdGenerator,
) -> BTreeMap<Tid, Task> {
    let mut fan_out: BTreeMap<Tid, usize> = BTreeMap::new();
    for connection in connections.iter() {
        *fan_out.entry(connection.tid).or_default() += 1;
    }
    let mut received: BTreeMap<usize, f64> = BTreeMap::new();
    for connection in connections.iter() {
        let Some(task) = tasks.get(&connection.tid) else {
            continue;
        };
        let parts = match phase.comm_type {
            CommType::Replicate => 1,
            CommType::Shuffle => fan_out[&connection.tid],
        };
        *received.entry(connection.nid).or_default() += task.input_size * phase.output_ratio / parts as f64;
    }
    received
        .into_iter()
        .map(|(nid, input_size)| {
            let tid = tids.next_tid();
            (tid, Task::new(tid, nid, input_size))
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn run_job(
    heuristic: &dyn PlacementHeuristic,
    heuristic_name: &str,
    trace_id: usize,
    trace: Arc<dyn Trace>,
    job: &JobProfile,
    collaborators: &Collaborators,
    phase_duration: f64,
    seed: u64,
) -> Result<Vec<PhaseRecord>> {
    let tids = TaskIdGenerator::default();
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut tasks = heuristic.allocate_data(job, trace.closest_snapshot(0.0).as_ref(), &tids, &mut rng);
    let mut records = Vec::new();
    for (index, phase) in job.phases.iter().enumerate() {
        let sim_time_offset = index as f64 * phase_duration;
        let snapshot = trace.closest_snapshot(sim_time_offset);
        let ctx = PhaseContext {
            trace_id,
            job: job.clone(),
            phase: phase.clone(),
            next_phase: job.phases.get(index + 1).unwrap_or(phase).clone(),
            trace: trace.clone(),
            sim_time_offset,
            tasks,
            history: collaborators.history.clone(),
            replay: collaborators.replay.clone(),
            nid_remap: snapshot.nid_remap(),
            seed: seed.wrapping_add(index as u64),
        };
        let result = heuristic.allocate_tasks(&ctx)?;
        tasks = next_tasks(&result.connections, &ctx.tasks, phase, &tids);
        records.push(PhaseRecord {
            heuristic: heuristic_name.to_string(),
            trace_id,
            phase: index,
            result,
        });
    }
    Ok(records)
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let args = Args::parse();
    let config: Config = read_yaml(&args.config).expect("Can't read config file");
    let heuristic_config = match &config.heuristic_config {
        Some(path) => HeuristicConfig::from_yaml(path).expect("Can't read heuristic config"),
        None => HeuristicConfig::default(),
    };
    let job = JobProfile::from_yaml(&config.job).expect("Can't read job profile");
    let traces = config
        .traces
        .iter()
        .map(|path| Arc::new(StaticTrace::from_yaml(path).expect("Can't read trace")) as Arc<dyn Trace>)
        .collect::<Vec<_>>();
    let collaborators = Collaborators {
        history: Arc::new(FailureRateTable::from_yaml(&config.failure_rates).expect("Can't read failure rates")),
        replay: Arc::new(config.replay.clone()),
    };

    let mut records = Vec::new();
    for name in config.heuristics.iter() {
        let heuristic = resolve_heuristic(name, &heuristic_config).expect("Can't resolve heuristic");
        for (trace_id, trace) in traces.iter().enumerate() {
            match run_job(
                heuristic.as_ref(),
                name,
                trace_id,
                trace.clone(),
                &job,
                &collaborators,
                config.phase_duration,
                config.seed,
            ) {
                Ok(job_records) => records.extend(job_records),
                Err(e) => error!("{} on trace {} discarded: {}", name, trace_id, e),
            }
        }
    }

    let width = records
        .iter()
        .map(|record| record.heuristic.len())
        .max()
        .unwrap_or(0)
        .max("heuristic".len());
    println!(
        "| {: <width$} | trace | phase | destinations | search effort | reliability | contention | utilization |",
        "heuristic",
        width = width
    );
    println!(
        "|-{:-<width$}-|-------|-------|--------------|---------------|-------------|------------|-------------|",
        "",
        width = width
    );
    for record in records.iter() {
        println!(
            "| {: <width$} | {: >5} | {: >5} | {: >12} | {: >13.2} | {: >11.4} | {: >10.2} | {: >10.1}% |",
            record.heuristic,
            record.trace_id,
            record.phase,
            record.result.destinations().len(),
            record.result.search_effort,
            record.result.reliability,
            record.result.contention,
            record.result.cluster_utilization * 100.,
            width = width
        );
    }

    if let Some(output) = args.output {
        File::create(output)
            .expect("Can't create output file")
            .write_all(serde_json::to_string_pretty(&records).expect("Can't serialize results").as_bytes())
            .expect("Can't write to output file");
    }
}
