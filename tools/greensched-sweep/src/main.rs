use std::fs;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use greensched::core::config::SimulationConfig;
use greensched::experiment::SweepExperiment;
use greensched::extensions::csv_trace::{load_nodes_from_csv, load_sites_from_csv, load_workloads_from_csv};
use greensched::extensions::log_export::{write_placement_log, write_sweep_summary};
use greensched::extensions::workload_generator::{generate_nodes, generate_workloads};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Sweeps placement policies over carbon-weight and batch-size grids
struct Args {
    /// Path to YAML file with the base simulation configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to nodes CSV (synthetic fleet is generated if omitted)
    #[arg(long)]
    nodes_csv: Option<PathBuf>,

    /// Path to sites CSV
    #[arg(long)]
    sites_csv: Option<PathBuf>,

    /// Path to workloads CSV (synthetic stream is generated if omitted)
    #[arg(long)]
    workloads_csv: Option<PathBuf>,

    /// Comma-separated carbon weights to sweep
    #[arg(long, default_value = "0.05,0.1,0.2,0.4")]
    ci_weights: String,

    /// Comma-separated batch sizes to sweep
    #[arg(long, default_value = "1,8,32")]
    batch_sizes: String,

    /// Comma-separated policy descriptors to sweep
    #[arg(long, default_value = "LeastLoaded,CiAware,CarbonScaler,MinCostFlow")]
    policies: String,

    /// Directory for the summary and per-run placement logs
    #[arg(short, long, default_value = "results")]
    output_dir: PathBuf,

    /// Seed for synthetic input generation
    #[arg(long, default_value_t = 123)]
    seed: u64,

    /// Number of synthetic workloads when generating
    #[arg(long, default_value_t = 500)]
    workload_count: usize,

    /// Number of threads to use (default - use all available cores)
    #[arg(short, long, default_value_t = std::thread::available_parallelism().unwrap().get())]
    threads: usize,
}

fn parse_f64_list(raw: &str) -> Vec<f64> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .unwrap_or_else(|_| panic!("invalid float in list: {}", part))
        })
        .collect()
}

fn parse_usize_list(raw: &str) -> Vec<usize> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .unwrap_or_else(|_| panic!("invalid integer in list: {}", part))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut base_config = match &args.config {
        Some(path) => SimulationConfig::from_file(path.to_str().unwrap()),
        None => SimulationConfig::default(),
    };

    if let Some(path) = &args.sites_csv {
        base_config.sites = load_sites_from_csv(path)?;
    }
    match &args.nodes_csv {
        Some(path) => base_config.nodes = load_nodes_from_csv(path)?,
        None => {
            if base_config.nodes.is_empty() {
                info!("no nodes given, generating a synthetic fleet (seed {})", args.seed);
                base_config.nodes = generate_nodes(args.seed);
            }
        }
    }

    let workloads = match &args.workloads_csv {
        Some(path) => load_workloads_from_csv(path)?,
        None => {
            info!(
                "no workloads given, generating {} synthetic jobs (seed {})",
                args.workload_count, args.seed
            );
            generate_workloads(args.seed, args.workload_count, 0., 3600.)
        }
    };

    let policies: Vec<String> = args.policies.split(',').map(|p| p.trim().to_string()).collect();
    let ci_weights = parse_f64_list(&args.ci_weights);
    let batch_sizes = parse_usize_list(&args.batch_sizes);

    let experiment = SweepExperiment::new(base_config, policies, ci_weights, batch_sizes, workloads);
    let runs = experiment.run(args.threads);

    fs::create_dir_all(&args.output_dir)?;
    for run in &runs {
        let file_name = format!(
            "{}_{}_{}_results.csv",
            run.summary.scheduler, run.summary.ci_weight, run.summary.batch_size
        );
        write_placement_log(File::create(args.output_dir.join(file_name))?, &run.log)?;
    }
    let summaries: Vec<_> = runs.iter().map(|run| run.summary.clone()).collect();
    let summary_path = args.output_dir.join("ci_sweep_summary.csv");
    write_sweep_summary(File::create(&summary_path)?, &summaries)?;
    info!("wrote {} runs and {}", runs.len(), summary_path.display());
    Ok(())
}
