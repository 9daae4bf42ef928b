//! TSP Heuristics - Command Line Interface
//!
//! Solves TSPLIB instances with Lin-Kernighan and the competing heuristics,
//! and benchmarks them against each other.

use clap::{Parser, Subcommand};
use tsp_heuristics::benchmark::{
    load_problems_from_dir, write_history_csv, AlgorithmKind, Benchmark, BenchmarkConfig,
};
use tsp_heuristics::heuristics::{LinKernighan, LinKernighanConfig, NearestNeighbour};
use tsp_heuristics::{Problem, Result, RunResult, Tour};

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "tsp-heuristics")]
#[command(version = "1.0")]
#[command(about = "Lin-Kernighan and competing heuristics for the symmetric TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single TSPLIB instance
    Solve {
        #[arg(short, long)]
        problem: PathBuf,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "lin-kernighan")]
        algorithm: AlgorithmKind,

        /// Evaluation budget
        #[arg(short, long, default_value = "10000")]
        budget: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Polish the best tour with Lin-Kernighan afterwards
        #[arg(long)]
        improve: bool,

        /// Depth limit for Lin-Kernighan chains
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output result to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the best fitness after every evaluation to a CSV file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing .tsp files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON benchmark configuration; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of runs per algorithm
        #[arg(short, long)]
        runs: Option<usize>,

        /// Evaluation budget per run
        #[arg(short, long)]
        budget: Option<usize>,

        /// Base seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Algorithms to compare
        #[arg(short, long, value_enum, value_delimiter = ',')]
        algorithms: Vec<AlgorithmKind>,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,

        /// Depth limit for Lin-Kernighan chains
        #[arg(long)]
        max_depth: Option<usize>,

        /// Also export the best fitness after every evaluation
        #[arg(long)]
        history: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        problem: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve { problem, algorithm, budget, seed, improve, max_depth, output, history, verbose } => {
            solve_problem(&problem, algorithm, budget, seed, improve, max_depth, output, history, verbose)
        }

        Commands::Benchmark { dir, output, config, runs, budget, seed, algorithms, max_size, max_depth, history } => {
            let overrides = BenchmarkOverrides { output, runs, budget, seed, algorithms, max_depth, history };
            run_benchmark(&dir, config, overrides, max_size)
        }

        Commands::Analyze { problem } => analyze_problem(&problem),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_problem(
    path: &Path,
    algorithm: AlgorithmKind,
    budget: usize,
    seed: u64,
    improve: bool,
    max_depth: Option<usize>,
    output: Option<PathBuf>,
    history: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    println!("Loading problem from {:?}...", path);
    let problem = Problem::from_file(path)?;

    if verbose {
        println!("{}", problem.statistics());
    }

    println!("Solving with {:?}...", algorithm);
    let start = Instant::now();

    let mut result = algorithm.solver(budget, max_depth).solve(&problem, seed);

    if improve {
        result = polish(&problem, &result, budget, max_depth)?;
    }

    let elapsed = start.elapsed();

    println!("\n========== Results ==========");
    println!("Algorithm: {}", result.algorithm_name);
    println!("Length: {}", result.best_fitness);
    println!("Evaluations until best: {} of {}", result.evaluations_until_best, result.evaluation_budget);
    println!("Time: {:.4}s", elapsed.as_secs_f64());

    if verbose {
        println!("\nTour: {}", result.best_path);
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&out_path, json)?;
        println!("\nResult saved to {:?}", out_path);
    }

    if let Some(history_path) = history {
        write_history_csv(&history_path, std::slice::from_ref(&result))?;
        println!("History saved to {:?}", history_path);
    }

    Ok(())
}

/// Run Lin-Kernighan from the best tour of an earlier run.
fn polish(problem: &Problem, result: &RunResult, budget: usize, max_depth: Option<usize>) -> Result<RunResult> {
    let tour = Tour::from_nodes(problem, result.best_nodes())?;
    let lk = LinKernighan::with_config(LinKernighanConfig {
        evaluation_budget: budget,
        max_depth,
    });

    let mut polished = lk.run_from(tour);
    polished.algorithm_name = format!("{}+LinKernighan", result.algorithm_name);
    polished.computation_time += result.computation_time;
    Ok(polished)
}

/// Command line values that take precedence over the JSON configuration
struct BenchmarkOverrides {
    output: Option<PathBuf>,
    runs: Option<usize>,
    budget: Option<usize>,
    seed: Option<u64>,
    algorithms: Vec<AlgorithmKind>,
    max_depth: Option<usize>,
    history: bool,
}

fn run_benchmark(
    dir: &Path,
    config_path: Option<PathBuf>,
    overrides: BenchmarkOverrides,
    max_size: Option<usize>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => BenchmarkConfig::from_json_file(path)?,
        None => BenchmarkConfig::default(),
    };
    if let Some(runs) = overrides.runs {
        config.runs = runs;
    }
    if let Some(budget) = overrides.budget {
        config.evaluation_budget = budget;
    }
    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    if !overrides.algorithms.is_empty() {
        config.algorithms = overrides.algorithms;
    }
    if overrides.max_depth.is_some() {
        config.max_depth = overrides.max_depth;
    }
    if overrides.history {
        config.write_history = true;
    }
    if let Some(output) = overrides.output {
        config.output_dir = output.to_string_lossy().to_string();
    }
    let write_history = config.write_history;

    println!("Loading problems from {:?}...", dir);

    let mut problems = load_problems_from_dir(dir)?;

    if let Some(max) = max_size {
        problems.retain(|p| p.dimension() <= max);
    }

    println!("Found {} problems", problems.len());

    if problems.is_empty() {
        eprintln!("No problems found!");
        return Ok(());
    }

    let output = PathBuf::from(&config.output_dir);
    std::fs::create_dir_all(&output)?;

    let mut benchmark = Benchmark::new(config);

    for (i, problem) in problems.iter().enumerate() {
        println!(
            "\n[{}/{}] Processing {} (n={})...",
            i + 1,
            problems.len(),
            problem.name,
            problem.dimension()
        );

        benchmark.run_problem(problem);
    }

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    if write_history {
        let history_path = output.join("history.csv");
        benchmark.export_history_csv(&history_path)?;
        println!("History exported to {:?}", history_path);
    }

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_problem(path: &Path) -> Result<()> {
    let problem = Problem::from_file(path)?;

    println!("========== Problem Analysis ==========\n");
    println!("{}", problem.statistics());

    if problem.dimension() == 0 {
        return Ok(());
    }

    let nn_tour = NearestNeighbour::new().construct_from(&problem, 0)?;
    let nn_length = nn_tour.fitness();
    let lk_result = LinKernighan::with_budget(1_000).run_from(nn_tour);

    println!("Quick Solution Estimates:");
    println!("  Nearest Neighbour (from node 0): {}", nn_length);
    println!(
        "  Nearest Neighbour + Lin-Kernighan: {} ({} sweeps to best)",
        lk_result.best_fitness, lk_result.evaluations_until_best
    );

    Ok(())
}
