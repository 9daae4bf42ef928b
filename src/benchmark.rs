//! Benchmarking module.
//!
//! Runs every configured algorithm several times on each problem, collects
//! the individual [`RunResult`]s and aggregates them into per problem and
//! algorithm statistics, CSV files and a plain text report.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::Result;
use crate::heuristics::{
    AntColony, EvolutionaryAlgorithm, LinKernighan, LinKernighanConfig, NearestNeighbour,
    SimulatedAnnealing, Solver,
};
use crate::problem::Problem;
use crate::result::RunResult;

/// Algorithms taking part in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    NearestNeighbour,
    SimulatedAnnealing,
    Evolutionary,
    AntColony,
    LinKernighan,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 5] = [
        AlgorithmKind::NearestNeighbour,
        AlgorithmKind::SimulatedAnnealing,
        AlgorithmKind::Evolutionary,
        AlgorithmKind::AntColony,
        AlgorithmKind::LinKernighan,
    ];

    /// Build the solver with its default parameters and the given budget.
    /// `max_depth` only applies to Lin-Kernighan.
    pub fn solver(&self, evaluation_budget: usize, max_depth: Option<usize>) -> Box<dyn Solver> {
        match self {
            AlgorithmKind::NearestNeighbour => Box::new(NearestNeighbour::with_budget(evaluation_budget)),
            AlgorithmKind::SimulatedAnnealing => Box::new(SimulatedAnnealing::with_budget(evaluation_budget)),
            AlgorithmKind::Evolutionary => Box::new(EvolutionaryAlgorithm::with_budget(evaluation_budget)),
            AlgorithmKind::AntColony => Box::new(AntColony::with_budget(evaluation_budget)),
            AlgorithmKind::LinKernighan => Box::new(LinKernighan::with_config(LinKernighanConfig {
                evaluation_budget,
                max_depth,
            })),
        }
    }
}

/// Aggregated statistics for one algorithm on one problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Problem name
    pub problem: String,
    /// Algorithm name
    pub algorithm: String,
    /// Number of runs
    pub runs: usize,
    /// Best fitness over all runs
    pub best_fitness: f64,
    /// Mean fitness
    pub mean_fitness: f64,
    /// Sample standard deviation of the fitness, 0 for a single run
    pub std_dev: f64,
    /// Worst fitness over all runs
    pub worst_fitness: f64,
    /// Mean number of evaluations spent before the best tour was found
    pub mean_evaluations_until_best: f64,
    /// Mean wall clock time in seconds
    pub mean_time: f64,
}

/// One row of the best-so-far history export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub problem: String,
    pub algorithm: String,
    /// Index of the run within its (problem, algorithm) group
    pub run: usize,
    /// 1-based evaluation (colony iteration for ant colony, sweep for
    /// Lin-Kernighan)
    pub evaluation: usize,
    pub best_fitness: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of runs per algorithm and problem
    pub runs: usize,
    /// Evaluation budget handed to every algorithm
    pub evaluation_budget: usize,
    /// Run `r` uses seed `seed + r`
    pub seed: u64,
    /// Algorithms to compare
    pub algorithms: Vec<AlgorithmKind>,
    /// Depth limit for Lin-Kernighan chains
    pub max_depth: Option<usize>,
    /// Keep the best-so-far history of every run for `export_history_csv`
    pub write_history: bool,
    /// Output directory
    pub output_dir: String,
    /// Show a progress bar while running
    pub show_progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            runs: 10,
            evaluation_budget: 10_000,
            seed: 0,
            algorithms: AlgorithmKind::ALL.to_vec(),
            max_depth: None,
            write_history: false,
            output_dir: "results".to_string(),
            show_progress: true,
        }
    }
}

impl BenchmarkConfig {
    /// Load a configuration from JSON; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    }

    /// Run every configured algorithm `runs` times on `problem`.
    pub fn run_problem(&mut self, problem: &Problem) {
        log::info!(
            "Running benchmark on problem: {} (n={})",
            problem.name,
            problem.dimension()
        );

        let total = self.config.algorithms.len() * self.config.runs;
        let bar = self.progress_bar(total as u64);

        for kind in self.config.algorithms.clone() {
            let solver = kind.solver(self.config.evaluation_budget, self.config.max_depth);
            bar.set_message(format!("{} {}", problem.name, solver.name()));

            for run in 0..self.config.runs {
                let seed = self.config.seed.wrapping_add(run as u64);
                let mut result = solver.solve(problem, seed);
                if !self.config.write_history {
                    result.best_history = Vec::new();
                }
                log::debug!(
                    "{} run {} (seed {}): {}",
                    solver.name(),
                    run,
                    seed,
                    result.best_fitness
                );
                self.results.push(result);
                bar.inc(1);
            }
        }

        bar.finish_and_clear();
    }

    /// Run benchmark on multiple problems
    pub fn run_on_problems(&mut self, problems: &[Problem]) {
        for problem in problems {
            self.run_problem(problem);
        }
    }

    /// Compute statistics for each (problem, algorithm) pair
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut groups: HashMap<(String, String), Vec<&RunResult>> = HashMap::new();

        for result in &self.results {
            groups
                .entry((result.problem_name.clone(), result.algorithm_name.clone()))
                .or_default()
                .push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = groups
            .into_iter()
            .map(|((problem, algorithm), results)| {
                let fitness: Vec<f64> = results.iter().map(|r| r.best_fitness).collect();
                let evaluations: Vec<f64> = results
                    .iter()
                    .map(|r| r.evaluations_until_best as f64)
                    .collect();
                let times: Vec<f64> = results.iter().map(|r| r.computation_time).collect();

                let std_dev = fitness.iter().std_dev();

                AlgorithmStatistics {
                    problem,
                    algorithm,
                    runs: results.len(),
                    best_fitness: Statistics::min(fitness.iter()),
                    mean_fitness: fitness.iter().mean(),
                    std_dev: if std_dev.is_nan() { 0.0 } else { std_dev },
                    worst_fitness: Statistics::max(fitness.iter()),
                    mean_evaluations_until_best: evaluations.iter().mean(),
                    mean_time: times.iter().mean(),
                }
            })
            .collect();

        statistics.sort_by(|a, b| {
            a.problem
                .cmp(&b.problem)
                .then(OrderedFloat(a.mean_fitness).cmp(&OrderedFloat(b.mean_fitness)))
        });

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export the best-so-far history of every run to CSV
    pub fn export_history_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_history_csv(path, &self.results)
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        TSP Benchmark Report\n");
        report.push_str("========================================\n\n");
        report.push_str(&format!(
            "Generated: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        report.push_str(&format!(
            "Runs: {}, evaluation budget: {}, seed: {}\n\n",
            self.config.runs, self.config.evaluation_budget, self.config.seed
        ));

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(96).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<16} {:<22} {:>10} {:>12} {:>10} {:>10} {:>12}\n",
            "Problem", "Algorithm", "Best", "Mean", "Std Dev", "Worst", "Evals@Best"
        ));
        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<16} {:<22} {:>10.0} {:>12.2} {:>10.2} {:>10.0} {:>12.1}\n",
                stat.problem,
                stat.algorithm,
                stat.best_fitness,
                stat.mean_fitness,
                stat.std_dev,
                stat.worst_fitness,
                stat.mean_evaluations_until_best
            ));
        }

        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        report.push_str("\nBest Tours per Problem:\n");

        let mut problem_best: BTreeMap<&str, &RunResult> = BTreeMap::new();
        for result in &self.results {
            let entry = problem_best.entry(&result.problem_name).or_insert(result);
            if result.best_fitness < entry.best_fitness {
                *entry = result;
            }
        }

        for (problem, best) in &problem_best {
            report.push_str(&format!(
                "  {}: {:.0} ({})\n",
                problem, best.best_fitness, best.algorithm_name
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}

/// Write one row per recorded history entry of `results`.
pub fn write_history_csv<P: AsRef<Path>>(path: P, results: &[RunResult]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    let mut runs: HashMap<(&str, &str), usize> = HashMap::new();

    for result in results {
        let counter = runs
            .entry((result.problem_name.as_str(), result.algorithm_name.as_str()))
            .or_insert(0);
        let run = *counter;
        *counter += 1;

        for (i, &best_fitness) in result.best_history.iter().enumerate() {
            writer.serialize(HistoryRecord {
                problem: result.problem_name.clone(),
                algorithm: result.algorithm_name.clone(),
                run,
                evaluation: i + 1,
                best_fitness,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Load every `.tsp` file in `dir`, smallest problem first. Files that fail
/// to parse are skipped with a warning.
pub fn load_problems_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Problem>> {
    let mut problems = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "tsp").unwrap_or(false) {
            match Problem::from_file(&path) {
                Ok(problem) => problems.push(problem),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    problems.sort_by_key(|p| p.dimension());

    Ok(problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::DistanceMatrix;
    use crate::tour::is_permutation;
    use std::path::PathBuf;
    use rand::SeedableRng;

    fn create_test_problem() -> Problem {
        let points = [(0.0, 0.0), (3.0, 0.0), (6.0, 1.0), (5.0, 4.0), (1.0, 5.0), (-1.0, 2.0)];
        let matrix = DistanceMatrix::from_fn(points.len(), |i, j| {
            let (dx, dy): (f64, f64) = (points[i].0 - points[j].0, points[i].1 - points[j].1);
            (dx * dx + dy * dy).sqrt().round()
        })
        .unwrap();
        Problem::new("hexagon", matrix)
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tsp-heuristics-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn result(problem: &str, algorithm: &str, fitness: f64, evaluations: usize) -> RunResult {
        RunResult {
            problem_name: problem.to_string(),
            algorithm_name: algorithm.to_string(),
            best_fitness: fitness,
            best_path: "0,1,2".to_string(),
            evaluation_budget: 100,
            evaluations_until_best: evaluations,
            computation_time: 0.5,
            best_history: Vec::new(),
        }
    }

    fn quiet_config() -> BenchmarkConfig {
        BenchmarkConfig {
            runs: 2,
            evaluation_budget: 100,
            seed: 7,
            show_progress: false,
            ..BenchmarkConfig::default()
        }
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.runs, 10);
        assert_eq!(config.algorithms.len(), 5);
    }

    #[test]
    fn test_config_from_json_keeps_defaults() {
        let dir = scratch_dir("config");
        let path = dir.join("bench.json");
        std::fs::write(&path, r#"{ "runs": 3, "algorithms": ["lin-kernighan", "ant-colony"] }"#).unwrap();

        let config = BenchmarkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.runs, 3);
        assert_eq!(
            config.algorithms,
            vec![AlgorithmKind::LinKernighan, AlgorithmKind::AntColony]
        );
        assert_eq!(config.evaluation_budget, 10_000);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_run_problem_records_every_run() {
        let problem = create_test_problem();
        let mut benchmark = Benchmark::new(quiet_config());
        benchmark.run_problem(&problem);

        assert_eq!(benchmark.results().len(), 10);
        for result in benchmark.results() {
            let nodes = result.best_nodes();
            assert!(is_permutation(&nodes, 6));
            assert_eq!(result.best_fitness, problem.cycle_length(&nodes));
            assert_eq!(result.problem_name, "hexagon");
        }

        // same seeds give the same tours
        let mut again = Benchmark::new(quiet_config());
        again.run_problem(&problem);
        for (a, b) in benchmark.results().iter().zip(again.results()) {
            assert_eq!(a.best_path, b.best_path);
        }
    }

    #[test]
    fn test_compute_statistics() {
        let mut benchmark = Benchmark::new(quiet_config());
        benchmark.results = vec![
            result("p", "A", 10.0, 1),
            result("p", "A", 20.0, 2),
            result("p", "A", 30.0, 6),
            result("p", "B", 5.0, 4),
            result("q", "A", 8.0, 0),
        ];

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 3);

        // sorted by problem, then mean
        assert_eq!((stats[0].problem.as_str(), stats[0].algorithm.as_str()), ("p", "B"));
        assert_eq!((stats[1].problem.as_str(), stats[1].algorithm.as_str()), ("p", "A"));
        assert_eq!(stats[2].problem, "q");

        let a = &stats[1];
        assert_eq!(a.runs, 3);
        assert_eq!(a.best_fitness, 10.0);
        assert_eq!(a.worst_fitness, 30.0);
        assert!((a.mean_fitness - 20.0).abs() < 1e-9);
        assert!((a.std_dev - 10.0).abs() < 1e-9);
        assert!((a.mean_evaluations_until_best - 3.0).abs() < 1e-9);

        assert_eq!(stats[0].std_dev, 0.0);
    }

    #[test]
    fn test_export_and_report() {
        let dir = scratch_dir("export");
        let mut benchmark = Benchmark::new(quiet_config());
        benchmark.results = vec![result("p", "A", 10.0, 1), result("p", "B", 12.0, 3)];

        let results_path = dir.join("results.csv");
        benchmark.export_to_csv(&results_path).unwrap();
        let mut reader = csv::Reader::from_path(&results_path).unwrap();
        let read: Vec<RunResult> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(read, benchmark.results);

        let stats_path = dir.join("statistics.csv");
        benchmark.export_statistics_csv(&stats_path).unwrap();
        let text = std::fs::read_to_string(&stats_path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("problem,algorithm,runs"));

        let report = benchmark.generate_report();
        assert!(report.contains("p: 10 (A)"));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_history_kept_only_when_requested() {
        let problem = create_test_problem();
        let config = BenchmarkConfig {
            runs: 1,
            algorithms: vec![AlgorithmKind::SimulatedAnnealing, AlgorithmKind::AntColony],
            ..quiet_config()
        };

        let mut without = Benchmark::new(config.clone());
        without.run_problem(&problem);
        assert!(without.results().iter().all(|r| r.best_history.is_empty()));

        let mut with = Benchmark::new(BenchmarkConfig {
            write_history: true,
            ..config
        });
        with.run_problem(&problem);
        let sa = &with.results()[0];
        assert_eq!(sa.best_history.len(), 100);
        assert!(sa.best_history.windows(2).all(|w| w[1] <= w[0]));
        // budget 100 over a colony of 50
        assert_eq!(with.results()[1].best_history.len(), 2);
    }

    #[test]
    fn test_export_history_csv() {
        let dir = scratch_dir("history");
        let mut benchmark = Benchmark::new(quiet_config());
        benchmark.results = vec![
            result("p", "A", 10.0, 1).with_history(vec![12.0, 10.0]),
            result("p", "A", 11.0, 1).with_history(vec![11.0]),
            result("p", "B", 9.0, 1),
        ];

        let path = dir.join("history.csv");
        benchmark.export_history_csv(&path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<HistoryRecord> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();

        let summary: Vec<(usize, usize, f64)> = rows.iter().map(|r| (r.run, r.evaluation, r.best_fitness)).collect();
        assert_eq!(summary, vec![(0, 1, 12.0), (0, 2, 10.0), (1, 1, 11.0)]);
        assert!(rows.iter().all(|r| r.algorithm == "A"));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_max_depth_reaches_lin_kernighan() {
        let problem = create_test_problem();
        // a depth limit of 2 leaves no room for any exchange
        let solver = AlgorithmKind::LinKernighan.solver(50, Some(2));
        let result = solver.solve(&problem, 3);

        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(3);
        let start = crate::tour::Tour::random(&problem, &mut rng);
        assert_eq!(result.best_path, start.path());
        assert_eq!(result.evaluations_until_best, 0);

        let dir = scratch_dir("depth");
        let path = dir.join("bench.json");
        std::fs::write(&path, r#"{ "max_depth": 6, "write_history": true }"#).unwrap();
        let config = BenchmarkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_depth, Some(6));
        assert!(config.write_history);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_load_problems_from_dir() {
        let dir = scratch_dir("load");
        std::fs::write(
            dir.join("big.tsp"),
            "NAME: big\nTYPE: TSP\nDIMENSION: 4\nEDGE_WEIGHT_TYPE: EUC_2D\nNODE_COORD_SECTION\n1 0 0\n2 3 0\n3 3 4\n4 0 4\nEOF\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("small.tsp"),
            "NAME: small\nTYPE: TSP\nDIMENSION: 3\nEDGE_WEIGHT_TYPE: EUC_2D\nNODE_COORD_SECTION\n1 0 0\n2 3 0\n3 3 4\nEOF\n",
        )
        .unwrap();
        std::fs::write(dir.join("broken.tsp"), "NAME: broken\nEOF\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a problem").unwrap();

        let problems = load_problems_from_dir(&dir).unwrap();
        let names: Vec<&str> = problems.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["small", "big"]);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
