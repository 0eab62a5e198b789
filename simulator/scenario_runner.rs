// Scenario Runner - Load and execute scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/sweep_32b.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/sweep_32b.yaml --seed 0x1234...

use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use log::{error, info};
use simple_logger::SimpleLogger;

use chord_sim::chord_sinks::{distribution_path, write_distribution};
use chord_sim::{
    parse_seed_hex, run_id, ChordConfig, ChordCoordinator, Error, EventSink, FileEventSink,
    NoOpSink, OutputConfig, Result,
};

/// Scenario file format
#[derive(Debug, serde::Deserialize)]
struct ScenarioFile {
    /// Scenario metadata
    #[serde(default)]
    meta: ScenarioMeta,

    config: ScenarioConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScenarioMeta {
    name: Option<String>,
    description: Option<String>,
    hypothesis: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ScenarioConfig {
    // Ring settings (bits, workers)
    #[serde(flatten)]
    chord: ChordConfig,

    /// One network per entry, simulated in order
    peer_counts: Vec<usize>,

    #[serde(default = "default_queries_per_node")]
    queries_per_node: usize,

    /// Write run logs and distribution tables
    #[serde(default)]
    write_files: bool,

    // Run file locations (log_dir, csv_dir)
    #[serde(flatten)]
    output: OutputConfig,
}

fn default_queries_per_node() -> usize {
    1
}

/// One row of the sweep table
struct SweepRow {
    peers: usize,
    average_hops: f64,
    max_hops: usize,
}

fn main() -> ExitCode {
    if let Err(e) = SimpleLogger::new().with_level(log::LevelFilter::Warn).init() {
        eprintln!("logger already initialised: {}", e);
    }

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/sweep_32b.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/sweep_32b.yaml --seed 0x123456...", args[0]);
        return ExitCode::FAILURE;
    }

    let path = Path::new(&args[1]);

    // Parse optional seed
    let seed = if args.len() >= 4 && args[2] == "--seed" {
        match parse_seed_hex(&args[3]) {
            Ok(seed) => Some(seed),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let outcome = if path.is_file() {
        run_scenario_file(path, seed)
    } else if path.is_dir() {
        run_scenario_directory(path, seed)
    } else {
        Err(Error::Configuration(format!(
            "Path does not exist: {}",
            path.display()
        )))
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_scenario_directory(dir: &Path, seed: Option<[u8; 32]>) -> Result<()> {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        ) {
            scenarios.push(path);
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        return Err(Error::Configuration(format!(
            "No .yaml files found in {}",
            dir.display()
        )));
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Scenarios                 ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        run_scenario_file(scenario_path, seed)?;
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete!                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    Ok(())
}

fn load_scenario(path: &Path) -> Result<ScenarioFile> {
    let yaml_content = fs::read_to_string(path)?;
    let scenario: ScenarioFile = serde_yaml::from_str(&yaml_content)?;

    if scenario.config.peer_counts.is_empty() {
        return Err(Error::Configuration(format!(
            "{} lists no peer_counts",
            path.display()
        )));
    }
    Ok(scenario)
}

fn run_scenario_file(path: &Path, seed: Option<[u8; 32]>) -> Result<()> {
    println!("Loading scenario from: {}", path.display());
    let scenario = load_scenario(path)?;

    // Print scenario header
    println!("\n╔════════════════════════════════════════════════════════╗");
    match scenario.meta.name {
        Some(ref name) => println!("║  {}", name),
        None => println!("║  Scenario: {}", path.display()),
    }
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    let config = scenario.config;
    let mut chord_config = config.chord.clone();
    chord_config.seed = seed;

    let sink: Box<dyn EventSink> = if config.write_files {
        Box::new(FileEventSink::new(config.output.clone()))
    } else {
        Box::new(NoOpSink)
    };
    let mut chord = ChordCoordinator::new_with_sink(chord_config, sink)?;
    let bits = chord.space().bits();

    println!("Configuration:");
    println!("  Bits: {}", bits);
    println!("  Workers: {}", config.chord.workers);
    println!("  Peer counts: {:?}", config.peer_counts);
    println!("  Queries per node: {}", config.queries_per_node);
    println!("  Seed: {:?}", chord.seed());
    println!("\nStarting sweep...\n");

    let mut rows = Vec::with_capacity(config.peer_counts.len());
    for &peers in &config.peer_counts {
        let id = run_id(bits, peers);
        info!("running {}", id);

        chord.generate_network(peers, &id)?;
        let result = chord.simulate(&id, config.queries_per_node)?;

        if config.write_files {
            for (measure, dist) in [
                ("Hops", result.hop_distribution()),
                ("Queries", result.query_distribution()),
            ] {
                let path =
                    distribution_path(&config.output, bits, peers, config.queries_per_node, measure);
                write_distribution(&path, measure, dist)?;
            }
        }

        rows.push(SweepRow {
            peers,
            average_hops: result.average_hops(),
            max_hops: result.hop_distribution().max_value().unwrap_or(0),
        });
    }

    print_sweep(&rows);
    println!("\n✓ Scenario complete!\n");
    Ok(())
}

fn print_sweep(rows: &[SweepRow]) {
    println!(
        "{:>10} {:>12} {:>10} {:>10} {:>14}",
        "Peers", "Avg hops", "Max hops", "log2(n)", "0.5 * log2(n)"
    );
    println!("{}", "-".repeat(60));
    for row in rows {
        let log_n = (row.peers as f64).log2();
        println!(
            "{:>10} {:>12.4} {:>10} {:>10.4} {:>14.4}",
            row.peers,
            row.average_hops,
            row.max_hops,
            log_n,
            0.5 * log_n
        );
    }
}
