// Chord lookup simulation
//
// Usage:
//   chord_sim <bits> <peers> [queries_per_node] [--seed SEED_HEX] [--workers N]
//             [--log-dir DIR] [--csv-dir DIR] [--no-files] [--verbose]

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use chord_sim::chord_sinks::{distribution_path, write_distribution};
use chord_sim::{
    parse_seed_hex, run_id, ChordConfig, ChordCoordinator, ConsoleEventSink, Error,
    FileEventSink, MultiEventSink, OutputConfig, Result,
};

#[derive(Debug, Clone)]
struct CliArgs {
    bits: u32,
    peers: usize,
    queries_per_node: usize,
    seed: Option<[u8; 32]>,
    workers: Option<usize>,
    output: OutputConfig,
    write_files: bool,
    verbose: bool,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <bits> <peers> [queries_per_node=1] [--seed SEED_HEX] [--workers N] \
         [--log-dir DIR] [--csv-dir DIR] [--no-files] [--verbose]",
        program
    )
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| {
            Error::Configuration(format!(
                "{} must be a positive integer, got '{}'",
                name, value
            ))
        })
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut positional = Vec::new();
    let mut seed = None;
    let mut workers = None;
    let mut output = OutputConfig::default();
    let mut write_files = true;
    let mut verbose = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| Error::Configuration(format!("{} needs a value", flag)))
        };

        match arg.as_str() {
            "--seed" => seed = Some(parse_seed_hex(&value("--seed")?)?),
            "--workers" => workers = Some(parse_number("--workers", &value("--workers")?)?),
            "--log-dir" => output.log_dir = PathBuf::from(value("--log-dir")?),
            "--csv-dir" => output.csv_dir = PathBuf::from(value("--csv-dir")?),
            "--no-files" => write_files = false,
            "--verbose" => verbose = true,
            flag if flag.starts_with("--") => {
                return Err(Error::Configuration(format!("unknown option {}", flag)))
            }
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() < 2 || positional.len() > 3 {
        return Err(Error::Configuration(
            "Too few input arguments: <bits> <peers> [queries_per_node]".to_string(),
        ));
    }

    let bits: u32 = parse_number("bits", &positional[0])?;
    let peers: usize = parse_number("peers", &positional[1])?;
    let queries_per_node: usize = match positional.get(2) {
        Some(q) => parse_number("queries_per_node", q)?,
        None => 1,
    };

    if bits == 0 || peers == 0 || queries_per_node == 0 {
        return Err(Error::Configuration(
            "bits, peers and queries_per_node must be positive".to_string(),
        ));
    }

    Ok(CliArgs {
        bits,
        peers,
        queries_per_node,
        seed,
        workers,
        output,
        write_files,
        verbose,
    })
}

fn run(args: CliArgs) -> Result<()> {
    let mut config = ChordConfig::with_bits(args.bits);
    config.seed = args.seed;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    // Run files unless --no-files, console records on top with --verbose
    let mut sinks = MultiEventSink::new();
    if args.write_files {
        sinks.add_sink(Box::new(FileEventSink::new(args.output.clone())));
    }
    if args.verbose {
        sinks.add_sink(Box::new(ConsoleEventSink::new(true)));
    }

    let mut chord = ChordCoordinator::new_with_sink(config, Box::new(sinks))?;
    let bits = chord.space().bits();
    let id = run_id(bits, args.peers);
    info!("seed = {:?}", chord.seed());

    chord.generate_network(args.peers, &id)?;

    info!("Starting simulation");
    let result = chord.simulate(&id, args.queries_per_node)?;

    println!("{}", result.average_hops());
    result.print_summary();

    if args.write_files {
        for (measure, dist) in [
            ("Hops", result.hop_distribution()),
            ("Queries", result.query_distribution()),
        ] {
            let path = distribution_path(
                &args.output,
                bits,
                args.peers,
                args.queries_per_node,
                measure,
            );
            write_distribution(&path, measure, dist)?;
            info!("{} distribution written to {}", measure, path.display());
        }
    }

    info!("Done");
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).init() {
        eprintln!("logger already initialised: {}", e);
    }

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("chord_sim");

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", usage(program));
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
