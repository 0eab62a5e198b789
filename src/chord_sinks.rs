//! Various event sinks for different use cases

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::info;

use crate::chord_config::OutputConfig;
use crate::chord_error::Result;
use crate::chord_interface::{format_ids, Event, EventSink, NodeDescriptor, QueryRecord};
use crate::chord_stats::Distribution;

fn topology_line(node: &NodeDescriptor) -> String {
    format!(
        "Node\t{}\tPredecessor\t{}\tSuccessor\t{}\tFingerSize\t{}\tFingers\t{}",
        node.id,
        node.predecessor,
        node.successor,
        node.fingers.len(),
        format_ids(&node.fingers)
    )
}

fn query_line(query: &QueryRecord) -> String {
    format!(
        "Peer\t{}\tquery\t{}\tholder\t{}\tnodes\t{}\thops\t{}",
        query.peer,
        query.key,
        query.holder,
        format_ids(&query.path),
        query.hops
    )
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

// ============================================================================
// File Sink
// ============================================================================

/// Writes the topology log, the finger-edge CSV and the query log.
///
/// Files per run:
/// - `{log_dir}/topology{run_id}.log`
/// - `{csv_dir}/{run_id}.csv`
/// - `{log_dir}/simulation{rounds}q_{run_id}.log`
///
/// Every record is flushed as it is written, so a failed run keeps the
/// records produced before the failure.
pub struct FileEventSink {
    output: OutputConfig,
    topology: Option<BufWriter<File>>,
    edges: Option<BufWriter<File>>,
    queries: Option<BufWriter<File>>,
}

impl FileEventSink {
    pub fn new(output: OutputConfig) -> Self {
        Self {
            output,
            topology: None,
            edges: None,
            queries: None,
        }
    }

    pub fn topology_path(&self, run_id: &str) -> PathBuf {
        self.output.log_dir.join(format!("topology{}.log", run_id))
    }

    pub fn edges_path(&self, run_id: &str) -> PathBuf {
        self.output.csv_dir.join(format!("{}.csv", run_id))
    }

    pub fn queries_path(&self, run_id: &str, rounds: usize) -> PathBuf {
        self.output
            .log_dir
            .join(format!("simulation{}q_{}.log", rounds, run_id))
    }

    fn write_line(writer: &mut Option<BufWriter<File>>, line: &str) -> Result<()> {
        if let Some(writer) = writer {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        Ok(())
    }

    fn close(writer: &mut Option<BufWriter<File>>) -> Result<()> {
        if let Some(mut writer) = writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl EventSink for FileEventSink {
    fn log(&mut self, event: Event) -> Result<()> {
        match event {
            Event::GenerationStarted { run_id, .. } => {
                self.topology = Some(create(&self.topology_path(&run_id))?);
                self.edges = Some(create(&self.edges_path(&run_id))?);
            }
            Event::FingerDiscovered(edge) => {
                Self::write_line(&mut self.edges, &format!("{},{}", edge.source, edge.finger))?;
            }
            Event::NodeDescribed(node) => {
                Self::write_line(&mut self.topology, &topology_line(&node))?;
            }
            Event::GenerationFinished { .. } => {
                Self::close(&mut self.topology)?;
                Self::close(&mut self.edges)?;
            }
            Event::SimulationStarted { run_id, rounds } => {
                self.queries = Some(create(&self.queries_path(&run_id, rounds))?);
            }
            Event::QueryResolved(query) => {
                Self::write_line(&mut self.queries, &query_line(&query))?;
            }
            Event::SimulationFinished { .. } => {
                Self::close(&mut self.queries)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Console Logging Sink
// ============================================================================

/// Logging event sink that outputs records through the `log` facade
pub struct ConsoleEventSink {
    enabled: bool,
}

impl ConsoleEventSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl EventSink for ConsoleEventSink {
    fn log(&mut self, event: Event) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        match event {
            Event::GenerationStarted { run_id, bits, peers } => {
                info!("[{}] generating {} peers on {} bits", run_id, peers, bits)
            }
            Event::FingerDiscovered(edge) => info!("finger {} -> {}", edge.source, edge.finger),
            Event::NodeDescribed(node) => info!("{}", topology_line(&node)),
            Event::GenerationFinished { run_id } => info!("[{}] network ready", run_id),
            Event::SimulationStarted { run_id, rounds } => {
                info!("[{}] simulating {} queries per node", run_id, rounds)
            }
            Event::QueryResolved(query) => info!("{}", query_line(&query)),
            Event::SimulationFinished { run_id } => info!("[{}] simulation done", run_id),
        }
        Ok(())
    }
}

// ============================================================================
// Multi Sink (Combine Multiple Sinks)
// ============================================================================

/// Combines multiple event sinks; the first failing sink stops the fan-out
#[derive(Default)]
pub struct MultiEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl MultiEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for MultiEventSink {
    fn log(&mut self, event: Event) -> Result<()> {
        for sink in &mut self.sinks {
            sink.log(event.clone())?;
        }
        Ok(())
    }
}

// ============================================================================
// Recording Sink
// ============================================================================

/// Keeps every event in memory; clones share the same buffer
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for RecordingSink {
    fn log(&mut self, event: Event) -> Result<()> {
        self.events.borrow_mut().push(event);
        Ok(())
    }
}

// ============================================================================
// Distribution Tables
// ============================================================================

/// Write `dist` as a two-column CSV with header `{measure},Occ`.
pub fn write_distribution(path: &Path, measure: &str, dist: &Distribution) -> Result<()> {
    let mut writer = create(path)?;
    writeln!(writer, "{},Occ", measure)?;
    for (value, occurrences) in dist {
        writeln!(writer, "{},{}", value, occurrences)?;
    }
    writer.flush()?;
    Ok(())
}

/// Path of a distribution table:
/// `{csv_dir}/Occ/b{bits}_n{peers}_q{queries}_{measure}_queries_distribution.csv`
pub fn distribution_path(
    output: &OutputConfig,
    bits: u32,
    peers: usize,
    queries_per_node: usize,
    measure: &str,
) -> PathBuf {
    output.csv_dir.join("Occ").join(format!(
        "b{}_n{}_q{}_{}_queries_distribution.csv",
        bits, peers, queries_per_node, measure
    ))
}
