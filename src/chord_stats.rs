//! Statistics and results for the lookup simulation

use std::collections::btree_map::Iter;
use std::collections::BTreeMap;

/// Frequency table: observed value -> number of occurrences
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Distribution {
    counts: BTreeMap<usize, usize>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: usize) {
        *self.counts.entry(value).or_insert(0) += 1;
    }

    /// Occurrences of `value` (0 if never seen)
    pub fn get(&self, value: usize) -> usize {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> Iter<'_, usize, usize> {
        self.counts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of recorded samples
    pub fn occurrences(&self) -> usize {
        self.counts.values().sum()
    }

    /// Sum of every sample, `sum(value * occurrences)`
    pub fn weighted_sum(&self) -> usize {
        self.counts.iter().map(|(value, count)| value * count).sum()
    }

    pub fn max_value(&self) -> Option<usize> {
        self.counts.keys().next_back().copied()
    }
}

impl<'a> IntoIterator for &'a Distribution {
    type Item = (&'a usize, &'a usize);
    type IntoIter = Iter<'a, usize, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

/// Outcome of one `simulate` call
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    average_hops: f64,
    hop_distribution: Distribution,
    query_distribution: Distribution,
}

impl SimulationResult {
    pub fn new(
        average_hops: f64,
        hop_distribution: Distribution,
        query_distribution: Distribution,
    ) -> Self {
        Self {
            average_hops,
            hop_distribution,
            query_distribution,
        }
    }

    pub fn average_hops(&self) -> f64 {
        self.average_hops
    }

    /// Hop count -> number of queries resolved in that many hops
    pub fn hop_distribution(&self) -> &Distribution {
        &self.hop_distribution
    }

    /// Queries received -> number of nodes that received that many
    pub fn query_distribution(&self) -> &Distribution {
        &self.query_distribution
    }

    pub fn total_queries(&self) -> usize {
        self.hop_distribution.occurrences()
    }

    /// Print a summary of the simulation results
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Chord Lookup Simulation Results                 ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Queries: {}", self.total_queries());
        println!("Average hops: {:.4}", self.average_hops);
        if let Some(max) = self.hop_distribution.max_value() {
            println!("Longest path: {} hops", max);
        }
        println!();

        println!("Hop distribution:");
        for (hops, count) in &self.hop_distribution {
            println!("  {:>4} hops: {}", hops, count);
        }
        println!();

        println!("Load distribution (queries received -> nodes):");
        for (queries, nodes) in &self.query_distribution {
            println!("  {:>4}: {}", queries, nodes);
        }
        println!();
    }
}
