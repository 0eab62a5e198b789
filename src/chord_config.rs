//! Configuration for the chord simulator

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::chord_error::{Error, Result};
use crate::chord_interface::{DEFAULT_WORKERS, MAX_BITS};

/// Configuration for one coordinator
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChordConfig {
    /// Width of the identifier space; rounded up to a multiple of 4, at most 160
    pub bits: u32,

    /// Finger-table worker threads
    pub workers: usize,

    /// Random seed (None = generate random)
    #[serde(skip)]
    pub seed: Option<[u8; 32]>,
}

impl Default for ChordConfig {
    fn default() -> Self {
        Self {
            bits: MAX_BITS,
            workers: DEFAULT_WORKERS,
            seed: None,
        }
    }
}

impl ChordConfig {
    pub fn with_bits(bits: u32) -> Self {
        Self {
            bits,
            ..Default::default()
        }
    }

    /// Get or generate seed
    pub fn resolve_seed(&self) -> [u8; 32] {
        self.seed.unwrap_or_else(|| {
            let mut temp_rng = StdRng::from_entropy();
            let mut seed = [0u8; 32];
            temp_rng.fill_bytes(&mut seed);
            seed
        })
    }
}

/// Where the file sinks write
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Topology and query logs
    pub log_dir: PathBuf,

    /// Finger edges and distribution tables
    pub csv_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("log"),
            csv_dir: PathBuf::from("csvLog"),
        }
    }
}

/// Run id used to name the log files: `{bits}b_{peers}n`
pub fn run_id(bits: u32, peers: usize) -> String {
    format!("{}b_{}n", bits, peers)
}

/// Parse a hex seed such as `0x1f2e...`; missing trailing bytes are zero.
pub fn parse_seed_hex(hex: &str) -> Result<[u8; 32]> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.is_empty() || hex.len() > 64 || hex.len() % 2 != 0 {
        return Err(Error::Configuration(format!(
            "seed must be 2 to 64 hex digits, got {} digits",
            hex.len()
        )));
    }

    let mut seed = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let byte_str = std::str::from_utf8(chunk)
            .map_err(|e| Error::Configuration(format!("Invalid hex seed: {}", e)))?;
        seed[i] = u8::from_str_radix(byte_str, 16)
            .map_err(|e| Error::Configuration(format!("Invalid hex seed: {}", e)))?;
    }

    Ok(seed)
}
