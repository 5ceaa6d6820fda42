/// Mining backend abstraction layer
/// Lets the runner drive any lane width through one interface

use anyhow::{bail, Result};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use crate::algorithms::HashSuite;
use crate::mining::WorkItem;
use crate::x16r::{OrderDerivation, ScanConfig, Scanner, ShareSink, StopReason};

/// Result of a mining attempt
#[derive(Clone, Debug)]
pub struct MiningResult {
    pub found_share: bool,
    pub shares: u32,
    pub next_nonce: u32,
    pub hashes_computed: u64,
    pub elapsed_ms: u64,
    pub stop: StopReason,
}

/// Description of the compute resource behind a backend
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub name: String,
    pub lanes: usize,
    /// Algorithms running on stand-ins instead of the real primitive
    pub stand_ins: Vec<String>,
}

/// Mining backend trait - abstract interface for CPU scanners
pub trait MiningBackend: Send {
    /// Get the algorithm name (e.g., "x16r", "x16s")
    fn algorithm_name(&self) -> &str;

    /// Nonces hashed per chain invocation
    fn lanes(&self) -> usize;

    fn device_info(&self) -> DeviceInfo;

    /// Scan `work` from its start nonce up to `max_nonce`
    ///
    /// # Arguments
    /// * `work` - Header, target and starting nonce
    /// * `max_nonce` - End of this call's nonce range
    /// * `restart` - Checked once per batch; set it to abandon the job
    /// * `sink` - Receives shares as they are found
    fn mine_job(
        &mut self,
        work: &WorkItem,
        max_nonce: u32,
        restart: &AtomicBool,
        sink: &dyn ShareSink,
    ) -> Result<MiningResult>;
}

/// Scanner plus the bits of context a backend reports
pub struct CpuBackend<const N: usize> {
    scanner: Scanner<N>,
    algorithm: String,
    stand_ins: Vec<String>,
}

impl<const N: usize> CpuBackend<N> {
    pub fn new(suite: Arc<HashSuite>, derivation: Box<dyn OrderDerivation>, config: ScanConfig) -> Self {
        let algorithm = derivation.name().to_string();
        let stand_ins = suite.stand_ins().iter().map(|a| a.name().to_string()).collect();
        Self {
            scanner: Scanner::new(suite, derivation, config),
            algorithm,
            stand_ins,
        }
    }
}

impl<const N: usize> MiningBackend for CpuBackend<N> {
    fn algorithm_name(&self) -> &str {
        &self.algorithm
    }

    fn lanes(&self) -> usize {
        N
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("cpu {}-way", N),
            lanes: N,
            stand_ins: self.stand_ins.clone(),
        }
    }

    fn mine_job(
        &mut self,
        work: &WorkItem,
        max_nonce: u32,
        restart: &AtomicBool,
        sink: &dyn ShareSink,
    ) -> Result<MiningResult> {
        let start = Instant::now();
        let outcome = self.scanner.scan(work, max_nonce, restart, sink)?;
        Ok(MiningResult {
            found_share: outcome.shares > 0,
            shares: outcome.shares,
            next_nonce: outcome.next_nonce,
            hashes_computed: outcome.hashes_done,
            elapsed_ms: start.elapsed().as_millis() as u64,
            stop: outcome.stop,
        })
    }
}

/// Create a backend for the requested lane width
pub fn create_backend(
    lanes: usize,
    suite: Arc<HashSuite>,
    derivation: Box<dyn OrderDerivation>,
    config: ScanConfig,
) -> Result<Box<dyn MiningBackend>> {
    match lanes {
        8 => Ok(Box::new(CpuBackend::<8>::new(suite, derivation, config))),
        4 => Ok(Box::new(CpuBackend::<4>::new(suite, derivation, config))),
        n => bail!("Unsupported lane count: {}. Supported: 4, 8", n),
    }
}
