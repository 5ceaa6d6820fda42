/// Batch nonce search
///
/// `INIT -> LOOP -> (SHARE_FOUND | EXHAUSTED | CANCELLED)`
///
/// Each iteration writes N consecutive nonces into the batched header, runs
/// the chain once and checks every lane against the target. The restart flag
/// is only looked at between batches, so a batch that has started is always
/// finished and its shares reported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::chain::ChainExecutor;
use super::lanes::{interleave, scatter_lane};
use super::order::{OrderCache, OrderDerivation};
use crate::algorithms::HashSuite;
use crate::mining::{Target, WorkItem, HASH_LEN, HEADER_LEN, NONCE_WORD};

/// Scanner behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanConfig {
    /// Use [`Target::BENCHMARK`] and never submit
    pub benchmark: bool,
    /// Return after the batch that produced the first share
    pub stop_on_share: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Reached the end of the nonce range
    Exhausted,
    /// Restart flag observed
    Cancelled,
    /// A share was reported and `stop_on_share` is set
    ShareFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub hashes_done: u64,
    pub shares: u32,
    /// First nonce not yet tried
    pub next_nonce: u32,
    pub stop: StopReason,
}

/// A lane whose hash met the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    pub lane: usize,
    pub nonce: u32,
    pub hash: [u8; HASH_LEN],
}

/// Receives shares; called from mining threads
pub trait ShareSink: Sync {
    fn submit(&self, work: &WorkItem, share: Share);
}

/// Drops everything, for benchmarks
pub struct NullSink;

impl ShareSink for NullSink {
    fn submit(&self, _work: &WorkItem, _share: Share) {}
}

/// Per-thread nonce scanner: a chain executor plus its own order cache
pub struct Scanner<const N: usize> {
    chain: ChainExecutor<N>,
    cache: OrderCache,
    config: ScanConfig,
    vdata: Vec<u8>,
    hashes: [[u8; HASH_LEN]; N],
}

impl<const N: usize> Scanner<N> {
    pub fn new(suite: Arc<HashSuite>, derivation: Box<dyn OrderDerivation>, config: ScanConfig) -> Self {
        Self::with_chain(ChainExecutor::new(suite), OrderCache::new(derivation), config)
    }

    pub fn with_chain(chain: ChainExecutor<N>, cache: OrderCache, config: ScanConfig) -> Self {
        Self {
            chain,
            cache,
            config,
            vdata: vec![0u8; N * HEADER_LEN],
            hashes: [[0u8; HASH_LEN]; N],
        }
    }

    pub fn order_cache(&self) -> &OrderCache {
        &self.cache
    }

    /// Scan nonces from `work.start_nonce` until `max_nonce - N`, the restart
    /// flag, or (if configured) the first share.
    ///
    /// At least one batch is hashed, unless a batch at `start_nonce` would
    /// run past `u32::MAX`.
    pub fn scan(
        &mut self,
        work: &WorkItem,
        max_nonce: u32,
        restart: &AtomicBool,
        sink: &dyn ShareSink,
    ) -> Result<ScanOutcome> {
        let target = if self.config.benchmark { Target::BENCHMARK } else { work.target };
        let order = self
            .cache
            .resolve(&work.header)
            .with_context(|| format!("job {}: unusable algorithm order", work.job_id))?;

        let layout = ChainExecutor::<N>::HEADER_LAYOUT;
        let copies = [work.header.as_bytes(); N];
        interleave(&mut self.vdata, &copies, layout, HEADER_LEN);

        let first_nonce = work.start_nonce;
        let last_nonce = max_nonce.saturating_sub(N as u32);
        let mut n = first_nonce;
        let mut hashes_done = 0u64;
        let mut shares = 0u32;

        // Highest batch start whose lanes all fit below u32::MAX
        let top = u32::MAX - (N as u32 - 1);

        let stop = loop {
            if n > top {
                break StopReason::Exhausted;
            }
            for lane in 0..N {
                let nonce = n + lane as u32;
                scatter_lane(&mut self.vdata, layout, lane, NONCE_WORD * 4, &nonce.to_le_bytes());
            }

            self.chain.hash(&self.vdata, &order, &mut self.hashes);
            hashes_done += N as u64;

            let mut batch_shares = 0u32;
            for (lane, hash) in self.hashes.iter().enumerate() {
                if target.passes_coarse(hash) && target.is_met_by(hash) && !self.config.benchmark {
                    let share = Share { lane, nonce: n + lane as u32, hash: *hash };
                    tracing::debug!("job {} lane {} nonce {:08x} meets target", work.job_id, lane, share.nonce);
                    sink.submit(work, share);
                    batch_shares += 1;
                }
            }
            shares += batch_shares;

            let Some(next) = n.checked_add(N as u32) else {
                break StopReason::Exhausted;
            };
            n = next;

            if batch_shares > 0 && self.config.stop_on_share {
                break StopReason::ShareFound;
            }
            if restart.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if n >= last_nonce {
                break StopReason::Exhausted;
            }
        };

        Ok(ScanOutcome { hashes_done, shares, next_nonce: n, stop })
    }
}
