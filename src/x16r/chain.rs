/// Batched x16 hash chain
///
/// Runs sixteen rounds over N lanes at once. Between rounds every lane's
/// 64-byte digest lives in its own flat buffer; each round packs those into
/// whatever layout the round's primitive wants (per the capability table),
/// calls it, and unpacks the result. Round 0 reads the 80-byte header, every
/// later round reads the previous 64-byte digest.

use std::sync::Arc;

use anyhow::Result;

use super::capability::{CapabilityTable, Convention};
use super::lanes::{deinterleave, interleave, LaneLayout, WordSize};
use super::order::AlgorithmOrder;
use crate::algorithms::{Algorithm, HashContext, HashPrimitive, HashSuite, DIGEST_LEN};
use crate::mining::{BlockHeader, HASH_LEN, HEADER_LEN};

/// Reusable per-algorithm hashing state.
///
/// Only the context of the algorithm being run is live; it is reset at
/// the start of every invocation so nothing carries over between rounds.
struct VectorContext {
    slots: [Option<Box<dyn HashContext>>; Algorithm::COUNT],
}

impl VectorContext {
    fn new() -> Self {
        Self { slots: Default::default() }
    }

    fn activate(
        &mut self,
        algo: Algorithm,
        primitive: &dyn HashPrimitive,
        layout: LaneLayout,
    ) -> &mut dyn HashContext {
        let slot = &mut self.slots[algo.index()];
        if matches!(slot, Some(ctx) if ctx.layout() != layout) {
            *slot = None;
        }
        &mut **slot.get_or_insert_with(|| primitive.new_context(layout))
    }
}

fn invoke(ctx: &mut dyn HashContext, convention: Convention, input: &[u8], len: usize, out: &mut [u8]) {
    match convention {
        Convention::OneShot => ctx.full(input, len, out),
        Convention::Stateful => {
            ctx.init();
            ctx.update(input, len);
            ctx.close(out);
        }
    }
}

/// N-lane chain executor. Owns all of its scratch space; one per worker.
pub struct ChainExecutor<const N: usize> {
    suite: Arc<HashSuite>,
    table: CapabilityTable,
    /// Per-lane buffers: the header before round 0, a digest afterwards
    lanes: [[u8; HEADER_LEN]; N],
    /// Working vector buffers, sized for the widest layout at header length
    vin: Vec<u8>,
    vout: Vec<u8>,
    digest: [u8; DIGEST_LEN],
    contexts: VectorContext,
}

impl<const N: usize> ChainExecutor<N> {
    /// Layout the batched header is stored in
    pub const HEADER_LAYOUT: LaneLayout = LaneLayout::new(N, WordSize::W64);

    pub fn new(suite: Arc<HashSuite>) -> Self {
        Self {
            suite,
            table: CapabilityTable::for_lanes(N),
            lanes: [[0u8; HEADER_LEN]; N],
            vin: vec![0u8; N * HEADER_LEN],
            vout: vec![0u8; N * HEADER_LEN],
            digest: [0u8; DIGEST_LEN],
            contexts: VectorContext::new(),
        }
    }

    /// Executor driven by a custom capability table
    pub fn with_table(suite: Arc<HashSuite>, table: CapabilityTable) -> Result<Self> {
        table.validate(N)?;
        let mut executor = Self::new(suite);
        executor.table = table;
        Ok(executor)
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.table
    }

    /// Hash N headers given in [`Self::HEADER_LAYOUT`] (`N * 80` bytes).
    /// Writes the first 32 bytes of each lane's final digest to `out`.
    pub fn hash(&mut self, vdata: &[u8], order: &AlgorithmOrder, out: &mut [[u8; HASH_LEN]; N]) {
        let header_layout = Self::HEADER_LAYOUT;
        let Self { suite, table, lanes, vin, vout, digest, contexts } = self;

        deinterleave(&mut lanes[..], vdata, header_layout, HEADER_LEN);

        let mut size = HEADER_LEN;
        for (round, algo) in order.iter().enumerate() {
            let cap = table.get(algo);
            let layout = cap.layout;
            let ctx = contexts.activate(algo, suite.get(algo), layout);

            if layout.is_scalar() {
                for lane in lanes.iter_mut() {
                    invoke(ctx, cap.convention, &lane[..size], size, &mut digest[..]);
                    lane[..DIGEST_LEN].copy_from_slice(&digest[..]);
                }
            } else if round == 0 && layout == header_layout {
                // The batched header is already in this primitive's layout
                let out_len = layout.interleaved_len(DIGEST_LEN);
                invoke(ctx, cap.convention, &vdata[..layout.interleaved_len(size)], size, &mut vout[..out_len]);
                deinterleave(&mut lanes[..], &vout[..out_len], layout, DIGEST_LEN);
            } else {
                let in_len = layout.interleaved_len(size);
                let out_len = layout.interleaved_len(DIGEST_LEN);
                for group in lanes.chunks_mut(layout.lanes) {
                    interleave(&mut vin[..in_len], group, layout, size);
                    invoke(ctx, cap.convention, &vin[..in_len], size, &mut vout[..out_len]);
                    deinterleave(group, &vout[..out_len], layout, DIGEST_LEN);
                }
            }
            size = DIGEST_LEN;
        }

        for (slot, lane) in out.iter_mut().zip(lanes.iter()) {
            slot.copy_from_slice(&lane[..HASH_LEN]);
        }
    }

    /// Convenience form taking N separate headers
    pub fn hash_headers(
        &mut self,
        headers: &[BlockHeader; N],
        order: &AlgorithmOrder,
        out: &mut [[u8; HASH_LEN]; N],
    ) {
        let mut vdata = vec![0u8; N * HEADER_LEN];
        let raw: Vec<&[u8; HEADER_LEN]> = headers.iter().map(|h| h.as_bytes()).collect();
        interleave(&mut vdata, &raw, Self::HEADER_LAYOUT, HEADER_LEN);
        self.hash(&vdata, order, out);
    }
}

/// Hash a single header through the chain one primitive call at a time.
/// Slow; used to check the batched executors.
pub fn hash_one(suite: &HashSuite, header: &BlockHeader, order: &AlgorithmOrder) -> [u8; HASH_LEN] {
    let mut digest = suite.get(order.as_slice()[0]).digest(header.as_bytes());
    for algo in order.iter().skip(1) {
        digest = suite.get(algo).digest(&digest);
    }
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest[..HASH_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite() -> Arc<HashSuite> {
        Arc::new(HashSuite::with_stand_ins())
    }

    fn headers<const N: usize>() -> [BlockHeader; N] {
        std::array::from_fn(|lane| {
            let mut bytes = [0u8; HEADER_LEN];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = (i as u8).wrapping_mul(7).wrapping_add(3);
            }
            let mut header = BlockHeader::from_bytes(bytes);
            header.set_nonce(1000 + lane as u32);
            header
        })
    }

    #[test]
    fn test_lanes_match_single_header() {
        let suite = suite();
        let order = AlgorithmOrder::parse("0123456789ABCDEF").unwrap();
        let headers = headers::<8>();

        let mut chain = ChainExecutor::<8>::new(suite.clone());
        let mut out = [[0u8; HASH_LEN]; 8];
        chain.hash_headers(&headers, &order, &mut out);

        for (lane, header) in headers.iter().enumerate() {
            assert_eq!(out[lane], hash_one(&suite, header, &order), "lane {}", lane);
        }
    }

    #[test]
    fn test_repeat_calls_are_deterministic() {
        let order = AlgorithmOrder::parse("DD0E5F13C2B7A469").unwrap();
        let headers = headers::<4>();
        let mut chain = ChainExecutor::<4>::new(suite());

        let mut first = [[0u8; HASH_LEN]; 4];
        let mut second = [[0u8; HASH_LEN]; 4];
        chain.hash_headers(&headers, &order, &mut first);

        // Run a different order in between to dirty every context
        let mut scratch = [[0u8; HASH_LEN]; 4];
        chain.hash_headers(&headers, &AlgorithmOrder::parse("FEDCBA9876543210").unwrap(), &mut scratch);

        chain.hash_headers(&headers, &order, &mut second);
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }

    #[test]
    fn test_round_zero_sensitive_to_whole_header() {
        // Shabal first: round 0 must see all 80 bytes, including the nonce
        let order = AlgorithmOrder::parse("DDDDDDDDDDDDDDDD").unwrap();
        let mut headers = headers::<4>();
        headers[1] = headers[0];
        headers[1].set_nonce(headers[0].nonce() ^ 0x8000_0000);

        let mut chain = ChainExecutor::<4>::new(suite());
        let mut out = [[0u8; HASH_LEN]; 4];
        chain.hash_headers(&headers, &order, &mut out);
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn test_custom_table_is_validated() {
        assert!(ChainExecutor::<4>::with_table(suite(), CapabilityTable::for_lanes(8)).is_err());
        let chain = ChainExecutor::<4>::with_table(suite(), CapabilityTable::scalar(4)).unwrap();
        assert_eq!(chain.table().lanes(), 4);
        assert!(chain.table().get(Algorithm::Blake).layout.is_scalar());
    }
}
