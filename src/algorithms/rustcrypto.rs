/// Adapter from RustCrypto `digest` hashes to [`HashPrimitive`]
///
/// Batched contexts keep one hasher per lane. Input is gathered out of the
/// interleaved buffer lane by lane and the digests are scattered back in the
/// same layout, so a context created for `8x64` consumes and produces exactly
/// what an 8-way SIMD implementation would.

use std::marker::PhantomData;

use digest::consts::U64;
use digest::{Digest, OutputSizeUser};

use super::{Algorithm, HashContext, HashPrimitive, DIGEST_LEN};
use crate::x16r::lanes::{gather_lane, scatter_lane, LaneLayout};

/// Largest per-lane message the chain feeds a primitive (the block header)
const MAX_LANE_INPUT: usize = 80;

/// Any 512-bit `digest` hash bound to an x16 algorithm slot
pub struct DigestPrimitive<D> {
    algorithm: Algorithm,
    /// Bytes absorbed before the message on every init
    prefix: &'static [u8],
    stand_in: bool,
    _hash: PhantomData<fn() -> D>,
}

impl<D> DigestPrimitive<D>
where
    D: Digest + OutputSizeUser<OutputSize = U64> + Send + 'static,
{
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            prefix: &[],
            stand_in: false,
            _hash: PhantomData,
        }
    }

    /// Same hash, keyed with a fixed prefix. Only used for stand-ins.
    pub(crate) fn stand_in(algorithm: Algorithm, prefix: &'static [u8]) -> Self {
        Self {
            algorithm,
            prefix,
            stand_in: true,
            _hash: PhantomData,
        }
    }
}

impl<D> HashPrimitive for DigestPrimitive<D>
where
    D: Digest + OutputSizeUser<OutputSize = U64> + Send + 'static,
{
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn is_stand_in(&self) -> bool {
        self.stand_in
    }

    fn new_context(&self, layout: LaneLayout) -> Box<dyn HashContext> {
        Box::new(DigestContext::<D>::new(layout, self.prefix))
    }
}

/// Per-lane hasher state behind a lane layout
pub struct DigestContext<D> {
    layout: LaneLayout,
    prefix: &'static [u8],
    states: Vec<D>,
    scratch: [u8; MAX_LANE_INPUT],
}

impl<D> DigestContext<D>
where
    D: Digest + OutputSizeUser<OutputSize = U64> + Send,
{
    pub fn new(layout: LaneLayout, prefix: &'static [u8]) -> Self {
        let mut ctx = Self {
            layout,
            prefix,
            states: (0..layout.lanes).map(|_| D::new()).collect(),
            scratch: [0u8; MAX_LANE_INPUT],
        };
        ctx.init();
        ctx
    }
}

impl<D> HashContext for DigestContext<D>
where
    D: Digest + OutputSizeUser<OutputSize = U64> + Send,
{
    fn layout(&self) -> LaneLayout {
        self.layout
    }

    fn init(&mut self) {
        for state in self.states.iter_mut() {
            *state = D::new();
            if !self.prefix.is_empty() {
                state.update(self.prefix);
            }
        }
    }

    fn update(&mut self, data: &[u8], len: usize) {
        if self.layout.is_scalar() {
            self.states[0].update(&data[..len]);
            return;
        }

        // Feed in word-aligned pieces so lane lengths above the scratch size still work
        let piece = MAX_LANE_INPUT - MAX_LANE_INPUT % self.layout.word.bytes();
        let mut done = 0;
        while done < len {
            let take = piece.min(len - done);
            let window = &data[self.layout.interleaved_len(done)..];
            for (lane, state) in self.states.iter_mut().enumerate() {
                gather_lane(window, self.layout, lane, &mut self.scratch[..take]);
                state.update(&self.scratch[..take]);
            }
            done += take;
        }
    }

    fn close(&mut self, out: &mut [u8]) {
        for (lane, state) in self.states.iter_mut().enumerate() {
            let digest = std::mem::replace(state, D::new()).finalize();
            scatter_lane(out, self.layout, lane, 0, digest.as_slice());
        }
        debug_assert!(out.len() >= self.layout.interleaved_len(DIGEST_LEN));
    }
}

pub fn groestl512() -> DigestPrimitive<groestl::Groestl512> {
    DigestPrimitive::new(Algorithm::Groestl)
}

pub fn skein512() -> DigestPrimitive<skein::Skein512<U64>> {
    DigestPrimitive::new(Algorithm::Skein)
}

pub fn jh512() -> DigestPrimitive<jh::Jh512> {
    DigestPrimitive::new(Algorithm::Jh)
}

pub fn keccak512() -> DigestPrimitive<sha3::Keccak512> {
    DigestPrimitive::new(Algorithm::Keccak)
}

pub fn shabal512() -> DigestPrimitive<shabal::Shabal512> {
    DigestPrimitive::new(Algorithm::Shabal)
}

pub fn whirlpool() -> DigestPrimitive<whirlpool::Whirlpool> {
    DigestPrimitive::new(Algorithm::Whirlpool)
}

pub fn sha512() -> DigestPrimitive<sha2::Sha512> {
    DigestPrimitive::new(Algorithm::Sha512)
}

/// Every primitive this crate ships a real implementation for
pub fn available() -> Vec<Box<dyn HashPrimitive>> {
    vec![
        Box::new(groestl512()),
        Box::new(skein512()),
        Box::new(jh512()),
        Box::new(keccak512()),
        Box::new(shabal512()),
        Box::new(whirlpool()),
        Box::new(sha512()),
    ]
}
