/// Placeholder primitives for algorithms without a registry implementation
///
/// A stand-in is SHA-512 keyed with the algorithm's name, so every slot still
/// produces a distinct 512-bit function and the chain does the same amount of
/// data movement. Digests computed with stand-ins are NOT valid x16r
/// proof-of-work; they exist for benchmarking the chain and for tests.

use super::rustcrypto::DigestPrimitive;
use super::{Algorithm, HashContext, HashPrimitive};
use crate::x16r::lanes::LaneLayout;

pub struct StandIn {
    inner: DigestPrimitive<sha2::Sha512>,
}

impl StandIn {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            inner: DigestPrimitive::stand_in(algorithm, algorithm.name().as_bytes()),
        }
    }
}

impl HashPrimitive for StandIn {
    fn algorithm(&self) -> Algorithm {
        self.inner.algorithm()
    }

    fn is_stand_in(&self) -> bool {
        true
    }

    fn new_context(&self, layout: LaneLayout) -> Box<dyn HashContext> {
        self.inner.new_context(layout)
    }
}
