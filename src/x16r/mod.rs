//! Vectorized x16r hash chain: order cache, lane layouts, capability table,
//! chain executor and the nonce scanner that drives them.

pub mod capability;
pub mod chain;
pub mod lanes;
pub mod order;
pub mod scan;

pub use capability::{Capability, CapabilityTable, Convention};
pub use chain::{hash_one, ChainExecutor};
pub use lanes::{LaneLayout, WordSize};
pub use order::{AlgorithmOrder, OrderCache, OrderDerivation, OrderError, X16rOrder, X16sOrder};
pub use scan::{NullSink, ScanConfig, ScanOutcome, Scanner, Share, ShareSink, StopReason};

/// Chain over eight lanes
pub type X16r8Way = ChainExecutor<8>;

/// Chain over four lanes
pub type X16r4Way = ChainExecutor<4>;
