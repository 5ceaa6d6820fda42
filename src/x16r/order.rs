/// Algorithm order derivation and caching
///
/// The order of the sixteen rounds is a function of the previous block hash,
/// so it only changes when the job changes. Deriving it per nonce would be
/// wasted work; [`OrderCache`] re-derives only when the header's time field
/// differs from the cached one. Each scanner owns its own cache, so workers
/// on different jobs never see each other's order.

use std::fmt;
use std::str::FromStr;

use crate::algorithms::Algorithm;
use crate::mining::BlockHeader;

pub const ORDER_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("algorithm order must be 16 characters, got {0:?}")]
    Length(String),

    #[error("invalid algorithm digit {digit:?} at position {position} in {order:?}")]
    Digit { order: String, position: usize, digit: char },
}

/// Sequence of sixteen algorithms, one per round. Repeats are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlgorithmOrder([Algorithm; ORDER_LEN]);

impl AlgorithmOrder {
    pub const fn new(rounds: [Algorithm; ORDER_LEN]) -> Self {
        Self(rounds)
    }

    /// Parse an order string such as `"0123456789ABCDEF"`
    pub fn parse(s: &str) -> Result<Self, OrderError> {
        if s.chars().count() != ORDER_LEN {
            return Err(OrderError::Length(s.to_string()));
        }
        let mut rounds = [Algorithm::Blake; ORDER_LEN];
        for (position, (slot, digit)) in rounds.iter_mut().zip(s.chars()).enumerate() {
            *slot = Algorithm::from_hex_char(digit).ok_or_else(|| OrderError::Digit {
                order: s.to_string(),
                position,
                digit,
            })?;
        }
        Ok(Self(rounds))
    }

    pub fn iter(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Algorithm] {
        &self.0
    }
}

impl FromStr for AlgorithmOrder {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AlgorithmOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|a| write!(f, "{}", a.hex_char()))
    }
}

/// Maps the 8-byte order seed taken from the header to an order string
pub trait OrderDerivation: Send {
    fn name(&self) -> &str;

    fn derive(&self, seed: &[u8; 8]) -> String;
}

/// Nibble `round` of the seed, reading the 8 bytes back to front
fn seed_nibble(seed: &[u8; 8], round: usize) -> u8 {
    let byte = seed[(15 - round) >> 1];
    if round & 1 == 1 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}

/// x16r: one seed nibble per round, repeats allowed
#[derive(Debug, Clone, Copy, Default)]
pub struct X16rOrder;

impl OrderDerivation for X16rOrder {
    fn name(&self) -> &str {
        "x16r"
    }

    fn derive(&self, seed: &[u8; 8]) -> String {
        (0..ORDER_LEN)
            .map(|round| Algorithm::ALL[seed_nibble(seed, round) as usize].hex_char())
            .collect()
    }
}

/// x16s: the seed nibbles shuffle the identity order, so every algorithm runs exactly once
#[derive(Debug, Clone, Copy, Default)]
pub struct X16sOrder;

impl OrderDerivation for X16sOrder {
    fn name(&self) -> &str {
        "x16s"
    }

    fn derive(&self, seed: &[u8; 8]) -> String {
        let mut order: Vec<char> = Algorithm::ALL.iter().map(|a| a.hex_char()).collect();
        for round in 0..ORDER_LEN {
            // Move the selected entry to the front
            let pick = seed_nibble(seed, round) as usize;
            order[..=pick].rotate_right(1);
        }
        order.into_iter().collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedOrder {
    ntime: u32,
    order: AlgorithmOrder,
}

/// Per-worker cache of the current algorithm order, keyed by header time
pub struct OrderCache {
    derivation: Box<dyn OrderDerivation>,
    entry: Option<CachedOrder>,
    derivations: u64,
}

impl OrderCache {
    pub fn new(derivation: Box<dyn OrderDerivation>) -> Self {
        Self {
            derivation,
            entry: None,
            derivations: 0,
        }
    }

    /// Order for `header`, deriving it only if the time field changed.
    ///
    /// A derivation that yields an invalid order string is an error and
    /// leaves the previous entry in place.
    pub fn resolve(&mut self, header: &BlockHeader) -> Result<AlgorithmOrder, OrderError> {
        let ntime = header.time();
        if let Some(entry) = self.entry.filter(|e| e.ntime == ntime) {
            return Ok(entry.order);
        }

        let raw = self.derivation.derive(&header.order_seed());
        self.derivations += 1;
        let order = AlgorithmOrder::parse(&raw)?;
        self.entry = Some(CachedOrder { ntime, order });

        tracing::debug!("{} hash order {} ({:08x})", self.derivation.name(), order, ntime);
        Ok(order)
    }

    /// Number of times the derivation has been invoked
    pub fn derivations(&self) -> u64 {
        self.derivations
    }

    pub fn cached(&self) -> Option<(u32, AlgorithmOrder)> {
        self.entry.map(|e| (e.ntime, e.order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Fixed(&'static str, Arc<AtomicUsize>);

    impl OrderDerivation for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn derive(&self, _seed: &[u8; 8]) -> String {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0.to_string()
        }
    }

    fn header_with_time(ntime: u32) -> BlockHeader {
        let mut header = BlockHeader::default();
        header.set_time(ntime);
        header
    }

    #[test]
    fn test_parse_and_display() {
        let order = AlgorithmOrder::parse("0123456789ABCDEF").unwrap();
        assert_eq!(order.as_slice(), &Algorithm::ALL);
        assert_eq!(order.to_string(), "0123456789ABCDEF");

        let lower: AlgorithmOrder = "fedcba9876543210".parse().unwrap();
        assert_eq!(lower.to_string(), "FEDCBA9876543210");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(AlgorithmOrder::parse("0123"), Err(OrderError::Length(_))));
        assert!(matches!(
            AlgorithmOrder::parse("0123456789ABCDEG"),
            Err(OrderError::Digit { position: 15, digit: 'G', .. })
        ));
    }

    #[test]
    fn test_x16r_nibbles() {
        let seed = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        assert_eq!(X16rOrder.derive(&seed), "EFCDAB8967452301");
        assert_eq!(X16rOrder.derive(&[0u8; 8]), "0000000000000000");
    }

    #[test]
    fn test_x16s_is_permutation() {
        assert_eq!(X16sOrder.derive(&[0u8; 8]), "0123456789ABCDEF");

        let seed = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        let order = X16sOrder.derive(&seed);
        let mut sorted: Vec<char> = order.chars().collect();
        sorted.sort_unstable();
        assert_eq!(sorted.into_iter().collect::<String>(), "0123456789ABCDEF");

        // Only the first round's nibble is non-zero
        let single = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10];
        assert_eq!(X16sOrder.derive(&single), "1023456789ABCDEF");
    }

    #[test]
    fn test_cache_derives_once_per_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = OrderCache::new(Box::new(Fixed("FEDCBA9876543210", calls.clone())));

        let header = header_with_time(1_700_000_000);
        let first = cache.resolve(&header).unwrap();
        for _ in 0..10 {
            assert_eq!(cache.resolve(&header).unwrap(), first);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.derivations(), 1);

        cache.resolve(&header_with_time(1_700_000_001)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached().map(|(t, _)| t), Some(1_700_000_001));
    }

    #[test]
    fn test_cache_first_call_derives_for_max_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = OrderCache::new(Box::new(Fixed("0000000000000000", calls.clone())));
        cache.resolve(&header_with_time(u32::MAX)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_keeps_entry_on_bad_derivation() {
        struct Scripted(Mutex<Vec<&'static str>>);

        impl OrderDerivation for Scripted {
            fn name(&self) -> &str {
                "scripted"
            }

            fn derive(&self, _seed: &[u8; 8]) -> String {
                let mut script = self.0.lock().unwrap();
                script.remove(0).to_string()
            }
        }

        let script = vec!["0123456789ABCDEF", "0123456789ABCDEZ"];
        let mut cache = OrderCache::new(Box::new(Scripted(Mutex::new(script))));

        let order = cache.resolve(&header_with_time(1)).unwrap();
        assert!(cache.resolve(&header_with_time(2)).is_err());
        assert_eq!(cache.cached(), Some((1, order)));
        assert_eq!(cache.derivations(), 2);
    }
}
