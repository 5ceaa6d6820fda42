/// Hash primitives used by the x16 chain and the trait they are driven through
pub mod rustcrypto;
pub mod stand_in;
pub mod suite;

use std::fmt;

use crate::x16r::lanes::LaneLayout;

pub use self::rustcrypto::DigestPrimitive;
pub use self::stand_in::StandIn;
pub use self::suite::{HashSuite, HashSuiteBuilder, SuiteError};

/// Every primitive produces a 512-bit digest per lane
pub const DIGEST_LEN: usize = 64;

/// The sixteen x16 algorithms, numbered as the order string names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Algorithm {
    Blake = 0,
    Bmw = 1,
    Groestl = 2,
    Skein = 3,
    Jh = 4,
    Keccak = 5,
    Luffa = 6,
    CubeHash = 7,
    Shavite = 8,
    Simd = 9,
    Echo = 10,
    Hamsi = 11,
    Fugue = 12,
    Shabal = 13,
    Whirlpool = 14,
    Sha512 = 15,
}

impl Algorithm {
    pub const COUNT: usize = 16;

    pub const ALL: [Algorithm; Self::COUNT] = [
        Algorithm::Blake,
        Algorithm::Bmw,
        Algorithm::Groestl,
        Algorithm::Skein,
        Algorithm::Jh,
        Algorithm::Keccak,
        Algorithm::Luffa,
        Algorithm::CubeHash,
        Algorithm::Shavite,
        Algorithm::Simd,
        Algorithm::Echo,
        Algorithm::Hamsi,
        Algorithm::Fugue,
        Algorithm::Shabal,
        Algorithm::Whirlpool,
        Algorithm::Sha512,
    ];

    /// Algorithm selected by a 4-bit value. Anything above 15 is `None`.
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        Self::ALL.get(nibble as usize).copied()
    }

    /// Algorithm selected by one character of an order string ('0'-'9', 'A'-'F').
    /// Lowercase digits are accepted as well.
    pub fn from_hex_char(c: char) -> Option<Self> {
        c.to_digit(16).and_then(|d| Self::from_nibble(d as u8))
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Uppercase hex digit used for this algorithm in order strings
    pub fn hex_char(self) -> char {
        b"0123456789ABCDEF"[self.index()] as char
    }

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Blake => "blake512",
            Algorithm::Bmw => "bmw512",
            Algorithm::Groestl => "groestl512",
            Algorithm::Skein => "skein512",
            Algorithm::Jh => "jh512",
            Algorithm::Keccak => "keccak512",
            Algorithm::Luffa => "luffa512",
            Algorithm::CubeHash => "cubehash512",
            Algorithm::Shavite => "shavite512",
            Algorithm::Simd => "simd512",
            Algorithm::Echo => "echo512",
            Algorithm::Hamsi => "hamsi512",
            Algorithm::Fugue => "fugue512",
            Algorithm::Shabal => "shabal512",
            Algorithm::Whirlpool => "whirlpool",
            Algorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hashing state for one or more lanes.
///
/// `data` passed to [`update`](HashContext::update) and the buffer written by
/// [`close`](HashContext::close) are laid out according to
/// [`layout`](HashContext::layout): plain bytes for the scalar layout,
/// interleaved otherwise. `len` is always the per-lane message length.
pub trait HashContext: Send {
    fn layout(&self) -> LaneLayout;

    /// Reset to the initial state, discarding anything absorbed so far
    fn init(&mut self);

    fn update(&mut self, data: &[u8], len: usize);

    /// Finish and write `DIGEST_LEN` bytes per lane
    fn close(&mut self, out: &mut [u8]);

    /// Single-shot hashing. Primitives with a fused implementation override this.
    fn full(&mut self, data: &[u8], len: usize, out: &mut [u8]) {
        self.init();
        self.update(data, len);
        self.close(out);
    }
}

/// A 512-bit hash function that can run at any lane layout
pub trait HashPrimitive: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn name(&self) -> &str {
        self.algorithm().name()
    }

    /// Whether this is a placeholder rather than the real algorithm
    fn is_stand_in(&self) -> bool {
        false
    }

    /// Fresh context for the given layout
    fn new_context(&self, layout: LaneLayout) -> Box<dyn HashContext>;

    /// Hash one message
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        let mut out = [0u8; DIGEST_LEN];
        self.new_context(LaneLayout::SCALAR).full(data, data.len(), &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_mapping() {
        for (i, algo) in Algorithm::ALL.iter().enumerate() {
            assert_eq!(algo.index(), i);
            assert_eq!(Algorithm::from_nibble(i as u8), Some(*algo));
        }
        assert_eq!(Algorithm::from_nibble(16), None);
        assert_eq!(Algorithm::from_nibble(0xFF), None);
    }

    #[test]
    fn test_hex_chars() {
        assert_eq!(Algorithm::from_hex_char('0'), Some(Algorithm::Blake));
        assert_eq!(Algorithm::from_hex_char('A'), Some(Algorithm::Echo));
        assert_eq!(Algorithm::from_hex_char('f'), Some(Algorithm::Sha512));
        assert_eq!(Algorithm::from_hex_char('G'), None);
        assert_eq!(Algorithm::from_hex_char(' '), None);

        for algo in Algorithm::ALL {
            assert_eq!(Algorithm::from_hex_char(algo.hex_char()), Some(algo));
        }
    }
}
