use anyhow::{anyhow, Result};
use std::fmt;

/// Serialized block header length
pub const HEADER_LEN: usize = 80;

/// Length of the proof-of-work result reported per nonce
pub const HASH_LEN: usize = 32;

/// Word offsets inside the header (32-bit words, little-endian)
pub const ORDER_SEED_WORD: usize = 1;
pub const TIME_WORD: usize = 17;
pub const BITS_WORD: usize = 18;
pub const NONCE_WORD: usize = 19;

/// Mining statistics
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    pub hashes: u64,
    pub shares_found: u64,
    pub batches: u64,
}

impl MiningStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 80-byte block header, exactly as it is hashed
///
/// Layout: version (0..4), previous block hash (4..36), merkle root (36..68),
/// time (68..72), bits (72..76), nonce (76..80).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader([u8; HEADER_LEN]);

impl Default for BlockHeader {
    fn default() -> Self {
        Self([0u8; HEADER_LEN])
    }
}

impl BlockHeader {
    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex_to_bytes_be(hex)?;
        let bytes: [u8; HEADER_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| anyhow!("Expected {} header bytes, got {}", HEADER_LEN, b.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.0
    }

    #[inline]
    pub fn word(&self, index: usize) -> u32 {
        let at = index * 4;
        u32::from_le_bytes([self.0[at], self.0[at + 1], self.0[at + 2], self.0[at + 3]])
    }

    #[inline]
    pub fn set_word(&mut self, index: usize, value: u32) {
        let at = index * 4;
        self.0[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn time(&self) -> u32 {
        self.word(TIME_WORD)
    }

    pub fn set_time(&mut self, ntime: u32) {
        self.set_word(TIME_WORD, ntime);
    }

    pub fn bits(&self) -> u32 {
        self.word(BITS_WORD)
    }

    pub fn nonce(&self) -> u32 {
        self.word(NONCE_WORD)
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.set_word(NONCE_WORD, nonce);
    }

    /// The two 32-bit fields (words 1 and 2, the start of the previous block
    /// hash) that select the algorithm order, in header byte order
    pub fn order_seed(&self) -> [u8; 8] {
        let at = ORDER_SEED_WORD * 4;
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&self.0[at..at + 8]);
        seed
    }
}

impl fmt::Debug for BlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHeader({})", hex::encode(self.0))
    }
}

/// Proof-of-work target, eight 32-bit words, most significant first
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Target {
    words: [u32; 8],
}

impl Target {
    /// Accepts every hash
    pub const MAX: Target = Target { words: [u32::MAX; 8] };

    /// Fixed easy target used in benchmark mode
    pub const BENCHMARK: Target = Target {
        words: [0x0000_0cff, u32::MAX, u32::MAX, u32::MAX, u32::MAX, u32::MAX, u32::MAX, u32::MAX],
    };

    pub const fn from_words(words: [u32; 8]) -> Self {
        Self { words }
    }

    /// From a 256-bit big-endian value
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut words = [0u32; 8];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self { words }
    }

    /// From compact nBits
    pub fn from_compact(nbits: u32) -> Self {
        Self::from_be_bytes(&nbits_to_target(nbits))
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex_to_bytes_be(hex)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| anyhow!("Expected 32 target bytes, got {}", b.len()))?;
        Ok(Self::from_be_bytes(&bytes))
    }

    pub fn words(&self) -> &[u32; 8] {
        &self.words
    }

    /// Most significant word, the one the coarse check compares against
    pub fn msw(&self) -> u32 {
        self.words[0]
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Cheap first filter: only the most significant word
    #[inline]
    pub fn passes_coarse(&self, hash: &[u8; HASH_LEN]) -> bool {
        hash_word(hash, 7) <= self.words[0]
    }

    /// Full comparison, hash <= target
    ///
    /// The hash is a little-endian 256-bit number, so its word 7 lines up with
    /// the target's first word.
    pub fn is_met_by(&self, hash: &[u8; HASH_LEN]) -> bool {
        for (i, &t) in self.words.iter().enumerate() {
            let h = hash_word(hash, 7 - i);
            if h > t {
                return false;
            }
            if h < t {
                return true;
            }
        }
        true
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", hex::encode(self.to_be_bytes()))
    }
}

/// Little-endian word `index` of a hash
#[inline]
pub fn hash_word(hash: &[u8; HASH_LEN], index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([hash[at], hash[at + 1], hash[at + 2], hash[at + 3]])
}

/// One unit of work: a header to scan plus its target
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: String,
    pub header: BlockHeader,
    pub target: Target,
    pub start_nonce: u32,
}

impl WorkItem {
    pub fn new(job_id: impl Into<String>, header: BlockHeader, target: Target) -> Self {
        Self {
            job_id: job_id.into(),
            start_nonce: header.nonce(),
            header,
            target,
        }
    }

    pub fn with_start_nonce(mut self, nonce: u32) -> Self {
        self.start_nonce = nonce;
        self
    }
}

/// Convert hex string to big-endian bytes
pub fn hex_to_bytes_be(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim_start_matches("0x");
    Ok(hex::decode(hex)?)
}

/// Convert hex string to u32 (big-endian, as nbits is usually written)
pub fn hex_to_u32_be(hex: &str) -> Result<u32> {
    let bytes = hex_to_bytes_be(hex)?;
    if bytes.len() != 4 {
        return Err(anyhow!("Expected 4 bytes for u32, got {}", bytes.len()));
    }
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Convert nBits compact format to full 256-bit target (big-endian)
pub fn nbits_to_target(nbits: u32) -> [u8; 32] {
    let mut target = [0u8; 32];

    let exponent = (nbits >> 24) as usize;
    let mantissa = nbits & 0x00FFFFFF;

    if exponent <= 3 {
        // Small exponent: shift right
        let shifted = mantissa >> (8 * (3 - exponent));
        target[29] = (shifted >> 16) as u8;
        target[30] = (shifted >> 8) as u8;
        target[31] = shifted as u8;
    } else if exponent <= 32 {
        // Normal range: place mantissa at correct position
        let offset = 32 - exponent;
        target[offset] = (mantissa >> 16) as u8;
        if offset + 1 < 32 {
            target[offset + 1] = (mantissa >> 8) as u8;
        }
        if offset + 2 < 32 {
            target[offset + 2] = mantissa as u8;
        }
    } else {
        // Exponent > 32: target is larger than 256 bits, return max
        target.fill(0xFF);
    }

    target
}

/// Difficulty relative to the 0x1d00ffff limit
pub fn nbits_to_difficulty(nbits: u32) -> f64 {
    let exponent = (nbits >> 24) as i32;
    let mantissa = (nbits & 0x00FFFFFF) as f64;
    if mantissa == 0.0 {
        return 0.0;
    }
    let diff1 = 0x00FFFF as f64 * 256f64.powi(0x1d - 3);
    diff1 / (mantissa * 256f64.powi(exponent - 3))
}
