/// Lane layout transforms
///
/// A batched hash primitive does not read N separate buffers. It reads one
/// buffer in which the same word position of every lane sits side by side:
///
/// ```text
/// lane0: A0 A1 A2 ...      interleaved (4 lanes):
/// lane1: B0 B1 B2 ...  ->  A0 B0 C0 D0 A1 B1 C1 D1 A2 ...
/// lane2: C0 C1 C2 ...
/// lane3: D0 D1 D2 ...
/// ```
///
/// The word size is dictated by the primitive (32-bit for Shabal, 64-bit for
/// most 512-bit designs, 128-bit for the AES/Luffa-style ones). Using the
/// wrong word size does not fail, it silently produces wrong digests.

use std::fmt;

/// Element granularity of an interleaved buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordSize {
    W32,
    W64,
    W128,
}

impl WordSize {
    /// Size of one word in bytes
    pub const fn bytes(self) -> usize {
        match self {
            WordSize::W32 => 4,
            WordSize::W64 => 8,
            WordSize::W128 => 16,
        }
    }

    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }
}

/// Number of lanes packed together and the word size they are packed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneLayout {
    pub lanes: usize,
    pub word: WordSize,
}

impl LaneLayout {
    /// One lane, no interleaving. The word size is irrelevant here.
    pub const SCALAR: LaneLayout = LaneLayout { lanes: 1, word: WordSize::W64 };

    pub const fn new(lanes: usize, word: WordSize) -> Self {
        Self { lanes, word }
    }

    pub const fn is_scalar(&self) -> bool {
        self.lanes == 1
    }

    /// Bytes needed to hold `len` bytes of every lane
    pub const fn interleaved_len(&self, len: usize) -> usize {
        self.lanes * len
    }

    /// Position of byte `byte` of lane `lane` inside the interleaved buffer
    #[inline]
    pub const fn offset(&self, lane: usize, byte: usize) -> usize {
        let w = self.word.bytes();
        ((byte / w) * self.lanes + lane) * w + byte % w
    }
}

impl fmt::Display for LaneLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            write!(f, "scalar")
        } else {
            write!(f, "{}x{}", self.lanes, self.word.bits())
        }
    }
}

/// Pack the first `len` bytes of each lane into `dst`.
///
/// `len` must be a multiple of the word size; 64 and 80 (the only lengths
/// the chain uses) are multiples of every supported word size.
pub fn interleave<L: AsRef<[u8]>>(dst: &mut [u8], lanes: &[L], layout: LaneLayout, len: usize) {
    debug_assert_eq!(lanes.len(), layout.lanes);
    debug_assert_eq!(len % layout.word.bytes(), 0);

    let w = layout.word.bytes();
    let stride = w * layout.lanes;
    let dst = &mut dst[..layout.interleaved_len(len)];

    for (k, row) in dst.chunks_exact_mut(stride).enumerate() {
        let src = k * w..(k + 1) * w;
        for (slot, lane) in row.chunks_exact_mut(w).zip(lanes) {
            slot.copy_from_slice(&lane.as_ref()[src.clone()]);
        }
    }
}

/// Exact inverse of [`interleave`]: unpack `len` bytes per lane from `src`.
pub fn deinterleave<L: AsMut<[u8]>>(lanes: &mut [L], src: &[u8], layout: LaneLayout, len: usize) {
    debug_assert_eq!(lanes.len(), layout.lanes);
    debug_assert_eq!(len % layout.word.bytes(), 0);

    let w = layout.word.bytes();
    let stride = w * layout.lanes;
    let src = &src[..layout.interleaved_len(len)];

    for (k, row) in src.chunks_exact(stride).enumerate() {
        let dst = k * w..(k + 1) * w;
        for (slot, lane) in row.chunks_exact(w).zip(lanes.iter_mut()) {
            lane.as_mut()[dst.clone()].copy_from_slice(slot);
        }
    }
}

/// Copy `out.len()` bytes of a single lane out of an interleaved buffer.
pub fn gather_lane(src: &[u8], layout: LaneLayout, lane: usize, out: &mut [u8]) {
    if layout.is_scalar() {
        out.copy_from_slice(&src[..out.len()]);
        return;
    }
    let w = layout.word.bytes();
    for (k, chunk) in out.chunks_mut(w).enumerate() {
        let at = layout.offset(lane, k * w);
        chunk.copy_from_slice(&src[at..at + chunk.len()]);
    }
}

/// Write `bytes` into a single lane of an interleaved buffer, starting at
/// byte `at` of that lane. Writes may start and end mid-word.
pub fn scatter_lane(dst: &mut [u8], layout: LaneLayout, lane: usize, at: usize, bytes: &[u8]) {
    if layout.is_scalar() {
        dst[at..at + bytes.len()].copy_from_slice(bytes);
        return;
    }
    for (i, &b) in bytes.iter().enumerate() {
        dst[layout.offset(lane, at + i)] = b;
    }
}
