/// Per-algorithm capability table
///
/// Records, for a given batch width, how each primitive is driven: the lane
/// layout of its batched form (or scalar) and whether it is called through
/// init/update/close or a single fused call. The chain executor consults this
/// instead of special-casing algorithms.

use anyhow::{bail, Result};

use super::lanes::{LaneLayout, WordSize};
use crate::algorithms::Algorithm;

/// How a primitive is invoked for one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// One `full` call
    OneShot,
    /// `init`, `update`, `close`
    Stateful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub layout: LaneLayout,
    pub convention: Convention,
}

impl Capability {
    pub const fn new(lanes: usize, word: WordSize, convention: Convention) -> Self {
        Self { layout: LaneLayout::new(lanes, word), convention }
    }

    pub const fn scalar(convention: Convention) -> Self {
        Self { layout: LaneLayout::SCALAR, convention }
    }
}

#[derive(Debug, Clone)]
pub struct CapabilityTable {
    lanes: usize,
    entries: [Capability; Algorithm::COUNT],
}

impl CapabilityTable {
    /// Table for an N-lane executor. 8 and 4 lanes have batched forms,
    /// any other width runs every primitive per lane.
    pub fn for_lanes(lanes: usize) -> Self {
        match lanes {
            8 => Self::eight_way(),
            4 => Self::four_way(),
            n => Self::scalar(n),
        }
    }

    fn eight_way() -> Self {
        use Convention::*;
        use WordSize::*;

        let wide = |c| Capability::new(8, W64, c);
        let half = |c| Capability::new(4, W128, c);

        Self {
            lanes: 8,
            entries: [
                wide(OneShot),                // blake
                wide(Stateful),               // bmw
                Capability::scalar(OneShot),  // groestl
                wide(Stateful),               // skein
                wide(Stateful),               // jh
                wide(Stateful),               // keccak
                half(OneShot),                // luffa
                half(OneShot),                // cubehash
                Capability::scalar(Stateful), // shavite
                half(OneShot),                // simd
                Capability::scalar(OneShot),  // echo
                wide(Stateful),               // hamsi
                Capability::scalar(Stateful), // fugue
                Capability::new(8, W32, Stateful),
                Capability::scalar(Stateful), // whirlpool
                wide(Stateful),               // sha512
            ],
        }
    }

    fn four_way() -> Self {
        use Convention::*;
        use WordSize::*;

        let wide = |c| Capability::new(4, W64, c);
        let half = |c| Capability::new(2, W128, c);

        Self {
            lanes: 4,
            entries: [
                wide(OneShot),
                wide(Stateful),
                Capability::scalar(OneShot),
                wide(Stateful),
                wide(Stateful),
                wide(Stateful),
                half(OneShot),
                Capability::scalar(Stateful), // no 4-lane cubehash
                Capability::scalar(Stateful),
                half(OneShot),
                Capability::scalar(OneShot),
                wide(Stateful),
                Capability::scalar(Stateful),
                Capability::new(4, W32, Stateful),
                Capability::scalar(Stateful),
                wide(Stateful),
            ],
        }
    }

    /// Every primitive scalar, with the calling conventions of the batched tables
    pub fn scalar(lanes: usize) -> Self {
        let mut table = Self::eight_way();
        table.lanes = lanes;
        for entry in table.entries.iter_mut() {
            entry.layout = LaneLayout::SCALAR;
        }
        table
    }

    /// Override a single algorithm's entry
    pub fn with(mut self, algo: Algorithm, capability: Capability) -> Self {
        self.entries[algo.index()] = capability;
        self
    }

    #[inline]
    pub fn get(&self, algo: Algorithm) -> Capability {
        self.entries[algo.index()]
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Check the table can drive an executor with `lanes` lanes
    pub fn validate(&self, lanes: usize) -> Result<()> {
        if self.lanes() != lanes {
            bail!("capability table is for {} lanes, executor has {}", self.lanes(), lanes);
        }
        for algo in Algorithm::ALL {
            let width = self.get(algo).layout.lanes;
            if width == 0 || lanes % width != 0 {
                bail!("{} native width {} does not divide {} lanes", algo, width, lanes);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_validate() {
        for lanes in [1usize, 2, 4, 8] {
            CapabilityTable::for_lanes(lanes).validate(lanes).unwrap();
            CapabilityTable::scalar(lanes).validate(lanes).unwrap();
        }
    }

    #[test]
    fn test_word_sizes() {
        let t8 = CapabilityTable::for_lanes(8);
        assert_eq!(t8.get(Algorithm::Shabal).layout, LaneLayout::new(8, WordSize::W32));
        assert_eq!(t8.get(Algorithm::Luffa).layout, LaneLayout::new(4, WordSize::W128));
        assert_eq!(t8.get(Algorithm::Whirlpool).layout, LaneLayout::SCALAR);

        let t4 = CapabilityTable::for_lanes(4);
        assert_eq!(t4.get(Algorithm::Simd).layout, LaneLayout::new(2, WordSize::W128));
        assert_eq!(t4.get(Algorithm::CubeHash).layout, LaneLayout::SCALAR);
        assert_eq!(t4.get(Algorithm::Blake).convention, Convention::OneShot);
    }

    #[test]
    fn test_rejects_mismatched_width() {
        let table = CapabilityTable::for_lanes(8);
        assert!(table.validate(4).is_err());

        let bad = CapabilityTable::for_lanes(4)
            .with(Algorithm::Hamsi, Capability::new(3, WordSize::W64, Convention::Stateful));
        assert!(bad.validate(4).is_err());
    }
}
