/// Registry mapping each algorithm slot to its implementation

use std::fmt;

use super::{rustcrypto, Algorithm, HashPrimitive, StandIn};

#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("no implementation registered for: {}", names(.0))]
    Missing(Vec<Algorithm>),

    #[error("{registered} registered in slot {slot}")]
    WrongSlot { slot: Algorithm, registered: Algorithm },
}

fn names(algos: &[Algorithm]) -> String {
    algos.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ")
}

/// Partially filled registry
#[derive(Default)]
pub struct HashSuiteBuilder {
    slots: [Option<Box<dyn HashPrimitive>>; Algorithm::COUNT],
}

impl HashSuiteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with every primitive this crate implements
    pub fn rustcrypto() -> Self {
        let mut builder = Self::new();
        for primitive in rustcrypto::available() {
            let slot = primitive.algorithm();
            builder.slots[slot.index()] = Some(primitive);
        }
        builder
    }

    /// Put `primitive` in its algorithm's slot, replacing what was there
    pub fn register(mut self, primitive: Box<dyn HashPrimitive>) -> Self {
        let slot = primitive.algorithm();
        self.slots[slot.index()] = Some(primitive);
        self
    }

    pub fn missing(&self) -> Vec<Algorithm> {
        Algorithm::ALL
            .into_iter()
            .filter(|a| self.slots[a.index()].is_none())
            .collect()
    }

    /// Fill every empty slot with a [`StandIn`]
    pub fn fill_stand_ins(mut self) -> Self {
        for algo in self.missing() {
            tracing::warn!("{} has no implementation, using a stand-in", algo);
            self.slots[algo.index()] = Some(Box::new(StandIn::new(algo)));
        }
        self
    }

    pub fn build(self) -> Result<HashSuite, SuiteError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(SuiteError::Missing(missing));
        }

        let mut primitives = Vec::with_capacity(Algorithm::COUNT);
        for (slot, primitive) in Algorithm::ALL.into_iter().zip(self.slots.into_iter().flatten()) {
            if primitive.algorithm() != slot {
                return Err(SuiteError::WrongSlot { slot, registered: primitive.algorithm() });
            }
            primitives.push(primitive);
        }
        Ok(HashSuite { primitives })
    }
}

/// Complete set of sixteen primitives, indexed by [`Algorithm`]
pub struct HashSuite {
    // Always exactly Algorithm::COUNT entries, slot i holds algorithm i
    primitives: Vec<Box<dyn HashPrimitive>>,
}

impl HashSuite {
    pub fn builder() -> HashSuiteBuilder {
        HashSuiteBuilder::new()
    }

    /// Real implementations where available, stand-ins for the rest
    pub fn with_stand_ins() -> Self {
        let builder = HashSuiteBuilder::rustcrypto().fill_stand_ins();
        let primitives = builder.slots.into_iter().flatten().collect();
        HashSuite { primitives }
    }

    #[inline]
    pub fn get(&self, algo: Algorithm) -> &dyn HashPrimitive {
        self.primitives[algo.index()].as_ref()
    }

    pub fn stand_ins(&self) -> Vec<Algorithm> {
        self.primitives
            .iter()
            .filter(|p| p.is_stand_in())
            .map(|p| p.algorithm())
            .collect()
    }

    pub fn has_stand_ins(&self) -> bool {
        self.primitives.iter().any(|p| p.is_stand_in())
    }
}

impl fmt::Debug for HashSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.primitives.iter().map(|p| (p.name().to_string(), p.is_stand_in())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rustcrypto_missing_slots() {
        let missing = HashSuiteBuilder::rustcrypto().missing();
        assert_eq!(
            missing,
            vec![
                Algorithm::Blake,
                Algorithm::Bmw,
                Algorithm::Luffa,
                Algorithm::CubeHash,
                Algorithm::Shavite,
                Algorithm::Simd,
                Algorithm::Echo,
                Algorithm::Hamsi,
                Algorithm::Fugue,
            ]
        );
    }

    #[test]
    fn test_build_reports_missing() {
        let err = HashSuiteBuilder::rustcrypto().build().unwrap_err();
        assert!(err.to_string().contains("blake512, bmw512"));
        match err {
            SuiteError::Missing(algos) => assert_eq!(algos.len(), 9),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_stand_in_suite_is_complete() {
        let suite = HashSuite::with_stand_ins();
        for algo in Algorithm::ALL {
            assert_eq!(suite.get(algo).algorithm(), algo);
        }
        assert_eq!(suite.stand_ins().len(), 9);
        assert!(suite.has_stand_ins());
        assert!(!suite.get(Algorithm::Sha512).is_stand_in());
    }

    #[test]
    fn test_register_completes_suite() {
        let mut builder = HashSuiteBuilder::rustcrypto();
        for algo in builder.missing() {
            builder = builder.register(Box::new(StandIn::new(algo)));
        }
        assert!(builder.missing().is_empty());
        assert!(builder.build().is_ok());
    }
}
