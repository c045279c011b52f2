use serde::{Deserialize, Serialize};
use std::fmt;

/// Position ID. Allocated sequentially by the driver, doubles as the arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl PositionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for PositionId {
    fn from(index: usize) -> Self {
        Self(index as u64)
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed() {
        assert_eq!(PositionId(7).to_string(), "P7");
    }

    #[test]
    fn index_roundtrip() {
        let id = PositionId::from(42usize);
        assert_eq!(id.index(), 42);
    }
}
