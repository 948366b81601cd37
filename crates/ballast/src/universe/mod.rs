//! Symbol universes selectable in the Ballast engine.

pub mod curated;

pub use curated::{Constituent, CuratedUniverse};

/// Trait for stock universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().contains(&symbol.to_string())
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

impl Universe for CuratedUniverse {
    fn symbols(&self) -> Vec<String> {
        self.symbols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_trait() {
        let universe = CuratedUniverse::new();

        assert!(universe.contains("AAPL"));
        assert!(!universe.contains("NOTREAL"));
        assert!(universe.size() >= 10);
    }
}
