//! Curated default universe of liquid large-cap US equities.
//!
//! Offered to users who have no watchlist yet; spans tech, financials,
//! energy, and staples so an equal-weight reference portfolio is not a
//! single-sector bet.

/// A universe constituent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    /// Stock symbol.
    pub symbol: String,
    /// Company name.
    pub name: String,
}

impl Constituent {
    /// Create a new constituent.
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// Curated default universe.
#[derive(Debug, Clone)]
pub struct CuratedUniverse {
    constituents: Vec<Constituent>,
}

impl CuratedUniverse {
    /// Create the universe with its default constituents.
    pub fn new() -> Self {
        Self {
            constituents: Self::default_constituents(),
        }
    }

    /// Get all constituents.
    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    /// Get all symbols.
    pub fn symbols(&self) -> Vec<String> {
        self.constituents.iter().map(|c| c.symbol.clone()).collect()
    }

    /// Look up the company name for a symbol.
    pub fn name(&self, symbol: &str) -> Option<&str> {
        self.constituents
            .iter()
            .find(|c| c.symbol == symbol)
            .map(|c| c.name.as_str())
    }

    fn default_constituents() -> Vec<Constituent> {
        vec![
            Constituent::new("AAPL", "Apple Inc."),
            Constituent::new("MSFT", "Microsoft Corporation"),
            Constituent::new("GOOG", "Alphabet Inc."),
            Constituent::new("AMZN", "Amazon.com, Inc."),
            Constituent::new("NVDA", "NVIDIA Corporation"),
            Constituent::new("TSLA", "Tesla, Inc."),
            Constituent::new("JPM", "JPMorgan Chase & Co."),
            Constituent::new("GS", "The Goldman Sachs Group, Inc."),
            Constituent::new("XOM", "Exxon Mobil Corporation"),
            Constituent::new("CVX", "Chevron Corporation"),
            Constituent::new("PG", "The Procter & Gamble Company"),
            Constituent::new("KO", "The Coca-Cola Company"),
            Constituent::new("PEP", "PepsiCo, Inc."),
        ]
    }
}

impl Default for CuratedUniverse {
    fn default() -> Self {
        Self::new()
    }
}
