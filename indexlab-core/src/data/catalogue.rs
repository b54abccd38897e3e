//! Index catalogue: which indices exist, where to fetch them, how to order them.
//!
//! Each entry maps a display name to a primary-source symbol, optional
//! primary-source fallback symbols, and an optional secondary-source symbol.
//! Mainland China indices have no usable primary symbol and go straight to the
//! secondary source.

use serde::{Deserialize, Serialize};

/// Market region, used to group snapshot columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    China,
    Japan,
    Canada,
    Malaysia,
    Europe,
    AsiaPacific,
    UnitedStates,
    UnitedKingdom,
    HongKong,
}

impl Region {
    /// Snapshot group: China first, then the rest of the world, then US/UK/HK.
    pub fn order_group(self) -> u8 {
        match self {
            Region::China => 0,
            Region::Japan
            | Region::Canada
            | Region::Malaysia
            | Region::Europe
            | Region::AsiaPacific => 1,
            Region::UnitedStates | Region::UnitedKingdom | Region::HongKong => 2,
        }
    }
}

/// One logical index and its source symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSpec {
    /// Canonical display name, e.g. `S&P 500 (US)`.
    pub name: String,
    pub region: Region,
    /// Symbol on the primary source.
    #[serde(default)]
    pub primary: Option<String>,
    /// Alternate primary-source symbols, tried in order.
    #[serde(default)]
    pub fallbacks: Vec<String>,
    /// Symbol on the secondary source.
    #[serde(default)]
    pub secondary: Option<String>,
}

impl IndexSpec {
    pub fn new(name: &str, region: Region) -> Self {
        Self {
            name: name.to_string(),
            region,
            primary: None,
            fallbacks: Vec::new(),
            secondary: None,
        }
    }

    pub fn primary(mut self, symbol: &str) -> Self {
        self.primary = Some(symbol.to_string());
        self
    }

    pub fn fallback(mut self, symbol: &str) -> Self {
        self.fallbacks.push(symbol.to_string());
        self
    }

    pub fn secondary(mut self, symbol: &str) -> Self {
        self.secondary = Some(symbol.to_string());
        self
    }
}

/// Preferred snapshot column order.
pub const CANONICAL_COLUMN_ORDER: &[&str] = &[
    "Shanghai Composite (CN)",
    "Shenzhen Component (CN)",
    "CSI 300 (CN)",
    "Nikkei 225 (JP)",
    "S&P/TSX Composite (CA)",
    "FTSE Bursa Malaysia KLCI (MY)",
    "CAC 40 (FR)",
    "DAX (German)",
    "Straits Times Index (SG)",
    "S&P/ASX 200 (AU)",
    "S&P 500 (US)",
    "NASDAQ Composite (US)",
    "FTSE 100 (UK)",
    "Hang Seng (HK)",
];

/// Older snapshots used bare names; map them to the current convention.
pub const LEGACY_COLUMN_NAMES: &[(&str, &str)] = &[
    ("S&P 500", "S&P 500 (US)"),
    ("NASDAQ Composite", "NASDAQ Composite (US)"),
    ("FTSE 100", "FTSE 100 (UK)"),
    ("Hang Seng", "Hang Seng (HK)"),
    ("Nikkei 225", "Nikkei 225 (JP)"),
    ("S&P/TSX Composite", "S&P/TSX Composite (CA)"),
    ("FTSE Bursa Malaysia KLCI", "FTSE Bursa Malaysia KLCI (MY)"),
    ("CAC 40", "CAC 40 (FR)"),
    ("DAX", "DAX (German)"),
    ("Straits Times Index", "Straits Times Index (SG)"),
    ("S&P/ASX 200", "S&P/ASX 200 (AU)"),
    ("Shanghai Composite", "Shanghai Composite (CN)"),
    ("Shenzhen Component", "Shenzhen Component (CN)"),
    ("CSI 300", "CSI 300 (CN)"),
];

/// Current name for a legacy bare column name, if it is one.
pub fn upgrade_legacy_name(name: &str) -> Option<&'static str> {
    LEGACY_COLUMN_NAMES
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
}

/// Column order for a snapshot: canonical names first, then any other
/// catalogue entries grouped by region (stable within a group).
///
/// Columns known to neither list are appended by `MarketTable::reorder`.
pub fn column_order(catalogue: &[IndexSpec]) -> Vec<String> {
    let mut order: Vec<String> = CANONICAL_COLUMN_ORDER.iter().map(|s| s.to_string()).collect();
    let mut extra: Vec<&IndexSpec> = catalogue
        .iter()
        .filter(|s| !CANONICAL_COLUMN_ORDER.contains(&s.name.as_str()))
        .collect();
    extra.sort_by_key(|s| s.region.order_group());
    for spec in extra {
        if !order.contains(&spec.name) {
            order.push(spec.name.clone());
        }
    }
    order
}

/// The built-in catalogue of global equity indices.
pub fn default_catalogue() -> Vec<IndexSpec> {
    vec![
        IndexSpec::new("S&P 500 (US)", Region::UnitedStates)
            .primary("^GSPC")
            .secondary(".INX"),
        IndexSpec::new("NASDAQ Composite (US)", Region::UnitedStates)
            .primary("^IXIC")
            .secondary(".IXIC"),
        IndexSpec::new("FTSE 100 (UK)", Region::UnitedKingdom).primary("^FTSE"),
        IndexSpec::new("Hang Seng (HK)", Region::HongKong).primary("^HSI"),
        IndexSpec::new("Nikkei 225 (JP)", Region::Japan).primary("^N225"),
        IndexSpec::new("S&P/TSX Composite (CA)", Region::Canada).primary("^GSPTSE"),
        IndexSpec::new("FTSE Bursa Malaysia KLCI (MY)", Region::Malaysia)
            .primary("^KLSE")
            .fallback("^FBMKLCI"),
        IndexSpec::new("CAC 40 (FR)", Region::Europe).primary("^FCHI"),
        IndexSpec::new("DAX (German)", Region::Europe).primary("^GDAXI"),
        IndexSpec::new("Straits Times Index (SG)", Region::AsiaPacific).primary("^STI"),
        IndexSpec::new("S&P/ASX 200 (AU)", Region::AsiaPacific).primary("^AXJO"),
        IndexSpec::new("Shanghai Composite (CN)", Region::China).secondary("sh000001"),
        IndexSpec::new("Shenzhen Component (CN)", Region::China).secondary("sz399001"),
        IndexSpec::new("CSI 300 (CN)", Region::China).secondary("sh000300"),
    ]
}
