//! Shared types: reach levels, custodian classes, cache entry metadata,
//! and cache statistics.

use serde::{Deserialize, Serialize};

/// Content reach levels - determines who can access content
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ReachLevel {
    Private = 0,      // Only beneficiary
    Invited = 1,      // Explicitly invited individuals
    Local = 2,        // Family/household
    Neighborhood = 3, // Street block
    Municipal = 4,    // City/town
    Bioregional = 5,  // Watershed/ecosystem
    Regional = 6,     // State/province
    Commons = 7,      // Global/public
}

/// Number of reach levels (and therefore isolated cache budgets)
pub const REACH_LEVEL_COUNT: usize = 8;

impl ReachLevel {
    /// Convert a raw level, clamping out-of-range values to Commons
    pub fn from_u8(level: u8) -> ReachLevel {
        match level {
            0 => ReachLevel::Private,
            1 => ReachLevel::Invited,
            2 => ReachLevel::Local,
            3 => ReachLevel::Neighborhood,
            4 => ReachLevel::Municipal,
            5 => ReachLevel::Bioregional,
            6 => ReachLevel::Regional,
            _ => ReachLevel::Commons,
        }
    }
}

/// Custodian bandwidth class
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BandwidthClass {
    Low = 1,
    Medium = 2,
    High = 3,
    Ultra = 4,
}

impl BandwidthClass {
    pub fn score_bonus(&self) -> i32 {
        match self {
            BandwidthClass::Ultra => 20,
            BandwidthClass::High => 10,
            BandwidthClass::Medium => 5,
            BandwidthClass::Low => -5,
        }
    }
}

/// Steward tier for content curation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum StewardTier {
    Caretaker = 1, // Basic stewardship
    Curator = 2,   // Active curation
    Expert = 3,    // Domain expertise
    Pioneer = 4,   // Original research
}

impl StewardTier {
    pub fn score_bonus(&self) -> i32 {
        match self {
            StewardTier::Caretaker => 5,
            StewardTier::Curator => 15,
            StewardTier::Expert => 30,
            StewardTier::Pioneer => 50,
        }
    }
}

/// Cache entry metadata - one per cached content item
///
/// The `(hash, reach_level)` pair is unique: the same hash may appear at
/// multiple reach levels as independent entries, each with its own lifecycle.
/// Domain and epic are coarse classification tags, opaque to the cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntryMetadata {
    pub hash: String,
    pub size_bytes: u64,
    pub created_at: u64,
    pub last_accessed_at: u64,
    pub access_count: u64,
    pub reach_level: u8,
    pub domain: String,
    pub epic: String,
    /// Last computed priority score (0.0-1.0), used as eviction tiebreaker
    pub priority: f64,
}

/// Statistics for a cache tier
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub item_count: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
    /// Evictions due to size pressure (explicit deletes are not counted)
    pub eviction_count: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

impl CacheStats {
    /// Hit rate as a fraction (0.0 when no lookups have happened yet)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}
