//! Priority model - pure retention scoring for cache entries.
//!
//! Priority = base_reach + proximity + bandwidth + steward + affinity - age.
//! Reach level and affinity dominate; age is subtractive. The raw score is
//! clamped to 0..=200 and normalized to 0.0..=1.0, where higher means
//! "retain longer / evict later".
//!
//! The function is monotonic in every input: raising reach openness,
//! proximity, bandwidth class, steward tier, or affinity never lowers the
//! score, and raising the age penalty never raises it. It is called on every
//! cache insertion, so it allocates nothing.

use crate::types::{BandwidthClass, StewardTier};

/// Raw score ceiling before normalization
const MAX_RAW_SCORE: f64 = 200.0;

/// Inputs to the priority model
#[derive(Clone, Copy, Debug)]
pub struct PriorityParams {
    /// Reach level 0 (private) to 7 (commons)
    pub reach_level: u8,
    /// Custodian proximity, -100 to +100
    pub proximity_score: i32,
    pub bandwidth_class: BandwidthClass,
    pub steward_tier: StewardTier,
    /// Affinity relevance, 0.0 to 1.0
    pub affinity_match: f64,
    /// Penalty for aged content, subtracted from the raw score
    pub age_penalty: f64,
}

/// Score an entry's retention priority. O(1), side-effect-free.
pub fn priority(params: &PriorityParams) -> f64 {
    let mut score = 0.0;

    // Base reach level (commons = 84, private = 0)
    score += f64::from(params.reach_level.min(7)) * 12.0;

    // Custodian proximity (-100 to +100)
    score += f64::from(params.proximity_score.clamp(-100, 100));

    score += f64::from(params.bandwidth_class.score_bonus());
    score += f64::from(params.steward_tier.score_bonus());

    // Affinity bonus (0-10 points)
    score += params.affinity_match.clamp(0.0, 1.0) * 10.0;

    score -= params.age_penalty.max(0.0);

    score.clamp(0.0, MAX_RAW_SCORE) / MAX_RAW_SCORE
}
