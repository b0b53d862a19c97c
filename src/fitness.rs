// src/fitness.rs
//
// Suitability scoring. The scoring formula is a pluggable capability
// behind `FitnessScorer`; the tone mapping below is the single source of
// truth for turning a score into a severity level.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::indicators::Demand;
use crate::roster_client::EmployeeRecord;

// Skill-vector keys the default scorer understands. Anything else scores 0.
pub const SKILL_COFFEE: &str = "coffee";
pub const SKILL_SANDWICH: &str = "sandwich";
pub const SKILL_CUSTOMER_SERVICE: &str = "customerService";
pub const SKILL_SPEED: &str = "speed";

/// Three-level severity classification derived from a numeric fitness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Good,
    Warn,
    Alert,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tone::Good => "good",
            Tone::Warn => "warn",
            Tone::Alert => "alert",
        };
        f.write_str(label)
    }
}

/// Maps a 0-100 score onto a tone. Every consumer shares this mapping so
/// the week indicators and the day projection never disagree about what
/// counts as a mismatch.
pub fn score_to_tone(score: f64) -> Tone {
    if score >= 80.0 {
        Tone::Good
    } else if score >= 56.0 {
        Tone::Warn
    } else {
        Tone::Alert
    }
}

/// Capability interface for suitability scoring.
///
/// Implementations must be deterministic for identical inputs, total
/// (unknown skills default to 0, the call never fails) and monotonic in
/// the skill dimension matching the demand.
pub trait FitnessScorer {
    /// Scores an employee against a day's demand. Result is in `[0, 100]`.
    fn score(&self, employee: &EmployeeRecord, demand: Option<Demand>) -> f64;
}

/// Default scorer: the demand-matching skill carries 0.6 of the weight,
/// customer service and speed 0.2 each. Mixed or unknown demand averages
/// the four base skills.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillWeightScorer;

fn skill(employee: &EmployeeRecord, name: &str) -> f64 {
    employee.skills.get(name).copied().unwrap_or(0.0)
}

impl FitnessScorer for SkillWeightScorer {
    fn score(&self, employee: &EmployeeRecord, demand: Option<Demand>) -> f64 {
        let coffee = skill(employee, SKILL_COFFEE);
        let sandwich = skill(employee, SKILL_SANDWICH);
        let customer_service = skill(employee, SKILL_CUSTOMER_SERVICE);
        let speed = skill(employee, SKILL_SPEED);

        let raw = match demand {
            Some(Demand::Coffee) => coffee * 0.6 + customer_service * 0.2 + speed * 0.2,
            Some(Demand::Sandwich) => sandwich * 0.6 + customer_service * 0.2 + speed * 0.2,
            Some(Demand::Mixed) | None => (coffee + sandwich + customer_service + speed) / 4.0,
        };
        raw.clamp(0.0, 100.0)
    }
}

/// Weighted overall score across the base skills, using the weight table
/// the service exposes on `/config`. Missing weights count as 0; an empty
/// table degrades to a zero denominator guard rather than dividing by 0.
pub fn overall_score(employee: &EmployeeRecord, weights: &HashMap<String, f64>) -> f64 {
    let w = |key: &str| weights.get(key).copied().unwrap_or(0.0);
    let coffee_w = w("coffee");
    let sandwich_w = w("sandwich");
    let speed_w = w("speed");
    let customer_w = w("customer_service");

    let denom = coffee_w + sandwich_w + speed_w + customer_w;
    if denom == 0.0 {
        return 0.0;
    }
    (coffee_w * skill(employee, SKILL_COFFEE)
        + sandwich_w * skill(employee, SKILL_SANDWICH)
        + speed_w * skill(employee, SKILL_SPEED)
        + customer_w * skill(employee, SKILL_CUSTOMER_SERVICE))
        / denom
}
