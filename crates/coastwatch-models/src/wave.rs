//! Wave intensity scores and levels.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical sea-state bucket derived from a 0-10 wave intensity.
///
/// Buckets are inclusive-lower: `[0,2)`, `[2,4)`, `[4,6)`, `[6,8)`, `[8,10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WaveLevel {
    Calm,
    SlightlyChoppy,
    Moderate,
    Rough,
    VeryRough,
}

impl WaveLevel {
    /// All levels in ascending order.
    pub const ALL: &'static [WaveLevel] = &[
        WaveLevel::Calm,
        WaveLevel::SlightlyChoppy,
        WaveLevel::Moderate,
        WaveLevel::Rough,
        WaveLevel::VeryRough,
    ];

    /// Bucket a wave intensity.
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity < 2.0 {
            WaveLevel::Calm
        } else if intensity < 4.0 {
            WaveLevel::SlightlyChoppy
        } else if intensity < 6.0 {
            WaveLevel::Moderate
        } else if intensity < 8.0 {
            WaveLevel::Rough
        } else {
            WaveLevel::VeryRough
        }
    }

    /// Position of the level, 0 (calm) to 4 (very rough).
    pub fn ordinal(&self) -> u8 {
        match self {
            WaveLevel::Calm => 0,
            WaveLevel::SlightlyChoppy => 1,
            WaveLevel::Moderate => 2,
            WaveLevel::Rough => 3,
            WaveLevel::VeryRough => 4,
        }
    }

    /// Human-readable level name.
    pub fn name(&self) -> &'static str {
        match self {
            WaveLevel::Calm => "Calm",
            WaveLevel::SlightlyChoppy => "Slightly choppy",
            WaveLevel::Moderate => "Moderate",
            WaveLevel::Rough => "Rough",
            WaveLevel::VeryRough => "Very rough",
        }
    }

    /// Canonical description shown to beach visitors.
    pub fn description(&self) -> &'static str {
        match self {
            WaveLevel::Calm => "Sea is very calm, no waves",
            WaveLevel::SlightlyChoppy => "Light waves, safe",
            WaveLevel::Moderate => "Moderate waves, be careful",
            WaveLevel::Rough => "Strong waves, caution required",
            WaveLevel::VeryRough => "Very strong waves, dangerous",
        }
    }

    /// Safety label for alerting.
    pub fn safety(&self) -> &'static str {
        match self {
            WaveLevel::Calm | WaveLevel::SlightlyChoppy => "Safe",
            WaveLevel::Moderate => "Careful",
            WaveLevel::Rough => "Caution",
            WaveLevel::VeryRough => "Dangerous",
        }
    }

    /// Dashboard colour (hex RGB).
    pub fn color(&self) -> &'static str {
        match self {
            WaveLevel::Calm => "#00ff00",
            WaveLevel::SlightlyChoppy => "#90EE90",
            WaveLevel::Moderate => "#FFFF00",
            WaveLevel::Rough => "#FFA500",
            WaveLevel::VeryRough => "#FF0000",
        }
    }
}

impl fmt::Display for WaveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wave assessment of one frame.
///
/// All numeric fields are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WaveScore {
    /// Fused intensity of this frame (0-10)
    pub current_intensity: f64,
    /// Rolling mean over the intensity history (0-10)
    pub average_intensity: f64,
    pub motion_score: f64,
    pub edge_score: f64,
    pub pattern_score: f64,
    pub level: WaveLevel,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries_are_inclusive_lower() {
        assert_eq!(WaveLevel::from_intensity(0.0), WaveLevel::Calm);
        assert_eq!(WaveLevel::from_intensity(1.9), WaveLevel::Calm);
        assert_eq!(WaveLevel::from_intensity(2.0), WaveLevel::SlightlyChoppy);
        assert_eq!(WaveLevel::from_intensity(3.99), WaveLevel::SlightlyChoppy);
        assert_eq!(WaveLevel::from_intensity(4.0), WaveLevel::Moderate);
        assert_eq!(WaveLevel::from_intensity(6.0), WaveLevel::Rough);
        assert_eq!(WaveLevel::from_intensity(7.99), WaveLevel::Rough);
        assert_eq!(WaveLevel::from_intensity(8.0), WaveLevel::VeryRough);
        assert_eq!(WaveLevel::from_intensity(10.0), WaveLevel::VeryRough);
    }

    #[test]
    fn test_levels_are_ordered() {
        for pair in WaveLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].ordinal() + 1, pair[1].ordinal());
        }
    }

    #[test]
    fn test_descriptions_are_fixed() {
        assert_eq!(WaveLevel::Calm.description(), "Sea is very calm, no waves");
        assert_eq!(WaveLevel::VeryRough.safety(), "Dangerous");
        assert_eq!(WaveLevel::SlightlyChoppy.to_string(), "Slightly choppy");
    }

    #[test]
    fn test_level_serde() {
        let json = serde_json::to_string(&WaveLevel::SlightlyChoppy).unwrap();
        assert_eq!(json, "\"slightly_choppy\"");
    }
}
