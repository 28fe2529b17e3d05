use crate::core::sim_constants::SimConstants;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const FRESH_TIRE_HEALTH: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TireCompound {
    Soft,
    Medium,
    Hard,
    #[serde(alias = "intermediate")]
    Inter,
    Wet,
}

impl TireCompound {
    pub fn is_slick(&self) -> bool {
        matches!(self, TireCompound::Soft | TireCompound::Medium | TireCompound::Hard)
    }

    /// wear_factor scales the base tire wear rate per compound.
    pub fn wear_factor(&self) -> f64 {
        match self {
            TireCompound::Soft => 1.2,
            TireCompound::Hard => 0.8,
            _ => 1.0,
        }
    }

    /// wetness_factor returns the speed multiplier of the compound for the current track wetness.
    pub fn wetness_factor(&self, track_wetness: f64, sim_consts: &SimConstants) -> f64 {
        if track_wetness < sim_consts.dry_track_threshold {
            match self {
                TireCompound::Inter => 0.92,
                _ => 1.0,
            }
        } else if track_wetness > sim_consts.wet_track_threshold {
            match self {
                TireCompound::Soft | TireCompound::Hard => 0.60,
                TireCompound::Inter => 0.95,
                _ => 1.0,
            }
        } else {
            1.0
        }
    }
}

impl fmt::Display for TireCompound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TireCompound::Soft => "soft",
            TireCompound::Medium => "medium",
            TireCompound::Hard => "hard",
            TireCompound::Inter => "inter",
            TireCompound::Wet => "wet",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TireCompound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(TireCompound::Soft),
            "medium" => Ok(TireCompound::Medium),
            "hard" => Ok(TireCompound::Hard),
            "inter" | "intermediate" => Ok(TireCompound::Inter),
            "wet" => Ok(TireCompound::Wet),
            other => Err(format!("unknown tire compound {:?}", other)),
        }
    }
}

/// Tireset is the set of tires currently mounted on a car. Health starts at 100 and is not
/// clamped at 0: worn-out tires keep losing health and stay in the heavily degraded speed branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tireset {
    pub compound: TireCompound,
    pub health: f64,
}

impl Tireset {
    pub fn new(compound: TireCompound) -> Tireset {
        Tireset {
            compound,
            health: FRESH_TIRE_HEALTH,
        }
    }

    /// health_factor returns the speed multiplier due to tire wear. Only the more punitive
    /// multiplier applies once the tires are completely worn.
    pub fn health_factor(&self, sim_consts: &SimConstants) -> f64 {
        if self.health <= 0.0 {
            0.60
        } else if self.health < sim_consts.worn_tire_threshold {
            0.95
        } else {
            1.0
        }
    }

    pub fn wear(&mut self, amount: f64) {
        self.health -= amount;
    }
}
