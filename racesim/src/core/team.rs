use crate::core::driver::DriverPars;
use crate::core::sim_constants::SimConstants;
use helpers::general::InputValueError;
use serde::{Deserialize, Serialize};

/// Car ratings of a team (each 0 - 100).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct CarRatings {
    pub aerodynamics: f64,
    pub engine: f64,
    pub reliability: f64,
    pub chassis: f64,
}

impl Default for CarRatings {
    fn default() -> Self {
        CarRatings {
            aerodynamics: 70.0,
            engine: 70.0,
            reliability: 70.0,
            chassis: 70.0,
        }
    }
}

/// Staff members relevant during a race.
/// * `head_of_strategy` - Slightly faster race pace
/// * `race_engineer` - Less tire wear
/// * `pit_crew_chief` - Shorter pit stops
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct StaffPars {
    pub head_of_strategy: bool,
    pub race_engineer: bool,
    pub pit_crew_chief: bool,
}

/// * `id` - Team identifier, e.g. merc
/// * `name` - Team name, e.g. Silver Arrows
/// * `color` - CSS colour of the team, e.g. #14b8a6
/// * `car` - Car ratings
/// * `drivers` - Contracted drivers, in seat order
/// * `staff` - Hired race staff
/// * `morale` - Team morale (0 - 100)
/// * `performance_factor` - Additional pace factor provided by the season layer
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TeamPars {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub car: CarRatings,
    #[serde(default)]
    pub drivers: Vec<DriverPars>,
    #[serde(default)]
    pub staff: StaffPars,
    #[serde(default = "default_morale")]
    pub morale: f64,
    #[serde(default = "default_performance_factor")]
    pub performance_factor: f64,
}

fn default_morale() -> f64 {
    50.0
}

fn default_performance_factor() -> f64 {
    1.0
}

impl TeamPars {
    /// pace_factor folds staff, car ratings and the season layer's performance factor into one
    /// speed multiplier.
    pub fn pace_factor(&self, sim_consts: &SimConstants) -> f64 {
        let strategy = if self.staff.head_of_strategy {
            sim_consts.strategy_staff_bonus
        } else {
            1.0
        };
        let car_rating = (self.car.aerodynamics + self.car.engine + self.car.chassis) / 3.0;
        let car = 1.0 + (car_rating - sim_consts.car_rating_reference) * sim_consts.car_rating_scale;

        strategy * car * self.performance_factor
    }

    pub fn tire_wear_factor(&self, sim_consts: &SimConstants) -> f64 {
        if self.staff.race_engineer {
            sim_consts.engineer_wear_factor
        } else {
            1.0
        }
    }

    /// pit_time_factor scales the pit stop duration. Low morale makes the crew slower.
    pub fn pit_time_factor(&self, sim_consts: &SimConstants) -> f64 {
        let crew = if self.staff.pit_crew_chief {
            sim_consts.pit_crew_factor
        } else {
            1.0
        };
        let morale = self.morale.clamp(0.0, 100.0) / 100.0;

        crew * (sim_consts.morale_pit_base - morale * sim_consts.morale_pit_slope)
    }

    /// validate checks the performance factor and the skills of the contracted drivers.
    pub fn validate(&self) -> Result<(), InputValueError> {
        if !(self.performance_factor > 0.0) || !self.performance_factor.is_finite() {
            return Err(InputValueError(format!(
                "performance factor of team {} must be positive, but is {}",
                self.id, self.performance_factor
            )));
        }
        self.drivers.iter().try_for_each(|driver| driver.validate())
    }
}
