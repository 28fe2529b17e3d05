use helpers::general::InputValueError;
use serde::{Deserialize, Serialize};

/// SimConstants is the tuning table of the race simulation. All per-tick probabilities are
/// evaluated once per simulated tick, independent of the tick length.
///
/// Every field has a default, so a JSON file only needs to contain the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConstants {
    // EVENTS --------------------------------------------------------------------------------------
    /// Chance per tick that a safety car is deployed (inside the lap window)
    pub safety_car_chance: f64,
    /// Chance per tick that an active safety car returns to the pits
    pub safety_car_end_chance: f64,
    /// Safety car is only deployed if the leader's lap is greater than this value
    pub safety_car_first_lap: u32,
    /// Safety car is only deployed if the leader's lap is smaller than `laps - this value`
    pub safety_car_last_laps: u32,
    /// Chance per tick of rain starting (only while sunny)
    pub weather_change_chance: f64,
    /// Chance per tick of a reliability issue
    pub reliability_chance: f64,
    /// Chance per player car to retire when a reliability issue is ignored
    pub dnf_on_ignore_chance: f64,
    /// Chance per tick that the overtake mode falls back to low (engine cooldown)
    pub overtake_cooldown_chance: f64,

    // AI STRATEGY ---------------------------------------------------------------------------------
    /// Chance per tick that an AI car on slicks reacts to rain by pitting for inters
    pub ai_rain_pit_chance: f64,
    /// Chance per tick that an AI car pits for fresh tires behind the safety car
    pub ai_sc_pit_chance: f64,
    /// AI cars only pit behind the safety car below this tire health
    pub ai_sc_pit_tire_threshold: f64,
    /// AI cars pit at the end of a lap below this tire health (dry, green flag)
    pub ai_lap_pit_tire_threshold: f64,

    // PIT STOPS -----------------------------------------------------------------------------------
    /// (s) Stationary time of a pit stop at neutral crew and morale factors
    pub pit_stop_duration: f64,
    /// Pit time factor if the team employs a pit crew chief (< 1.0 is faster)
    pub pit_crew_factor: f64,
    /// Morale pit time factor is `morale_pit_base - morale_pit_slope * morale / 100`
    pub morale_pit_base: f64,
    pub morale_pit_slope: f64,

    // ENVIRONMENT ---------------------------------------------------------------------------------
    /// (%/s) Wetness increase while raining
    pub wetness_rain_rate: f64,
    /// (%/s) Wetness decrease while dry
    pub wetness_dry_rate: f64,
    /// (%) Inters overheat below this wetness
    pub dry_track_threshold: f64,
    /// (%) Slicks lose most of their grip above this wetness
    pub wet_track_threshold: f64,

    // PACE AND WEAR -------------------------------------------------------------------------------
    pub skill_reference: f64,
    pub skill_scale: f64,
    /// Speed bonus per setup quality point (player only)
    pub setup_speed_scale: f64,
    /// Speed factor if the team employs a head of strategy
    pub strategy_staff_bonus: f64,
    /// Tire wear factor if the team employs a race engineer
    pub engineer_wear_factor: f64,
    /// Car ratings are folded into the pace factor around this reference rating
    pub car_rating_reference: f64,
    pub car_rating_scale: f64,
    /// (%/s) Tire wear at neutral style, mode and compound
    pub tire_wear_base: f64,
    /// Below this tire health cars lose some pace
    pub worn_tire_threshold: f64,
    /// Speed cap behind the safety car as fraction of the base speed
    pub safety_car_speed_cap: f64,

    // PRESENTATION --------------------------------------------------------------------------------
    /// (s) Minimum simulated time between two commentary requests
    pub commentary_interval: f64,
    /// Chance that an eligible tick requests commentary
    pub commentary_chance: f64,
    /// Multiplier from progress rate to the displayed speed value
    pub display_speed_scale: f64,

    // FIELD ---------------------------------------------------------------------------------------
    pub rookie_skill: f64,
    pub rookie_skill_step: f64,
}

impl Default for SimConstants {
    fn default() -> Self {
        SimConstants {
            safety_car_chance: 0.002,
            safety_car_end_chance: 0.005,
            safety_car_first_lap: 1,
            safety_car_last_laps: 2,
            weather_change_chance: 0.003,
            reliability_chance: 0.001,
            dnf_on_ignore_chance: 0.3,
            overtake_cooldown_chance: 0.0005,
            ai_rain_pit_chance: 0.05,
            ai_sc_pit_chance: 0.1,
            ai_sc_pit_tire_threshold: 60.0,
            ai_lap_pit_tire_threshold: 20.0,
            pit_stop_duration: 5.0,
            pit_crew_factor: 0.9,
            morale_pit_base: 1.5,
            morale_pit_slope: 0.7,
            wetness_rain_rate: 0.5,
            wetness_dry_rate: 0.2,
            dry_track_threshold: 20.0,
            wet_track_threshold: 50.0,
            skill_reference: 70.0,
            skill_scale: 0.001,
            setup_speed_scale: 0.0003,
            strategy_staff_bonus: 1.02,
            engineer_wear_factor: 0.9,
            car_rating_reference: 70.0,
            car_rating_scale: 0.0005,
            tire_wear_base: 0.05,
            worn_tire_threshold: 20.0,
            safety_car_speed_cap: 0.6,
            commentary_interval: 15.0,
            commentary_chance: 0.3,
            display_speed_scale: 300.0,
            rookie_skill: 60.0,
            rookie_skill_step: 5.0,
        }
    }
}

impl SimConstants {
    /// validate checks that probabilities are in [0, 1] and rates and durations are positive.
    pub fn validate(&self) -> Result<(), InputValueError> {
        let probabilities = [
            ("safety_car_chance", self.safety_car_chance),
            ("safety_car_end_chance", self.safety_car_end_chance),
            ("weather_change_chance", self.weather_change_chance),
            ("reliability_chance", self.reliability_chance),
            ("dnf_on_ignore_chance", self.dnf_on_ignore_chance),
            ("overtake_cooldown_chance", self.overtake_cooldown_chance),
            ("ai_rain_pit_chance", self.ai_rain_pit_chance),
            ("ai_sc_pit_chance", self.ai_sc_pit_chance),
            ("commentary_chance", self.commentary_chance),
        ];
        for (name, p) in probabilities.iter() {
            if !(0.0..=1.0).contains(p) {
                return Err(InputValueError(format!(
                    "{} must be in [0, 1], but is {}",
                    name, p
                )));
            }
        }

        let positives = [
            ("pit_stop_duration", self.pit_stop_duration),
            ("pit_crew_factor", self.pit_crew_factor),
            ("wetness_rain_rate", self.wetness_rain_rate),
            ("wetness_dry_rate", self.wetness_dry_rate),
            ("tire_wear_base", self.tire_wear_base),
            ("safety_car_speed_cap", self.safety_car_speed_cap),
        ];
        for (name, v) in positives.iter() {
            if !(*v > 0.0) {
                return Err(InputValueError(format!(
                    "{} must be positive, but is {}",
                    name, v
                )));
            }
        }

        // the morale factor must stay positive for every morale in [0, 100]
        if !(self.morale_pit_base - self.morale_pit_slope > 0.0) || !(self.morale_pit_base > 0.0) {
            return Err(InputValueError(
                "morale pit factor must be positive for every morale value".to_owned(),
            ));
        }

        if self.dry_track_threshold > self.wet_track_threshold {
            return Err(InputValueError(
                "dry_track_threshold must not exceed wet_track_threshold".to_owned(),
            ));
        }

        Ok(())
    }
}
