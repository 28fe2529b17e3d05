use crate::core::sim_constants::SimConstants;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherState {
    Sunny,
    Rain,
}

impl Default for WeatherState {
    fn default() -> Self {
        WeatherState::Sunny
    }
}

impl fmt::Display for WeatherState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WeatherState::Sunny => write!(f, "sunny"),
            WeatherState::Rain => write!(f, "rain"),
        }
    }
}

/// Environment is the per-race state shared by all cars. It is created at race start, changed
/// only by ticks and decision resolutions, and dropped with the race.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    pub weather: WeatherState,
    pub safety_car: bool,
    /// (%) 0 = dry, 100 = fully wet
    pub track_wetness: f64,
}

impl Environment {
    /// with_updated_wetness returns the environment after `dt` seconds. The track gets wet 2.5x
    /// faster than it dries with the default rates.
    pub fn with_updated_wetness(&self, dt: f64, sim_consts: &SimConstants) -> Environment {
        let track_wetness = match self.weather {
            WeatherState::Rain => (self.track_wetness + sim_consts.wetness_rain_rate * dt).min(100.0),
            WeatherState::Sunny => (self.track_wetness - sim_consts.wetness_dry_rate * dt).max(0.0),
        };

        Environment {
            track_wetness,
            ..*self
        }
    }

    /// condition returns the race condition worth mentioning in commentary, if any.
    pub fn condition(&self) -> Option<&'static str> {
        if self.safety_car {
            Some("Safety Car")
        } else if self.weather == WeatherState::Rain {
            Some("Rain")
        } else {
            None
        }
    }
}
