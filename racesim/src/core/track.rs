use crate::core::track_path::{Point, TrackPath};
use crate::error::RaceSimError;
use serde::{Deserialize, Serialize};

/// Car setup as used by the practice stage (each value 0 - 100).
/// * `wings` - Downforce vs. top speed
/// * `suspension` - Soft vs. stiff
/// * `gear` - Acceleration vs. top speed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarSetup {
    pub wings: f64,
    pub suspension: f64,
    pub gear: f64,
}

/// * `id` - Track identifier, e.g. t1
/// * `name` - Track name, e.g. Melbourne GP
/// * `location` - Country or city
/// * `laps` - Number of laps of the race
/// * `base_lap_time` - (s) Lap time at nominal pace, reference for every speed calculation
/// * `path` - SVG path data of the closed centerline (viewBox 0 0 100 100)
/// * `ideal_setup` - Setup the practice stage rates against (hidden from the player)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackPars {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub laps: u32,
    pub base_lap_time: f64,
    pub path: String,
    #[serde(default)]
    pub ideal_setup: CarSetup,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub location: String,
    pub laps: u32,
    pub base_lap_time: f64,
    pub ideal_setup: CarSetup,
    pub path: TrackPath,
}

impl Track {
    pub fn new(track_pars: &TrackPars) -> Result<Track, RaceSimError> {
        if track_pars.laps < 1 {
            return Err(RaceSimError::EmptyRace);
        }
        if !(track_pars.base_lap_time > 0.0) {
            return Err(RaceSimError::InvalidParameter(
                helpers::general::InputValueError(format!(
                    "base lap time of {} must be positive, but is {}",
                    track_pars.name, track_pars.base_lap_time
                )),
            ));
        }

        let path = TrackPath::parse(&track_pars.path).map_err(|source| {
            RaceSimError::InvalidTrack {
                track: track_pars.name.to_owned(),
                source,
            }
        })?;

        Ok(Track {
            id: track_pars.id.to_owned(),
            name: track_pars.name.to_owned(),
            location: track_pars.location.to_owned(),
            laps: track_pars.laps,
            base_lap_time: track_pars.base_lap_time,
            ideal_setup: track_pars.ideal_setup,
            path,
        })
    }

    /// base_speed returns the progress rate (percent of a lap per second) at nominal pace.
    pub fn base_speed(&self) -> f64 {
        100.0 / self.base_lap_time
    }

    /// position_at returns the 2D position of a car at the given lap progress (0 - 100).
    pub fn position_at(&self, progress: f64) -> Point {
        self.path.point_at(progress)
    }
}
