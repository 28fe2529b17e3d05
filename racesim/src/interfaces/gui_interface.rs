use crate::core::car::{CarStatus, DrivingStyle, EngineMode};
use crate::core::environment::WeatherState;
use crate::core::events::RaceEvent;
use crate::core::race::{Race, RacePhase, SimSpeed};
use crate::core::tireset::TireCompound;
use crate::core::track_path::Point;
use crate::post::race_result::Classification;
use serde::Serialize;

/// Maximum number of race state snapshots per second of wall time sent to a presenter.
pub const MAX_GUI_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct CarState {
    pub position: usize,
    pub driver_id: String,
    pub name: String,
    pub team_id: String,
    pub color: RgbColor,
    pub is_player: bool,
    pub lap: u32,
    pub progress: f64,
    pub race_prog: f64,
    pub speed: f64,
    pub gap: f64,
    pub tire_compound: TireCompound,
    pub tire_health: f64,
    pub engine_mode: EngineMode,
    pub driving_style: DrivingStyle,
    pub pitting: bool,
    pub status: CarStatus,
    /// Position on the track map
    pub point: Point,
}

/// RaceState is a read-only snapshot of a race, taken between ticks.
#[derive(Debug, Clone, Serialize)]
pub struct RaceState {
    pub car_states: Vec<CarState>,
    pub race_time: f64,
    pub leader_lap: u32,
    pub tot_no_laps: u32,
    pub weather: WeatherState,
    pub safety_car: bool,
    pub track_wetness: f64,
    pub phase: RacePhase,
    pub is_playing: bool,
    pub sim_speed: SimSpeed,
    pub active_event: Option<RaceEvent>,
    pub selected_driver: Option<String>,
    pub messages: Vec<String>,
    // final results payload (only set once the race is finished)
    pub final_result: Option<Classification>,
}

impl RaceState {
    pub fn from_race(race: &Race) -> RaceState {
        let car_states = race
            .cars_list
            .iter()
            .enumerate()
            .map(|(i, car)| CarState {
                position: i + 1,
                driver_id: car.driver_id.to_owned(),
                name: car.name.to_owned(),
                team_id: car.team_id.to_owned(),
                color: car.color,
                is_player: car.is_player,
                lap: car.lap,
                progress: car.progress,
                race_prog: car.race_prog(),
                speed: car.speed,
                gap: car.gap,
                tire_compound: car.tireset.compound,
                tire_health: car.tireset.health,
                engine_mode: car.engine_mode,
                driving_style: car.driving_style,
                pitting: car.is_pitting(),
                status: car.status,
                point: race.track.position_at(car.progress),
            })
            .collect();

        RaceState {
            car_states,
            race_time: race.cur_racetime,
            leader_lap: race.leader_lap(),
            tot_no_laps: race.track.laps,
            weather: race.env.weather,
            safety_car: race.env.safety_car,
            track_wetness: race.env.track_wetness,
            phase: race.phase,
            is_playing: race.is_playing,
            sim_speed: race.sim_speed,
            active_event: race.active_event.to_owned(),
            selected_driver: race.selected_driver.to_owned(),
            messages: race.messages(),
            final_result: race.classification().cloned(),
        }
    }

    pub fn selected_car(&self) -> Option<&CarState> {
        let selected = self.selected_driver.as_deref()?;
        self.car_states.iter().find(|c| c.driver_id == selected)
    }
}
