use crate::core::environment::{Environment, WeatherState};
use crate::core::sim_constants::SimConstants;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Weather,
    SafetyCar,
    Reliability,
}

impl EventKind {
    /// illustration_key is the content key of the illustration that goes with the event.
    pub fn illustration_key(&self) -> &'static str {
        match self {
            EventKind::Weather => "rain",
            EventKind::SafetyCar => "safety_car",
            EventKind::Reliability => "crash",
        }
    }
}

/// ActionId identifies the decision options of all race events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionId {
    #[serde(rename = "pit_sc")]
    PitForFreshTires,
    #[serde(rename = "pit_inter")]
    PitForInters,
    #[serde(rename = "mode_save")]
    ReduceEngineMode,
    #[serde(rename = "ignore_issue")]
    IgnoreIssue,
    #[serde(rename = "stay_out")]
    StayOut,
}

impl ActionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionId::PitForFreshTires => "pit_sc",
            ActionId::PitForInters => "pit_inter",
            ActionId::ReduceEngineMode => "mode_save",
            ActionId::IgnoreIssue => "ignore_issue",
            ActionId::StayOut => "stay_out",
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pit_sc" => Ok(ActionId::PitForFreshTires),
            "pit_inter" => Ok(ActionId::PitForInters),
            "mode_save" => Ok(ActionId::ReduceEngineMode),
            "ignore_issue" => Ok(ActionId::IgnoreIssue),
            "stay_out" => Ok(ActionId::StayOut),
            other => Err(other.to_owned()),
        }
    }
}

/// Colour hint of a decision button: safe, neutral, informative or risky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorHint {
    Green,
    Slate,
    Blue,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub label: String,
    pub action_id: ActionId,
    pub color_hint: ColorHint,
}

impl DecisionOption {
    fn new(label: &str, action_id: ActionId, color_hint: ColorHint) -> DecisionOption {
        DecisionOption {
            label: label.to_owned(),
            action_id,
            color_hint,
        }
    }
}

/// RaceEvent pauses the race until the player picks one of its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: EventKind,
    pub options: Vec<DecisionOption>,
}

impl RaceEvent {
    pub fn safety_car() -> RaceEvent {
        RaceEvent {
            id: "safety_car".to_owned(),
            title: "SAFETY CAR!".to_owned(),
            description: "An accident on track! The safety car is out and the field closes up."
                .to_owned(),
            kind: EventKind::SafetyCar,
            options: vec![
                DecisionOption::new("Box for fresh tires", ActionId::PitForFreshTires, ColorHint::Green),
                DecisionOption::new("Stay out (hold position)", ActionId::StayOut, ColorHint::Slate),
            ],
        }
    }

    pub fn rain_start() -> RaceEvent {
        RaceEvent {
            id: "rain_start".to_owned(),
            title: "WEATHER CHANGE".to_owned(),
            description: "Dark clouds are rolling in. It starts to rain heavily, the track is getting wet!"
                .to_owned(),
            kind: EventKind::Weather,
            options: vec![
                DecisionOption::new("Box for intermediates", ActionId::PitForInters, ColorHint::Blue),
                DecisionOption::new("Risk it on slicks", ActionId::StayOut, ColorHint::Red),
            ],
        }
    }

    pub fn engine_issue() -> RaceEvent {
        RaceEvent {
            id: "engine_issue".to_owned(),
            title: "ENGINE PROBLEM".to_owned(),
            description: "Telemetry shows high temperatures. We are losing power.".to_owned(),
            kind: EventKind::Reliability,
            options: vec![
                DecisionOption::new("Turn the mode down (safe)", ActionId::ReduceEngineMode, ColorHint::Green),
                DecisionOption::new("Ignore it (risk of DNF)", ActionId::IgnoreIssue, ColorHint::Red),
            ],
        }
    }

    pub fn offers(&self, action_id: ActionId) -> bool {
        self.options.iter().any(|o| o.action_id == action_id)
    }
}

/// check_for_event draws once per tick and returns at most one new race event. The triggers are
/// checked in a fixed order (safety car, weather, reliability) against disjoint bands of the same
/// draw, so they are mutually exclusive within a tick.
///
/// * `leader_lap` - Current lap of the race leader
/// * `tot_no_laps` - Number of laps of the race
pub fn check_for_event<R: Rng + ?Sized>(
    env: &Environment,
    leader_lap: u32,
    tot_no_laps: u32,
    sim_consts: &SimConstants,
    rng: &mut R,
) -> Option<RaceEvent> {
    let draw: f64 = rng.gen();

    let in_sc_window = leader_lap > sim_consts.safety_car_first_lap
        && leader_lap.saturating_add(sim_consts.safety_car_last_laps) < tot_no_laps;

    // every eligible trigger owns its own band of the draw, so each fires with its own chance
    let triggers = [
        (
            !env.safety_car && in_sc_window,
            sim_consts.safety_car_chance,
            EventKind::SafetyCar,
        ),
        (
            env.weather == WeatherState::Sunny,
            sim_consts.weather_change_chance,
            EventKind::Weather,
        ),
        (true, sim_consts.reliability_chance, EventKind::Reliability),
    ];

    let mut band_start = 0.0;
    for (eligible, chance, kind) in triggers.iter() {
        if !eligible {
            continue;
        }
        let band_end = band_start + chance;
        if draw >= band_start && draw < band_end {
            return Some(match kind {
                EventKind::SafetyCar => RaceEvent::safety_car(),
                EventKind::Weather => RaceEvent::rain_start(),
                EventKind::Reliability => RaceEvent::engine_issue(),
            });
        }
        band_start = band_end;
    }

    None
}
