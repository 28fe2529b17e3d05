use crate::core::driver::DriverPars;
use crate::core::tireset::{TireCompound, Tireset};
use crate::interfaces::gui_interface::RgbColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Engine power mode, selectable by the player (and reset by the engine cooldown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    Low,
    Medium,
    High,
    Overtake,
}

impl EngineMode {
    pub fn speed_factor(&self) -> f64 {
        match self {
            EngineMode::Low => 0.96,
            EngineMode::Medium => 1.00,
            EngineMode::High => 1.04,
            EngineMode::Overtake => 1.08,
        }
    }

    pub fn wear_factor(&self) -> f64 {
        match self {
            EngineMode::High => 1.1,
            EngineMode::Overtake => 1.3,
            _ => 1.0,
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            EngineMode::Low => "low",
            EngineMode::Medium => "medium",
            EngineMode::High => "high",
            EngineMode::Overtake => "overtake",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(EngineMode::Low),
            "medium" => Ok(EngineMode::Medium),
            "high" => Ok(EngineMode::High),
            "overtake" => Ok(EngineMode::Overtake),
            other => Err(format!("unknown engine mode {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrivingStyle {
    Conserve,
    Balanced,
    Push,
}

impl DrivingStyle {
    pub fn speed_factor(&self) -> f64 {
        match self {
            DrivingStyle::Conserve => 0.97,
            DrivingStyle::Balanced => 1.00,
            DrivingStyle::Push => 1.03,
        }
    }

    pub fn wear_factor(&self) -> f64 {
        match self {
            DrivingStyle::Conserve => 0.6,
            DrivingStyle::Balanced => 1.0,
            DrivingStyle::Push => 1.4,
        }
    }
}

impl fmt::Display for DrivingStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            DrivingStyle::Conserve => "conserve",
            DrivingStyle::Balanced => "balanced",
            DrivingStyle::Push => "push",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DrivingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conserve" => Ok(DrivingStyle::Conserve),
            "balanced" => Ok(DrivingStyle::Balanced),
            "push" => Ok(DrivingStyle::Push),
            other => Err(format!("unknown driving style {:?}", other)),
        }
    }
}

/// Finished and DNF are both terminal, a car can never be in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarStatus {
    Running,
    Finished,
    #[serde(rename = "DNF")]
    Dnf,
}

/// Static per-race factors a car inherits from its team.
/// * `pace` - Speed multiplier (staff, car ratings, setup for the player)
/// * `tire_wear` - Tire wear multiplier (race engineer)
/// * `pit_time` - Pit stop duration multiplier (pit crew, morale), 1.0 for AI cars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarFactors {
    pub pace: f64,
    pub tire_wear: f64,
    pub pit_time: f64,
}

impl Default for CarFactors {
    fn default() -> Self {
        CarFactors {
            pace: 1.0,
            tire_wear: 1.0,
            pit_time: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    pub driver_id: String,
    pub name: String,
    pub team_id: String,
    pub color: RgbColor,
    pub skill: f64,
    pub is_player: bool,
    pub factors: CarFactors,
    pub lap: u32,
    /// (%) Progress in the current lap, in [0, 100[ (exactly 100 once finished)
    pub progress: f64,
    /// Display only
    pub speed: f64,
    pub tireset: Tireset,
    pub engine_mode: EngineMode,
    pub driving_style: DrivingStyle,
    /// (s) Remaining stationary time in the pit lane, 0 if not pitting
    pub pitting: f64,
    /// Compound mounted when the current pit stop is completed
    pub pit_compound: Option<TireCompound>,
    /// (s) Gap to the leader
    pub gap: f64,
    pub status: CarStatus,
    pub cur_laptime: f64,
    pub laptimes: Vec<f64>,
}

impl Car {
    pub fn new(
        driver_pars: &DriverPars,
        team_id: &str,
        color: RgbColor,
        factors: CarFactors,
        is_player: bool,
    ) -> Car {
        Car {
            driver_id: driver_pars.id.to_owned(),
            name: driver_pars.name.to_owned(),
            team_id: team_id.to_owned(),
            color,
            skill: driver_pars.skill,
            is_player,
            factors,
            lap: 0,
            progress: 0.0,
            speed: 0.0,
            tireset: Tireset::new(TireCompound::Soft),
            engine_mode: EngineMode::Medium,
            driving_style: DrivingStyle::Balanced,
            pitting: 0.0,
            pit_compound: None,
            gap: 0.0,
            status: CarStatus::Running,
            cur_laptime: 0.0,
            laptimes: Vec::new(),
        }
    }

    /// is_active returns true if the car still takes part in the simulation.
    pub fn is_active(&self) -> bool {
        self.status == CarStatus::Running
    }

    pub fn is_finished(&self) -> bool {
        self.status == CarStatus::Finished
    }

    pub fn is_dnf(&self) -> bool {
        self.status == CarStatus::Dnf
    }

    pub fn is_pitting(&self) -> bool {
        self.pitting > 0.0
    }

    /// queue_pit sends the car into the pit lane for the given stationary time. A car that is
    /// already pitting keeps its remaining time and only changes the queued compound.
    pub fn queue_pit(&mut self, compound: TireCompound, duration: f64) {
        if !self.is_pitting() {
            self.pitting = duration;
        }
        self.pit_compound = Some(compound);
        self.speed = 0.0;
    }

    /// complete_pit mounts the queued compound (or a fresh set of the current one).
    pub fn complete_pit(&mut self) {
        let compound = self.pit_compound.take().unwrap_or(self.tireset.compound);
        self.tireset = Tireset::new(compound);
        self.pitting = 0.0;
    }

    pub fn retire(&mut self) {
        if self.is_active() {
            self.status = CarStatus::Dnf;
            self.speed = 0.0;
            self.pitting = 0.0;
            self.pit_compound = None;
        }
    }

    pub fn race_prog(&self) -> f64 {
        self.lap as f64 + self.progress / 100.0
    }

    pub fn total_time(&self) -> f64 {
        self.laptimes.iter().sum()
    }

    pub fn best_laptime(&self) -> Option<f64> {
        self.laptimes.iter().copied().fold(None, |best, t| match best {
            Some(b) if b <= t => Some(b),
            _ => Some(t),
        })
    }
}
