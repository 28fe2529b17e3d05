use crate::core::car::{DrivingStyle, EngineMode};
use crate::core::race::{Race, SimSpeed};
use crate::error::{ControlError, DecisionError};
use std::str::FromStr;
use thiserror::Error;

/// RaceControl is a player input. Controls are applied between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum RaceControl {
    Play,
    Pause,
    TogglePlay,
    SetSpeed(SimSpeed),
    Select(String),
    SetStrategy {
        driving_style: DrivingStyle,
        engine_mode: EngineMode,
    },
    Decide(String),
    Quit {
        confirmed: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("could not parse command: {0}")]
    Parse(String),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

impl FromStr for RaceControl {
    type Err = CommandError;

    /// Parses text commands such as `play`, `speed 4`, `select d1`, `strategy push overtake`,
    /// `decide pit_inter` or `quit yes`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();

        let control = match tokens.as_slice() {
            ["play"] => RaceControl::Play,
            ["pause"] => RaceControl::Pause,
            ["p"] | ["toggle"] => RaceControl::TogglePlay,
            ["speed", speed] => RaceControl::SetSpeed(speed.parse().map_err(CommandError::Parse)?),
            ["select", driver_id] => RaceControl::Select((*driver_id).to_owned()),
            ["strategy", style, mode] => RaceControl::SetStrategy {
                driving_style: style.parse().map_err(CommandError::Parse)?,
                engine_mode: mode.parse().map_err(CommandError::Parse)?,
            },
            ["decide", action_id] => RaceControl::Decide((*action_id).to_owned()),
            ["quit"] => RaceControl::Quit { confirmed: false },
            ["quit", "yes"] | ["quit", "y"] => RaceControl::Quit { confirmed: true },
            _ => return Err(CommandError::Parse(s.trim().to_owned())),
        };

        Ok(control)
    }
}

/// apply_control applies a player input to the race. Rejected inputs leave the race untouched.
pub fn apply_control(race: &mut Race, control: &RaceControl) -> Result<(), CommandError> {
    match control {
        RaceControl::Play => race.play()?,
        RaceControl::Pause => race.pause()?,
        RaceControl::TogglePlay => race.toggle_play()?,
        RaceControl::SetSpeed(sim_speed) => race.set_sim_speed(*sim_speed)?,
        RaceControl::Select(driver_id) => race.select_car(driver_id)?,
        RaceControl::SetStrategy {
            driving_style,
            engine_mode,
        } => race.set_strategy(*driving_style, *engine_mode)?,
        RaceControl::Decide(action_id) => {
            race.resolve_str(action_id)?;
        }
        RaceControl::Quit { confirmed } => race.quit(*confirmed)?,
    }
    Ok(())
}
