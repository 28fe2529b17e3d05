use crate::core::events::ActionId;
use crate::core::track_path::TrackPathError;
use helpers::general::InputValueError;
use thiserror::Error;

/// RaceSimError covers everything that can go wrong while building a race from its inputs.
#[derive(Debug, Error)]
pub enum RaceSimError {
    #[error("invalid track path for track {track}: {source}")]
    InvalidTrack {
        track: String,
        #[source]
        source: TrackPathError,
    },
    #[error("team {team} has an invalid colour {color:?}")]
    InvalidColor { team: String, color: String },
    #[error("player team {0} is not part of the team list")]
    UnknownPlayerTeam(String),
    #[error("race needs at least one car and one lap")]
    EmptyRace,
    #[error(transparent)]
    InvalidParameter(#[from] InputValueError),
}

/// DecisionError is returned by the decision resolver. Vehicle and environment state is left
/// untouched in every case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    #[error("there is no race event awaiting a decision")]
    NoActiveEvent,
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("action {0} is not offered by the active event")]
    ActionNotOffered(ActionId),
}

/// ControlError is returned by the player-facing race controls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("driver {0} is not part of this race")]
    UnknownDriver(String),
    #[error("driver {0} does not drive for the player team")]
    NotPlayerCar(String),
    #[error("no player car is selected")]
    NoSelection,
    #[error("quitting the race requires confirmation")]
    QuitNotConfirmed,
    #[error("the race is already over")]
    RaceOver,
}
