use crate::core::car::{Car, EngineMode};
use crate::core::environment::{Environment, WeatherState};
use crate::core::events::{ActionId, EventKind, RaceEvent};
use crate::core::sim_constants::SimConstants;
use crate::core::tireset::TireCompound;
use crate::error::DecisionError;
use rand::Rng;

/// DecisionOutcome lists what a resolution changed beyond the car modes, for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionOutcome {
    pub pitted: Vec<String>,
    pub retired: Vec<String>,
    pub weather_changed: bool,
}

/// apply_decision applies the chosen option of an event to every active player car and to the
/// environment. An action the event does not offer is rejected before anything is changed.
pub fn apply_decision<R: Rng + ?Sized>(
    event: &RaceEvent,
    action_id: ActionId,
    cars: &mut [Car],
    env: &mut Environment,
    sim_consts: &SimConstants,
    rng: &mut R,
) -> Result<DecisionOutcome, DecisionError> {
    if !event.offers(action_id) {
        return Err(DecisionError::ActionNotOffered(action_id));
    }

    let mut outcome = DecisionOutcome::default();

    for car in cars.iter_mut().filter(|c| c.is_player && c.is_active()) {
        match action_id {
            ActionId::PitForFreshTires => {
                car.queue_pit(TireCompound::Soft, sim_consts.pit_stop_duration);
                outcome.pitted.push(car.driver_id.to_owned());
            }
            ActionId::PitForInters => {
                car.queue_pit(TireCompound::Inter, sim_consts.pit_stop_duration);
                outcome.pitted.push(car.driver_id.to_owned());
            }
            ActionId::ReduceEngineMode => car.engine_mode = EngineMode::Low,
            ActionId::IgnoreIssue => {
                if rng.gen_bool(sim_consts.dnf_on_ignore_chance) {
                    car.retire();
                    outcome.retired.push(car.driver_id.to_owned());
                }
            }
            ActionId::StayOut => {}
        }
    }

    // the rain arrives whatever the player chose
    if event.kind == EventKind::Weather && env.weather != WeatherState::Rain {
        env.weather = WeatherState::Rain;
        outcome.weather_changed = true;
    }

    Ok(outcome)
}
