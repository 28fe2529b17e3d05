use crate::core::events::{ActionId, RaceEvent};
use crate::core::race::{Race, RacePhase, TickOutcome};
use crate::core::sim_constants::SimConstants;
use crate::interfaces::controls::{apply_control, RaceControl};
use crate::interfaces::gui_interface::{RaceState, MAX_GUI_UPDATE_FREQUENCY};
use crate::post::race_result::Classification;
use crate::pre::read_sim_pars::SimPars;
use anyhow::Context;
use flume::{Receiver, Sender};
use std::str::FromStr;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Wall time between two ticks in real-time mode.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// A race must end within this multiple of its nominal duration.
const MAX_RACE_DURATION_FACTOR: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub enum RaceOutcome {
    Finished(Classification),
    /// Quit by the player, no results
    Abandoned,
}

impl RaceOutcome {
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            RaceOutcome::Finished(classification) => Some(classification),
            RaceOutcome::Abandoned => None,
        }
    }
}

/// DecisionMaker answers race events when no player is at the controls.
pub trait DecisionMaker {
    fn decide(&mut self, race: &Race, event: &RaceEvent) -> ActionId;
}

/// DecisionPolicy is a fixed answer scheme: `Cautious` picks the first (safe) option of an event,
/// `Bold` the last (risky) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPolicy {
    Cautious,
    Bold,
}

impl DecisionMaker for DecisionPolicy {
    fn decide(&mut self, _race: &Race, event: &RaceEvent) -> ActionId {
        let option = match self {
            DecisionPolicy::Cautious => event.options.first(),
            DecisionPolicy::Bold => event.options.last(),
        };
        option.map(|o| o.action_id).unwrap_or(ActionId::StayOut)
    }
}

impl FromStr for DecisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cautious" => Ok(DecisionPolicy::Cautious),
            "bold" => Ok(DecisionPolicy::Bold),
            other => Err(format!("unknown decision policy {:?} (use cautious or bold)", other)),
        }
    }
}

fn race_outcome(race: &Race) -> RaceOutcome {
    match (race.phase, race.classification()) {
        (RacePhase::Finished, Some(classification)) => {
            RaceOutcome::Finished(classification.to_owned())
        }
        _ => RaceOutcome::Abandoned,
    }
}

/// run_headless simulates the race to completion as fast as possible. Race events are answered
/// by the decision maker.
pub fn run_headless(race: &mut Race, decider: &mut dyn DecisionMaker) -> anyhow::Result<RaceOutcome> {
    let t_race_max = race.track.laps as f64 * race.track.base_lap_time * MAX_RACE_DURATION_FACTOR;
    let mut leader_lap = 0;

    race.play()?;

    while !race.is_over() {
        match race.simulate_timestep() {
            TickOutcome::EventRaised(event) => {
                let action_id = decider.decide(race, &event);
                debug!("answering race event {} with {}", event.id, action_id);
                race.resolve(action_id)?;
            }
            TickOutcome::Idle => {
                // paused from outside, e.g. by a previous decision that ended the race
                if !race.is_over() {
                    race.play()?;
                }
            }
            TickOutcome::Advanced | TickOutcome::Finished => {}
        }

        if race.leader_lap() > leader_lap {
            leader_lap = race.leader_lap();
            debug!("leader completed lap {} at {:.1}s", leader_lap, race.cur_racetime);
        }

        if race.cur_racetime > t_race_max {
            anyhow::bail!(
                "Race did not finish within {:.0}s of simulated time!",
                t_race_max
            );
        }
    }

    Ok(race_outcome(race))
}

/// run_realtime simulates the race in real time. Player controls are applied between ticks, and
/// a snapshot of the race is published after every tick and every control. The loop blocks while
/// the race is paused or waiting for a decision. If the control channel is closed, the race is
/// abandoned.
pub fn run_realtime(
    race: &mut Race,
    rx_controls: &Receiver<RaceControl>,
    tx_state: &Sender<RaceState>,
    tick_interval: Duration,
) -> anyhow::Result<RaceOutcome> {
    let t_min_publish = Duration::from_secs_f64(1.0 / MAX_GUI_UPDATE_FREQUENCY);
    let mut t_last_publish = Instant::now();

    publish(race, tx_state)?;

    while !race.is_over() {
        let t_start = Instant::now();

        if !race.is_playing {
            // nothing to simulate, wait for the player
            match rx_controls.recv() {
                Ok(control) => handle_control(race, &control),
                Err(_) => {
                    warn!("control channel closed, abandoning race");
                    race.quit(true)?;
                }
            }
            publish(race, tx_state)?;
            t_last_publish = Instant::now();
            continue;
        }

        let mut controls_applied = false;
        for control in rx_controls.try_iter() {
            handle_control(race, &control);
            controls_applied = true;
        }
        if race.is_over() || !race.is_playing {
            publish(race, tx_state)?;
            t_last_publish = Instant::now();
            continue;
        }

        let outcome = race.simulate_timestep();
        if controls_applied
            || outcome != TickOutcome::Advanced
            || t_last_publish.elapsed() >= t_min_publish
        {
            publish(race, tx_state)?;
            t_last_publish = Instant::now();
        }

        if let TickOutcome::EventRaised(event) = &outcome {
            info!("{}: {}", event.title, event.description);
        }

        // sleep until the tick interval is over in real time as well
        match tick_interval.checked_sub(t_start.elapsed()) {
            Some(t_sleep) if !race.is_over() && race.is_playing => sleep(t_sleep),
            Some(_) => {}
            None => warn!("Could not keep up with real-time!"),
        }
    }

    publish(race, tx_state)?;
    Ok(race_outcome(race))
}

fn publish(race: &Race, tx_state: &Sender<RaceState>) -> anyhow::Result<()> {
    tx_state
        .send(RaceState::from_race(race))
        .context("Failed to send race state to the presenter!")
}

fn handle_control(race: &mut Race, control: &RaceControl) {
    debug!("control {:?}", control);
    if let Err(e) = apply_control(race, control) {
        warn!("control {:?} rejected: {}", control, e);
    }
}

/// handle_race creates and simulates a race on the basis of the inserted parameters without a
/// player at the controls, and returns the outcome for post-processing.
pub fn handle_race(
    sim_pars: &SimPars,
    sim_consts: &SimConstants,
    timestep_size: f64,
    decider: &mut dyn DecisionMaker,
    seed: Option<u64>,
) -> anyhow::Result<RaceOutcome> {
    let mut race = match seed {
        Some(seed) => Race::with_seed(sim_pars, sim_consts, timestep_size, seed),
        None => Race::new(sim_pars, sim_consts, timestep_size),
    }
    .context("Failed to set up the race!")?;

    run_headless(&mut race, decider)
}
