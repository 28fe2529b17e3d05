use crate::core::car::{Car, DrivingStyle, EngineMode};
use crate::core::decision::{self, DecisionOutcome};
use crate::core::environment::Environment;
use crate::core::events::{self, ActionId, RaceEvent};
use crate::core::grid;
use crate::core::ranking;
use crate::core::sim_constants::SimConstants;
use crate::core::tick::{self, TickContext};
use crate::core::track::Track;
use crate::error::{ControlError, DecisionError, RaceSimError};
use crate::interfaces::flavor::FlavorRequest;
use crate::post::race_result::{classify, Classification};
use crate::pre::read_sim_pars::SimPars;
use flume::Sender;
use helpers::buffer::RingBuffer;
use helpers::general::InputValueError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// * `season` - Season
/// * `player_team_id` - Team controlled by the player
/// * `grid_order` - Starting order as driver ids (result of qualifying), random by skill if absent
/// * `setup_quality` - (0 - 100) Result of the practice stage, speeds up the player cars
/// * `cars_per_team` - Number of cars entered by every AI team
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RacePars {
    pub season: u32,
    pub player_team_id: String,
    #[serde(default)]
    pub grid_order: Option<Vec<String>>,
    #[serde(default)]
    pub setup_quality: f64,
    #[serde(default = "default_cars_per_team")]
    pub cars_per_team: usize,
}

fn default_cars_per_team() -> usize {
    2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Running,
    AwaitingDecision,
    Finished,
    Abandoned,
}

/// Simulation speed multipliers selectable by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimSpeed {
    X1,
    X2,
    X4,
}

impl SimSpeed {
    pub fn multiplier(&self) -> f64 {
        match self {
            SimSpeed::X1 => 1.0,
            SimSpeed::X2 => 2.0,
            SimSpeed::X4 => 4.0,
        }
    }
}

impl Default for SimSpeed {
    fn default() -> Self {
        SimSpeed::X1
    }
}

impl fmt::Display for SimSpeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

impl FromStr for SimSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches(|c| c == 'x' || c == 'X') {
            "1" => Ok(SimSpeed::X1),
            "2" => Ok(SimSpeed::X2),
            "4" => Ok(SimSpeed::X4),
            other => Err(format!("unsupported simulation speed {:?} (use 1, 2 or 4)", other)),
        }
    }
}

/// Result of a single call of `simulate_timestep`.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing happened because the race is paused, waiting for a decision or over
    Idle,
    Advanced,
    /// The tick was completed and the race now waits for a decision
    EventRaised(RaceEvent),
    Finished,
}

#[derive(Debug)]
pub struct Race {
    pub season: u32,
    pub player_team_id: String,
    pub timestep_size: f64,
    pub cur_racetime: f64,
    pub sim_speed: SimSpeed,
    pub is_playing: bool,
    pub phase: RacePhase,
    pub track: Track,
    pub sim_consts: SimConstants,
    pub env: Environment,
    pub cars_list: Vec<Car>,
    pub active_event: Option<RaceEvent>,
    pub selected_driver: Option<String>,
    messages: RingBuffer<String>,
    t_last_commentary: f64,
    tx_flavor: Option<Sender<FlavorRequest>>,
    rng: StdRng,
    classification: Option<Classification>,
}

impl Race {
    /// new creates a race from the simulation parameters. The race starts paused.
    ///
    /// * `timestep_size` - (s) Simulated time per tick at 1x speed
    pub fn new(
        sim_pars: &SimPars,
        sim_consts: &SimConstants,
        timestep_size: f64,
    ) -> Result<Race, RaceSimError> {
        Race::with_rng(sim_pars, sim_consts, timestep_size, StdRng::from_entropy())
    }

    /// with_seed creates a race with a reproducible random number stream.
    pub fn with_seed(
        sim_pars: &SimPars,
        sim_consts: &SimConstants,
        timestep_size: f64,
        seed: u64,
    ) -> Result<Race, RaceSimError> {
        Race::with_rng(sim_pars, sim_consts, timestep_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        sim_pars: &SimPars,
        sim_consts: &SimConstants,
        timestep_size: f64,
        mut rng: StdRng,
    ) -> Result<Race, RaceSimError> {
        sim_consts.validate()?;
        for team in sim_pars.teams.iter() {
            team.validate()?;
        }
        for driver in sim_pars.free_drivers.iter() {
            driver.validate()?;
        }
        if !(timestep_size > 0.0) {
            return Err(InputValueError(format!(
                "timestep size must be positive, got {}",
                timestep_size
            ))
            .into());
        }

        let track = Track::new(&sim_pars.track_pars)?;
        let cars_list = grid::build_field(
            &sim_pars.race_pars,
            &sim_pars.teams,
            &sim_pars.free_drivers,
            sim_consts,
            &mut rng,
        )?;

        let selected_driver = cars_list
            .iter()
            .find(|c| c.is_player)
            .map(|c| c.driver_id.to_owned());

        let mut messages = RingBuffer::new(5);
        messages.push("Drivers are lining up on the grid...".to_owned());

        info!(
            "race created: {} ({} laps), {} cars, player team {}",
            track.name,
            track.laps,
            cars_list.len(),
            sim_pars.race_pars.player_team_id
        );

        Ok(Race {
            season: sim_pars.race_pars.season,
            player_team_id: sim_pars.race_pars.player_team_id.to_owned(),
            timestep_size,
            cur_racetime: 0.0,
            sim_speed: SimSpeed::X1,
            is_playing: false,
            phase: RacePhase::Running,
            track,
            sim_consts: sim_consts.to_owned(),
            env: Environment::default(),
            cars_list,
            active_event: None,
            selected_driver,
            messages,
            t_last_commentary: 0.0,
            tx_flavor: None,
            rng,
            classification: None,
        })
    }

    /// with_flavor_channel attaches the channel commentary and illustration requests are sent to.
    pub fn with_flavor_channel(mut self, tx: Sender<FlavorRequest>) -> Race {
        self.tx_flavor = Some(tx);
        self
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_timestep advances the race by one tick. Nothing is changed while the race is
    /// paused, waiting for a decision, or over. The new car list replaces the old one as a whole.
    pub fn simulate_timestep(&mut self) -> TickOutcome {
        if self.phase != RacePhase::Running || !self.is_playing {
            return TickOutcome::Idle;
        }

        let dt = self.timestep_size * self.sim_speed.multiplier();
        self.cur_racetime += dt;

        // environment
        let mut env = tick::update_environment(&self.env, dt, &self.sim_consts, &mut self.rng);
        if self.env.safety_car && !env.safety_car {
            info!("green flag at {:.1}s, safety car in", self.cur_racetime);
            self.messages
                .push("GREEN FLAG! The safety car comes in.".to_owned());
        }

        // race events (only one at a time and only before the leader finished)
        let event = match self.cars_list.first() {
            Some(leader) if self.active_event.is_none() && !leader.is_finished() => {
                events::check_for_event(
                    &env,
                    leader.lap,
                    self.track.laps,
                    &self.sim_consts,
                    &mut self.rng,
                )
            }
            _ => None,
        };

        if let Some(event) = &event {
            if event.kind == events::EventKind::SafetyCar {
                env.safety_car = true;
                info!("safety car deployed at {:.1}s", self.cur_racetime);
            }
        }

        // cars
        let ctx = TickContext {
            track: &self.track,
            sim_consts: &self.sim_consts,
            env: &env,
            dt,
        };
        let cars_next = tick::advance_cars(&self.cars_list, &ctx, &mut self.rng);
        self.log_car_changes(&cars_next);

        let mut cars_next = ranking::rank(cars_next);
        ranking::compute_gaps(&mut cars_next, self.track.base_lap_time);

        self.cars_list = cars_next;
        self.env = env;

        self.request_commentary();

        if self.all_cars_done() {
            if event.is_some() {
                debug!("race event dropped, all cars are done");
            }
            self.finalize();
            return TickOutcome::Finished;
        }

        match event {
            Some(event) => {
                info!("race event {} at {:.1}s, waiting for decision", event.id, self.cur_racetime);
                self.request_illustration(&event);
                self.active_event = Some(event.to_owned());
                self.phase = RacePhase::AwaitingDecision;
                self.is_playing = false;
                TickOutcome::EventRaised(event)
            }
            None => TickOutcome::Advanced,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // DECISIONS -----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// resolve applies the chosen option of the active event to the player cars, clears the event
    /// and resumes the race. Invalid calls leave the race untouched.
    pub fn resolve(&mut self, action_id: ActionId) -> Result<DecisionOutcome, DecisionError> {
        let event = match &self.active_event {
            Some(event) if self.phase == RacePhase::AwaitingDecision => event,
            _ => return Err(DecisionError::NoActiveEvent),
        };

        let outcome = decision::apply_decision(
            event,
            action_id,
            &mut self.cars_list,
            &mut self.env,
            &self.sim_consts,
            &mut self.rng,
        )?;

        let kind = event.kind;
        info!("race event {} resolved with {}", event.id, action_id);
        self.active_event = None;

        for driver_id in outcome.pitted.iter() {
            debug!("{} queued for a pit stop", driver_id);
        }
        for driver_id in outcome.retired.iter() {
            let name = self.driver_name(driver_id);
            info!("{} retired after ignoring an engine issue", name);
            self.messages.push(format!("{} retires! Engine failure.", name));
        }
        if outcome.weather_changed {
            info!("weather changed to rain");
            self.messages
                .push("It's raining! The track is getting slippery.".to_owned());
        }
        if kind == events::EventKind::SafetyCar {
            self.messages.push("Safety car period started.".to_owned());
        }

        if self.all_cars_done() {
            self.finalize();
        } else {
            self.phase = RacePhase::Running;
            self.is_playing = true;
        }

        Ok(outcome)
    }

    /// resolve_str resolves the active event with an action id given as text, e.g. "pit_inter".
    pub fn resolve_str(&mut self, action_id: &str) -> Result<DecisionOutcome, DecisionError> {
        let action_id = action_id
            .parse::<ActionId>()
            .map_err(DecisionError::UnknownAction)?;
        self.resolve(action_id)
    }

    // ---------------------------------------------------------------------------------------------
    // PLAYER CONTROLS -----------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// play resumes ticking. It has no effect while a decision is pending.
    pub fn play(&mut self) -> Result<(), ControlError> {
        self.check_not_over()?;
        if self.phase == RacePhase::Running {
            self.is_playing = true;
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), ControlError> {
        self.check_not_over()?;
        self.is_playing = false;
        Ok(())
    }

    pub fn toggle_play(&mut self) -> Result<(), ControlError> {
        if self.is_playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn set_sim_speed(&mut self, sim_speed: SimSpeed) -> Result<(), ControlError> {
        self.check_not_over()?;
        self.sim_speed = sim_speed;
        Ok(())
    }

    /// select_car selects a car for telemetry display. Every car can be selected.
    pub fn select_car(&mut self, driver_id: &str) -> Result<(), ControlError> {
        if !self.cars_list.iter().any(|c| c.driver_id == driver_id) {
            return Err(ControlError::UnknownDriver(driver_id.to_owned()));
        }
        self.selected_driver = Some(driver_id.to_owned());
        Ok(())
    }

    /// set_strategy changes driving style and engine mode of the selected car. Only player cars
    /// still in the race can be controlled.
    pub fn set_strategy(
        &mut self,
        driving_style: DrivingStyle,
        engine_mode: EngineMode,
    ) -> Result<(), ControlError> {
        self.check_not_over()?;
        let selected = self
            .selected_driver
            .as_deref()
            .ok_or(ControlError::NoSelection)?;
        let car = self
            .cars_list
            .iter_mut()
            .find(|c| c.driver_id == selected)
            .ok_or_else(|| ControlError::UnknownDriver(selected.to_owned()))?;

        if !car.is_player || !car.is_active() {
            return Err(ControlError::NotPlayerCar(car.driver_id.to_owned()));
        }

        debug!(
            "{} switches to {} / engine {}",
            car.driver_id, driving_style, engine_mode
        );
        car.driving_style = driving_style;
        car.engine_mode = engine_mode;
        Ok(())
    }

    /// quit abandons the race. The race state is discarded and no results are produced.
    pub fn quit(&mut self, confirmed: bool) -> Result<(), ControlError> {
        if !confirmed {
            return Err(ControlError::QuitNotConfirmed);
        }
        self.check_not_over()?;

        warn!("race abandoned at {:.1}s", self.cur_racetime);
        self.phase = RacePhase::Abandoned;
        self.is_playing = false;
        self.active_event = None;
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // FINALIZATION --------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// finalize classifies the race once every car finished or retired. Repeated calls return the
    /// same classification. Returns None if cars are still running or the race was abandoned.
    pub fn finalize(&mut self) -> Option<&Classification> {
        if self.phase == RacePhase::Abandoned || !self.all_cars_done() {
            return None;
        }

        if self.classification.is_none() {
            self.phase = RacePhase::Finished;
            self.is_playing = false;
            self.active_event = None;
            if let Some(winner) = self.cars_list.first() {
                info!(
                    "race finished after {:.1}s, winner {} ({})",
                    self.cur_racetime, winner.name, winner.team_id
                );
            }
        }

        let cars_list = &self.cars_list;
        let weather = self.env.weather;
        Some(
            self.classification
                .get_or_insert_with(|| classify(cars_list, weather)),
        )
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn all_cars_done(&self) -> bool {
        self.cars_list.iter().all(|c| !c.is_active())
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, RacePhase::Finished | RacePhase::Abandoned)
    }

    pub fn leader(&self) -> Option<&Car> {
        self.cars_list.first()
    }

    pub fn leader_lap(&self) -> u32 {
        self.leader().map(|c| c.lap).unwrap_or(0)
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    /// messages returns the most recent status messages, newest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.to_vec()
    }

    pub fn player_cars(&self) -> impl Iterator<Item = &Car> {
        self.cars_list.iter().filter(|c| c.is_player)
    }

    pub fn get_car(&self, driver_id: &str) -> Option<&Car> {
        self.cars_list.iter().find(|c| c.driver_id == driver_id)
    }

    fn check_not_over(&self) -> Result<(), ControlError> {
        if self.is_over() {
            Err(ControlError::RaceOver)
        } else {
            Ok(())
        }
    }

    fn driver_name(&self, driver_id: &str) -> String {
        self.get_car(driver_id)
            .map(|c| c.name.to_owned())
            .unwrap_or_else(|| driver_id.to_owned())
    }

    fn log_car_changes(&self, cars_next: &[Car]) {
        for (prev, next) in self.cars_list.iter().zip(cars_next.iter()) {
            if !prev.is_pitting() && next.is_pitting() {
                debug!("{} enters the pits for {:?}", next.driver_id, next.pit_compound);
            }
            if next.lap > prev.lap {
                if let Some(laptime) = next.laptimes.last() {
                    debug!("{} completed lap {} in {:.3}s", next.driver_id, next.lap, laptime);
                }
            }
            if !prev.is_finished() && next.is_finished() {
                debug!("{} takes the chequered flag", next.driver_id);
            }
        }
    }

    /// request_commentary sends a commentary request at most once per commentary interval and
    /// only if the random gate opens.
    fn request_commentary(&mut self) {
        if self.cur_racetime - self.t_last_commentary < self.sim_consts.commentary_interval {
            return;
        }
        if !self.rng.gen_bool(self.sim_consts.commentary_chance) {
            return;
        }
        self.t_last_commentary = self.cur_racetime;

        let (tx, leader) = match (&self.tx_flavor, self.cars_list.first()) {
            (Some(tx), Some(leader)) => (tx, leader),
            _ => return,
        };

        let request = FlavorRequest::Commentary {
            lap: leader.lap,
            leader: leader.name.to_owned(),
            condition: self.env.condition().map(|c| c.to_owned()),
        };
        if tx.try_send(request).is_err() {
            debug!("commentary request dropped, flavor channel unavailable");
        }
    }

    fn request_illustration(&self, event: &RaceEvent) {
        if let Some(tx) = &self.tx_flavor {
            let request = FlavorRequest::Illustration {
                key: event.kind.illustration_key().to_owned(),
                context: event.description.to_owned(),
            };
            if tx.try_send(request).is_err() {
                debug!("illustration request dropped, flavor channel unavailable");
            }
        }
    }
}
