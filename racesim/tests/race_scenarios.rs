use approx::assert_relative_eq;
use racesim::core::car::{CarStatus, EngineMode};
use racesim::core::decision::apply_decision;
use racesim::core::environment::{Environment, WeatherState};
use racesim::core::events::{ActionId, EventKind, RaceEvent};
use racesim::core::handle_race::{run_headless, run_realtime, DecisionPolicy, RaceOutcome};
use racesim::core::race::{Race, RacePhase, TickOutcome};
use racesim::core::ranking::cmp_running_order;
use racesim::core::sim_constants::SimConstants;
use racesim::core::team::{StaffPars, TeamPars};
use racesim::core::tick::{calc_speed, TickContext};
use racesim::error::{ControlError, DecisionError, RaceSimError};
use racesim::interfaces::controls::RaceControl;
use racesim::interfaces::flavor::FlavorRequest;
use racesim::post::race_result::points_for_position;
use racesim::pre::read_sim_pars::SimPars;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

const MAX_TICKS: usize = 100_000;

/// Two teams with two drivers each on a rectangular track.
fn sim_pars(laps: u32) -> SimPars {
    let json = format!(
        r##"{{
            "race_pars": {{"season": 2025, "player_team_id": "apex", "cars_per_team": 2}},
            "track_pars": {{"id": "oval", "name": "Oval", "laps": {}, "base_lap_time": 80.0,
                           "path": "M 0 0 L 100 0 L 100 50 L 0 50 Z"}},
            "teams": [
                {{"id": "apex", "name": "Apex Racing", "color": "#ef4444",
                  "drivers": [{{"id": "p1", "name": "Player One", "skill": 80.0}},
                              {{"id": "p2", "name": "Player Two", "skill": 78.0}}]}},
                {{"id": "merc", "name": "Silver Arrows", "color": "#14b8a6",
                  "drivers": [{{"id": "m1", "name": "Rival One", "skill": 82.0}},
                              {{"id": "m2", "name": "Rival Two", "skill": 76.0}}]}}
            ]
        }}"##,
        laps
    );
    serde_json::from_str(&json).unwrap()
}

/// Constants without any random race event, AI pit or engine cooldown.
fn quiet_consts() -> SimConstants {
    SimConstants {
        safety_car_chance: 0.0,
        weather_change_chance: 0.0,
        reliability_chance: 0.0,
        overtake_cooldown_chance: 0.0,
        ai_rain_pit_chance: 0.0,
        ai_sc_pit_chance: 0.0,
        ..SimConstants::default()
    }
}

fn assert_race_invariants(race: &Race, last_laps: &mut HashMap<String, u32>) {
    let cars = &race.cars_list;

    if let Some(leader) = cars.first() {
        assert_eq!(leader.gap, 0.0);
    }
    for pair in cars.windows(2) {
        assert_ne!(cmp_running_order(&pair[0], &pair[1]), Ordering::Greater);
    }

    for car in cars.iter() {
        assert!(car.gap >= 0.0, "negative gap for {}", car.driver_id);
        if car.is_pitting() {
            assert_eq!(car.speed, 0.0, "{} moves while pitting", car.driver_id);
        }
        if car.is_finished() {
            assert!(car.lap >= race.track.laps);
        }
        if car.is_dnf() {
            assert_eq!(car.speed, 0.0);
        }
        if car.is_finished() {
            assert_eq!(car.progress, 100.0);
        } else {
            assert!((0.0..100.0).contains(&car.progress));
        }

        let last_lap = last_laps.entry(car.driver_id.to_owned()).or_insert(0);
        assert!(car.lap >= *last_lap, "lap count of {} decreased", car.driver_id);
        *last_lap = car.lap;
    }
}

#[test]
fn two_identical_cars_share_the_first_two_positions() {
    let sim_pars: SimPars = serde_json::from_str(
        r##"{
            "race_pars": {"season": 2025, "player_team_id": "apex", "cars_per_team": 1},
            "track_pars": {"id": "oval", "name": "Oval", "laps": 1, "base_lap_time": 80.0,
                           "path": "M 0 0 L 100 0 L 100 50 L 0 50 Z"},
            "teams": [
                {"id": "apex", "name": "Apex Racing", "color": "#ef4444",
                 "drivers": [{"id": "a", "name": "Driver A", "skill": 80.0}]},
                {"id": "merc", "name": "Silver Arrows", "color": "#14b8a6",
                 "drivers": [{"id": "b", "name": "Driver B", "skill": 80.0}]}
            ]
        }"##,
    )
    .unwrap();
    let mut race = Race::with_seed(&sim_pars, &quiet_consts(), 1.0, 7).unwrap();
    assert_eq!(race.cars_list.len(), 2);

    let outcome = run_headless(&mut race, &mut DecisionPolicy::Cautious).unwrap();
    let classification = match outcome {
        RaceOutcome::Finished(classification) => classification,
        RaceOutcome::Abandoned => panic!("race was abandoned"),
    };

    assert!(race.cars_list.iter().all(|c| c.status == CarStatus::Finished));
    assert_eq!(classification.results.len(), 2);
    assert_ne!(
        classification.results[0].driver_id,
        classification.results[1].driver_id
    );
    assert_eq!(classification.total_points(), 25 + 18);
    assert_eq!(classification.results[0].position, 1);
    assert_eq!(classification.results[1].position, 2);
}

#[test]
fn worn_out_tires_get_the_heavy_penalty() {
    let sim_consts = quiet_consts();
    let race = Race::with_seed(&sim_pars(3), &sim_consts, 1.0, 1).unwrap();
    let ctx = TickContext {
        track: &race.track,
        sim_consts: &race.sim_consts,
        env: &race.env,
        dt: 1.0,
    };

    let mut car = race.cars_list[0].to_owned();
    car.tireset.health = 50.0;
    let v_fresh = calc_speed(&car, &ctx);
    car.tireset.health = 10.0;
    let v_worn = calc_speed(&car, &ctx);
    car.tireset.health = -1.0;
    let v_dead = calc_speed(&car, &ctx);

    assert_relative_eq!(v_worn / v_fresh, 0.95, epsilon = 1e-12);
    assert_relative_eq!(v_dead / v_fresh, 0.60, epsilon = 1e-12);
}

#[test]
fn weather_stays_sunny_until_the_decision_is_made() {
    let sim_consts = SimConstants {
        weather_change_chance: 1.0,
        ..quiet_consts()
    };
    let mut race = Race::with_seed(&sim_pars(5), &sim_consts, 1.0, 3).unwrap();
    race.play().unwrap();

    let event = match race.simulate_timestep() {
        TickOutcome::EventRaised(event) => event,
        other => panic!("expected a race event, got {:?}", other),
    };
    assert_eq!(event.kind, EventKind::Weather);
    assert_eq!(race.phase, RacePhase::AwaitingDecision);
    assert!(!race.is_playing);
    assert_eq!(race.env.weather, WeatherState::Sunny);

    // paused while the event is open
    let t_event = race.cur_racetime;
    assert_eq!(race.simulate_timestep(), TickOutcome::Idle);
    assert_eq!(race.play(), Ok(()));
    assert!(!race.is_playing);
    assert_eq!(race.cur_racetime, t_event);
    assert_eq!(race.env.weather, WeatherState::Sunny);

    race.resolve(ActionId::StayOut).unwrap();
    assert_eq!(race.env.weather, WeatherState::Rain);
    assert_eq!(race.phase, RacePhase::Running);
    assert!(race.is_playing);
    assert!(race.active_event.is_none());
    assert!(race.player_cars().all(|c| !c.is_pitting()));
}

#[test]
fn invalid_resolutions_leave_the_race_untouched() {
    let sim_consts = SimConstants {
        weather_change_chance: 1.0,
        ..quiet_consts()
    };
    let mut race = Race::with_seed(&sim_pars(5), &sim_consts, 1.0, 3).unwrap();
    assert_eq!(
        race.resolve(ActionId::StayOut),
        Err(DecisionError::NoActiveEvent)
    );

    race.play().unwrap();
    race.simulate_timestep();
    let cars_before = race.cars_list.to_owned();

    assert_eq!(
        race.resolve(ActionId::IgnoreIssue),
        Err(DecisionError::ActionNotOffered(ActionId::IgnoreIssue))
    );
    assert!(matches!(
        race.resolve_str("warp_drive"),
        Err(DecisionError::UnknownAction(_))
    ));
    assert_eq!(race.phase, RacePhase::AwaitingDecision);
    assert_eq!(race.env.weather, WeatherState::Sunny);
    assert_eq!(race.cars_list, cars_before);

    race.resolve_str("pit_inter").unwrap();
    assert!(race.player_cars().all(|c| c.is_pitting()));
}

#[test]
fn ignoring_an_engine_issue_retires_at_the_configured_rate() {
    let sim_consts = quiet_consts();
    let race = Race::with_seed(&sim_pars(5), &sim_consts, 1.0, 1).unwrap();
    let event = RaceEvent::engine_issue();
    let mut rng = StdRng::seed_from_u64(42);

    let no_trials = 5000;
    let mut no_dnfs = 0;
    let mut no_player_cars = 0;
    for _ in 0..no_trials {
        let mut cars = race.cars_list.to_owned();
        let mut env = Environment::default();
        apply_decision(&event, ActionId::IgnoreIssue, &mut cars, &mut env, &sim_consts, &mut rng)
            .unwrap();

        no_player_cars += cars.iter().filter(|c| c.is_player).count();
        no_dnfs += cars.iter().filter(|c| c.is_dnf()).count();
        assert!(cars.iter().filter(|c| !c.is_player).all(|c| c.is_active()));
    }

    let dnf_rate = no_dnfs as f64 / no_player_cars as f64;
    assert_relative_eq!(dnf_rate, sim_consts.dnf_on_ignore_chance, epsilon = 0.03);
}

#[test]
fn reducing_the_engine_mode_is_deterministic() {
    let sim_consts = quiet_consts();
    let race = Race::with_seed(&sim_pars(5), &sim_consts, 1.0, 1).unwrap();
    let event = RaceEvent::engine_issue();

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut cars = race.cars_list.to_owned();
        let mut env = Environment::default();
        let outcome = apply_decision(
            &event,
            ActionId::ReduceEngineMode,
            &mut cars,
            &mut env,
            &sim_consts,
            &mut rng,
        )
        .unwrap();

        assert!(outcome.retired.is_empty());
        for car in cars.iter() {
            if car.is_player {
                assert_eq!(car.engine_mode, EngineMode::Low);
            } else {
                assert_eq!(car.engine_mode, EngineMode::Medium);
            }
        }
    }
}

#[test]
fn pit_stops_get_shorter_with_morale_and_pit_crew() {
    let sim_consts = SimConstants::default();
    let team = |morale: f64, pit_crew_chief: bool| TeamPars {
        id: "apex".to_owned(),
        name: "Apex Racing".to_owned(),
        color: "#ef4444".to_owned(),
        car: Default::default(),
        drivers: vec![],
        staff: StaffPars {
            pit_crew_chief,
            ..StaffPars::default()
        },
        morale,
        performance_factor: 1.0,
    };

    for pit_crew_chief in [false, true] {
        let mut last = f64::INFINITY;
        for morale in [0.0, 25.0, 50.0, 75.0, 100.0] {
            let factor = team(morale, pit_crew_chief).pit_time_factor(&sim_consts);
            assert!(factor > 0.0);
            assert!(factor < last, "no improvement at morale {}", morale);
            last = factor;
        }
    }
    for morale in [0.0, 50.0, 100.0] {
        assert!(
            team(morale, true).pit_time_factor(&sim_consts)
                < team(morale, false).pit_time_factor(&sim_consts)
        );
    }

    // the factor reaches the player cars only
    let mut sim_pars = sim_pars(3);
    sim_pars.teams[0].morale = 100.0;
    sim_pars.teams[0].staff.pit_crew_chief = true;
    let race = Race::with_seed(&sim_pars, &sim_consts, 1.0, 1).unwrap();
    for car in race.cars_list.iter() {
        if car.is_player {
            assert_relative_eq!(
                car.factors.pit_time,
                sim_pars.teams[0].pit_time_factor(&sim_consts)
            );
        } else {
            assert_relative_eq!(car.factors.pit_time, 1.0);
        }
    }
}

#[test]
fn full_race_keeps_its_invariants() {
    let sim_consts = SimConstants {
        safety_car_chance: 0.01,
        weather_change_chance: 0.004,
        reliability_chance: 0.004,
        ..SimConstants::default()
    };

    for (seed, action_index) in [(1, 0), (2, 1), (3, 0), (4, 1)] {
        let mut race = Race::with_seed(&sim_pars(6), &sim_consts, 1.0, seed).unwrap();
        let mut last_laps = HashMap::new();
        race.play().unwrap();

        let mut no_ticks = 0;
        while !race.is_over() {
            if let TickOutcome::EventRaised(event) = race.simulate_timestep() {
                assert!(race.active_event.is_some());
                assert!(!race.is_playing);
                let action_id = event.options[action_index].action_id;
                race.resolve(action_id).unwrap();
            }
            assert_race_invariants(&race, &mut last_laps);

            no_ticks += 1;
            assert!(no_ticks < MAX_TICKS, "race did not finish");
        }

        assert_eq!(race.phase, RacePhase::Finished);
        assert!(race.cars_list.iter().all(|c| !c.is_active()));

        let first = race.finalize().cloned().unwrap();
        let second = race.finalize().cloned().unwrap();
        assert_eq!(first, second);

        assert_eq!(first.results.len(), race.cars_list.len());
        for (i, result) in first.results.iter().enumerate() {
            assert_eq!(result.position, i + 1);
            assert_eq!(result.points, points_for_position(i + 1));
        }
        for summary in first.summaries.iter() {
            if summary.status == CarStatus::Finished {
                assert_eq!(summary.laptimes.len() as u32, race.track.laps);
            }
        }
    }
}

#[test]
fn quitting_requires_confirmation_and_yields_no_result() {
    let mut race = Race::with_seed(&sim_pars(3), &quiet_consts(), 1.0, 5).unwrap();
    race.play().unwrap();
    for _ in 0..10 {
        race.simulate_timestep();
    }

    assert_eq!(race.quit(false), Err(ControlError::QuitNotConfirmed));
    assert_eq!(race.phase, RacePhase::Running);

    race.quit(true).unwrap();
    assert_eq!(race.phase, RacePhase::Abandoned);
    assert!(race.finalize().is_none());
    assert_eq!(race.simulate_timestep(), TickOutcome::Idle);
    assert_eq!(race.play(), Err(ControlError::RaceOver));
}

#[test]
fn only_selected_player_cars_take_strategy_changes() {
    let mut race = Race::with_seed(&sim_pars(3), &quiet_consts(), 1.0, 5).unwrap();
    let selected = race.selected_driver.to_owned().unwrap();
    assert!(race.get_car(&selected).unwrap().is_player);
    race.select_car("p1").unwrap();

    race.set_strategy(
        racesim::core::car::DrivingStyle::Push,
        EngineMode::Overtake,
    )
    .unwrap();
    let p1 = race.get_car("p1").unwrap();
    assert_eq!(p1.engine_mode, EngineMode::Overtake);

    race.select_car("m1").unwrap();
    assert_eq!(
        race.set_strategy(racesim::core::car::DrivingStyle::Push, EngineMode::Low),
        Err(ControlError::NotPlayerCar("m1".to_owned()))
    );
    assert_eq!(race.get_car("m1").unwrap().engine_mode, EngineMode::Medium);
    assert!(matches!(
        race.select_car("nobody"),
        Err(ControlError::UnknownDriver(_))
    ));
}

#[test]
fn realtime_race_runs_to_the_finish() {
    let mut race = Race::with_seed(&sim_pars(1), &quiet_consts(), 10.0, 11).unwrap();
    let (tx_controls, rx_controls) = flume::unbounded();
    let (tx_state, rx_state) = flume::unbounded();

    tx_controls.send(RaceControl::Play).unwrap();
    tx_controls
        .send(RaceControl::SetSpeed("4".parse().unwrap()))
        .unwrap();
    drop(tx_controls);

    let outcome = run_realtime(&mut race, &rx_controls, &tx_state, Duration::from_millis(0)).unwrap();
    drop(tx_state);

    let classification = outcome.classification().unwrap();
    assert_eq!(classification.results.len(), 4);

    let states: Vec<_> = rx_state.iter().collect();
    assert!(states.len() > 1);
    assert!(!states[0].is_playing);
    let last = states.last().unwrap();
    assert_eq!(last.phase, RacePhase::Finished);
    assert_eq!(last.final_result.as_ref(), Some(classification));
}

#[test]
fn realtime_race_is_abandoned_when_the_controls_hang_up() {
    let mut race = Race::with_seed(&sim_pars(3), &quiet_consts(), 1.0, 11).unwrap();
    let (tx_controls, rx_controls) = flume::unbounded::<RaceControl>();
    let (tx_state, _rx_state) = flume::unbounded();
    drop(tx_controls);

    let outcome = run_realtime(&mut race, &rx_controls, &tx_state, Duration::from_millis(0)).unwrap();
    assert_eq!(outcome, RaceOutcome::Abandoned);
    assert_eq!(race.phase, RacePhase::Abandoned);
}

/// commentary_times runs the race for `no_ticks` ticks and returns the race times at which
/// commentary was requested.
fn commentary_times(sim_consts: &SimConstants, no_ticks: usize) -> Vec<f64> {
    let (tx_flavor, rx_flavor) = flume::unbounded();
    let mut race = Race::with_seed(&sim_pars(3), sim_consts, 1.0, 21)
        .unwrap()
        .with_flavor_channel(tx_flavor);
    race.play().unwrap();

    let mut times = vec![];
    for _ in 0..no_ticks {
        race.simulate_timestep();
        for request in rx_flavor.try_iter() {
            match request {
                FlavorRequest::Commentary { leader, .. } => {
                    assert_eq!(leader, race.cars_list[0].name);
                    times.push(race.cur_racetime);
                }
                FlavorRequest::Illustration { .. } => panic!("no race events expected"),
            }
        }
    }
    times
}

#[test]
fn commentary_is_rate_limited_by_the_interval() {
    let sim_consts = SimConstants {
        commentary_chance: 1.0,
        ..quiet_consts()
    };
    let times = commentary_times(&sim_consts, 100);

    assert_eq!(times, vec![15.0, 30.0, 45.0, 60.0, 75.0, 90.0]);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= sim_consts.commentary_interval);
    }
}

#[test]
fn commentary_gate_closed_sends_nothing() {
    let sim_consts = SimConstants {
        commentary_chance: 0.0,
        ..quiet_consts()
    };
    assert!(commentary_times(&sim_consts, 100).is_empty());
}

#[test]
fn race_rejects_out_of_range_team_and_driver_values() {
    let mut pars = sim_pars(3);
    pars.teams[1].performance_factor = 0.0;
    assert!(matches!(
        Race::with_seed(&pars, &quiet_consts(), 1.0, 1),
        Err(RaceSimError::InvalidParameter(_))
    ));

    let mut pars = sim_pars(3);
    pars.teams[0].drivers[0].skill = 150.0;
    assert!(matches!(
        Race::with_seed(&pars, &quiet_consts(), 1.0, 1),
        Err(RaceSimError::InvalidParameter(_))
    ));
}
