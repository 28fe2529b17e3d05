use crate::core::car::{Car, CarStatus, EngineMode};
use crate::core::environment::{Environment, WeatherState};
use crate::core::sim_constants::SimConstants;
use crate::core::tireset::TireCompound;
use crate::core::track::Track;
use rand::Rng;

/// Remaining pit time below which the stop counts as completed (float noise of the countdown).
const PIT_EPS: f64 = 1e-9;

/// TickContext bundles the read-only inputs of one tick.
/// * `dt` - (s) Simulated time covered by the tick
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub track: &'a Track,
    pub sim_consts: &'a SimConstants,
    pub env: &'a Environment,
    pub dt: f64,
}

/// update_environment returns the environment for the next tick: the safety car may return to
/// the pits, and the track wetness trends towards the current weather.
pub fn update_environment<R: Rng + ?Sized>(
    env: &Environment,
    dt: f64,
    sim_consts: &SimConstants,
    rng: &mut R,
) -> Environment {
    let mut env_new = env.with_updated_wetness(dt, sim_consts);

    if env_new.safety_car && rng.gen_bool(sim_consts.safety_car_end_chance) {
        env_new.safety_car = false;
    }

    env_new
}

/// calc_speed returns the progress rate of a car (percent of a lap per second).
pub fn calc_speed(car: &Car, ctx: &TickContext) -> f64 {
    let consts = ctx.sim_consts;
    let base_speed = ctx.track.base_speed();
    let skill_factor = 1.0 + (car.skill - consts.skill_reference) * consts.skill_scale;

    let speed = base_speed
        * skill_factor
        * car.factors.pace
        * car.engine_mode.speed_factor()
        * car.driving_style.speed_factor()
        * car.tireset.compound.wetness_factor(ctx.env.track_wetness, consts)
        * car.tireset.health_factor(consts);

    if ctx.env.safety_car {
        speed.min(base_speed * consts.safety_car_speed_cap)
    } else {
        speed
    }
}

/// calc_tire_wear returns the tire health a car loses during the tick.
pub fn calc_tire_wear(car: &Car, ctx: &TickContext) -> f64 {
    ctx.sim_consts.tire_wear_base
        * ctx.dt
        * car.factors.tire_wear
        * car.driving_style.wear_factor()
        * car.engine_mode.wear_factor()
        * car.tireset.compound.wear_factor()
}

/// advance_car returns the state of a car after one tick. Inactive cars are returned unchanged.
pub fn advance_car<R: Rng + ?Sized>(car: &Car, ctx: &TickContext, rng: &mut R) -> Car {
    let mut car = car.clone();
    if !car.is_active() {
        return car;
    }

    let consts = ctx.sim_consts;
    let env = ctx.env;

    // AI cars react to the conditions on their own, the player is asked via race events
    if !car.is_player && !car.is_pitting() {
        if env.weather == WeatherState::Rain
            && car.tireset.compound.is_slick()
            && rng.gen_bool(consts.ai_rain_pit_chance)
        {
            car.queue_pit(TireCompound::Inter, consts.pit_stop_duration);
        } else if env.safety_car
            && car.tireset.health < consts.ai_sc_pit_tire_threshold
            && rng.gen_bool(consts.ai_sc_pit_chance)
        {
            car.queue_pit(TireCompound::Soft, consts.pit_stop_duration);
        }
    }

    // stationary in the pit lane
    if car.is_pitting() {
        car.speed = 0.0;
        car.cur_laptime += ctx.dt;
        car.pitting = (car.pitting - ctx.dt / car.factors.pit_time).max(0.0);
        if car.pitting <= PIT_EPS {
            car.complete_pit();
        }
        return car;
    }

    let speed = calc_speed(&car, ctx);
    let wear = calc_tire_wear(&car, ctx);
    car.tireset.wear(wear);
    car.speed = speed * consts.display_speed_scale;
    car.progress += speed * ctx.dt;
    car.cur_laptime += ctx.dt;

    while car.progress >= 100.0 {
        car.progress -= 100.0;
        car.lap += 1;

        // lap time up to the instant the line was crossed
        let t_after_line = if speed > 0.0 { car.progress / speed } else { 0.0 };
        car.laptimes.push(car.cur_laptime - t_after_line);
        car.cur_laptime = t_after_line;

        if car.lap >= ctx.track.laps {
            car.status = CarStatus::Finished;
            car.progress = 100.0;
            break;
        }

        if !car.is_player
            && !env.safety_car
            && env.weather == WeatherState::Sunny
            && car.tireset.health < consts.ai_lap_pit_tire_threshold
            && !car.is_pitting()
        {
            car.queue_pit(TireCompound::Soft, consts.pit_stop_duration);
        }
    }

    if car.is_active()
        && car.engine_mode == EngineMode::Overtake
        && rng.gen_bool(consts.overtake_cooldown_chance)
    {
        car.engine_mode = EngineMode::Low;
    }

    car
}

/// advance_cars computes the next state of every car. The input list is not modified.
pub fn advance_cars<R: Rng + ?Sized>(cars: &[Car], ctx: &TickContext, rng: &mut R) -> Vec<Car> {
    cars.iter().map(|car| advance_car(car, ctx, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::{CarFactors, DrivingStyle};
    use crate::core::driver::DriverPars;
    use crate::core::track::{CarSetup, TrackPars};
    use crate::interfaces::gui_interface::RgbColor;
    use approx::assert_relative_eq;
    use rand::rngs::mock::StepRng;

    /// gen::<f64>() of this rng is always ~0.9999, i.e. no low-probability trigger fires.
    fn quiet_rng() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn track(laps: u32) -> Track {
        Track::new(&TrackPars {
            id: "t1".to_owned(),
            name: "Melbourne GP".to_owned(),
            location: "Australia".to_owned(),
            laps,
            base_lap_time: 80.0,
            path: "M 0,0 L 10,0 L 10,10 L 0,10 Z".to_owned(),
            ideal_setup: CarSetup::default(),
        })
        .unwrap()
    }

    fn car(skill: f64, is_player: bool) -> Car {
        let driver = DriverPars {
            id: "d".to_owned(),
            name: "Driver".to_owned(),
            skill,
            aggression: 50.0,
            tire_management: 50.0,
        };
        Car::new(&driver, "team", RgbColor::default(), CarFactors::default(), is_player)
    }

    #[test]
    fn reference_car_runs_at_base_speed() {
        let track = track(20);
        let consts = SimConstants::default();
        let env = Environment::default();
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut c = car(70.0, true);
        c.tireset.compound = TireCompound::Medium;
        assert_relative_eq!(calc_speed(&c, &ctx), 1.25);

        c.skill = 90.0;
        c.engine_mode = EngineMode::Overtake;
        c.driving_style = DrivingStyle::Push;
        assert_relative_eq!(calc_speed(&c, &ctx), 1.25 * 1.02 * 1.08 * 1.03, epsilon = 1e-12);
    }

    #[test]
    fn safety_car_caps_speed() {
        let track = track(20);
        let consts = SimConstants::default();
        let env = Environment { safety_car: true, ..Environment::default() };
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut c = car(99.0, true);
        c.engine_mode = EngineMode::Overtake;
        assert_relative_eq!(calc_speed(&c, &ctx), 0.75);
    }

    #[test]
    fn tire_wear_scales_with_style_mode_and_compound() {
        let track = track(20);
        let consts = SimConstants::default();
        let env = Environment::default();
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 2.0 };

        let mut c = car(70.0, true);
        c.driving_style = DrivingStyle::Push;
        c.engine_mode = EngineMode::Overtake;
        c.tireset.compound = TireCompound::Soft;
        c.factors.tire_wear = 0.9;
        assert_relative_eq!(
            calc_tire_wear(&c, &ctx),
            0.05 * 2.0 * 0.9 * 1.4 * 1.3 * 1.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn lap_completion_wraps_progress_and_records_laptime() {
        let track = track(3);
        let consts = SimConstants::default();
        let env = Environment::default();
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut c = car(70.0, true);
        c.tireset.compound = TireCompound::Medium;
        c.progress = 99.5;
        c.cur_laptime = 79.6;
        let next = advance_car(&c, &ctx, &mut quiet_rng());
        assert_eq!(next.lap, 1);
        assert_relative_eq!(next.progress, 0.75, epsilon = 1e-9);
        assert_eq!(next.laptimes.len(), 1);
        assert_relative_eq!(next.laptimes[0], 80.0, epsilon = 1e-9);
        assert_relative_eq!(next.cur_laptime, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn final_lap_finishes_car_at_full_progress() {
        let track = track(1);
        let consts = SimConstants::default();
        let env = Environment::default();
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut c = car(70.0, false);
        c.progress = 99.9;
        let next = advance_car(&c, &ctx, &mut quiet_rng());
        assert!(next.is_finished());
        assert_eq!(next.lap, 1);
        assert_relative_eq!(next.progress, 100.0);

        // frozen from now on
        let after = advance_car(&next, &ctx, &mut quiet_rng());
        assert_eq!(after.lap, next.lap);
        assert_eq!(after.progress, next.progress);
    }

    #[test]
    fn pitting_car_is_stationary_and_gets_new_tires() {
        let track = track(20);
        let consts = SimConstants::default();
        let env = Environment::default();
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut c = car(70.0, true);
        c.progress = 40.0;
        c.tireset.health = 10.0;
        c.queue_pit(TireCompound::Hard, 2.5);

        let mut rng = quiet_rng();
        let t1 = advance_car(&c, &ctx, &mut rng);
        assert_eq!(t1.speed, 0.0);
        assert_eq!(t1.progress, 40.0);
        assert_relative_eq!(t1.pitting, 1.5);

        let t2 = advance_car(&t1, &ctx, &mut rng);
        let t3 = advance_car(&t2, &ctx, &mut rng);
        assert!(!t3.is_pitting());
        assert_eq!(t3.tireset.compound, TireCompound::Hard);
        assert_relative_eq!(t3.tireset.health, 100.0);
        assert_eq!(t3.progress, 40.0);
    }

    #[test]
    fn ai_pits_for_fresh_tires_at_end_of_lap_but_player_does_not() {
        let track = track(20);
        let consts = SimConstants::default();
        let env = Environment::default();
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut ai = car(70.0, false);
        ai.progress = 99.5;
        ai.tireset.health = 15.0;
        let mut player = ai.clone();
        player.is_player = true;

        let mut rng = quiet_rng();
        let ai = advance_car(&ai, &ctx, &mut rng);
        assert!(ai.is_pitting());
        assert_eq!(ai.speed, 0.0);
        assert_eq!(ai.pit_compound, Some(TireCompound::Soft));

        let player = advance_car(&player, &ctx, &mut rng);
        assert!(!player.is_pitting());
    }

    #[test]
    fn ai_reacts_to_rain_with_certainty_when_chance_is_one() {
        let track = track(20);
        let mut consts = SimConstants::default();
        consts.ai_rain_pit_chance = 1.0;
        let env = Environment { weather: WeatherState::Rain, ..Environment::default() };
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let next = advance_car(&car(70.0, false), &ctx, &mut quiet_rng());
        assert!(next.is_pitting());
        assert_eq!(next.pit_compound, Some(TireCompound::Inter));

        let player = advance_car(&car(70.0, true), &ctx, &mut quiet_rng());
        assert!(!player.is_pitting());
    }

    #[test]
    fn ai_pits_for_softs_behind_safety_car_on_worn_tires() {
        let track = track(20);
        let mut consts = SimConstants::default();
        consts.ai_sc_pit_chance = 1.0;
        let env = Environment { safety_car: true, ..Environment::default() };
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut worn = car(70.0, false);
        worn.tireset.compound = TireCompound::Hard;
        worn.tireset.health = 50.0;
        let next = advance_car(&worn, &ctx, &mut quiet_rng());
        assert!(next.is_pitting());
        assert_eq!(next.speed, 0.0);
        assert_eq!(next.pit_compound, Some(TireCompound::Soft));

        let mut fresh = worn.clone();
        fresh.tireset.health = 80.0;
        assert!(!advance_car(&fresh, &ctx, &mut quiet_rng()).is_pitting());

        let mut player = worn.clone();
        player.is_player = true;
        assert!(!advance_car(&player, &ctx, &mut quiet_rng()).is_pitting());

        consts.ai_sc_pit_chance = 0.0;
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };
        assert!(!advance_car(&worn, &ctx, &mut quiet_rng()).is_pitting());
    }

    #[test]
    fn overtake_mode_cools_down_to_low() {
        let track = track(20);
        let mut consts = SimConstants::default();
        consts.overtake_cooldown_chance = 1.0;
        let env = Environment::default();
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };

        let mut c = car(70.0, true);
        c.engine_mode = EngineMode::Overtake;
        assert_eq!(advance_car(&c, &ctx, &mut quiet_rng()).engine_mode, EngineMode::Low);

        // other modes are left alone
        c.engine_mode = EngineMode::High;
        assert_eq!(advance_car(&c, &ctx, &mut quiet_rng()).engine_mode, EngineMode::High);

        consts.overtake_cooldown_chance = 0.0;
        let ctx = TickContext { track: &track, sim_consts: &consts, env: &env, dt: 1.0 };
        c.engine_mode = EngineMode::Overtake;
        assert_eq!(advance_car(&c, &ctx, &mut quiet_rng()).engine_mode, EngineMode::Overtake);
    }

    #[test]
    fn environment_update_clears_safety_car_by_chance() {
        let mut consts = SimConstants::default();
        consts.safety_car_end_chance = 1.0;
        let env = Environment { safety_car: true, ..Environment::default() };
        let next = update_environment(&env, 1.0, &consts, &mut quiet_rng());
        assert!(!next.safety_car);

        consts.safety_car_end_chance = 0.0;
        let next = update_environment(&env, 1.0, &consts, &mut quiet_rng());
        assert!(next.safety_car);
    }
}
