use crate::core::car::{Car, CarFactors};
use crate::core::driver::DriverPars;
use crate::core::race::RacePars;
use crate::core::sim_constants::SimConstants;
use crate::core::team::TeamPars;
use crate::error::RaceSimError;
use crate::interfaces::gui_interface::RgbColor;
use css_color_parser::Color as CssColor;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::collections::HashSet;

/// parse_team_color converts the CSS colour of a team into RGB.
pub fn parse_team_color(team: &TeamPars) -> Result<RgbColor, RaceSimError> {
    let color = team
        .color
        .parse::<CssColor>()
        .map_err(|_| RaceSimError::InvalidColor {
            team: team.id.to_owned(),
            color: team.color.to_owned(),
        })?;

    Ok(RgbColor {
        r: color.r,
        g: color.g,
        b: color.b,
    })
}

/// car_factors returns the static per-race factors of a car of the given team.
fn car_factors(
    team: &TeamPars,
    is_player: bool,
    setup_quality: f64,
    sim_consts: &SimConstants,
) -> CarFactors {
    let mut pace = team.pace_factor(sim_consts);
    let mut pit_time = 1.0;

    if is_player {
        pace *= 1.0 + setup_quality.clamp(0.0, 100.0) * sim_consts.setup_speed_scale;
        pit_time = team.pit_time_factor(sim_consts);
    }

    CarFactors {
        pace,
        tire_wear: team.tire_wear_factor(sim_consts),
        pit_time,
    }
}

/// fill_seats returns the drivers of a team. Listed drivers come first, then drivers from the
/// free pool, then rookies. `pool` is consumed from the front.
fn fill_seats(
    team: &TeamPars,
    no_seats: usize,
    pool: &mut std::slice::Iter<DriverPars>,
    sim_consts: &SimConstants,
) -> Vec<DriverPars> {
    let mut seats: Vec<DriverPars> = team.drivers.iter().take(no_seats).cloned().collect();

    while seats.len() < no_seats {
        let seat = seats.len();
        let driver = match pool.next() {
            Some(driver) => driver.to_owned(),
            None => DriverPars::rookie(
                &team.id,
                &team.name,
                seat,
                sim_consts.rookie_skill - seat as f64 * sim_consts.rookie_skill_step,
            ),
        };
        seats.push(driver);
    }

    seats
}

/// build_field creates the cars of all teams and returns them in starting grid order.
///
/// The player team keeps its full roster (topped up with rookies if short). Every other team gets
/// `cars_per_team` cars, filled from the free driver pool in team order.
pub fn build_field<R: Rng + ?Sized>(
    race_pars: &RacePars,
    teams: &[TeamPars],
    free_drivers: &[DriverPars],
    sim_consts: &SimConstants,
    rng: &mut R,
) -> Result<Vec<Car>, RaceSimError> {
    let player_team = teams
        .iter()
        .find(|t| t.id == race_pars.player_team_id)
        .ok_or_else(|| RaceSimError::UnknownPlayerTeam(race_pars.player_team_id.to_owned()))?;

    let player_driver_ids: HashSet<&str> =
        player_team.drivers.iter().map(|d| d.id.as_str()).collect();
    let pool: Vec<DriverPars> = free_drivers
        .iter()
        .filter(|d| !player_driver_ids.contains(d.id.as_str()))
        .cloned()
        .collect();
    let mut pool_iter = pool.iter();

    let mut cars_list = Vec::with_capacity(teams.len() * race_pars.cars_per_team);

    // player cars first
    let no_player_seats = player_team.drivers.len().max(race_pars.cars_per_team);
    let no_pool: [DriverPars; 0] = [];
    let mut empty_pool = no_pool.iter();
    let color = parse_team_color(player_team)?;
    let factors = car_factors(player_team, true, race_pars.setup_quality, sim_consts);
    for driver in fill_seats(player_team, no_player_seats, &mut empty_pool, sim_consts) {
        cars_list.push(Car::new(&driver, &player_team.id, color, factors, true));
    }

    for team in teams.iter().filter(|t| t.id != player_team.id) {
        let color = parse_team_color(team)?;
        let factors = car_factors(team, false, 0.0, sim_consts);
        for driver in fill_seats(team, race_pars.cars_per_team, &mut pool_iter, sim_consts) {
            cars_list.push(Car::new(&driver, &team.id, color, factors, false));
        }
    }

    if cars_list.is_empty() {
        return Err(RaceSimError::EmptyRace);
    }

    Ok(order_grid(cars_list, race_pars.grid_order.as_deref(), rng))
}

/// order_grid sorts the cars into their starting positions. With a grid order, cars are placed by
/// their index in it and cars missing from it go to the back. Without one, cars are sorted by
/// skill plus a random bonus of up to 10 points.
pub fn order_grid<R: Rng + ?Sized>(
    cars_list: Vec<Car>,
    grid_order: Option<&[String]>,
    rng: &mut R,
) -> Vec<Car> {
    let mut cars_list = cars_list;

    match grid_order {
        Some(order) if !order.is_empty() => {
            cars_list.sort_by_key(|car| {
                order
                    .iter()
                    .position(|id| *id == car.driver_id)
                    .unwrap_or(usize::MAX)
            });
            cars_list
        }
        _ => {
            let bonus = Uniform::new(0.0, 10.0);
            let keys: Vec<f64> = cars_list
                .iter()
                .map(|car| car.skill + bonus.sample(rng))
                .collect();
            let idxs = helpers::general::argsort(&keys, helpers::general::SortOrder::Descending);

            let mut slots: Vec<Option<Car>> = cars_list.into_iter().map(Some).collect();
            idxs.iter().filter_map(|&i| slots[i].take()).collect()
        }
    }
}
