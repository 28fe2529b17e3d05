use anyhow::Context;
use clap::Parser;
use racesim::core::car::CarStatus;
use racesim::core::handle_race::{handle_race, run_realtime, RaceOutcome, TICK_INTERVAL};
use racesim::core::race::{Race, RacePhase};
use racesim::core::sim_constants::SimConstants;
use racesim::interfaces::controls::RaceControl;
use racesim::interfaces::flavor::{
    new_shared_display, spawn_flavor_worker, SharedFlavorDisplay, TemplateFlavor,
};
use racesim::interfaces::gui_interface::RaceState;
use racesim::post::race_result::Classification;
use racesim::pre::read_sim_pars::{read_sim_constants, read_sim_pars, SimPars};
use racesim::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

const ILLUSTRATION_DIR: &str = "assets";

const LIVE_HELP: &str = "Commands: play | pause | p | speed 1|2|4 | select <driver> | \
strategy <conserve|balanced|push> <low|medium|high|overtake> | decide <action> | quit [yes]";

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    init_logging(sim_opts.debug);

    // get simulation parameters
    info!("Reading simulation parameters from {:?}", sim_opts.parfile_path);
    let sim_pars = read_sim_pars(&sim_opts.parfile_path)?;

    let sim_consts = match &sim_opts.constants_path {
        Some(constants_path) => {
            info!("Reading simulation constants from {:?}", constants_path);
            read_sim_constants(constants_path)?
        }
        None => SimConstants::default(),
    };

    info!(
        "Simulating {} {} with a time step size of {:.3}s",
        sim_pars.track_pars.name, sim_pars.race_pars.season, sim_opts.timestep_size
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if sim_opts.live {
        run_live(&sim_opts, &sim_pars, &sim_consts)
    } else if sim_opts.no_sim_runs > 1 {
        run_batch(&sim_opts, &sim_pars, &sim_consts)
    } else {
        run_single(&sim_opts, &sim_pars, &sim_consts)
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}

// -------------------------------------------------------------------------------------------------
// NON-LIVE CASES ----------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

fn run_single(sim_opts: &SimOpts, sim_pars: &SimPars, sim_consts: &SimConstants) -> anyhow::Result<()> {
    let t_start = Instant::now();
    let mut policy = sim_opts.policy;

    let outcome = handle_race(
        sim_pars,
        sim_consts,
        sim_opts.timestep_size * sim_opts.sim_speed.multiplier(),
        &mut policy,
        sim_opts.seed,
    )?;

    info!("Execution time: {}ms", t_start.elapsed().as_millis());
    report(&outcome, sim_opts)
}

fn run_batch(sim_opts: &SimOpts, sim_pars: &SimPars, sim_consts: &SimConstants) -> anyhow::Result<()> {
    info!(
        "Running {} simulation runs in parallel...",
        sim_opts.no_sim_runs
    );
    let t_start = Instant::now();

    let outcomes = (0..sim_opts.no_sim_runs)
        .into_par_iter()
        .map(|run| {
            let mut policy = sim_opts.policy;
            handle_race(
                sim_pars,
                sim_consts,
                sim_opts.timestep_size * sim_opts.sim_speed.multiplier(),
                &mut policy,
                sim_opts.seed.map(|seed| seed + run as u64),
            )
            .context(format!("Simulation run {} failed!", run))
        })
        .collect::<anyhow::Result<Vec<RaceOutcome>>>()?;

    info!(
        "Execution time: {}ms ({:.1}ms per run)",
        t_start.elapsed().as_millis(),
        t_start.elapsed().as_secs_f64() * 1000.0 / sim_opts.no_sim_runs as f64
    );

    let classifications: Vec<&Classification> =
        outcomes.iter().filter_map(|o| o.classification()).collect();
    print_batch_statistics(&classifications, outcomes.len());

    match (outcomes.first(), &sim_opts.output) {
        (Some(outcome), Some(_)) => report_output(outcome, sim_opts),
        _ => Ok(()),
    }
}

fn report(outcome: &RaceOutcome, sim_opts: &SimOpts) -> anyhow::Result<()> {
    match outcome.classification() {
        Some(classification) => {
            classification.print_classification()?;
            classification.print_lap_times()?;
            report_output(outcome, sim_opts)
        }
        None => {
            println!("RESULT: Race abandoned, no classification");
            Ok(())
        }
    }
}

fn report_output(outcome: &RaceOutcome, sim_opts: &SimOpts) -> anyhow::Result<()> {
    if let (Some(output), Some(classification)) = (&sim_opts.output, outcome.classification()) {
        classification.write_csv(output)?;
        info!("Classification written to {:?}", output);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct DriverStats {
    name: String,
    team_id: String,
    starts: u32,
    points: u32,
    wins: u32,
    dnfs: u32,
}

fn print_batch_statistics(classifications: &[&Classification], no_runs: usize) {
    let mut stats: BTreeMap<&str, DriverStats> = BTreeMap::new();

    for classification in classifications {
        for (result, summary) in classification
            .results
            .iter()
            .zip(classification.summaries.iter())
        {
            let entry = stats
                .entry(result.driver_id.as_str())
                .or_insert_with(|| DriverStats {
                    name: summary.name.to_owned(),
                    team_id: result.team_id.to_owned(),
                    ..DriverStats::default()
                });
            entry.starts += 1;
            entry.points += result.points;
            if result.position == 1 {
                entry.wins += 1;
            }
            if summary.status == CarStatus::Dnf {
                entry.dnfs += 1;
            }
        }
    }

    let mut rows: Vec<(&str, &DriverStats)> = stats.iter().map(|(id, s)| (*id, s)).collect();
    rows.sort_by(|a, b| {
        let mean_a = a.1.points as f64 / a.1.starts as f64;
        let mean_b = b.1.points as f64 / b.1.starts as f64;
        mean_b.total_cmp(&mean_a)
    });

    println!(
        "RESULT: {} classified runs ({} abandoned)",
        classifications.len(),
        no_runs - classifications.len()
    );
    println!(
        "{:<10} {:<18} {:<12} {:>8} {:>6} {:>8}",
        "Driver", "Name", "Team", "Points", "Wins", "DNF"
    );
    for (driver_id, s) in rows {
        println!(
            "{:<10} {:<18} {:<12} {:>8.2} {:>6} {:>7.1}%",
            driver_id,
            s.name,
            s.team_id,
            s.points as f64 / s.starts as f64,
            s.wins,
            100.0 * s.dnfs as f64 / s.starts as f64
        );
    }
}

// -------------------------------------------------------------------------------------------------
// LIVE CASE ---------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

fn run_live(sim_opts: &SimOpts, sim_pars: &SimPars, sim_consts: &SimConstants) -> anyhow::Result<()> {
    let (tx_controls, rx_controls) = flume::unbounded::<RaceControl>();
    let (tx_state, rx_state) = flume::unbounded::<RaceState>();
    let (tx_flavor, rx_flavor) = flume::unbounded();

    // flavor worker, answers land in the shared display slot
    let display = new_shared_display();
    let flavor_worker = spawn_flavor_worker(
        Box::new(TemplateFlavor::new(ILLUSTRATION_DIR)),
        rx_flavor,
        display.clone(),
    );

    let race = match sim_opts.seed {
        Some(seed) => Race::with_seed(sim_pars, sim_consts, sim_opts.timestep_size, seed),
        None => Race::new(sim_pars, sim_consts, sim_opts.timestep_size),
    }
    .context("Failed to set up the race!")?;
    let mut race = race.with_flavor_channel(tx_flavor);
    race.set_sim_speed(sim_opts.sim_speed)?;

    // simulator runs in a separate thread, the main thread presents the snapshots
    let race_thread = thread::spawn(move || run_realtime(&mut race, &rx_controls, &tx_state, TICK_INTERVAL));

    // stdin is read in a separate thread, the control channel closes with stdin. The reader
    // blocks on stdin, so it is left running instead of joined.
    let stdin_reader = thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read from stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<RaceControl>() {
                Ok(control) => {
                    if tx_controls.send(control).is_err() {
                        break;
                    }
                }
                Err(e) => println!("{} ({})", e, LIVE_HELP),
            }
        }
    });

    println!("{}", LIVE_HELP);
    present(&rx_state, &display);

    let outcome = match race_thread.join() {
        Ok(outcome) => outcome?,
        Err(_) => anyhow::bail!("Race thread panicked!"),
    };

    if stdin_reader.is_finished() && stdin_reader.join().is_err() {
        warn!("Stdin reader panicked!");
    }

    // the race (and with it the flavor sender) is gone, so the worker terminates
    if flavor_worker.join().is_err() {
        warn!("Flavor worker panicked!");
    }

    report(&outcome, sim_opts)
}

/// present prints race state snapshots until the simulator hangs up.
fn present(rx_state: &flume::Receiver<RaceState>, display: &SharedFlavorDisplay) {
    let mut last_lap = u32::MAX;
    let mut last_phase = None;
    let mut last_playing = None;
    let mut last_messages: Vec<String> = Vec::new();
    let mut last_commentary: Vec<String> = Vec::new();

    for state in rx_state.iter() {
        for message in new_entries(&last_messages, &state.messages).iter().rev() {
            println!(">> {}", message);
        }
        last_messages = state.messages.to_owned();

        let commentary = match display.lock() {
            Ok(display) => display.commentary.to_vec(),
            Err(poisoned) => poisoned.into_inner().commentary.to_vec(),
        };
        for line in new_entries(&last_commentary, &commentary).iter().rev() {
            println!("   \"{}\"", line);
        }
        last_commentary = commentary;

        if state.leader_lap != last_lap {
            last_lap = state.leader_lap;
            print_standings(&state);
        }

        if last_phase != Some(state.phase) || last_playing != Some(state.is_playing) {
            last_phase = Some(state.phase);
            last_playing = Some(state.is_playing);
            print_phase(&state);
        }
    }
}

/// new_entries returns the entries of a newest-first list that were pushed since `old` was taken.
fn new_entries<'a>(old: &[String], cur: &'a [String]) -> &'a [String] {
    for k in 0..=cur.len() {
        let kept = &cur[k..];
        if old.len() >= kept.len() && kept == &old[..kept.len()] {
            return &cur[..k];
        }
    }
    cur
}

fn print_standings(state: &RaceState) {
    println!(
        "Lap {}/{} | {:.1}s | {} {}| wetness {:.0}% | speed {}",
        state.leader_lap.min(state.tot_no_laps),
        state.tot_no_laps,
        state.race_time,
        state.weather,
        if state.safety_car { "| SC " } else { "" },
        state.track_wetness,
        state.sim_speed
    );
    for car in state.car_states.iter() {
        println!(
            "{}P{:<2} {:<18} {:<6} lap {:>2} gap {:>6.1}s {:>6} {:>4.0}% {}",
            if car.is_player { "*" } else { " " },
            car.position,
            car.name,
            car.tire_compound,
            car.lap,
            car.gap,
            if car.pitting { "PIT" } else { "" },
            car.tire_health,
            match car.status {
                CarStatus::Running => "",
                CarStatus::Finished => "FIN",
                CarStatus::Dnf => "DNF",
            }
        );
    }
    if let Some(car) = state.selected_car() {
        println!(
            "Selected: {} ({} / {})",
            car.name, car.driving_style, car.engine_mode
        );
    }
}

fn print_phase(state: &RaceState) {
    match state.phase {
        RacePhase::AwaitingDecision => {
            if let Some(event) = &state.active_event {
                println!("!! {}: {}", event.title, event.description);
                for option in event.options.iter() {
                    println!("   decide {:<14} {}", option.action_id, option.label);
                }
            }
        }
        RacePhase::Running if state.is_playing => println!("-- running"),
        RacePhase::Running => println!("-- paused (type play)"),
        RacePhase::Finished => println!("-- chequered flag"),
        RacePhase::Abandoned => println!("-- race abandoned"),
    }
}
