use crate::core::driver::DriverPars;
use crate::core::race::RacePars;
use crate::core::sim_constants::SimConstants;
use crate::core::team::TeamPars;
use crate::core::track::TrackPars;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// SimPars is used to store all other parameter structs.
/// * `teams` - All teams of the season, including the player team
/// * `free_drivers` - Drivers without a contract, used to fill the AI seats
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    pub track_pars: TrackPars,
    pub teams: Vec<TeamPars>,
    #[serde(default)]
    pub free_drivers: Vec<DriverPars>,
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// read_sim_constants reads the tuning constants from a JSON file. Constants missing in the file
/// keep their default values.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.display()
        ))?;

    let sim_consts: SimConstants = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.display()
    ))?;
    sim_consts.validate().context(format!(
        "Invalid simulation constants in file {}!",
        filepath.display()
    ))?;
    Ok(sim_consts)
}
