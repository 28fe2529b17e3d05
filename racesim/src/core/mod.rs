pub mod car;
pub mod decision;
pub mod driver;
pub mod environment;
pub mod events;
pub mod grid;
pub mod handle_race;
pub mod race;
pub mod ranking;
pub mod sim_constants;
pub mod team;
pub mod tick;
pub mod tireset;
pub mod track;
pub mod track_path;
