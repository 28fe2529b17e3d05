use helpers::general::InputValueError;
use serde::{Deserialize, Serialize};

/// * `id` - Driver identifier as used in the grid order, e.g. d1
/// * `name` - Display name, e.g. Max V.
/// * `skill` - Overall skill (0 - 100), static for the race
/// * `aggression` - (0 - 100) Used by the season layer, carried for completeness
/// * `tire_management` - (0 - 100) Used by the season layer, carried for completeness
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DriverPars {
    pub id: String,
    pub name: String,
    pub skill: f64,
    #[serde(default = "default_rating")]
    pub aggression: f64,
    #[serde(default = "default_rating")]
    pub tire_management: f64,
}

fn default_rating() -> f64 {
    50.0
}

impl DriverPars {
    /// rookie creates the placeholder driver that fills an empty seat of a team. `seat` is the
    /// 0-based seat index within the team.
    pub fn rookie(team_id: &str, team_name: &str, seat: usize, skill: f64) -> DriverPars {
        let short_name: String = team_name.chars().take(3).collect();
        DriverPars {
            id: format!("ai_{}_{}", team_id, seat + 1),
            name: format!("Rookie {} {}", short_name, seat + 1),
            skill,
            aggression: default_rating(),
            tire_management: default_rating(),
        }
    }

    /// validate checks that the skill is a rating in [0, 100].
    pub fn validate(&self) -> Result<(), InputValueError> {
        if !(0.0..=100.0).contains(&self.skill) {
            return Err(InputValueError(format!(
                "skill of driver {} must be in [0, 100], but is {}",
                self.id, self.skill
            )));
        }
        Ok(())
    }
}
