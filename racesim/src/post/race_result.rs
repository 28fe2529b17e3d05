use crate::core::car::{Car, CarStatus};
use crate::core::environment::WeatherState;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;

/// Championship points for positions 1 to 10, all further positions score nothing.
pub const POINTS_TABLE: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];

/// points_for_position returns the points of a 1-based finishing position.
pub fn points_for_position(position: usize) -> u32 {
    match position {
        0 => 0,
        p => POINTS_TABLE.get(p - 1).copied().unwrap_or(0),
    }
}

/// RaceResult is the per-driver outcome handed to the season layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    pub driver_id: String,
    pub team_id: String,
    pub position: usize,
    pub points: u32,
}

/// DriverSummary carries the timing details of a driver's race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSummary {
    pub driver_id: String,
    pub name: String,
    pub team_id: String,
    pub is_player: bool,
    pub laps: u32,
    pub total_time: f64,
    pub best_lap: Option<f64>,
    pub status: CarStatus,
    pub laptimes: Vec<f64>,
}

/// Classification contains all race information that is required for post-processing the
/// results. `results` and `summaries` are in finishing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub results: Vec<RaceResult>,
    pub weather: WeatherState,
    pub summaries: Vec<DriverSummary>,
}

/// CSV row of the classification.
#[derive(Debug, Serialize)]
struct ClassificationRecord<'a> {
    position: usize,
    driver_id: &'a str,
    name: &'a str,
    team_id: &'a str,
    points: u32,
    laps: u32,
    total_time: f64,
    best_lap: Option<f64>,
    status: CarStatus,
}

/// classify derives the classification from the final, already ranked list of cars. DNF cars are
/// classified at their ranked position like everybody else.
pub fn classify(cars: &[Car], weather: WeatherState) -> Classification {
    let results = cars
        .iter()
        .enumerate()
        .map(|(i, car)| RaceResult {
            driver_id: car.driver_id.to_owned(),
            team_id: car.team_id.to_owned(),
            position: i + 1,
            points: points_for_position(i + 1),
        })
        .collect();

    let summaries = cars
        .iter()
        .map(|car| DriverSummary {
            driver_id: car.driver_id.to_owned(),
            name: car.name.to_owned(),
            team_id: car.team_id.to_owned(),
            is_player: car.is_player,
            laps: car.lap,
            total_time: car.total_time(),
            best_lap: car.best_laptime(),
            status: car.status,
            laptimes: car.laptimes.to_owned(),
        })
        .collect();

    Classification {
        results,
        weather,
        summaries,
    }
}

impl Classification {
    pub fn winner(&self) -> Option<&DriverSummary> {
        self.summaries.first()
    }

    pub fn total_points(&self) -> u32 {
        self.results.iter().map(|r| r.points).sum()
    }

    /// points_of returns the points scored by the cars of a team.
    pub fn points_of_team(&self, team_id: &str) -> u32 {
        self.results
            .iter()
            .filter(|r| r.team_id == team_id)
            .map(|r| r.points)
            .sum()
    }

    /// to_table returns the classification as a fixed-width text table.
    pub fn to_table(&self) -> Result<String, std::fmt::Error> {
        let mut table = String::new();
        writeln!(
            &mut table,
            "{:>3}  {:<20} {:<12} {:>4} {:>4} {:>10} {:>9}  {}",
            "pos", "driver", "team", "pts", "laps", "time", "best", "status"
        )?;

        for (result, summary) in self.results.iter().zip(self.summaries.iter()) {
            let status = match summary.status {
                CarStatus::Finished => "finished",
                CarStatus::Dnf => "DNF",
                CarStatus::Running => "running",
            };
            let best_lap = summary
                .best_lap
                .map(|t| format!("{:8.3}s", t))
                .unwrap_or_else(|| "-".to_owned());
            writeln!(
                &mut table,
                "{:3}  {:<20} {:<12} {:4} {:4} {:9.3}s {:>9}  {}",
                result.position,
                summary.name,
                summary.team_id,
                result.points,
                summary.laps,
                summary.total_time,
                best_lap,
                status
            )?;
        }

        Ok(table)
    }

    /// print_classification prints the resulting classification to the console output.
    pub fn print_classification(&self) -> anyhow::Result<()> {
        println!("RESULT: Classification (weather at the flag: {})", self.weather);
        print!("{}", self.to_table()?);
        Ok(())
    }

    /// print_lap_times prints the lap times of every driver to the console output.
    pub fn print_lap_times(&self) -> anyhow::Result<()> {
        let mut content = String::new();
        for summary in self.summaries.iter() {
            write!(&mut content, "{:<20}", summary.name)?;
            for laptime in summary.laptimes.iter() {
                write!(&mut content, " {:8.3}s", laptime)?;
            }
            writeln!(&mut content)?;
        }

        println!("RESULT: Lap times");
        print!("{}", content);
        Ok(())
    }

    /// write_csv writes the classification to a CSV file.
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .context(format!("Failed to create output directory {}!", dir.display()))?;
            }
        }

        let mut writer = csv::Writer::from_path(path)
            .context(format!("Failed to open output file {}!", path.display()))?;

        for (result, summary) in self.results.iter().zip(self.summaries.iter()) {
            writer.serialize(ClassificationRecord {
                position: result.position,
                driver_id: &result.driver_id,
                name: &summary.name,
                team_id: &result.team_id,
                points: result.points,
                laps: summary.laps,
                total_time: summary.total_time,
                best_lap: summary.best_lap,
                status: summary.status,
            })?;
        }

        writer
            .flush()
            .context(format!("Failed to write output file {}!", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::CarFactors;
    use crate::core::driver::DriverPars;
    use crate::interfaces::gui_interface::RgbColor;

    fn car(id: &str, status: CarStatus) -> Car {
        let driver = DriverPars {
            id: id.to_owned(),
            name: id.to_uppercase(),
            skill: 70.0,
            aggression: 50.0,
            tire_management: 50.0,
        };
        let mut car = Car::new(&driver, "team", RgbColor::default(), CarFactors::default(), false);
        car.status = status;
        car
    }

    #[test]
    fn points_table() {
        assert_eq!(points_for_position(1), 25);
        assert_eq!(points_for_position(2), 18);
        assert_eq!(points_for_position(10), 1);
        assert_eq!(points_for_position(11), 0);
        assert_eq!(points_for_position(20), 0);
        assert_eq!(points_for_position(0), 0);
    }

    #[test]
    fn dnf_scores_by_ranked_position() {
        let mut cars: Vec<Car> = (0..7)
            .map(|i| car(&format!("d{}", i), CarStatus::Finished))
            .collect();
        cars.push(car("out", CarStatus::Dnf));
        let classification = classify(&cars, WeatherState::Rain);

        let out = &classification.results[7];
        assert_eq!(out.driver_id, "out");
        assert_eq!(out.position, 8);
        assert_eq!(out.points, 4);
        assert_eq!(classification.weather, WeatherState::Rain);
    }

    #[test]
    fn classification_is_idempotent() {
        let mut cars = vec![car("a", CarStatus::Finished), car("b", CarStatus::Finished)];
        cars[0].laptimes = vec![80.0, 79.0];
        assert_eq!(
            classify(&cars, WeatherState::Sunny),
            classify(&cars, WeatherState::Sunny)
        );
        let classification = classify(&cars, WeatherState::Sunny);
        assert_eq!(classification.total_points(), 43);
        assert_eq!(classification.points_of_team("team"), 43);
        assert_eq!(classification.winner().map(|w| w.best_lap), Some(Some(79.0)));
    }

    #[test]
    fn table_lists_every_driver() {
        let cars = vec![car("a", CarStatus::Finished), car("b", CarStatus::Dnf)];
        let table = classify(&cars, WeatherState::Sunny).to_table().unwrap();
        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("DNF"));
    }
}
