use crate::core::car::Car;
use std::cmp::Ordering;

/// cmp_running_order compares two cars by their position in the race: finished cars first, then
/// higher lap, then higher progress. Cars that compare equal keep their previous order.
pub fn cmp_running_order(a: &Car, b: &Car) -> Ordering {
    b.is_finished()
        .cmp(&a.is_finished())
        .then_with(|| b.lap.cmp(&a.lap))
        .then_with(|| b.progress.partial_cmp(&a.progress).unwrap_or(Ordering::Equal))
}

/// rank returns the cars in running order. The sort is stable, so the previous order decides
/// between cars on identical lap and progress (e.g. all finishers).
pub fn rank(mut cars: Vec<Car>) -> Vec<Car> {
    cars.sort_by(cmp_running_order);
    cars
}

/// compute_gaps sets the gap to the leader of every car in an already ranked list. The gap is an
/// estimate based on the reference lap time, not on the actual driven times.
pub fn compute_gaps(cars: &mut [Car], base_lap_time: f64) {
    let (leader_lap, leader_progress) = match cars.first() {
        Some(leader) => (leader.lap as f64, leader.progress),
        None => return,
    };

    for (i, car) in cars.iter_mut().enumerate() {
        if i == 0 {
            car.gap = 0.0;
            continue;
        }

        let gap = (leader_lap - car.lap as f64) * base_lap_time
            + (leader_progress - car.progress) * (base_lap_time / 100.0);
        car.gap = gap.max(0.0);
    }
}
