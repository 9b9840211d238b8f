//! Scoreboard text for the host.

use crate::location::Location;

pub fn guess_label(guess: &Location) -> String {
    format!("Guess: {guess}")
}

pub fn distance_label(distance_meters: f64) -> String {
    format!("{:.1} km", distance_meters / 1000.0)
}

pub fn points_label(points: f64) -> String {
    if (points - points.round()).abs() < f64::EPSILON {
        format!("{} points", points.round())
    } else {
        format!("{points:.2} points")
    }
}
