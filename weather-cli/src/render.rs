//! Text rendering of the coordinator's state.

use std::{collections::HashMap, fmt::Write};

use weather_core::{RemedialAction, UiState, WeatherCondition, WeatherSample, WeatherSnapshot};

pub fn render_state(state: &UiState) -> String {
    let mut out = String::new();

    if let Some(coordinate) = state.coordinate {
        let _ = writeln!(out, "Location: {coordinate}");
    }
    if let Some(warning) = &state.warning {
        let _ = writeln!(out, "Warning: {warning}");
    }

    match &state.weather {
        Some(snapshot) => render_snapshot(&mut out, snapshot),
        None => {
            let _ = writeln!(out, "No weather data.");
        }
    }

    out
}

pub fn render_failure(state: &UiState, remedy: RemedialAction) -> String {
    let mut out = String::new();
    if let Some(error) = &state.error {
        let _ = write!(out, "{error}");
    }
    let _ = write!(out, "\nNext step: {}", hint(remedy));
    out
}

fn hint(remedy: RemedialAction) -> String {
    match remedy {
        RemedialAction::RequestPermission => {
            format!("{} (run `weather configure`)", remedy.label())
        }
        RemedialAction::OpenLocationSettings => {
            format!("{} (run `weather configure` and enable positioning)", remedy.label())
        }
        RemedialAction::Retry => format!("{} (run `weather show`)", remedy.label()),
    }
}

fn render_snapshot(out: &mut String, snapshot: &WeatherSnapshot) {
    if let Some(now) = &snapshot.current {
        let _ = writeln!(
            out,
            "Now ({}): {:.1}°C, {}",
            now.time.format("%H:%M"),
            now.temperature_celsius,
            now.condition.description()
        );
        let _ = writeln!(
            out,
            "  Humidity {:.0}%  Wind {:.1} km/h  Pressure {:.0} hPa",
            now.humidity_pct, now.wind_speed_kmh, now.pressure_hpa
        );
    }

    if snapshot.by_day.is_empty() {
        return;
    }

    let _ = writeln!(out, "Forecast:");
    for (day, samples) in &snapshot.by_day {
        if let Some(summary) = DaySummary::from_samples(samples) {
            let _ = writeln!(out, "  {:<10} {}", day_label(*day, samples), summary);
        }
    }
}

fn day_label(day: u32, samples: &[WeatherSample]) -> String {
    match day {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => samples
            .first()
            .map(|s| s.time.format("%A").to_string())
            .unwrap_or_else(|| format!("Day {day}")),
    }
}

#[derive(Debug, PartialEq)]
struct DaySummary {
    low: f64,
    high: f64,
    precipitation_pct: Option<f64>,
    condition: WeatherCondition,
}

impl DaySummary {
    fn from_samples(samples: &[WeatherSample]) -> Option<Self> {
        let first = samples.first()?;

        let low = samples.iter().map(|s| s.temperature_celsius).fold(f64::INFINITY, f64::min);
        let high = samples.iter().map(|s| s.temperature_celsius).fold(f64::NEG_INFINITY, f64::max);
        let precipitation_pct = samples
            .iter()
            .filter_map(|s| s.precipitation_probability_pct)
            .reduce(f64::max);

        let mut counts: HashMap<WeatherCondition, usize> = HashMap::new();
        for sample in samples {
            *counts.entry(sample.condition).or_default() += 1;
        }
        // Ties go to whichever condition shows up first in the day.
        let best = counts.values().copied().max().unwrap_or(0);
        let condition = samples
            .iter()
            .map(|s| s.condition)
            .find(|c| counts.get(c) == Some(&best))
            .unwrap_or(first.condition);

        Some(Self { low, high, precipitation_pct, condition })
    }
}

impl std::fmt::Display for DaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>5.1} / {:>5.1}°C  {}", self.low, self.high, self.condition.description())?;
        if let Some(p) = self.precipitation_pct {
            write!(f, "  ({p:.0}% precip.)")?;
        }
        Ok(())
    }
}
