use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::CoordinatorError;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Both components finite and inside the geographic ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn validate(self) -> Result<Self, CoordinatorError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(CoordinatorError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Weather condition categories mapped from WMO codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            // freezing drizzle and freezing rain
            56 | 57 | 66 | 67 => Self::Sleet,
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear sky",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Cloudy => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// One hourly measurement as delivered by the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub time: NaiveDateTime,
    pub temperature_celsius: f64,
    pub pressure_hpa: f64,
    pub wind_speed_kmh: f64,
    pub humidity_pct: f64,
    pub precipitation_probability_pct: Option<f64>,
    pub weather_code: i32,
    pub condition: WeatherCondition,
}

/// Result of one successful fetch. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: Option<WeatherSample>,
    /// Day index (0 = today) to that day's samples in time order.
    pub by_day: BTreeMap<u32, Vec<WeatherSample>>,
}

impl WeatherSnapshot {
    /// Groups an hourly series into days (24 samples per day) and picks the
    /// sample for `now` out of day 0.
    pub fn from_hourly(samples: Vec<WeatherSample>, now: NaiveDateTime) -> Self {
        use chrono::Timelike;

        let mut by_day: BTreeMap<u32, Vec<WeatherSample>> = BTreeMap::new();
        for (index, sample) in samples.into_iter().enumerate() {
            by_day.entry((index / 24) as u32).or_default().push(sample);
        }

        let target_hour = if now.minute() < 30 { now.hour() } else { (now.hour() + 1).min(23) };

        let current = by_day
            .get(&0)
            .and_then(|today| today.iter().find(|s| s.time.hour() == target_hour))
            .cloned();

        Self { current, by_day }
    }
}

/// Position of the coordinator's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    ResolvingCoordinate,
    Fetching,
    Ready,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Ready | Phase::Failed)
    }
}

/// The single value presentation surfaces render. Published whole on every
/// transition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiState {
    pub weather: Option<WeatherSnapshot>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub coordinate: Option<Coordinate>,
    pub phase: Phase,
    /// Informational only; set when the coordinate could not be persisted.
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_at(day: u32, hour: u32, temperature: f64) -> WeatherSample {
        WeatherSample {
            time: NaiveDate::from_ymd_opt(2024, 3, 1 + day)
                .and_then(|d| d.and_hms_opt(hour, 0, 0))
                .expect("valid timestamp"),
            temperature_celsius: temperature,
            pressure_hpa: 1013.0,
            wind_speed_kmh: 10.0,
            humidity_pct: 50.0,
            precipitation_probability_pct: Some(0.0),
            weather_code: 0,
            condition: WeatherCondition::Clear,
        }
    }

    fn two_days() -> Vec<WeatherSample> {
        (0..48).map(|i| sample_at(i / 24, i % 24, i as f64)).collect()
    }

    #[test]
    fn coordinate_ranges_are_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(Coordinate::new(0.0, 0.0).is_valid());
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_non_finite() {
        assert!(!Coordinate::new(90.01, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());

        let err = Coordinate::new(120.0, 0.0).validate().unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidCoordinate { .. }));
    }

    #[test]
    fn from_hourly_groups_by_day() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 10, 0))
            .expect("valid timestamp");
        let snapshot = WeatherSnapshot::from_hourly(two_days(), now);

        assert_eq!(snapshot.by_day.len(), 2);
        assert_eq!(snapshot.by_day[&0].len(), 24);
        assert_eq!(snapshot.by_day[&1][0].temperature_celsius, 24.0);
    }

    #[test]
    fn from_hourly_rounds_current_to_nearest_hour() {
        let early = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 10, 0))
            .expect("valid timestamp");
        let late = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 45, 0))
            .expect("valid timestamp");
        let last = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(23, 50, 0))
            .expect("valid timestamp");

        let current = |now| WeatherSnapshot::from_hourly(two_days(), now).current;
        assert_eq!(current(early).map(|s| s.temperature_celsius), Some(10.0));
        assert_eq!(current(late).map(|s| s.temperature_celsius), Some(11.0));
        assert_eq!(current(last).map(|s| s.temperature_celsius), Some(23.0));
    }

    #[test]
    fn from_hourly_empty_series_has_no_current() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .expect("valid timestamp");
        let snapshot = WeatherSnapshot::from_hourly(Vec::new(), now);
        assert!(snapshot.current.is_none());
        assert!(snapshot.by_day.is_empty());
    }

    #[test]
    fn wmo_codes_map_to_conditions() {
        assert_eq!(WeatherCondition::from_wmo_code(0), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_wmo_code(2), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_wmo_code(48), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_wmo_code(57), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_wmo_code(66), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_wmo_code(82), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_wmo_code(86), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_wmo_code(99), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_wmo_code(999), WeatherCondition::Clear);
    }

    #[test]
    fn phase_terminality() {
        assert!(Phase::Ready.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Fetching.is_terminal());
        assert!(!UiState::default().phase.is_terminal());
    }
}
