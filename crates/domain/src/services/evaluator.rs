//! Alert evaluator: one reading against one threshold profile.
//!
//! Pure and synchronous. The output lists violation candidates in a fixed
//! order (offline, temperature, humidity, battery) and the alert types whose
//! state is known this pass.

use serde::Serialize;

use crate::models::{AlertSeverity, AlertType, SensorReading};
use crate::services::thresholds::ThresholdProfile;

/// An out-of-range condition not yet committed as an alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationCandidate {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub current_value: f64,
    pub threshold_value: f64,
    pub message: String,
}

/// Result of evaluating one sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub candidates: Vec<ViolationCandidate>,
    /// Alert types whose state was determined by this reading. Open alerts of
    /// a checked type without a candidate are back in range.
    pub checked: Vec<AlertType>,
}

impl Evaluation {
    pub fn has_candidate(&self, alert_type: AlertType) -> bool {
        self.candidates.iter().any(|c| c.alert_type == alert_type)
    }

    pub fn is_checked(&self, alert_type: AlertType) -> bool {
        self.checked.contains(&alert_type)
    }

    pub fn is_offline(&self) -> bool {
        self.has_candidate(AlertType::Offline)
    }
}

/// Grades a temperature deviation in degrees.
pub fn temperature_severity(deviation: f64) -> AlertSeverity {
    let d = deviation.abs();
    if d > 5.0 {
        AlertSeverity::Critical
    } else if d > 2.0 {
        AlertSeverity::High
    } else if d > 1.0 {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

/// Evaluates a reading against a profile.
pub fn evaluate(reading: &SensorReading, profile: &ThresholdProfile) -> Evaluation {
    let mut evaluation = Evaluation::default();

    if !reading.present {
        evaluation.checked.push(AlertType::Offline);
        evaluation.candidates.push(ViolationCandidate {
            alert_type: AlertType::Offline,
            severity: AlertSeverity::High,
            current_value: 0.0,
            threshold_value: 0.0,
            message: "Sensor offline: no reading returned by the vendor".to_string(),
        });
        return evaluation;
    }

    evaluation.checked.push(AlertType::Offline);

    if let Some(temp) = reading.temperature {
        evaluation
            .checked
            .extend([AlertType::TemperatureHigh, AlertType::TemperatureLow]);

        if temp < profile.min_temp {
            evaluation.candidates.push(ViolationCandidate {
                alert_type: AlertType::TemperatureLow,
                severity: temperature_severity(temp - profile.min_temp),
                current_value: temp,
                threshold_value: profile.min_temp,
                message: format!(
                    "Temperature {:.1}°C is below minimum {:.1}°C",
                    temp, profile.min_temp
                ),
            });
        } else if temp > profile.max_temp {
            evaluation.candidates.push(ViolationCandidate {
                alert_type: AlertType::TemperatureHigh,
                severity: temperature_severity(temp - profile.max_temp),
                current_value: temp,
                threshold_value: profile.max_temp,
                message: format!(
                    "Temperature {:.1}°C is above maximum {:.1}°C",
                    temp, profile.max_temp
                ),
            });
        }
    }

    match reading.humidity {
        Some(humidity) => {
            evaluation.checked.push(AlertType::Humidity);
            if let Some(candidate) = check_humidity(humidity, profile) {
                evaluation.candidates.push(candidate);
            }
        }
        // Nothing to violate, so any open humidity alert is stale.
        None if !profile.has_humidity_bounds() => evaluation.checked.push(AlertType::Humidity),
        None => {}
    }

    if let Some(voltage) = reading.battery_voltage {
        evaluation.checked.push(AlertType::BatteryLow);
        if voltage < profile.min_battery_voltage {
            evaluation.candidates.push(ViolationCandidate {
                alert_type: AlertType::BatteryLow,
                severity: AlertSeverity::Low,
                current_value: voltage,
                threshold_value: profile.min_battery_voltage,
                message: format!(
                    "Battery {:.2}V is below {:.2}V",
                    voltage, profile.min_battery_voltage
                ),
            });
        }
    }

    evaluation
}

fn check_humidity(humidity: f64, profile: &ThresholdProfile) -> Option<ViolationCandidate> {
    if let Some(min) = profile.min_humidity.filter(|min| humidity < *min) {
        return Some(ViolationCandidate {
            alert_type: AlertType::Humidity,
            severity: AlertSeverity::Medium,
            current_value: humidity,
            threshold_value: min,
            message: format!("Humidity {:.1}% is below minimum {:.1}%", humidity, min),
        });
    }
    if let Some(max) = profile.max_humidity.filter(|max| humidity > *max) {
        return Some(ViolationCandidate {
            alert_type: AlertType::Humidity,
            severity: AlertSeverity::Medium,
            current_value: humidity,
            threshold_value: max,
            message: format!("Humidity {:.1}% is above maximum {:.1}%", humidity, max),
        });
    }
    None
}
