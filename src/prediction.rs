// Response shapes of the external prediction service and the 15-value
// measurement state used to annotate landmarks.
//
// The viewer never calls the service. It reads a saved `POST /predict`
// response to pick a highlight tint, and shows measurement values next to
// the selected landmark.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

pub const MEASUREMENT_COUNT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Accepts the short (`"M"`, `"F"`) and full (`"Male"`, `"Female"`) labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Some(Gender::Male),
            "f" | "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Prediction confidence as a percentage in [0, 100].
///
/// Producers disagree on fraction vs. percentage; values at or below 1.0
/// are read as fractions and scaled once here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence(f32);

impl Confidence {
    pub fn from_raw(raw: f32) -> Self {
        let pct = if raw <= 1.0 { raw * 100.0 } else { raw };
        Confidence(if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) })
    }

    pub fn percent(self) -> f32 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        f32::deserialize(deserializer).map(Confidence::from_raw)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Probabilities {
    #[serde(rename = "Female")]
    pub female: Confidence,
    #[serde(rename = "Male")]
    pub male: Confidence,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub gender: String,
    #[serde(default)]
    pub gender_full: Option<String>,
    pub confidence: Confidence,
    pub probabilities: Option<Probabilities>,
}

impl Prediction {
    pub fn gender(&self) -> Option<Gender> {
        Gender::from_label(&self.gender)
            .or_else(|| self.gender_full.as_deref().and_then(Gender::from_label))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    #[serde(default)]
    pub prediction: Option<Prediction>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// The predicted gender of a successful response.
    pub fn gender(&self) -> Option<Gender> {
        if !self.success {
            return None;
        }
        self.prediction.as_ref().and_then(Prediction::gender)
    }
}

/// Ordered M1..M15 values as typed into the form. Blank entries are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements {
    values: [Option<f32>; MEASUREMENT_COUNT],
}

impl Measurements {
    /// Parse a comma-separated list. Missing, blank or non-numeric entries stay empty;
    /// extra entries are ignored.
    pub fn parse(list: &str) -> Self {
        let mut values = [None; MEASUREMENT_COUNT];
        for (slot, raw) in values.iter_mut().zip(list.split(',')) {
            *slot = raw.trim().parse::<f32>().ok().filter(|v| v.is_finite());
        }
        Self { values }
    }

    /// The values served by the service's `GET /sample` endpoint.
    pub fn sample() -> Self {
        const SAMPLE: [f32; MEASUREMENT_COUNT] = [
            10.5, 12.3, 0.85, 9.8, 3.2, 3.1, 6.5, 5.8, 120.0, 7.5, 1.2, 11.5, 4.2, 3.6, 4.8,
        ];
        Self { values: SAMPLE.map(Some) }
    }

    /// Value of measurement `number` (1-based, matching M1..M15).
    pub fn get(&self, number: u8) -> Option<f32> {
        let idx = usize::from(number).checked_sub(1)?;
        self.values.get(idx).copied().flatten()
    }

    pub fn filled(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_successful_prediction() {
        let resp = PredictionResponse::from_json(
            r#"{
                "success": true,
                "prediction": {
                    "gender": "M",
                    "gender_full": "Male",
                    "confidence": 82.5,
                    "probabilities": { "Female": 17.5, "Male": 82.5 }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(resp.gender(), Some(Gender::Male));
        let prediction = resp.prediction.unwrap();
        assert_relative_eq!(prediction.confidence.percent(), 82.5);
        assert_relative_eq!(prediction.probabilities.unwrap().female.percent(), 17.5);
    }

    #[test]
    fn fraction_confidence_becomes_percentage() {
        let resp = PredictionResponse::from_json(
            r#"{"success": true, "prediction": {"gender": "F", "confidence": 0.64,
                "probabilities": {"Female": 0.64, "Male": 0.36}}}"#,
        )
        .unwrap();
        let prediction = resp.prediction.as_ref().unwrap();
        assert_relative_eq!(prediction.confidence.percent(), 64.0, epsilon = 1e-4);
        assert_eq!(resp.gender(), Some(Gender::Female));
    }

    #[test]
    fn error_response_has_no_gender() {
        let resp = PredictionResponse::from_json(
            r#"{"success": false, "error": "Expected 15 measurements, got 3"}"#,
        )
        .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.gender(), None);
        assert_eq!(resp.error.as_deref(), Some("Expected 15 measurements, got 3"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(PredictionResponse::from_json("{\"success\": tru").is_err());
    }

    #[test]
    fn gender_labels() {
        assert_eq!(Gender::from_label(" female "), Some(Gender::Female));
        assert_eq!(Gender::from_label("M"), Some(Gender::Male));
        assert_eq!(Gender::from_label("unknown"), None);
    }

    #[test]
    fn measurements_keep_blanks() {
        let m = Measurements::parse("10.5, ,abc,9.8");
        assert_eq!(m.get(1), Some(10.5));
        assert_eq!(m.get(2), None);
        assert_eq!(m.get(3), None);
        assert_eq!(m.get(4), Some(9.8));
        assert_eq!(m.get(15), None);
        assert_eq!(m.get(0), None);
        assert_eq!(m.get(16), None);
        assert_eq!(m.filled(), 2);
    }

    #[test]
    fn sample_fills_all_fifteen() {
        let m = Measurements::sample();
        assert_eq!(m.filled(), MEASUREMENT_COUNT);
        assert_eq!(m.get(9), Some(120.0));
    }
}
