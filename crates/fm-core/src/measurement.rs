use std::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::error::{Error, Result};

/// Anthropometric targets for a single subject.
///
/// `torso_height` and `side_depth` are informational and ignored by the scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub height_cm: f64,
    pub shoulder_cm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torso_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_depth: Option<f64>,
}

impl Measurement {
    pub fn new(height_cm: f64, shoulder_cm: f64) -> Result<Self> {
        let measurement = Self {
            height_cm,
            shoulder_cm,
            torso_height: None,
            side_depth: None,
        };
        measurement.validate()?;
        Ok(measurement)
    }

    /// Load a measurement file, replacing `height_cm` with `height_override` when given.
    pub fn load(path: impl AsRef<Path>, height_override: Option<f64>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        let measurement = Self::from_json_str(&raw, height_override)
            .map_err(|e| match e {
                Error::Validation(msg) => Error::Validation(format!("{msg} in {}", path.display())),
                other => other,
            })?;
        log::info!(
            "Loaded measurements from {}: height {:.2} cm, shoulder {:.2} cm",
            path.display(),
            measurement.height_cm,
            measurement.shoulder_cm
        );
        Ok(measurement)
    }

    pub fn from_json_str(raw: &str, height_override: Option<f64>) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::parse(format!("measurement file is not valid JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(Error::parse("measurement file must contain a JSON object"));
        };

        let height_cm = match height_override {
            Some(h) => Some(h),
            None => numeric_field(&fields, "height_cm")?,
        };
        let shoulder_cm = numeric_field(&fields, "shoulder_cm")?;

        let measurement = Self {
            height_cm: height_cm.ok_or_else(|| Error::validation("\"height_cm\" missing"))?,
            shoulder_cm: shoulder_cm.ok_or_else(|| Error::validation("\"shoulder_cm\" missing"))?,
            torso_height: numeric_field(&fields, "torso_height")?,
            side_depth: numeric_field(&fields, "side_depth")?,
        };
        measurement.validate()?;
        Ok(measurement)
    }

    fn validate(&self) -> Result<()> {
        for (name, v) in [("height_cm", self.height_cm), ("shoulder_cm", self.shoulder_cm)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::validation(format!("\"{name}\" must be a positive number, got {v}")));
            }
        }
        Ok(())
    }
}

/// Numbers and numeric strings are both accepted; anything else is a parse error.
fn numeric_field(fields: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
    let parsed = match fields.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| Error::parse(format!("\"{key}\" is not numeric")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_load_plain_values() {
        let m = Measurement::from_json_str(r#"{"height_cm": 170, "shoulder_cm": 40.5}"#, None).unwrap();
        assert_relative_eq!(m.height_cm, 170.0);
        assert_relative_eq!(m.shoulder_cm, 40.5);
        assert_eq!(m.torso_height, None);
    }

    #[test]
    fn test_override_replaces_height_only() {
        let m = Measurement::from_json_str(r#"{"height_cm": 170, "shoulder_cm": 40}"#, Some(182.0)).unwrap();
        assert_relative_eq!(m.height_cm, 182.0);
        assert_relative_eq!(m.shoulder_cm, 40.0);
    }

    #[test]
    fn test_override_fills_missing_height() {
        let m = Measurement::from_json_str(r#"{"shoulder_cm": 40}"#, Some(165.0)).unwrap();
        assert_relative_eq!(m.height_cm, 165.0);
    }

    #[test]
    fn test_missing_required_keys() {
        let err = Measurement::from_json_str(r#"{"shoulder_cm": 40}"#, None).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("height_cm"));

        let err = Measurement::from_json_str(r#"{"height_cm": 170}"#, Some(180.0)).unwrap_err();
        assert!(err.to_string().contains("shoulder_cm"));
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let m = Measurement::from_json_str(r#"{"height_cm": "171.5", "shoulder_cm": "39"}"#, None).unwrap();
        assert_relative_eq!(m.height_cm, 171.5);
        assert_relative_eq!(m.shoulder_cm, 39.0);
    }

    #[test]
    fn test_non_numeric_is_parse_error() {
        let err = Measurement::from_json_str(r#"{"height_cm": "tall", "shoulder_cm": 40}"#, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let err = Measurement::from_json_str(r#"{"height_cm": 170, "shoulder_cm": [40]}"#, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let err = Measurement::from_json_str("not json", None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_non_positive_rejected() {
        let err = Measurement::from_json_str(r#"{"height_cm": 0, "shoulder_cm": 40}"#, None).unwrap_err();
        assert!(err.is_validation());
        assert!(Measurement::new(170.0, -1.0).is_err());
    }

    #[test]
    fn test_extra_fields_kept_when_known() {
        let m = Measurement::from_json_str(
            r#"{"height_cm": 170, "shoulder_cm": 40, "torso_height": 0.31, "side_depth": 0.2, "note": "x"}"#,
            None,
        )
        .unwrap();
        assert_eq!(m.torso_height, Some(0.31));
        assert_eq!(m.side_depth, Some(0.2));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measurements.json");
        std::fs::write(&path, r#"{"height_cm": 170, "shoulder_cm": 40}"#).unwrap();
        let m = Measurement::load(&path, None).unwrap();
        assert_relative_eq!(m.height_cm, 170.0);

        let err = Measurement::load(dir.path().join("nope.json"), None).unwrap_err();
        assert!(err.is_not_found());
    }
}
