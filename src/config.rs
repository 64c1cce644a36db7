use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::ConversionError;

/// Output naming variant for the polar representation of the vector field.
/// Legacy names are used when the config carries the speedVar/dirVar key pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolarNaming {
    Canonical,
    Legacy,
}

impl PolarNaming {
    pub fn magnitude_name(&self) -> &'static str {
        match self {
            PolarNaming::Canonical => "magnitude",
            PolarNaming::Legacy => "speed",
        }
    }

    pub fn direction_name(&self) -> &'static str {
        match self {
            PolarNaming::Canonical => "direction",
            PolarNaming::Legacy => "dir",
        }
    }
}

/// Source columns for the polar representation, resolved from whichever
/// key pair the config used.
#[derive(Clone, Debug)]
pub struct PolarPair<'a> {
    pub magnitude_var: &'a str,
    pub direction_var: &'a str,
    pub naming: PolarNaming,
}

/// Declarative transformation config, loaded once per run from a JSON
/// document. Unknown keys are ignored; absent optional keys mean "this
/// derivation is not requested".
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionConfig {
    pub lon_var: String,
    pub lat_var: String,
    pub is360: bool,
    #[serde(default)]
    pub u_var: Option<String>,
    #[serde(default)]
    pub v_var: Option<String>,
    #[serde(default, rename = "convertUV")]
    pub convert_uv: bool,
    #[serde(default)]
    pub magnitude_var: Option<String>,
    #[serde(default)]
    pub direction_var: Option<String>,
    #[serde(default)]
    pub speed_var: Option<String>,
    #[serde(default)]
    pub dir_var: Option<String>,
    #[serde(default)]
    pub convert_mag_dir: bool,
    #[serde(default, deserialize_with = "string_or_list")]
    pub extra_vars: Vec<String>,
}

impl ConversionConfig {
    /// Loads and validates a config document from disk
    pub fn from_file(path: &Path) -> Result<Self, ConversionError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ConversionError::Config(format!("unable to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates a raw JSON config document
    pub fn from_json(raw: &str) -> Result<Self, ConversionError> {
        let config: ConversionConfig =
            serde_json::from_str(raw).map_err(|e| ConversionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConversionError> {
        if self.u_var.is_some() != self.v_var.is_some() {
            return Err(ConversionError::Config(
                "uVar and vVar must be configured together".into(),
            ));
        }
        if self.magnitude_var.is_some() != self.direction_var.is_some() {
            return Err(ConversionError::Config(
                "magnitudeVar and directionVar must be configured together".into(),
            ));
        }
        if self.speed_var.is_some() != self.dir_var.is_some() {
            return Err(ConversionError::Config(
                "speedVar and dirVar must be configured together".into(),
            ));
        }
        if self.magnitude_var.is_some() && self.speed_var.is_some() {
            return Err(ConversionError::Config(
                "magnitudeVar/directionVar and speedVar/dirVar are mutually exclusive".into(),
            ));
        }
        if self.convert_uv && self.uv_pair().is_none() {
            return Err(ConversionError::Config(
                "convertUV requires uVar and vVar".into(),
            ));
        }
        if self.convert_mag_dir && self.polar_pair().is_none() {
            return Err(ConversionError::Config(
                "convertMagDir requires magnitudeVar and directionVar (or speedVar and dirVar)"
                    .into(),
            ));
        }
        Ok(())
    }

    /// The configured Cartesian source columns, when both are present
    pub fn uv_pair(&self) -> Option<(&str, &str)> {
        match (&self.u_var, &self.v_var) {
            (Some(u), Some(v)) => Some((u.as_str(), v.as_str())),
            _ => None,
        }
    }

    /// The configured polar source columns, when both are present
    pub fn polar_pair(&self) -> Option<PolarPair<'_>> {
        if let (Some(magnitude), Some(direction)) = (&self.magnitude_var, &self.direction_var) {
            Some(PolarPair {
                magnitude_var: magnitude,
                direction_var: direction,
                naming: PolarNaming::Canonical,
            })
        } else if let (Some(speed), Some(dir)) = (&self.speed_var, &self.dir_var) {
            Some(PolarPair {
                magnitude_var: speed,
                direction_var: dir,
                naming: PolarNaming::Legacy,
            })
        } else {
            None
        }
    }

    /// Naming variant for derived polar outputs. Follows the key pair the
    /// config used; canonical when only uv columns are configured.
    pub fn polar_naming(&self) -> PolarNaming {
        match self.polar_pair() {
            Some(pair) => pair.naming,
            None => PolarNaming::Canonical,
        }
    }
}

struct StringOrListVisitor;

impl<'de> Visitor<'de> for StringOrListVisitor {
    type Value = Vec<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a variable name or a list of variable names")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(vec![v.to_string()])
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut vars = Vec::new();
        while let Some(var) = seq.next_element::<String>()? {
            vars.push(var);
        }
        Ok(vars)
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(StringOrListVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uv_config() {
        let config = ConversionConfig::from_json(
            r#"{
                "lonVar": "lon",
                "latVar": "lat",
                "is360": true,
                "uVar": "U",
                "vVar": "V",
                "convertUV": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.lon_var, "lon");
        assert!(config.is360);
        assert_eq!(config.uv_pair(), Some(("U", "V")));
        assert!(config.convert_uv);
        assert!(config.polar_pair().is_none());
        assert_eq!(config.polar_naming(), PolarNaming::Canonical);
        assert!(config.extra_vars.is_empty());
    }

    #[test]
    fn parse_legacy_polar_config() {
        let config = ConversionConfig::from_json(
            r#"{
                "lonVar": "longitude",
                "latVar": "latitude",
                "is360": false,
                "speedVar": "wind_speed",
                "dirVar": "wind_dir",
                "convertMagDir": true
            }"#,
        )
        .unwrap();

        let pair = config.polar_pair().unwrap();
        assert_eq!(pair.magnitude_var, "wind_speed");
        assert_eq!(pair.direction_var, "wind_dir");
        assert_eq!(pair.naming, PolarNaming::Legacy);
        assert_eq!(config.polar_naming().magnitude_name(), "speed");
        assert_eq!(config.polar_naming().direction_name(), "dir");
    }

    #[test]
    fn missing_is360_is_an_error() {
        let result = ConversionConfig::from_json(
            r#"{"lonVar": "lon", "latVar": "lat", "uVar": "U", "vVar": "V"}"#,
        );
        assert!(matches!(result, Err(ConversionError::Config(_))));
    }

    #[test]
    fn extra_vars_accepts_string_or_list() {
        let single = ConversionConfig::from_json(
            r#"{"lonVar": "lon", "latVar": "lat", "is360": false, "extraVars": "sst"}"#,
        )
        .unwrap();
        assert_eq!(single.extra_vars, vec!["sst".to_string()]);

        let list = ConversionConfig::from_json(
            r#"{"lonVar": "lon", "latVar": "lat", "is360": false, "extraVars": ["sst", "ice"]}"#,
        )
        .unwrap();
        assert_eq!(list.extra_vars, vec!["sst".to_string(), "ice".to_string()]);
    }

    #[test]
    fn half_configured_pairs_are_errors() {
        let result = ConversionConfig::from_json(
            r#"{"lonVar": "lon", "latVar": "lat", "is360": false, "uVar": "U"}"#,
        );
        assert!(matches!(result, Err(ConversionError::Config(_))));

        let result = ConversionConfig::from_json(
            r#"{"lonVar": "lon", "latVar": "lat", "is360": false, "magnitudeVar": "spd"}"#,
        );
        assert!(matches!(result, Err(ConversionError::Config(_))));
    }

    #[test]
    fn mixed_polar_naming_is_an_error() {
        let result = ConversionConfig::from_json(
            r#"{
                "lonVar": "lon",
                "latVar": "lat",
                "is360": false,
                "magnitudeVar": "spd",
                "directionVar": "deg",
                "speedVar": "spd2",
                "dirVar": "deg2"
            }"#,
        );
        assert!(matches!(result, Err(ConversionError::Config(_))));
    }

    #[test]
    fn convert_flag_without_sources_is_an_error() {
        let result = ConversionConfig::from_json(
            r#"{"lonVar": "lon", "latVar": "lat", "is360": false, "convertUV": true}"#,
        );
        assert!(matches!(result, Err(ConversionError::Config(_))));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = ConversionConfig::from_json(
            r#"{"lonVar": "lon", "latVar": "lat", "is360": false, "collection": "ASCAT"}"#,
        );
        assert!(config.is_ok());
    }
}
