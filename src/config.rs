// Defaults and the JSON rig description
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::conversion::{
    CoordToStep, StepToCoord, coord_to_step_linear, identity_step_to_coord, round_coord_to_step,
    step_to_coord_linear,
};
use crate::error::{Result, RigError};
use crate::rig::{AxisUpdate, OpenOptions, Rig};
use crate::transport::SerialTransport;

// Serial link
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

// Linear conversion scale when none is given (coordinate = shaft angle in rad)
pub const DEFAULT_RADIUS: f64 = 1.0;

// Default axis identifiers are m1, m2, ...
pub const AXIS_ID_PREFIX: &str = "m";

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS
}

/// How an axis maps steps to coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionConfig {
    /// Coordinates are raw step counts
    #[default]
    Identity,
    /// One revolution moves `radius * 2π`
    Linear {
        steps_per_revolution: u32,
        #[serde(default = "default_radius")]
        radius: f64,
    },
}

impl ConversionConfig {
    fn build(&self, axis: usize) -> Result<(StepToCoord, CoordToStep)> {
        match *self {
            ConversionConfig::Identity => Ok((identity_step_to_coord(), round_coord_to_step())),
            ConversionConfig::Linear {
                steps_per_revolution,
                radius,
            } => {
                let invalid = |e: RigError| RigError::InvalidConversion {
                    axis,
                    reason: e.to_string(),
                };
                let f = step_to_coord_linear(steps_per_revolution, radius).map_err(invalid)?;
                let g = coord_to_step_linear(steps_per_revolution, radius).map_err(invalid)?;
                Ok((f, g))
            }
        }
    }
}

/// One axis of a [`RigConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AxisConfig {
    /// Defaults to `m<index>`
    #[serde(default)]
    pub id: Option<String>,
    /// Defaults to the 1-based axis index
    #[serde(default)]
    pub dependency: Option<usize>,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// A rig as described in a JSON file
///
/// ```json
/// {
///   "axis_count": 2,
///   "port": "/dev/ttyUSB0",
///   "axes": [
///     { "id": "pan", "conversion": { "kind": "linear", "steps_per_revolution": 2048 } },
///     { "id": "lift", "conversion": { "kind": "linear", "steps_per_revolution": 200, "radius": 0.01 } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    pub axis_count: usize,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub no_connection: bool,
    /// When present, one entry per axis
    #[serde(default)]
    pub axes: Option<Vec<AxisConfig>>,
}

impl RigConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a rig description from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading rig description from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            no_connection: self.no_connection,
        }
    }

    /// The reconfiguration described by `axes`, empty when `axes` is absent
    pub fn axis_update(&self) -> Result<AxisUpdate> {
        let Some(axes) = &self.axes else {
            return Ok(AxisUpdate::new());
        };
        if axes.len() != self.axis_count {
            return Err(RigError::LengthMismatch {
                field: "axes",
                expected: self.axis_count,
                actual: axes.len(),
            });
        }

        let mut identifiers = Vec::with_capacity(axes.len());
        let mut dependency = Vec::with_capacity(axes.len());
        let mut step_to_coord = Vec::with_capacity(axes.len());
        let mut coord_to_step = Vec::with_capacity(axes.len());

        for (i, axis) in axes.iter().enumerate() {
            identifiers.push(
                axis.id
                    .clone()
                    .unwrap_or_else(|| format!("{}{}", AXIS_ID_PREFIX, i + 1)),
            );
            dependency.push(axis.dependency.unwrap_or(i + 1));
            let (f, g) = axis.conversion.build(i)?;
            step_to_coord.push(f);
            coord_to_step.push(g);
        }

        Ok(AxisUpdate::new()
            .identifiers(identifiers)
            .dependency(dependency)
            .step_to_coord(step_to_coord)
            .coord_to_step(coord_to_step))
    }

    /// Open the described rig through `transport` and apply its axes
    pub fn open_rig<T: SerialTransport>(&self, transport: &T) -> Result<Rig<T::Handle>> {
        // Validate before touching the port
        let update = self.axis_update()?;
        let mut rig = Rig::open(transport, self.axis_count, &self.open_options())?;
        rig.configure(update)?;
        Ok(rig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockSerial;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_minimal_description() {
        let config = RigConfig::from_json_str(r#"{ "axis_count": 3 }"#).unwrap();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.port, None);
        assert!(!config.no_connection);
        assert_eq!(config.open_options(), OpenOptions::default());
    }

    #[test]
    fn test_linear_axes() {
        let config = RigConfig::from_json_str(
            r#"{
                "axis_count": 2,
                "no_connection": true,
                "axes": [
                    { "id": "pan", "conversion": { "kind": "linear", "steps_per_revolution": 2048 } },
                    { "dependency": 1, "conversion": { "kind": "linear", "steps_per_revolution": 2048, "radius": 2.0 } }
                ]
            }"#,
        )
        .unwrap();

        let serial = MockSerial::default();
        let rig = config.open_rig(&serial).unwrap();
        assert!(rig.connection().is_absent());
        assert_eq!(rig.identifiers(), &["pan", "m2"]);
        assert_eq!(rig.dependency(), &[1, 1]);
        assert_eq!(rig.steps_to_coord(0, 512.0).unwrap(), FRAC_PI_2);
        assert_eq!(rig.steps_to_coord(1, 512.0).unwrap(), 2.0 * FRAC_PI_2);
        assert_eq!(rig.coord_to_steps(0, FRAC_PI_2).unwrap(), 512);
    }

    #[test]
    fn test_identity_is_default_conversion() {
        let config = RigConfig::from_json_str(
            r#"{ "axis_count": 1, "no_connection": true, "axes": [ { "id": "z" } ] }"#,
        )
        .unwrap();
        let rig = config.open_rig(&MockSerial::default()).unwrap();
        assert_eq!(rig.steps_to_coord(0, 12.0).unwrap(), 12.0);
        assert_eq!(rig.coord_to_steps(0, 11.7).unwrap(), 12);
    }

    #[test]
    fn test_axes_count_must_match() {
        let config = RigConfig::from_json_str(
            r#"{ "axis_count": 3, "no_connection": true, "axes": [ {}, {} ] }"#,
        )
        .unwrap();
        let err = config.open_rig(&MockSerial::default()).unwrap_err();
        assert!(matches!(
            err,
            RigError::LengthMismatch {
                field: "axes",
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_invalid_linear_parameters() {
        let zero_spr = RigConfig::from_json_str(
            r#"{ "axis_count": 1, "axes": [ { "conversion": { "kind": "linear", "steps_per_revolution": 0 } } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            zero_spr.axis_update().unwrap_err(),
            RigError::InvalidConversion { axis: 0, .. }
        ));

        let bad_radius = RigConfig::from_json_str(
            r#"{ "axis_count": 2, "axes": [ {}, { "conversion": { "kind": "linear", "steps_per_revolution": 200, "radius": -1.0 } } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            bad_radius.axis_update().unwrap_err(),
            RigError::InvalidConversion { axis: 1, .. }
        ));
    }

    #[test]
    fn test_invalid_config_does_not_open_port() {
        let config = RigConfig::from_json_str(
            r#"{ "axis_count": 1, "port": "/dev/ttyUSB0", "axes": [ { "conversion": { "kind": "linear", "steps_per_revolution": 0 } } ] }"#,
        )
        .unwrap();
        let serial = MockSerial::default();
        assert!(config.open_rig(&serial).is_err());
        assert!(serial.opened.borrow().is_empty());
    }

    #[test]
    fn test_opens_configured_port() {
        let config = RigConfig::from_json_str(
            r#"{ "axis_count": 2, "port": "/dev/ttyACM1", "baud_rate": 115200 }"#,
        )
        .unwrap();
        let serial = MockSerial::default();
        let rig = config.open_rig(&serial).unwrap();
        assert_eq!(rig.connection().port(), Some("/dev/ttyACM1"));
        assert_eq!(rig.connection().baud_rate(), Some(115_200));
        assert_eq!(rig.identifiers(), &["m1", "m2"]);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join(format!(
            "stepper-rig-missing-{}/rig.json",
            std::process::id()
        ));
        let err = RigConfig::load(&path).unwrap_err();
        assert!(matches!(err, RigError::Io(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let path =
            std::env::temp_dir().join(format!("stepper-rig-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "axis_count": 2, "baud_rate": 57600, "no_connection": true }"#,
        )
        .unwrap();
        let loaded = RigConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert_eq!(config.axis_count, 2);
        assert_eq!(config.baud_rate, 57_600);
        assert!(config.no_connection);
    }

    #[test]
    fn test_unknown_conversion_kind_rejected() {
        let err = RigConfig::from_json_str(
            r#"{ "axis_count": 1, "axes": [ { "conversion": { "kind": "helical" } } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, RigError::Json(_)));
    }
}
