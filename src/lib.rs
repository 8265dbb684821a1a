// Multi-axis stepper rig over a serial link
//
// Provides:
// - The per-axis rig record (connection, position, identifiers, conversions)
// - Linear step <-> coordinate conversion factories
// - A serial transport seam backed by `serialport`
// - JSON rig descriptions

pub mod config;
pub mod conversion;
pub mod error;
pub mod rig;
pub mod transport;

pub use config::{AxisConfig, ConversionConfig, RigConfig};
pub use conversion::{
    CoordToStep, StepToCoord, check_linear, coord_to_step_linear, step_to_coord_linear,
};
pub use error::{Result, RigError};
pub use rig::{AxisUpdate, Connection, OpenOptions, Rig};
pub use transport::{SerialTransport, SystemSerial};
