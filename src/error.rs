// Error types for the rig record, its transport and its configuration

/// Errors raised while opening, configuring or querying a rig
#[derive(Debug, thiserror::Error)]
pub enum RigError {
    #[error("A rig needs at least one axis")]
    NoAxes,

    #[error("No serial port specified and none detected")]
    NoPortAvailable,

    #[error("Failed to enumerate serial ports: {0}")]
    PortEnumeration(#[source] serialport::Error),

    #[error("Failed to open serial port {port} at {baud_rate} baud: {source}")]
    Connection {
        port: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },

    #[error("Expected {expected} entries for {field}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Axis {axis} out of range for a {axis_count}-axis rig")]
    AxisOutOfRange { axis: usize, axis_count: usize },

    #[error(
        "Invalid linear conversion ({steps_per_revolution} steps/rev, radius {radius}): {reason}"
    )]
    InvalidLinear {
        steps_per_revolution: u32,
        radius: f64,
        reason: &'static str,
    },

    #[error("Invalid conversion for axis {axis}: {reason}")]
    InvalidConversion { axis: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid rig description: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RigError>;
