// Multi-axis rig record
//
// Holds the serial connection plus, per axis: last-known position, an
// identifier, a step <-> coordinate conversion pair and an opaque dependency
// annotation. Every per-axis sequence always has exactly `axis_count` entries.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{AXIS_ID_PREFIX, DEFAULT_BAUD_RATE};
use crate::conversion::{CoordToStep, StepToCoord, identity_step_to_coord, round_coord_to_step};
use crate::error::{Result, RigError};
use crate::transport::SerialTransport;

/// How to reach the hardware when opening a rig
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOptions {
    /// Port path; `None` picks the first port the transport lists
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Skip the transport entirely (bench/test mode)
    pub no_connection: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            no_connection: false,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn no_connection(mut self, no_connection: bool) -> Self {
        self.no_connection = no_connection;
        self
    }
}

/// The rig's link to the motor controller
pub enum Connection<H> {
    /// Opened without hardware
    Absent,
    Open {
        port: String,
        baud_rate: u32,
        handle: H,
    },
}

impl<H> Connection<H> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Connection::Absent)
    }

    /// Port path, if connected
    pub fn port(&self) -> Option<&str> {
        match self {
            Connection::Absent => None,
            Connection::Open { port, .. } => Some(port),
        }
    }

    pub fn baud_rate(&self) -> Option<u32> {
        match self {
            Connection::Absent => None,
            Connection::Open { baud_rate, .. } => Some(*baud_rate),
        }
    }
}

// Handles such as `Box<dyn SerialPort>` are not Debug
impl<H> fmt::Debug for Connection<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Absent => f.write_str("Absent"),
            Connection::Open {
                port, baud_rate, ..
            } => f
                .debug_struct("Open")
                .field("port", port)
                .field("baud_rate", baud_rate)
                .finish_non_exhaustive(),
        }
    }
}

/// A partial reconfiguration; unset fields keep their current value
#[derive(Default, Clone)]
pub struct AxisUpdate {
    pub identifiers: Option<Vec<String>>,
    /// One entry is shared by every axis; otherwise one per axis
    pub step_to_coord: Option<Vec<StepToCoord>>,
    /// One entry is shared by every axis; otherwise one per axis
    pub coord_to_step: Option<Vec<CoordToStep>>,
    pub dependency: Option<Vec<usize>>,
}

impl AxisUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifiers<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifiers = Some(identifiers.into_iter().map(Into::into).collect());
        self
    }

    pub fn step_to_coord(mut self, fns: Vec<StepToCoord>) -> Self {
        self.step_to_coord = Some(fns);
        self
    }

    pub fn coord_to_step(mut self, fns: Vec<CoordToStep>) -> Self {
        self.coord_to_step = Some(fns);
        self
    }

    pub fn dependency(mut self, dependency: Vec<usize>) -> Self {
        self.dependency = Some(dependency);
        self
    }
}

impl fmt::Debug for AxisUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisUpdate")
            .field("identifiers", &self.identifiers)
            .field("step_to_coord", &self.step_to_coord.as_ref().map(Vec::len))
            .field("coord_to_step", &self.coord_to_step.as_ref().map(Vec::len))
            .field("dependency", &self.dependency)
            .finish()
    }
}

/// Per-axis state of a stepper rig
pub struct Rig<H> {
    connection: Connection<H>,
    position: Vec<f64>,
    identifiers: Vec<String>,
    step_to_coord: Vec<StepToCoord>,
    coord_to_step: Vec<CoordToStep>,
    dependency: Vec<usize>,
}

impl<H> Rig<H> {
    /// Open a rig with `axis_count` axes
    ///
    /// Unless `no_connection` is set, the port is opened through `transport`;
    /// with no port given, the first one the transport lists is used.
    /// All axes start at position zero with identifiers `m1..mN`, identity
    /// conversions and dependency `1..=N`.
    pub fn open<T>(transport: &T, axis_count: usize, options: &OpenOptions) -> Result<Self>
    where
        T: SerialTransport<Handle = H>,
    {
        if axis_count == 0 {
            return Err(RigError::NoAxes);
        }

        let connection = if options.no_connection {
            info!("Opening {}-axis rig without a connection", axis_count);
            Connection::Absent
        } else {
            let port = match &options.port {
                Some(port) => port.clone(),
                None => resolve_port(transport)?,
            };
            info!(
                "Opening {}-axis rig on {} at {} baud",
                axis_count, port, options.baud_rate
            );
            let handle =
                transport
                    .open(&port, options.baud_rate)
                    .map_err(|source| RigError::Connection {
                        port: port.clone(),
                        baud_rate: options.baud_rate,
                        source,
                    })?;
            Connection::Open {
                port,
                baud_rate: options.baud_rate,
                handle,
            }
        };

        Ok(Self::with_connection(connection, axis_count))
    }

    fn with_connection(connection: Connection<H>, axis_count: usize) -> Self {
        Self {
            connection,
            position: vec![0.0; axis_count],
            identifiers: (1..=axis_count)
                .map(|i| format!("{}{}", AXIS_ID_PREFIX, i))
                .collect(),
            step_to_coord: (0..axis_count).map(|_| identity_step_to_coord()).collect(),
            coord_to_step: (0..axis_count).map(|_| round_coord_to_step()).collect(),
            dependency: (1..=axis_count).collect(),
        }
    }

    /// Apply `update` in place
    ///
    /// Identifiers and dependency must have one entry per axis. Conversion
    /// lists may instead hold a single function, which every axis then shares.
    /// Nothing is changed unless the whole update is valid.
    pub fn configure(&mut self, update: AxisUpdate) -> Result<()> {
        let n = self.axis_count();

        if let Some(ids) = &update.identifiers {
            check_len("identifiers", n, ids.len())?;
        }
        if let Some(dep) = &update.dependency {
            check_len("dependency", n, dep.len())?;
        }
        let step_to_coord = update
            .step_to_coord
            .map(|fns| broadcast("step_to_coord", n, fns))
            .transpose()?;
        let coord_to_step = update
            .coord_to_step
            .map(|fns| broadcast("coord_to_step", n, fns))
            .transpose()?;

        if let Some(ids) = update.identifiers {
            debug!("Axis identifiers: {:?}", ids);
            self.identifiers = ids;
        }
        if let Some(dep) = update.dependency {
            debug!("Axis dependency: {:?}", dep);
            self.dependency = dep;
        }
        if let Some(fns) = step_to_coord {
            debug!("Replaced step->coord conversions on {} axes", n);
            self.step_to_coord = fns;
        }
        if let Some(fns) = coord_to_step {
            debug!("Replaced coord->step conversions on {} axes", n);
            self.coord_to_step = fns;
        }
        Ok(())
    }

    pub fn axis_count(&self) -> usize {
        self.position.len()
    }

    pub fn connection(&self) -> &Connection<H> {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        !self.connection.is_absent()
    }

    /// The open transport handle, for callers that drive the hardware
    pub fn connection_mut(&mut self) -> Option<&mut H> {
        match &mut self.connection {
            Connection::Absent => None,
            Connection::Open { handle, .. } => Some(handle),
        }
    }

    /// Last-known positions, one per axis
    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn dependency(&self) -> &[usize] {
        &self.dependency
    }

    pub fn step_to_coord_fns(&self) -> &[StepToCoord] {
        &self.step_to_coord
    }

    pub fn coord_to_step_fns(&self) -> &[CoordToStep] {
        &self.coord_to_step
    }

    /// Index of the first axis named `identifier`
    pub fn axis_index(&self, identifier: &str) -> Option<usize> {
        self.identifiers.iter().position(|id| id == identifier)
    }

    /// Convert a step count on `axis` to its coordinate
    pub fn steps_to_coord(&self, axis: usize, steps: f64) -> Result<f64> {
        let f = self.step_to_coord.get(axis).ok_or_else(|| self.out_of_range(axis))?;
        Ok(f(steps))
    }

    /// Convert a coordinate on `axis` to a step count
    pub fn coord_to_steps(&self, axis: usize, coord: f64) -> Result<i64> {
        let g = self.coord_to_step.get(axis).ok_or_else(|| self.out_of_range(axis))?;
        Ok(g(coord))
    }

    fn out_of_range(&self, axis: usize) -> RigError {
        RigError::AxisOutOfRange {
            axis,
            axis_count: self.axis_count(),
        }
    }
}

impl<H> fmt::Debug for Rig<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rig")
            .field("connection", &self.connection)
            .field("position", &self.position)
            .field("identifiers", &self.identifiers)
            .field("dependency", &self.dependency)
            .finish_non_exhaustive()
    }
}

/// First port the transport reports
fn resolve_port<T: SerialTransport>(transport: &T) -> Result<String> {
    let ports = transport
        .available_ports()
        .map_err(RigError::PortEnumeration)?;
    debug!("No port given, candidates: {:?}", ports);
    ports.into_iter().next().ok_or(RigError::NoPortAvailable)
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RigError::LengthMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Expand a single shared function to every axis, or pass a full list through
fn broadcast<F: ?Sized>(field: &'static str, n: usize, fns: Vec<Arc<F>>) -> Result<Vec<Arc<F>>> {
    if fns.len() == 1 {
        return Ok(vec![Arc::clone(&fns[0]); n]);
    }
    check_len(field, n, fns.len())?;
    Ok(fns)
}
