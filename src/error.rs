//! Error handling for the verdant station agent.

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors surfaced by a sensor collaborator.
///
/// Init failures are permanent: the agent disables the sensor for the
/// rest of the process and never retries the handshake. Read failures
/// are transient: they are counted and the sensor stays in rotation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The startup handshake failed or was never run.
    #[error("sensor not initialized")]
    NotInitialized,

    /// One poll produced no usable sample.
    #[error("sensor read failed: {0}")]
    ReadFailure(String),
}

/// The main error type for station agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is unusable (degenerate calibration, zero interval)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sensor collaborator failed
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Telemetry transport error
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl AgentError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new telemetry error
    pub fn telemetry_error(msg: impl Into<String>) -> Self {
        Self::Telemetry(msg.into())
    }
}
