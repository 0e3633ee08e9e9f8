use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("telemetry setup failed: {message}")]
    Telemetry { message: String },
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }
}
