use thiserror::Error;
/// Failures inside the signal path. None of these cross the pipeline boundary;
/// callers turn them into the documented fallbacks.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("filter design for {filter} is unstable (a1={a1}, a2={a2})")]
    UnstableFilter { filter: &'static str, a1: f64, a2: f64 },
    #[error("filter design for {0} produced non-finite coefficients")]
    NonFiniteCoefficients(&'static str),
    #[error("{0} produced a non-finite output sample")]
    NonFiniteOutput(&'static str),
    #[error("batch for device {device_id} contains a non-finite sample at index {index}")]
    NonFiniteSample { device_id: String, index: usize },
    #[error("malformed sample batch: {0}")]
    MalformedBatch(String),
    #[error("failed to read sample batch: {0}")]
    Io(#[from] std::io::Error),
}
