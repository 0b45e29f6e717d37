/// Domain-specific error types for the pricing engine.
/// Nothing is swallowed. Every failure reaches the caller, which decides
/// how to present it:
/// - Rejected inputs are reported before any computation starts
/// - A single failed grid cell aborts the whole grid
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("invalid parameter: {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("numerical degeneracy: {0}")]
    Degenerate(String),

    #[error("grid cell failed at vol_index={vol_index}, spot_index={spot_index}: {source}")]
    GridCell {
        vol_index: usize,
        spot_index: usize,
        #[source]
        source: Box<PricingError>,
    },

    #[error("bad request: {0}")]
    Request(String),

    #[error("axis error: {0}")]
    Axis(String),

    #[error("quote source error: {0}")]
    Quote(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("task failed: {0}")]
    Task(String),
}

impl PricingError {
    /// Short machine-readable tag, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::Degenerate(_) => "degenerate",
            Self::GridCell { .. } => "grid_cell",
            Self::Request(_) => "request",
            Self::Axis(_) => "axis",
            Self::Quote(_) => "quote",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Task(_) => "task",
        }
    }

    /// True when the error was caused by caller-supplied input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Io(_) | Self::Task(_))
    }
}

impl From<std::io::Error> for PricingError {
    fn from(e: std::io::Error) -> Self {
        PricingError::Io(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PricingError {
    fn from(e: tokio::task::JoinError) -> Self {
        PricingError::Task(e.to_string())
    }
}

pub type PricingResult<T> = Result<T, PricingError>;
