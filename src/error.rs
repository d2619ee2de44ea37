pub type Result<T> = std::result::Result<T, LensError>;

#[derive(Debug, thiserror::Error)]
pub enum LensError {
    /// Permission denied or no matching device. Terminal for the current
    /// session attempt; the renderer stays in "not capturing" state.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The stream has not negotiated real dimensions yet. Not a true
    /// error, the frame is skipped.
    #[error("stream has no dimensions yet")]
    StreamNotReady,

    /// The platform has no usable share handoff for the exported file.
    #[error("sharing unsupported: {0}")]
    ShareUnsupported(String),

    /// Rasterizing or encoding the snapshot failed.
    #[error("export failed: {0}")]
    ExportFailure(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LensError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportFailure(msg.into())
    }
}
