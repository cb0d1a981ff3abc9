use thiserror::Error;

#[derive(Debug, Error)]
pub enum JumpstartError {
    /// Module load failure, a missing required entry point or an unavailable layer.
    #[error("Initialization Failed: {0}")]
    Initialization(String),

    #[error("Library used before initialize()")]
    NotInitialized,

    #[error("Window Creation Failed (code {code:?}): {message}")]
    WindowCreation { code: Option<i32>, message: String },

    #[error("Surface Creation Failed (code {code:?}): {message}")]
    SurfaceCreation { code: Option<i32>, message: String },

    #[error("No compatible physical device found")]
    NoCompatibleDevice,

    /// The surface reports zero formats or zero present modes.
    #[error("Surface does not support any swapchain configuration")]
    UnsupportedSwapchain,

    /// An entry point the loader could not resolve was about to be invoked.
    #[error("Entry point {0} was not resolved")]
    UnresolvedEntryPoint(String),

    #[error("{operation} failed: {result}")]
    Vulkan { operation: &'static str, result: String },
}

impl JumpstartError {
    pub fn window_creation(message: impl Into<String>) -> Self {
        JumpstartError::WindowCreation { code: None, message: message.into() }
    }

    pub fn surface_creation(message: impl Into<String>) -> Self {
        JumpstartError::SurfaceCreation { code: None, message: message.into() }
    }
}

pub type JumpstartResult<T> = Result<T, JumpstartError>;
