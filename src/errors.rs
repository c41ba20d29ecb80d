#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Unresolved template variable: {0}")]
    UnresolvedVariable(String),

    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Timed out waiting for load completion")]
    WaitTimeout,

    #[error("Task panicked on the presentation thread")]
    TaskPanicked,

    #[error("Display is not running")]
    NotRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
