use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Animation engine is not available")]
    EngineUnavailable,

    #[error("Target not found for unit '{0}'")]
    TargetNotFound(String),

    #[error("Nothing to play for breakpoint '{0}'")]
    NoActiveVariant(String),

    /// Returned by `AnimationEngine::create` when a tween or timeline cannot be built
    #[error("Animation engine error: {0}")]
    Engine(String),
}
