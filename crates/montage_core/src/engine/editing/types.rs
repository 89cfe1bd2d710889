use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditingError {
    #[error("Media load failed: {0}")]
    MediaLoadError(String),

    #[error("Media probe failed: {0}")]
    ProbeError(String),

    #[error("Timeline operation failed: {0}")]
    TimelineError(String),

    #[error("Preview operation failed: {0}")]
    PreviewError(String),

    #[error("Export operation failed: {0}")]
    ExportError(String),

    #[error("Effect application failed: {0}")]
    EffectError(String),

    #[error("Project document invalid: {0}")]
    ProjectError(String),

    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique id with a readable prefix, e.g. `clip_12`.
pub fn next_id(prefix: &str) -> String {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", prefix, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = next_id("clip");
        let b = next_id("clip");
        assert!(a.starts_with("clip_"));
        assert_ne!(a, b);
    }
}
