//! Cooperative cancellation checked between chunks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{KgError, Result};

/// Shared flag; cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(KgError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }

    /// Set this flag on Ctrl+C. Must be called inside a tokio runtime.
    pub fn cancel_on_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Ctrl+C received, stopping after the current chunk");
                flag.cancel();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(flag.check("hop 1").is_ok());

        handle.cancel();
        let err = flag.check("hop 1").unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("hop 1"));
    }
}
