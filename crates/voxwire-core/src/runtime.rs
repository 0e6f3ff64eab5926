//! Runtime management for callers outside an async context
//!
//! Engine and UI threads usually have no Tokio runtime of their own. They
//! share one lazily built runtime so requests can be spawned from anywhere.

use crate::error::{VoxwireError, VoxwireResult};
use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};

static GLOBAL_RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Global runtime manager
pub struct RuntimeManager;

impl RuntimeManager {
    /// Handle for spawning request tasks
    ///
    /// Inside a Tokio runtime this is the current runtime; elsewhere the
    /// shared background runtime is started on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared runtime cannot be built
    pub fn handle() -> VoxwireResult<Handle> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(handle);
        }
        Ok(Self::global()?.handle().clone())
    }

    /// The shared background runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built
    pub fn global() -> VoxwireResult<&'static Runtime> {
        GLOBAL_RUNTIME.get_or_try_init(|| {
            let runtime = Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("voxwire-io")
                .enable_all()
                .build()
                .map_err(|e| {
                    tracing::error!("Failed to create global runtime: {}", e);
                    VoxwireError::concurrency(format!("Failed to create global runtime: {e}"))
                })?;
            tracing::info!("Global Tokio runtime initialized");
            Ok(runtime)
        })
    }

    /// Whether the shared runtime has been started
    #[must_use]
    pub fn is_initialized() -> bool {
        GLOBAL_RUNTIME.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_outside_runtime_uses_global() {
        let handle = RuntimeManager::handle().expect("runtime");
        assert!(RuntimeManager::is_initialized());

        let value = handle.block_on(async { 21 * 2 });
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_handle_inside_runtime_is_current() {
        let handle = RuntimeManager::handle().expect("runtime");
        let joined = handle.spawn(async { "spawned" }).await.unwrap();
        assert_eq!(joined, "spawned");
    }
}
