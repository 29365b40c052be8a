//! Single-result bridge over the callback-style clear-cache operation.

use crate::px2agent::{ClearCacheCallbacks, Px2Error, Px2Project, Px2Result};
use tokio::sync::{mpsc, oneshot};

/// Clears a project's caches and resolves once the project reports completion.
pub struct ClearCache<'a> {
    project: &'a dyn Px2Project,
    progress: Option<mpsc::UnboundedSender<String>>,
}

impl<'a> ClearCache<'a> {
    pub fn new(project: &'a dyn Px2Project) -> Self {
        Self {
            project,
            progress: None,
        }
    }

    /// Receive intermediate output chunks. They are not part of the result.
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<String>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Start clearing and wait for the completion notification.
    ///
    /// Fails with [`Px2Error::Cancelled`] if the project drops the completion
    /// callback without firing it.
    pub async fn run(self) -> Px2Result<String> {
        let (complete, done) = oneshot::channel();
        self.project.clearcache(ClearCacheCallbacks {
            success: self.progress,
            complete,
        });
        done.await.map_err(|_| Px2Error::Cancelled)?
    }
}
