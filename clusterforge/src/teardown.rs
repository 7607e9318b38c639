//! Reverse-order destroy sweep.
//!
//! Handles are registered in creation order and destroyed last-first.
//! A failed destroy is recorded and the sweep moves on, so one stuck
//! resource never strands the ones created before it.

use crate::services::StageHandle;
use clusterforge_shared::errors::{ForgeError, ForgeResult, TeardownFailure};
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct TeardownCoordinator {
    handles: Vec<Arc<dyn StageHandle>>,
}

impl TeardownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a created stage. Call in creation order.
    pub fn push(&mut self, handle: Arc<dyn StageHandle>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Labels in the order they will be destroyed.
    pub fn destroy_order(&self) -> Vec<String> {
        self.handles
            .iter()
            .rev()
            .map(|h| h.label().to_string())
            .collect()
    }

    /// Destroy every handle, newest first.
    ///
    /// Returns [`ForgeError::Teardown`] listing each failed stage.
    pub async fn run(&self) -> ForgeResult<()> {
        let failures = sweep(self.handles.iter().rev()).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ForgeError::Teardown(failures))
        }
    }
}

/// Destroy `handles` in the given order and collect the failures.
pub async fn sweep<'a, I>(handles: I) -> Vec<TeardownFailure>
where
    I: IntoIterator<Item = &'a Arc<dyn StageHandle>>,
{
    let mut failures = Vec::new();
    for handle in handles {
        let label = handle.label().to_string();
        tracing::info!(stage = %label, "tearing down stage");
        if let Err(e) = handle.teardown().await {
            tracing::warn!(stage = %label, error = %e, "stage teardown failed, continuing");
            failures.push(TeardownFailure::new(label, e.to_string()));
        }
    }
    failures
}
