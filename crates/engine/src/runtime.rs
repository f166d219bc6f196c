// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime wiring for partition routing, pruning and creation

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::orchestrator::Orchestrator;
use crate::partitioner::Partitioner;
use crate::policy::BoundPolicy;
use crate::pruner::Pruner;
use crate::router::Router;
use partix_core::{
    DatabaseId, IsolationLevel, LockManager, PartRelationInfo, PartitionRegistry, RelId,
    SharedState, Transaction,
};
use std::sync::Arc;

/// Collaborators injected by the host
#[derive(Clone)]
pub struct RuntimeDeps {
    pub locks: Arc<LockManager>,
    pub state: Arc<SharedState>,
    pub registry: Arc<dyn PartitionRegistry>,
    pub policy: Arc<dyn BoundPolicy>,
}

/// State shared by every engine component
pub(crate) struct Context {
    pub(crate) deps: RuntimeDeps,
    pub(crate) config: EngineConfig,
}

impl Context {
    /// Published descriptor of `parent`, loading the database's configuration
    /// from the registry on first use
    pub(crate) async fn relation(
        &self,
        database: DatabaseId,
        parent: RelId,
    ) -> Result<Arc<PartRelationInfo>, EngineError> {
        let cache = self.deps.state.database(database).await?;
        if !cache.is_loaded() {
            self.deps
                .state
                .reload(database, self.deps.registry.as_ref())
                .await?;
        }
        cache.get(parent).ok_or(EngineError::NotPartitioned(parent))
    }

    pub(crate) fn check_enabled(&self) -> Result<(), EngineError> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(EngineError::Disabled)
        }
    }
}

/// Entry point handing out transactions and engine components
#[derive(Clone)]
pub struct Runtime {
    ctx: Arc<Context>,
    router: Router,
    pruner: Pruner,
    partitioner: Partitioner,
}

impl Runtime {
    pub fn new(deps: RuntimeDeps, config: EngineConfig) -> Self {
        let ctx = Arc::new(Context { deps, config });
        let orchestrator = Orchestrator::new(Arc::clone(&ctx));
        Self {
            router: Router::new(Arc::clone(&ctx), orchestrator),
            pruner: Pruner::new(Arc::clone(&ctx)),
            partitioner: Partitioner::new(Arc::clone(&ctx)),
            ctx,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// Start a transaction using the configured lock timeout
    pub fn begin(&self, database: DatabaseId, isolation: IsolationLevel) -> Transaction {
        Transaction::begin(
            Arc::clone(&self.ctx.deps.locks),
            database,
            isolation,
            self.ctx.config.lock_timeout,
        )
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn pruner(&self) -> &Pruner {
        &self.pruner
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    /// Current descriptor of `parent`
    pub async fn relation(
        &self,
        database: DatabaseId,
        parent: RelId,
    ) -> Result<Arc<PartRelationInfo>, EngineError> {
        self.ctx.relation(database, parent).await
    }

    /// Tear down the shared state; later calls fail with `ShutDown`
    pub fn shutdown(&self) {
        self.ctx.deps.state.shutdown();
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
