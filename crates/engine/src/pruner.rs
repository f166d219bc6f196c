// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only partition pruning against the published descriptors

use crate::error::EngineError;
use crate::runtime::Context;
use partix_core::{prune, ConstEvaluator, DatabaseId, Expr, PruneResult, RelId};
use std::sync::Arc;

#[derive(Clone)]
pub struct Pruner {
    ctx: Arc<Context>,
}

impl Pruner {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Partitions of `parent` that may hold rows matching `expr`
    ///
    /// Never creates partitions; the result carries the descriptor version it
    /// was computed against.
    pub async fn prune(
        &self,
        database: DatabaseId,
        expr: &Expr,
        parent: RelId,
        eval: Option<&dyn ConstEvaluator>,
    ) -> Result<PruneResult, EngineError> {
        self.ctx.check_enabled()?;
        let info = self.ctx.relation(database, parent).await?;
        let result = prune(expr, &info, eval);
        tracing::debug!(
            %parent,
            kept = result.children.len(),
            of = info.nparts(),
            selectivity = result.selectivity,
            "pruned partitions"
        );
        Ok(result)
    }
}
