// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Insert routing
//!
//! Maps a row's key to the partition that owns it, asking the orchestrator to
//! create one when none does.

use crate::error::EngineError;
use crate::orchestrator::Orchestrator;
use crate::runtime::Context;
use partix_core::{
    walk_expr_tree, Expr, InsertTarget, LockMode, PartRelationInfo, RelId, Transaction, Value,
    WalkerContext,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Router {
    ctx: Arc<Context>,
    orchestrator: Orchestrator,
}

impl Router {
    pub(crate) fn new(ctx: Arc<Context>, orchestrator: Orchestrator) -> Self {
        Self { ctx, orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Partition of `parent` that should receive a row keyed by `value`
    ///
    /// Takes a row-exclusive lock on `parent` for the rest of the transaction.
    pub async fn route_and_ensure_partition(
        &self,
        xact: &Transaction,
        value: &Value,
        parent: RelId,
    ) -> Result<RelId, EngineError> {
        self.ctx.check_enabled()?;
        if value.is_null() {
            return Err(EngineError::NullKey);
        }
        xact.lock_relation(parent, LockMode::RowExclusive).await?;

        let info = self.ctx.relation(xact.database(), parent).await?;
        value.check_type(info.key_type)?;

        match route(&info, value) {
            InsertTarget::Single(index) => info.child_at(index).ok_or(EngineError::Unroutable(parent)),
            InsertTarget::Missing(miss) => {
                self.orchestrator
                    .ensure_partition(xact, parent, value, miss)
                    .await?;
                // Re-run the search against whatever is published now.
                let info = self.ctx.relation(xact.database(), parent).await?;
                match route(&info, value) {
                    InsertTarget::Single(index) => {
                        info.child_at(index).ok_or(EngineError::Unroutable(parent))
                    }
                    _ => Err(EngineError::Unroutable(parent)),
                }
            }
            InsertTarget::Ambiguous(_) | InsertTarget::Unroutable => {
                Err(EngineError::Unroutable(parent))
            }
        }
    }
}

fn route(info: &PartRelationInfo, value: &Value) -> InsertTarget {
    let expr = Expr::eq(info.key_column.clone(), value.clone());
    walk_expr_tree(&expr, &WalkerContext::new(info).inserting()).insert_target()
}
