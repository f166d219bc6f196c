// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `partix prune` - Select the partitions a filter can match

use super::{parse_key, Env};
use crate::output::{self, OutputFormat};
use crate::predicate;
use anyhow::Result;
use clap::Args;
use partix_core::{ParamEvaluator, PruneResult, RelId};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct PruneArgs {
    /// Parent relation id
    pub parent: u32,
    /// Filter, e.g. "id > 15 AND id < 25"
    pub predicate: String,
    /// Value bound to `$1`, `$2`, ... in order
    #[arg(long = "param")]
    pub params: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct PruneReport {
    children: Vec<u32>,
    selectivity: f64,
    found_gap: bool,
    version: u64,
}

impl From<PruneResult> for PruneReport {
    fn from(result: PruneResult) -> Self {
        Self {
            children: result.children.iter().map(|child| child.0).collect(),
            selectivity: result.selectivity,
            found_gap: result.found_gap,
            version: result.version,
        }
    }
}

impl fmt::Display for PruneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<String> = self.children.iter().map(u32::to_string).collect();
        writeln!(f, "children: {}", children.join(" "))?;
        writeln!(f, "selectivity: {:.3}", self.selectivity)?;
        write!(f, "found_gap: {}", self.found_gap)
    }
}

pub async fn handle(env: &Env, args: PruneArgs) -> Result<()> {
    let parent = RelId(args.parent);
    let expr = predicate::parse(&args.predicate)?;

    let eval = if args.params.is_empty() {
        None
    } else {
        let key_type = env.key_type(parent).await?;
        let params = args
            .params
            .iter()
            .map(|raw| parse_key(key_type, raw))
            .collect::<Result<Vec<_>>>()?;
        Some(ParamEvaluator::new(params))
    };

    let result = env
        .runtime
        .pruner()
        .prune(
            env.database,
            &expr,
            parent,
            eval.as_ref().map(|e| e as &dyn partix_core::ConstEvaluator),
        )
        .await?;
    output::print(&PruneReport::from(result), args.format)
}
