// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `partix show` - List the partitions of a relation

use super::Env;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use partix_core::{PartStrategy, RelId};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct ShowArgs {
    /// Parent relation id
    pub parent: u32,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
#[serde(untagged)]
enum PartitionRow {
    Range { child: u32, min: String, max: String },
    Hash { child: u32, bucket: usize },
}

impl fmt::Display for PartitionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionRow::Range { child, min, max } => write!(f, "{child:<8} [{min}, {max})"),
            PartitionRow::Hash { child, bucket } => write!(f, "{child:<8} bucket {bucket}"),
        }
    }
}

pub async fn handle(env: &Env, args: ShowArgs) -> Result<()> {
    let info = env.runtime.relation(env.database, RelId(args.parent)).await?;
    let rows: Vec<PartitionRow> = match &info.strategy {
        PartStrategy::Range { ranges, .. } => ranges
            .iter()
            .map(|re| PartitionRow::Range {
                child: re.child.0,
                min: re.min.to_string(),
                max: re.max.to_string(),
            })
            .collect(),
        PartStrategy::Hash { children } => children
            .iter()
            .enumerate()
            .map(|(bucket, child)| PartitionRow::Hash {
                child: child.0,
                bucket,
            })
            .collect(),
    };

    if args.format == OutputFormat::Text {
        println!(
            "Relation {} ({} by {}, version {})",
            info.parent,
            info.part_type(),
            info.key_column,
            info.version
        );
        if rows.is_empty() {
            println!("No partitions");
            return Ok(());
        }
    }
    output::print_list(&rows, args.format)
}
