// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `partix init` - Put a relation under partition management

use super::Env;
use anyhow::Result;
use clap::{Args, Subcommand};
use partix_core::{KeyType, PartRelationInfo, RangeInterval, RelId};

#[derive(Args)]
pub struct InitArgs {
    #[command(subcommand)]
    pub layout: InitLayout,
}

#[derive(Subcommand)]
pub enum InitLayout {
    /// Consecutive ranges of a fixed interval
    Range {
        /// Parent relation id
        parent: u32,
        /// Partitioning key column
        column: String,
        /// Key type (int or date)
        key_type: KeyType,
        /// Lower bound of the first partition
        start: String,
        /// Partition width, e.g. `100`, `7 days`, `1 month`
        interval: String,
        /// Number of partitions to create up front
        count: usize,
    },
    /// A fixed number of hash buckets
    Hash {
        parent: u32,
        column: String,
        key_type: KeyType,
        count: usize,
    },
}

pub async fn handle(env: &Env, args: InitArgs) -> Result<()> {
    let xact = env.begin();
    let partitioner = env.runtime.partitioner();
    let info = match args.layout {
        InitLayout::Range {
            parent,
            column,
            key_type,
            start,
            interval,
            count,
        } => {
            let start = key_type.parse_value(&start)?;
            let interval = RangeInterval::parse(key_type, &interval)?;
            partitioner
                .create_range_partitions(
                    &xact,
                    RelId(parent),
                    &column,
                    key_type,
                    start,
                    interval,
                    count,
                )
                .await?
        }
        InitLayout::Hash {
            parent,
            column,
            key_type,
            count,
        } => {
            partitioner
                .create_hash_partitions(&xact, RelId(parent), &column, key_type, count)
                .await?
        }
    };
    xact.commit();
    print_summary(&info);
    Ok(())
}

fn print_summary(info: &PartRelationInfo) {
    println!(
        "Partitioned {} by {} ({}): {} partitions",
        info.parent,
        info.key_column,
        info.part_type(),
        info.nparts()
    );
}
