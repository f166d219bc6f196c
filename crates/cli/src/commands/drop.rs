// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `partix drop` - Stop managing a relation's partitions

use super::Env;
use anyhow::Result;
use clap::Args;
use partix_core::RelId;

#[derive(Args)]
pub struct DropArgs {
    /// Parent relation id
    pub parent: u32,
}

pub async fn handle(env: &Env, args: DropArgs) -> Result<()> {
    let parent = RelId(args.parent);
    // Fails with "not partitioned" for unknown relations
    env.runtime.relation(env.database, parent).await?;

    let xact = env.begin();
    env.runtime.partitioner().drop_config(&xact, parent).await?;
    xact.commit();
    println!("Dropped partitioning of {parent}");
    Ok(())
}
