// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `partix route` - Find or create the partition for a key

use super::{parse_key, Env};
use anyhow::Result;
use clap::Args;
use partix_core::RelId;

#[derive(Args)]
pub struct RouteArgs {
    /// Parent relation id
    pub parent: u32,
    /// Key value of the row to insert
    pub value: String,
}

pub async fn handle(env: &Env, args: RouteArgs) -> Result<()> {
    let parent = RelId(args.parent);
    let value = parse_key(env.key_type(parent).await?, &args.value)?;

    let xact = env.begin();
    let child = env
        .runtime
        .router()
        .route_and_ensure_partition(&xact, &value, parent)
        .await?;
    xact.commit();
    println!("{child}");
    Ok(())
}
