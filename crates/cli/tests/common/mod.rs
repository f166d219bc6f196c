// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for CLI integration tests

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// Scratch directory holding a registry WAL
pub struct Workdir {
    dir: TempDir,
}

impl Workdir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str, content: &str) {
        std::fs::write(self.path().join(name), content).unwrap();
    }

    /// `partix` run inside the workdir with logging left at its default
    pub fn partix(&self) -> Command {
        let mut cmd = Command::cargo_bin("partix").unwrap();
        cmd.current_dir(self.path()).env_remove("PARTIX_LOG");
        cmd
    }

    /// Run `args`, expect success, return stdout
    pub fn run(&self, args: &[&str]) -> String {
        let output = self.partix().args(args).assert().success().get_output().clone();
        String::from_utf8(output.stdout).unwrap()
    }

    /// Relation 10 keyed by `id`: [0,10), [10,20), ... `count` partitions
    pub fn init_int_ranges(&self, count: usize) {
        self.run(&[
            "init",
            "range",
            "10",
            "id",
            "int",
            "0",
            "10",
            &count.to_string(),
        ]);
    }
}
