// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Predicate pruning walker
//!
//! Walks a filter expression bottom-up and computes, for every node, the set
//! of partitions that may hold matching rows. The result is a safe
//! over-approximation: a partition is only left out when no row in it can
//! satisfy the node. The walk never mutates shared state.

use crate::expr::{CmpOp, ConstEvaluator, Expr, Operand};
use crate::rangeset::RangeSet;
use crate::relation::{PartRelationInfo, PartStrategy, RelId};
use crate::search::{select_hash_partition, select_range_partitions, SearchMiss, Strategy};
use crate::value::Value;

/// Selectivity assumed for nodes the walker cannot resolve
pub const DEFAULT_UNKNOWN_SELECTIVITY: f64 = 1.0 / 3.0;

/// Read-only inputs of one walk
#[derive(Clone, Copy)]
pub struct WalkerContext<'a> {
    prel: &'a PartRelationInfo,
    eval: Option<&'a dyn ConstEvaluator>,
    for_insert: bool,
}

impl<'a> WalkerContext<'a> {
    /// Planning-time context: no constant folding, many results allowed
    pub fn new(prel: &'a PartRelationInfo) -> Self {
        Self {
            prel,
            eval: None,
            for_insert: false,
        }
    }

    /// Fold parameters through `eval`
    pub fn with_evaluator(mut self, eval: &'a dyn ConstEvaluator) -> Self {
        self.eval = Some(eval);
        self
    }

    /// Mark the walk as routing a row for insertion
    pub fn inserting(mut self) -> Self {
        self.for_insert = true;
        self
    }

    pub fn prel(&self) -> &'a PartRelationInfo {
        self.prel
    }

    pub fn has_evaluator(&self) -> bool {
        self.eval.is_some()
    }

    pub fn is_insert(&self) -> bool {
        self.for_insert
    }
}

/// Result of walking one expression node
#[derive(Clone, Debug, PartialEq)]
pub struct WrapperNode {
    pub orig: Expr,
    pub args: Vec<WrapperNode>,
    /// Positions into the walked relation's partition sequence
    pub rangeset: RangeSet,
    pub found_gap: bool,
    pub paramsel: f64,
    /// Why an insert walk matched nothing; `None` for planning walks
    pub miss: Option<SearchMiss>,
}

/// Where an inserted row should go, according to an insert walk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertTarget {
    Single(usize),
    /// No partition owns the value; the orchestrator has to create one
    Missing(SearchMiss),
    Ambiguous(usize),
    /// The predicate matches nothing and no search missed
    Unroutable,
}

impl WrapperNode {
    pub fn insert_target(&self) -> InsertTarget {
        match (self.rangeset.len(), self.miss) {
            (0, Some(miss)) => InsertTarget::Missing(miss),
            (0, None) => InsertTarget::Unroutable,
            (1, _) => self
                .rangeset
                .first()
                .map_or(InsertTarget::Unroutable, InsertTarget::Single),
            (n, _) => InsertTarget::Ambiguous(n),
        }
    }

    fn leaf(expr: &Expr, rangeset: RangeSet, found_gap: bool, paramsel: f64) -> Self {
        Self {
            orig: expr.clone(),
            args: Vec::new(),
            rangeset,
            found_gap,
            paramsel,
            miss: None,
        }
    }
}

/// Walk `expr` against the relation in `ctx`
pub fn walk_expr_tree(expr: &Expr, ctx: &WalkerContext<'_>) -> WrapperNode {
    match expr {
        Expr::And(args) => handle_boolexpr(expr, args, BoolOp::And, ctx),
        Expr::Or(args) => handle_boolexpr(expr, args, BoolOp::Or, ctx),
        Expr::Compare { left, op, right } => handle_compare(expr, left, *op, right, ctx),
        Expr::InList { column, values } => handle_in_list(expr, column, values, ctx),
        Expr::IsNull { column, negated } => handle_null_test(expr, column, *negated, ctx),
        Expr::Not(_) | Expr::Other(_) => unresolved(expr, ctx),
    }
}

#[derive(Clone, Copy)]
enum BoolOp {
    And,
    Or,
}

fn handle_boolexpr(expr: &Expr, args: &[Expr], op: BoolOp, ctx: &WalkerContext<'_>) -> WrapperNode {
    let nparts = ctx.prel.nparts();
    let children: Vec<WrapperNode> = args.iter().map(|arg| walk_expr_tree(arg, ctx)).collect();

    let (rangeset, paramsel) = match op {
        BoolOp::And => children.iter().fold(
            (RangeSet::complete(nparts), 1.0),
            |(set, sel), child| (set.intersect(&child.rangeset), sel * child.paramsel),
        ),
        BoolOp::Or => {
            let (set, miss_all) = children.iter().fold(
                (RangeSet::empty(), 1.0),
                |(set, miss_all), child| (set.union(&child.rangeset), miss_all * (1.0 - child.paramsel)),
            );
            // Independence assumption, an approximation rather than an exact probability.
            (set, 1.0 - miss_all)
        }
    };

    let found_gap = children.iter().any(|child| child.found_gap);
    let miss = if rangeset.is_empty() {
        children.iter().find_map(|child| child.miss)
    } else {
        None
    };

    WrapperNode {
        orig: expr.clone(),
        args: children,
        rangeset,
        found_gap,
        paramsel: paramsel.clamp(0.0, 1.0),
        miss,
    }
}

fn handle_compare(
    expr: &Expr,
    left: &Operand,
    op: CmpOp,
    right: &Operand,
    ctx: &WalkerContext<'_>,
) -> WrapperNode {
    let key = ctx.prel.key_column.as_str();
    let (op, operand) = match (left, right) {
        (Operand::Column(column), other) if column == key && !other.is_column() => (op, other),
        (other, Operand::Column(column)) if column == key && !other.is_column() => {
            (op.commute(), other)
        }
        _ => return unresolved(expr, ctx),
    };

    let Some(value) = resolve_operand(operand, ctx) else {
        return unresolved(expr, ctx);
    };
    // `key op NULL` is never true
    if value.is_null() {
        return WrapperNode::leaf(expr, RangeSet::empty(), false, 0.0);
    }
    let Some(strategy) = op.strategy() else {
        return unresolved(expr, ctx);
    };
    if value.check_type(ctx.prel.key_type).is_err() {
        return unresolved(expr, ctx);
    }

    select_partitions(expr, &value, strategy, ctx)
}

fn select_partitions(
    expr: &Expr,
    value: &Value,
    strategy: Strategy,
    ctx: &WalkerContext<'_>,
) -> WrapperNode {
    match &ctx.prel.strategy {
        PartStrategy::Range { ranges, .. } => {
            let selection =
                select_range_partitions(value, ctx.prel.comparator(), ranges, strategy);
            let paramsel = fraction(&selection.rangeset, ctx.prel.nparts());
            let mut node = WrapperNode::leaf(expr, selection.rangeset, selection.found_gap, paramsel);
            if ctx.for_insert {
                node.miss = selection.miss;
            }
            node
        }
        PartStrategy::Hash { children } => {
            if strategy != Strategy::Equal {
                return unresolved(expr, ctx);
            }
            let rangeset = select_hash_partition(value, children.len())
                .map_or_else(RangeSet::empty, RangeSet::single);
            let paramsel = fraction(&rangeset, children.len());
            WrapperNode::leaf(expr, rangeset, false, paramsel)
        }
    }
}

fn handle_in_list(
    expr: &Expr,
    column: &str,
    values: &[Operand],
    ctx: &WalkerContext<'_>,
) -> WrapperNode {
    if column != ctx.prel.key_column {
        return unresolved(expr, ctx);
    }

    let mut rangeset = RangeSet::empty();
    let mut found_gap = false;
    let mut miss = None;
    for operand in values {
        let Some(value) = resolve_operand(operand, ctx) else {
            return unresolved(expr, ctx);
        };
        if value.is_null() {
            continue;
        }
        if value.check_type(ctx.prel.key_type).is_err() {
            return unresolved(expr, ctx);
        }
        let node = select_partitions(expr, &value, Strategy::Equal, ctx);
        rangeset = rangeset.union(&node.rangeset);
        found_gap |= node.found_gap;
        miss = miss.or(node.miss);
    }

    let paramsel = fraction(&rangeset, ctx.prel.nparts());
    let miss = if rangeset.is_empty() { miss } else { None };
    let mut node = WrapperNode::leaf(expr, rangeset, found_gap, paramsel);
    node.miss = miss;
    node
}

fn handle_null_test(expr: &Expr, column: &str, negated: bool, ctx: &WalkerContext<'_>) -> WrapperNode {
    if column != ctx.prel.key_column {
        return unresolved(expr, ctx);
    }
    // Partitioning keys are never null
    if negated {
        WrapperNode::leaf(expr, RangeSet::complete(ctx.prel.nparts()), false, 1.0)
    } else {
        WrapperNode::leaf(expr, RangeSet::empty(), false, 0.0)
    }
}

fn resolve_operand(operand: &Operand, ctx: &WalkerContext<'_>) -> Option<Value> {
    match operand {
        Operand::Const(value) => Some(value.clone()),
        Operand::Param(_) => ctx.eval?.evaluate_constant(operand),
        Operand::Column(_) => None,
    }
}

fn unresolved(expr: &Expr, ctx: &WalkerContext<'_>) -> WrapperNode {
    WrapperNode::leaf(
        expr,
        RangeSet::complete(ctx.prel.nparts()),
        false,
        DEFAULT_UNKNOWN_SELECTIVITY,
    )
}

fn fraction(rangeset: &RangeSet, nparts: usize) -> f64 {
    if nparts == 0 {
        return 0.0;
    }
    rangeset.len() as f64 / nparts as f64
}

/// Outcome of pruning a relation for one filter
#[derive(Clone, Debug, PartialEq)]
pub struct PruneResult {
    pub indices: Vec<usize>,
    pub children: Vec<RelId>,
    pub selectivity: f64,
    pub found_gap: bool,
    /// Version of the descriptor the indices refer to
    pub version: u64,
}

/// Candidate partitions of `prel` for rows satisfying `expr`
pub fn prune(
    expr: &Expr,
    prel: &PartRelationInfo,
    eval: Option<&dyn ConstEvaluator>,
) -> PruneResult {
    let mut ctx = WalkerContext::new(prel);
    if let Some(eval) = eval {
        ctx = ctx.with_evaluator(eval);
    }
    let node = walk_expr_tree(expr, &ctx);
    let indices: Vec<usize> = node.rangeset.iter().collect();
    let children = indices
        .iter()
        .filter_map(|index| prel.child_at(*index))
        .collect();
    PruneResult {
        indices,
        children,
        selectivity: node.paramsel,
        found_gap: node.found_gap,
        version: prel.version,
    }
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
