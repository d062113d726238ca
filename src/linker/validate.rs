// src/linker/validate.rs

//! Link-time validation of a run group.
//!
//! Everything is checked before anything is wired: a group either links
//! completely or not at all.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use super::filter::WatchFilter;
use crate::context::ExecutionContext;
use crate::errors::{ConductorError, Result};
use crate::fs::FileSystem;
use crate::process::TriggerKind;

/// A dependent listening to one target for the given trigger kinds.
#[derive(Debug, Clone)]
pub(crate) struct ListenerEdge {
    pub dependent: usize,
    pub target: usize,
    pub kinds: Vec<TriggerKind>,
}

/// What the linker wires once validation passed.
#[derive(Debug)]
pub(crate) struct LinkPlan {
    pub fs_watches: Vec<(usize, WatchFilter)>,
    pub listeners: Vec<ListenerEdge>,
}

pub(crate) fn build_plan(contexts: &[ExecutionContext], fs: &dyn FileSystem) -> Result<LinkPlan> {
    ensure_not_started(contexts)?;
    let index = unique_names(contexts)?;
    validate_watch_paths(contexts, fs)?;
    let fs_watches = compile_filters(contexts, fs)?;
    let listeners = resolve_process_triggers(contexts, &index)?;
    ensure_acyclic(contexts, &listeners)?;

    Ok(LinkPlan {
        fs_watches,
        listeners,
    })
}

fn ensure_not_started(contexts: &[ExecutionContext]) -> Result<()> {
    if let Some(ctx) = contexts.iter().find(|c| c.is_started()) {
        return Err(ConductorError::ConfigError(format!(
            "cannot link a run group after process '{}' has started",
            ctx.name()
        )));
    }
    Ok(())
}

fn unique_names(contexts: &[ExecutionContext]) -> Result<HashMap<&str, usize>> {
    let mut index = HashMap::with_capacity(contexts.len());
    for (i, ctx) in contexts.iter().enumerate() {
        if index.insert(ctx.name(), i).is_some() {
            return Err(ConductorError::DuplicateName(ctx.name().to_string()));
        }
    }
    Ok(index)
}

fn validate_watch_paths(contexts: &[ExecutionContext], fs: &dyn FileSystem) -> Result<()> {
    for ctx in contexts {
        for path in ctx.definition().fs_trigger.watch.iter() {
            if !fs.exists(path) {
                return Err(ConductorError::MissingWatchPath {
                    process: ctx.name().to_string(),
                    path: path.clone(),
                });
            }
        }
    }
    Ok(())
}

fn compile_filters(
    contexts: &[ExecutionContext],
    fs: &dyn FileSystem,
) -> Result<Vec<(usize, WatchFilter)>> {
    let mut filters = Vec::new();
    for (i, ctx) in contexts.iter().enumerate() {
        let trigger = &ctx.definition().fs_trigger;
        if trigger.is_active() {
            filters.push((i, WatchFilter::compile(ctx.name(), trigger, fs)?));
        }
    }
    Ok(filters)
}

fn resolve_process_triggers(
    contexts: &[ExecutionContext],
    index: &HashMap<&str, usize>,
) -> Result<Vec<ListenerEdge>> {
    let mut edges = Vec::new();

    for (dependent, ctx) in contexts.iter().enumerate() {
        let mut by_target: BTreeMap<usize, Vec<TriggerKind>> = BTreeMap::new();

        for (kind, target_name) in ctx.definition().process_trigger.edges() {
            if target_name == ctx.name() {
                return Err(ConductorError::SelfTrigger(ctx.name().to_string()));
            }

            let Some(&target) = index.get(target_name) else {
                return Err(ConductorError::UnknownTriggerTarget {
                    process: ctx.name().to_string(),
                    kind: kind.as_str(),
                    target: target_name.to_string(),
                });
            };

            if contexts[target].definition().may_restart() {
                return Err(ConductorError::RestartingTriggerTarget {
                    process: ctx.name().to_string(),
                    kind: kind.as_str(),
                    target: target_name.to_string(),
                });
            }

            by_target.entry(target).or_default().push(kind);
        }

        edges.extend(by_target.into_iter().map(|(target, kinds)| ListenerEdge {
            dependent,
            target,
            kinds,
        }));
    }

    Ok(edges)
}

fn ensure_acyclic(contexts: &[ExecutionContext], edges: &[ListenerEdge]) -> Result<()> {
    // Edge direction: target -> dependent.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..contexts.len() {
        graph.add_node(i);
    }
    for edge in edges {
        graph.add_edge(edge.target, edge.dependent, ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ConductorError::TriggerCycle(
            contexts[cycle.node_id()].name().to_string(),
        )),
    }
}
