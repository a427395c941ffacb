//! `DependencyAnalyzer` (C4): a pure transformation from a flat step list to
//! a `DependencyGraph` — topological order, critical path, and a level
//! partition used to size parallel work.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::cmp::Reverse;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::errors::{PlanError, RrcResult};
use crate::model::{DependencyGraph, PlanStep};

/// Parses an effort estimate like `"2 hours"`, `"45m"`, `"1d"` into minutes.
/// Falls back to `1` when nothing recognizable is found, per §4.4.
fn parse_effort_minutes(effort: Option<&str>) -> i64 {
    let Some(effort) = effort else { return 1 };
    let lower = effort.to_ascii_lowercase();
    let mut total = 0i64;
    let mut digits = String::new();
    let mut chars = lower.chars().peekable();
    let mut found_any = false;

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            continue;
        }
        let mut unit = String::from(c);
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphabetic() {
                unit.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if let Ok(n) = digits.parse::<i64>() {
            let mult = if unit.starts_with('d') {
                24 * 60
            } else if unit.starts_with('h') {
                60
            } else {
                1 // minutes, or any unrecognized unit
            };
            total += n * mult;
            found_any = true;
        }
        digits.clear();
    }

    if !found_any { 1 } else { total.max(1) }
}

/// Pure function: analyzes a flat step list into a `DependencyGraph`.
/// Fails with `PlanError::Cycle`/`PlanError::DanglingDependency` rather than
/// guessing at a partial order.
pub fn analyze(steps: &[PlanStep]) -> RrcResult<DependencyGraph> {
    if steps.is_empty() {
        return Ok(DependencyGraph::default());
    }

    let node_set: HashSet<u32> = steps.iter().map(|s| s.step_number).collect();
    for step in steps {
        for &dep in &step.depends_on {
            if !node_set.contains(&dep) {
                return Err(PlanError::DanglingDependency(step.step_number, dep).into());
            }
        }
    }

    let by_number: HashMap<u32, &PlanStep> = steps.iter().map(|s| (s.step_number, s)).collect();

    // Graph core on petgraph, the same crate codegraph-prep builds its
    // AST/call graphs on: one node per step, one edge per dependency
    // (dep -> dependent).
    let mut graph: DiGraph<u32, ()> = DiGraph::with_capacity(steps.len(), 0);
    let mut index_of: HashMap<u32, NodeIndex> = HashMap::with_capacity(steps.len());
    for step in steps {
        index_of.insert(step.step_number, graph.add_node(step.step_number));
    }
    let mut edges: Vec<(u32, u32)> = Vec::new();
    for step in steps {
        for &dep in &step.depends_on {
            graph.add_edge(index_of[&dep], index_of[&step.step_number], ());
            edges.push((dep, step.step_number));
        }
    }

    // petgraph::algo::toposort is the authority on acyclicity; we only need
    // it as a yes/no signal here since the tie-broken order below is ours.
    if petgraph::algo::toposort(&graph, None).is_err() {
        return Err(PlanError::Cycle.into());
    }

    // Kahn's algorithm over the same graph, ties broken by ascending
    // step_number so the order is deterministic across runs.
    let mut indegree: HashMap<u32, usize> = steps
        .iter()
        .map(|s| {
            let count = graph
                .edges_directed(index_of[&s.step_number], petgraph::Direction::Incoming)
                .count();
            (s.step_number, count)
        })
        .collect();
    let mut ready: BinaryHeap<Reverse<u32>> = indegree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&n, _)| Reverse(n))
        .collect();
    let mut execution_order = Vec::with_capacity(steps.len());
    let mut level: HashMap<u32, u32> = HashMap::new();

    while let Some(Reverse(n)) = ready.pop() {
        execution_order.push(n);
        let lvl = by_number[&n]
            .depends_on
            .iter()
            .map(|d| level[d] + 1)
            .max()
            .unwrap_or(0);
        level.insert(n, lvl);

        for edge in graph.edges_directed(index_of[&n], petgraph::Direction::Outgoing) {
            let child = graph[edge.target()];
            let d = indegree.get_mut(&child).unwrap();
            *d -= 1;
            if *d == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    if execution_order.len() != steps.len() {
        return Err(PlanError::Cycle.into());
    }

    // Longest-weighted path (critical path), tie-broken lexicographically.
    let weight = |n: u32| parse_effort_minutes(by_number[&n].estimated_effort.as_deref());
    let mut best: HashMap<u32, (i64, Vec<u32>)> = HashMap::new();
    for &n in &execution_order {
        let deps = &by_number[&n].depends_on;
        let candidate = if deps.is_empty() {
            (weight(n), vec![n])
        } else {
            let mut options: Vec<(i64, Vec<u32>)> = deps
                .iter()
                .map(|d| {
                    let (w, path) = &best[d];
                    let mut p = path.clone();
                    p.push(n);
                    (w + weight(n), p)
                })
                .collect();
            options.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            options.into_iter().next().unwrap()
        };
        best.insert(n, candidate);
    }
    let mut all_paths: Vec<(i64, Vec<u32>)> = best.into_values().collect();
    all_paths.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let critical_path = all_paths.into_iter().next().map(|(_, p)| p).unwrap_or_default();

    // Level partition; collapse to [] when no level has >= 2 nodes (linear chain).
    let max_level = level.values().copied().max().unwrap_or(0);
    let mut groups: Vec<Vec<u32>> = vec![Vec::new(); max_level as usize + 1];
    for (&n, &lvl) in &level {
        groups[lvl as usize].push(n);
    }
    for g in groups.iter_mut() {
        g.sort_unstable();
    }
    let parallel_groups = if groups.iter().all(|g| g.len() < 2) {
        Vec::new()
    } else {
        groups
    };

    let mut nodes: Vec<u32> = steps.iter().map(|s| s.step_number).collect();
    nodes.sort_unstable();

    Ok(DependencyGraph {
        nodes,
        edges,
        execution_order,
        critical_path,
        parallel_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use std::collections::BTreeSet;

    fn step(n: u32, deps: &[u32]) -> PlanStep {
        PlanStep {
            step_number: n,
            id: format!("s{n}"),
            title: format!("step {n}"),
            description: "desc".into(),
            priority: Priority::Medium,
            estimated_effort: None,
            files_to_modify: vec![],
            files_to_create: vec![],
            files_to_delete: vec![],
            depends_on: deps.iter().copied().collect::<BTreeSet<u32>>(),
            blocks: BTreeSet::new(),
            can_parallel_with: BTreeSet::new(),
        }
    }

    #[test]
    fn empty_plan_yields_empty_graph() {
        let graph = analyze(&[]).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert!(graph.execution_order.is_empty());
        assert!(graph.critical_path.is_empty());
        assert!(graph.parallel_groups.is_empty());
    }

    #[test]
    fn single_step_graph() {
        let graph = analyze(&[step(1, &[])]).unwrap();
        assert_eq!(graph.execution_order, vec![1]);
        assert_eq!(graph.critical_path, vec![1]);
        assert!(graph.parallel_groups.is_empty());
    }

    #[test]
    fn linear_chain_has_no_parallel_groups() {
        let steps = vec![step(1, &[]), step(2, &[1]), step(3, &[2])];
        let graph = analyze(&steps).unwrap();
        assert_eq!(graph.execution_order, vec![1, 2, 3]);
        assert_eq!(graph.critical_path, vec![1, 2, 3]);
        assert!(graph.parallel_groups.is_empty());
    }

    #[test]
    fn diamond_dag_parallel_groups_and_critical_path() {
        // 1 -> {2, 3} -> 4
        let steps = vec![step(1, &[]), step(2, &[1]), step(3, &[1]), step(4, &[2, 3])];
        let graph = analyze(&steps).unwrap();
        assert_eq!(graph.execution_order, vec![1, 2, 3, 4]);
        assert_eq!(graph.parallel_groups, vec![vec![1], vec![2, 3], vec![4]]);
        // both 1-2-4 and 1-3-4 tie at weight 3; lexicographic tie-break picks 1-2-4.
        assert_eq!(graph.critical_path, vec![1, 2, 4]);
    }

    #[test]
    fn cycle_is_rejected() {
        let steps = vec![step(1, &[2]), step(2, &[1])];
        let err = analyze(&steps).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::Error::Plan(crate::errors::PlanError::Cycle)
        ));
    }

    #[test]
    fn dangling_dependency_is_rejected() {
        let steps = vec![step(1, &[99])];
        let err = analyze(&steps).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::Error::Plan(crate::errors::PlanError::DanglingDependency(1, 99))
        ));
    }

    #[test]
    fn every_node_appears_exactly_once_in_execution_order_and_one_group() {
        let steps = vec![
            step(1, &[]),
            step(2, &[1]),
            step(3, &[1]),
            step(4, &[2]),
            step(5, &[3]),
        ];
        let graph = analyze(&steps).unwrap();
        let mut seen = HashSet::new();
        for n in &graph.execution_order {
            assert!(seen.insert(*n), "duplicate in execution_order");
        }
        assert_eq!(seen.len(), steps.len());

        let mut seen_groups = HashSet::new();
        for g in &graph.parallel_groups {
            for n in g {
                assert!(seen_groups.insert(*n), "node in more than one group");
            }
        }
    }

    #[test]
    fn effort_estimates_change_critical_path_choice() {
        let mut a = step(2, &[1]);
        a.estimated_effort = Some("5 hours".to_string());
        let mut b = step(3, &[1]);
        b.estimated_effort = Some("10 minutes".to_string());
        let steps = vec![step(1, &[]), a, b, step(4, &[2, 3])];
        let graph = analyze(&steps).unwrap();
        assert_eq!(graph.critical_path, vec![1, 2, 4]);
    }
}
