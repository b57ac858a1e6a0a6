use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use slotmap::SecondaryMap;
use tracing::warn;

use crate::types::ElementId;

/// Parent/child edges between elements.
///
/// Edges are stored on both ends so releasing an element only touches its
/// own parents.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    parents: SecondaryMap<ElementId, Vec<ElementId>>,
    children: SecondaryMap<ElementId, Vec<ElementId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, parent: ElementId, child: ElementId) {
        if parent == child {
            return;
        }
        let parents = self.parents.entry(child).map(|e| e.or_default());
        if let Some(list) = parents {
            if list.contains(&parent) {
                return;
            }
            list.push(parent);
        }
        if let Some(list) = self.children.entry(parent).map(|e| e.or_default()) {
            list.push(child);
        }
    }

    pub fn remove_edge(&mut self, parent: ElementId, child: ElementId) {
        if let Some(list) = self.parents.get_mut(child) {
            list.retain(|p| *p != parent);
        }
        if let Some(list) = self.children.get_mut(parent) {
            list.retain(|c| *c != child);
        }
    }

    /// Drop every edge into `child`.
    pub fn remove_parents(&mut self, child: ElementId) {
        let Some(parents) = self.parents.remove(child) else {
            return;
        };
        for parent in parents {
            if let Some(list) = self.children.get_mut(parent) {
                list.retain(|c| *c != child);
            }
        }
    }

    pub fn parents(&self, id: ElementId) -> &[ElementId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transitive parents.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        self.walk(id, |g, n| g.parents(n))
    }

    /// Transitive children.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        self.walk(id, |g, n| g.children(n))
    }

    /// Order `ids` so every parent comes before its children.
    ///
    /// Among elements that are ready at the same time the one earlier in
    /// `ids` goes first. Parents outside `ids` are ignored. Elements caught
    /// in a cycle are appended in their `ids` order.
    pub fn topological_order(&self, ids: &[ElementId]) -> Vec<ElementId> {
        let rank: HashMap<ElementId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut pending: Vec<usize> = ids
            .iter()
            .map(|id| {
                let mut seen = HashSet::new();
                self.parents(*id)
                    .iter()
                    .filter(|p| rank.contains_key(p) && seen.insert(**p))
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut out = Vec::with_capacity(ids.len());
        let mut placed = vec![false; ids.len()];
        while let Some(Reverse(i)) = ready.pop() {
            placed[i] = true;
            out.push(ids[i]);
            let mut seen = HashSet::new();
            for child in self.children(ids[i]) {
                let Some(&j) = rank.get(child) else { continue };
                if !seen.insert(j) || placed[j] {
                    continue;
                }
                pending[j] -= 1;
                if pending[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }
        if out.len() < ids.len() {
            warn!(stuck = ids.len() - out.len(), "dependency cycle, keeping creation order");
            out.extend(ids.iter().enumerate().filter(|(i, _)| !placed[*i]).map(|(_, id)| *id));
        }
        out
    }

    fn walk<'a>(
        &'a self,
        start: ElementId,
        next: impl Fn(&'a Self, ElementId) -> &'a [ElementId],
    ) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut frontier = vec![start];
        while let Some(n) = frontier.pop() {
            for &m in next(self, n) {
                if m != start && seen.insert(m) {
                    out.push(m);
                    frontier.push(m);
                }
            }
        }
        out
    }
}
