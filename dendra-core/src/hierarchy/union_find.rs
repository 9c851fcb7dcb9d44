//! Union-find that allocates a new identifier for every merge.
//!
//! Points occupy ids `0..n`; the `i`-th merge receives id `n + i`, so a full
//! replay of `n - 1` edges ends at root `2n - 2`. Merged sets never reuse
//! either input id, which lets the dendrogram address children by the id the
//! union-find reports.

#[derive(Clone, Debug)]
pub(super) struct MergingUnionFind {
    parent: Vec<usize>,
    next: usize,
}

impl MergingUnionFind {
    pub(super) fn new(point_count: usize) -> Self {
        let capacity = (2 * point_count).saturating_sub(1);
        Self {
            parent: (0..capacity).collect(),
            next: point_count,
        }
    }

    pub(super) fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[node] != node {
            let parent = self.parent[node];
            self.parent[node] = root;
            node = parent;
        }

        root
    }

    /// Joins two set representatives under a freshly allocated id.
    ///
    /// Callers must pass distinct roots and at most `n - 1` merges may occur.
    pub(super) fn merge(&mut self, left: usize, right: usize) -> usize {
        let merged = self.next;
        self.next += 1;
        self.parent[left] = merged;
        self.parent[right] = merged;
        merged
    }
}
