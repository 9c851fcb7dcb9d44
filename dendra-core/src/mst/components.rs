//! Component bookkeeping for the Borůvka rounds.
//!
//! Components are named by a representative point id. Unions keep the smaller
//! representative so a component's name only changes when it absorbs a
//! component with a lower id.

#[derive(Clone, Debug)]
pub(super) struct Components {
    parent: Vec<usize>,
    count: usize,
}

impl Components {
    pub(super) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            count: n,
        }
    }

    /// Number of disjoint components.
    pub(super) fn count(&self) -> usize {
        self.count
    }

    pub(super) fn find(&mut self, mut point: usize) -> usize {
        let mut root = point;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[point] != point {
            let parent = self.parent[point];
            self.parent[point] = root;
            point = parent;
        }

        root
    }

    /// Joins the components of `left` and `right`; `false` when they already
    /// share one.
    pub(super) fn union(&mut self, left: usize, right: usize) -> bool {
        let left = self.find(left);
        let right = self.find(right);
        if left == right {
            return false;
        }
        let (keep, absorb) = if left < right {
            (left, right)
        } else {
            (right, left)
        };
        self.parent[absorb] = keep;
        self.count -= 1;
        true
    }

    /// Resolves every point to its representative for a read-only round.
    pub(super) fn snapshot(&mut self) -> Vec<usize> {
        (0..self.parent.len()).map(|point| self.find(point)).collect()
    }
}
