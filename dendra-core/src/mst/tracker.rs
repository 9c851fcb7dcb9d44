//! Per-component closest-edge tracking.
//!
//! Each component keeps the best mutual reachability edge found so far: the
//! point inside the component, the partner point outside it, and their
//! distance. Candidates compare by `(distance, min id, max id)` so every
//! round selects the same edges whatever order the traversal visits pairs.

use std::cmp::Ordering;

use crate::core_distance::CoreResult;

/// Best known edge leaving one component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    distance: f64,
    inside: usize,
    outside: usize,
}

impl Candidate {
    /// The "no edge known" state.
    pub const NONE: Self = Self {
        distance: f64::INFINITY,
        inside: usize::MAX,
        outside: usize::MAX,
    };

    pub(crate) const fn new(distance: f64, inside: usize, outside: usize) -> Self {
        Self {
            distance,
            inside,
            outside,
        }
    }

    /// Mutual reachability distance of the edge.
    #[must_use]
    #[rustfmt::skip]
    pub fn distance(&self) -> f64 { self.distance }

    /// Endpoint inside the tracked component, `None` without an edge.
    #[must_use]
    pub fn inside(&self) -> Option<usize> {
        (self.inside != usize::MAX).then_some(self.inside)
    }

    /// Endpoint outside the tracked component, `None` without an edge.
    #[must_use]
    pub fn outside(&self) -> Option<usize> {
        (self.outside != usize::MAX).then_some(self.outside)
    }

    /// Returns `true` once an edge has been recorded.
    #[must_use]
    pub fn is_some(&self) -> bool {
        self.inside != usize::MAX
    }

    fn key(&self) -> (f64, usize, usize) {
        (
            self.distance,
            self.inside.min(self.outside),
            self.inside.max(self.outside),
        )
    }

    /// Total order used to pick the winning edge among equal distances.
    pub(crate) fn precedes(&self, other: &Self) -> bool {
        let (distance, low, high) = self.key();
        let (other_distance, other_low, other_high) = other.key();
        distance
            .total_cmp(&other_distance)
            .then(low.cmp(&other_low))
            .then(high.cmp(&other_high))
            == Ordering::Less
    }
}

/// Closest known edge for every component, keyed by representative id.
///
/// # Examples
/// ```
/// use dendra_core::ClosestDistanceTracker;
///
/// let mut tracker = ClosestDistanceTracker::new(3);
/// assert!(tracker.consider(0, 0, 2, 4.0));
/// assert!(!tracker.consider(0, 0, 1, 5.0));
/// assert_eq!(tracker.best(0).outside(), Some(2));
/// tracker.reset(0);
/// assert!(!tracker.best(0).is_some());
/// ```
#[derive(Clone, Debug)]
pub struct ClosestDistanceTracker {
    best: Vec<Candidate>,
}

impl ClosestDistanceTracker {
    /// Creates a tracker for `components` ids with no candidates.
    #[must_use]
    pub fn new(components: usize) -> Self {
        Self {
            best: vec![Candidate::NONE; components],
        }
    }

    /// Creates a tracker seeded from precomputed core neighbours.
    ///
    /// `component_of[p]` names the component of point `p`.
    #[must_use]
    pub fn seeded<C: CoreResult + ?Sized>(component_of: &[usize], cores: &C) -> Self {
        let mut tracker = Self::new(component_of.len());
        tracker.seed(component_of, cores);
        tracker
    }

    /// Offers every core neighbour as a candidate.
    ///
    /// Neighbours in the same component are ignored; the rest are weighted by
    /// mutual reachability. Unknown neighbour ids are skipped.
    pub fn seed<C: CoreResult + ?Sized>(&mut self, component_of: &[usize], cores: &C) {
        for (point, &component) in component_of.iter().enumerate() {
            let core = cores.core_distance(point);
            for neighbour in cores.neighbours_of(point) {
                let Some(&partner) = component_of.get(neighbour.id) else {
                    continue;
                };
                if partner == component {
                    continue;
                }
                let reach = neighbour
                    .distance
                    .max(core)
                    .max(cores.core_distance(neighbour.id));
                self.consider(component, point, neighbour.id, reach);
            }
        }
    }

    /// Records the edge `inside -> outside` for `component` if it improves on
    /// the current candidate; returns whether it did.
    pub fn consider(&mut self, component: usize, inside: usize, outside: usize, distance: f64) -> bool {
        self.offer(component, Candidate::new(distance, inside, outside))
    }

    pub(crate) fn offer(&mut self, component: usize, candidate: Candidate) -> bool {
        let slot = &mut self.best[component];
        if candidate.precedes(slot) {
            *slot = candidate;
            true
        } else {
            false
        }
    }

    /// Returns the current candidate of `component`.
    #[must_use]
    pub fn best(&self, component: usize) -> Candidate {
        self.best[component]
    }

    /// Restores `component` to the empty state.
    pub fn reset(&mut self, component: usize) {
        self.best[component] = Candidate::NONE;
    }

    /// Restores every component to the empty state.
    pub fn reset_all(&mut self) {
        self.best.fill(Candidate::NONE);
    }

    /// Keeps the smaller of the current and offered candidate per component.
    ///
    /// Accepts another tracker's [`Self::candidates`] as well as the
    /// task-local results of a traversal.
    pub fn merge_min<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = (usize, Candidate)>,
    {
        for (component, candidate) in candidates {
            self.offer(component, candidate);
        }
    }

    /// Yields `(component, candidate)` for every component holding an edge.
    pub fn candidates(&self) -> impl Iterator<Item = (usize, Candidate)> + '_ {
        self.best
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.is_some())
            .map(|(component, candidate)| (component, *candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core_distance::{CoreDistances, Neighbour};

    #[test]
    fn equal_distances_prefer_lower_endpoints() {
        let mut tracker = ClosestDistanceTracker::new(4);
        assert!(tracker.consider(2, 2, 3, 1.0));
        assert!(tracker.consider(2, 2, 1, 1.0));
        assert!(!tracker.consider(2, 2, 3, 1.0));
        assert_eq!(tracker.best(2).outside(), Some(1));
    }

    #[test]
    fn seeding_skips_same_component_neighbours() {
        let cores = CoreDistances::from_parts(
            vec![1.0, 1.0, 2.0],
            vec![
                vec![Neighbour::new(1, 1.0), Neighbour::new(2, 1.5)],
                vec![Neighbour::new(0, 1.0)],
                vec![Neighbour::new(0, 1.5)],
            ],
        )
        .expect("valid table");
        let tracker = ClosestDistanceTracker::seeded(&[0, 0, 2], &cores);
        let best = tracker.best(0);
        assert_eq!((best.inside(), best.outside()), (Some(0), Some(2)));
        assert_eq!(best.distance(), 2.0);
        assert_eq!(tracker.best(2).outside(), Some(0));
        assert!(!tracker.best(1).is_some());
        assert_eq!(tracker.candidates().count(), 2);
    }

    #[test]
    fn merge_min_keeps_the_smaller_candidate() {
        let mut left = ClosestDistanceTracker::new(3);
        left.consider(0, 0, 2, 4.0);
        left.consider(1, 1, 2, 1.0);
        let mut right = ClosestDistanceTracker::new(3);
        right.consider(0, 0, 1, 2.0);
        right.consider(1, 1, 0, 3.0);
        right.consider(2, 2, 1, 1.0);

        left.merge_min(right.candidates());
        assert_eq!(left.best(0).outside(), Some(1));
        assert_eq!(left.best(1).distance(), 1.0);
        assert_eq!(left.best(2).outside(), Some(1));
    }

    #[test]
    fn reset_all_clears_every_candidate() {
        let mut tracker = ClosestDistanceTracker::new(2);
        tracker.consider(0, 0, 1, 3.0);
        tracker.consider(1, 1, 0, 3.0);
        tracker.reset_all();
        assert_eq!(tracker.candidates().count(), 0);
        assert_eq!(tracker.best(0), Candidate::NONE);
    }
}
