//! Property-based tests for the dual-tree Borůvka spanning tree.
//!
//! Compares the solver against a brute-force Kruskal oracle over the
//! complete mutual reachability graph, checks structural invariants, and
//! verifies that the worker count never changes the selected edges.

mod oracle;
mod strategies;
mod types;
