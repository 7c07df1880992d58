//! Route topology.

pub mod stop_graph;

pub use stop_graph::{Anchors, StopGraph};
