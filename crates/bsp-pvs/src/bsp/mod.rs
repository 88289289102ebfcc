//! Binary space partitioning of static level geometry into convex rooms.
//!
//! The tree recursively splits the polygon soup with planes taken from the
//! polygons themselves until every leaf bounds a convex room (or the depth
//! limit is hit). Leaves then carry what the renderer and the visibility
//! tracer need:
//!
//! - a triangle buffer, after [`PartitionTree::tessellate`]
//! - static objects attached with [`PartitionTree::insert_static_object`]
//! - sample points and the potentially visible set, see [`crate::pvs`]
//!
//! # Example
//!
//! ```ignore
//! use bsp_pvs::{PartitionTree, Polygon, TreeConfig};
//! use bsp_pvs::bsp::CollectingVisitor;
//! use nalgebra::Point3;
//!
//! let polygons: Vec<Polygon> = /* level geometry */;
//! let mut tree = PartitionTree::build(polygons, &TreeConfig::default());
//! tree.tessellate();
//!
//! let mut visitor = CollectingVisitor::new();
//! tree.traverse_front_to_back(Point3::new(0.0, 1.0, 0.0), &mut visitor);
//! let leaves_in_draw_order = visitor.into_leaves();
//! ```
//!
//! # Architecture
//!
//! - [`PartitionTree`]: arena of regions plus build statistics
//! - [`Region`]: one node; internal regions hold a plane, leaves hold geometry
//! - [`PartitionSelector`]: strategy trait for choosing dividers
//! - [`LeafVisitor`]: callback for ordered leaf traversal

mod region;
mod selector;
mod tree;
mod visitor;

pub use region::{Region, RegionId, StaticObjectPlacement};
pub use selector::{BalancedSelector, CandidateScore, PartitionSelector};
pub use tree::{BuildStats, PartitionTree};
pub use visitor::{CollectingVisitor, DrawTracker, FnVisitor, FrameStats, LeafVisitor};
