//! BSP partitioning of static level geometry with a sample-point PVS.

mod aabb;
pub mod bsp;
pub mod clip;
mod config;
mod error;
mod geometry;
mod plane;
mod polygon;
pub mod pvs;
pub mod tessellate;
mod triangle;

pub use aabb::Aabb;
pub use bsp::{PartitionTree, Region, RegionId, StaticObjectPlacement};
pub use config::{TreeConfig, DEFAULT_MAX_DEPTH, DEFAULT_SAMPLE_GRID};
pub use error::{BspError, Result};
pub use geometry::{Brush, GeometryStore};
pub use plane::{Classification, Plane3D, PlaneSide, PLANE_EPSILON};
pub use polygon::{is_convex_set, Polygon};
pub use triangle::{Triangle, SEGMENT_END_TOLERANCE};
