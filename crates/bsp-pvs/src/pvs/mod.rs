//! Potentially visible sets between the leaves of a [`PartitionTree`].
//!
//! Visibility is approximated by sample points. Every partition plane lays a
//! regular grid over its region's bounds and hands it to both children, so
//! adjacent leaves end up sharing the points on their common boundary. The
//! tracer connects leaves that share a point, then tests farther leaves by
//! shooting segments between their samples through the tree.
//!
//! ```ignore
//! use bsp_pvs::{PartitionTree, TreeConfig};
//!
//! let mut tree = PartitionTree::build(polygons, &TreeConfig::default());
//! tree.build_pvs("level.pvs")?;
//! let visible = tree.potentially_visible(&eye);
//! ```

mod file;
mod matrix;
mod sampler;
mod tracer;

use std::path::Path;
use std::time::Instant;

use log::{info, warn};

pub use matrix::PairMatrix;
pub use sampler::plane_grid;

use crate::error::Result;
use crate::PartitionTree;

/// Where [`PartitionTree::build_pvs`] got its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PvsSource {
    /// Read from an existing cache file.
    Cache,
    /// Traced from sample points and written to the cache.
    Traced,
}

impl PartitionTree {
    /// Loads the PVS cached at `path`, or traces it and writes the cache.
    ///
    /// A cache that can't be read or doesn't match this tree is ignored and
    /// overwritten. The tree is tessellated first if it isn't already, and
    /// sample points are distributed either way so they can be dumped.
    pub fn build_pvs<P: AsRef<Path>>(&mut self, path: P) -> Result<PvsSource> {
        let path = path.as_ref();
        self.tessellate();
        self.distribute_sample_points(Vec::new());

        if path.exists() {
            match self.read_pvs_file(path) {
                Ok(()) => {
                    info!("Loaded PVS for {} leaves from {path:?}", self.leaf_count());
                    return Ok(PvsSource::Cache);
                }
                Err(e) => warn!("Ignoring PVS cache {path:?}: {e}"),
            }
        }

        let start = Instant::now();
        self.trace_visibility();
        info!(
            "Computed PVS: {} visible leaf pairs ({:.2} s)",
            self.visible.count_pairs(),
            start.elapsed().as_secs_f64()
        );

        self.write_pvs_file(path)?;
        Ok(PvsSource::Traced)
    }
}
