//! Build and trace configuration.

/// Default cap on tree depth.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Default sample grid laid on every partition plane.
pub const DEFAULT_SAMPLE_GRID: (usize, usize) = (20, 20);

/// Knobs for building a [`PartitionTree`](crate::PartitionTree) and tracing its PVS.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeConfig {
    /// Regions at this depth become leaves even when not convex.
    pub max_depth: usize,
    /// Number of sample points along the plane-local U and V axes.
    pub sample_grid: (usize, usize),
    /// Visibility worker count; `None` uses one per available core.
    pub worker_threads: Option<usize>,
    /// Vertex coordinates are divided by this on load.
    pub scale: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            sample_grid: DEFAULT_SAMPLE_GRID,
            worker_threads: None,
            scale: 1.0,
        }
    }
}

impl TreeConfig {
    /// Sets the maximum tree depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the per-plane sample grid resolution.
    pub fn with_sample_grid(mut self, u: usize, v: usize) -> Self {
        self.sample_grid = (u, v);
        self
    }

    /// Pins the visibility worker count.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }

    /// Sets the load-time scale divisor.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Worker count actually used by the tracer.
    pub fn resolved_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        })
    }
}
