//! Leaf-to-leaf visibility over sample points.
//!
//! Tracing runs in two phases. Leaves sharing a sample point are connected
//! outright. Then, repeatedly, every leaf tests the leaves two PVS hops away
//! by shooting segments between sample points until a pass adds nothing.

use std::ops::Range;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use log::{debug, info};
use nalgebra::Point3;

use super::PairMatrix;
use crate::bsp::RegionId;
use crate::{PartitionTree, PlaneSide, PLANE_EPSILON};

/// Minimum time between progress reports.
const PROGRESS_INTERVAL_MS: u128 = 500;

/// Everything workers mutate, behind one lock.
struct TraceState {
    visible: PairMatrix,
    checked: PairMatrix,
    /// PVS lists indexed by region id.
    pvs: Vec<Vec<RegionId>>,
    processed: usize,
    last_report: Instant,
}

fn lock(state: &Mutex<TraceState>) -> MutexGuard<'_, TraceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reads `pvs[leaf][index]`, releasing the lock before returning.
fn pvs_entry(state: &Mutex<TraceState>, leaf: RegionId, index: usize) -> Option<RegionId> {
    lock(state).pvs[leaf].get(index).copied()
}

#[inline]
fn points_coincide(a: &Point3<f32>, b: &Point3<f32>) -> bool {
    (a.x - b.x).abs() <= PLANE_EPSILON
        && (a.y - b.y).abs() <= PLANE_EPSILON
        && (a.z - b.z).abs() <= PLANE_EPSILON
}

/// Splits `0..len` into at most `workers` contiguous, non-empty ranges.
fn worker_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let chunk = len.div_ceil(workers.max(1)).max(1);
    (0..len)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(len))
        .collect()
}

impl PartitionTree {
    /// Computes every leaf's PVS from its sample points.
    ///
    /// Pairs already marked as tested are never tested again, so tracing a
    /// fully traced tree changes nothing.
    pub fn trace_visibility(&mut self) {
        let start = Instant::now();

        let connected = self.connect_leaves();
        info!(
            "Detected {connected} connected leaf pairs ({:.2} ms)",
            start.elapsed().as_secs_f64() * 1000.0
        );
        self.prune_connected_sample_points();

        let threads = self.config().resolved_worker_threads();
        debug!(
            "Visibility matrices: {} bytes each for {} regions",
            self.visible.memory_usage(),
            self.visible.size()
        );
        let traced_start = Instant::now();
        let added = self.trace_transitive(threads);
        info!(
            "Tracing visibility added {added} leaf pairs ({:.2} ms, {threads} workers)",
            traced_start.elapsed().as_secs_f64() * 1000.0
        );
    }

    /// Connects leaves whose sample sets share a point. Returns the number of
    /// new pairs.
    pub(crate) fn connect_leaves(&mut self) -> usize {
        let mut connected = 0;
        for (i, &a) in self.leaves.iter().enumerate() {
            for &b in &self.leaves[i + 1..] {
                if self.visible.get(a, b) {
                    continue;
                }
                let shares_point = self.regions[a].sample_points.iter().any(|p| {
                    self.regions[b]
                        .sample_points
                        .iter()
                        .any(|q| points_coincide(p, q))
                });
                if !shares_point {
                    continue;
                }

                self.visible.set(a, b);
                self.checked.set(a, b);
                for (from, to) in [(a, b), (b, a)] {
                    let region = &mut self.regions[from];
                    region.pvs.push(to);
                    region.connected.push(to);
                }
                connected += 1;
            }
        }
        connected
    }

    /// Drops each leaf's sample points that lie on a connected neighbour's
    /// triangles.
    fn prune_connected_sample_points(&mut self) {
        let before: usize = self.leaf_regions().map(|r| r.sample_points.len()).sum();
        for i in 0..self.leaves.len() {
            let leaf = self.leaves[i];
            let mut points = std::mem::take(&mut self.regions[leaf].sample_points);
            for &neighbour in &self.regions[leaf].connected {
                self.regions[neighbour].prune_points_on_geometry(&mut points);
            }
            self.regions[leaf].sample_points = points;
        }
        let after: usize = self.leaf_regions().map(|r| r.sample_points.len()).sum();
        debug!("Removed {} redundant sample points", before - after);
    }

    /// Expands the PVS two hops at a time until a pass adds no pair.
    fn trace_transitive(&mut self, threads: usize) -> usize {
        let state = Mutex::new(TraceState {
            visible: std::mem::replace(&mut self.visible, PairMatrix::new(0)),
            checked: std::mem::replace(&mut self.checked, PairMatrix::new(0)),
            pvs: self
                .regions
                .iter_mut()
                .map(|r| std::mem::take(&mut r.pvs))
                .collect(),
            processed: 0,
            last_report: Instant::now(),
        });

        let mut added = 0;
        for pass in 1.. {
            lock(&state).processed = 0;
            let pass_added = self.trace_pass(&state, threads);
            debug!("Visibility pass {pass} added {pass_added} pairs");
            added += pass_added;
            if pass_added == 0 {
                break;
            }
        }

        let state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        self.visible = state.visible;
        self.checked = state.checked;
        for (region, pvs) in self.regions.iter_mut().zip(state.pvs) {
            region.pvs = pvs;
        }
        added
    }

    /// One pass over every leaf, split across scoped worker threads.
    fn trace_pass(&self, state: &Mutex<TraceState>, threads: usize) -> usize {
        let ranges = worker_ranges(self.leaves.len(), threads);
        thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .enumerate()
                .map(|(worker, range)| {
                    thread::Builder::new()
                        .name(format!("pvs-trace-{worker}"))
                        .spawn_scoped(scope, move || self.trace_range(state, range, worker))
                        .unwrap_or_else(|e| panic!("Could not create trace worker {worker}: {e}"))
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .sum()
        })
    }

    fn trace_range(&self, state: &Mutex<TraceState>, range: Range<usize>, worker: usize) -> usize {
        let mut added = 0;

        for &leaf1 in &self.leaves[range] {
            let mut i2 = 0;
            while let Some(leaf2) = pvs_entry(state, leaf1, i2) {
                i2 += 1;

                let mut i3 = 0;
                while let Some(leaf3) = pvs_entry(state, leaf2, i3) {
                    i3 += 1;
                    if leaf3 == leaf1 {
                        continue;
                    }
                    {
                        let s = lock(state);
                        if s.visible.get(leaf1, leaf3) || s.checked.get(leaf1, leaf3) {
                            continue;
                        }
                    }

                    let sees = self.check_visibility(leaf1, leaf3);

                    let mut s = lock(state);
                    if sees && s.visible.set(leaf1, leaf3) {
                        s.pvs[leaf1].push(leaf3);
                        s.pvs[leaf3].push(leaf1);
                        added += 1;
                    }
                    s.checked.set(leaf1, leaf3);
                }
            }

            let mut s = lock(state);
            s.processed += 1;
            if worker == 0 && s.last_report.elapsed().as_millis() >= PROGRESS_INTERVAL_MS {
                info!(
                    "Tracing visibility: {}/{} leaves, {} visible pairs",
                    s.processed,
                    self.leaves.len(),
                    s.visible.count_pairs()
                );
                s.last_report = Instant::now();
            }
        }

        added
    }

    /// Whether any sample point of `a` has an unobstructed segment to any
    /// sample point of `b`.
    pub fn check_visibility(&self, a: RegionId, b: RegionId) -> bool {
        let (from, to) = (&self.regions[a].sample_points, &self.regions[b].sample_points);
        from.iter()
            .any(|p| to.iter().any(|q| !self.segment_blocked(0, p, q)))
    }

    /// Whether the segment `start → end` hits a triangle in the subtree at
    /// `id`. Only leaves on the sides the segment touches are tested.
    pub fn segment_blocked(&self, id: RegionId, start: &Point3<f32>, end: &Point3<f32>) -> bool {
        let region = &self.regions[id];
        let (Some((front, back)), Some(plane)) = (region.children(), region.plane()) else {
            return region
                .triangles
                .iter()
                .any(|t| t.intersects_segment(start, end));
        };

        let s = plane.classify_point(start);
        let e = plane.classify_point(end);
        let spans = (s == PlaneSide::OnPlane && e == PlaneSide::OnPlane)
            || (s != e && s != PlaneSide::OnPlane && e != PlaneSide::OnPlane);
        if spans {
            return self.segment_blocked(back, start, end)
                || self.segment_blocked(front, start, end);
        }

        let touches_front = s == PlaneSide::Front || e == PlaneSide::Front;
        let touches_back = s == PlaneSide::Back || e == PlaneSide::Back;
        (touches_front && self.segment_blocked(front, start, end))
            || (touches_back && self.segment_blocked(back, start, end))
    }
}
