//! Partition plane selection strategies.
//!
//! The choice of divider decides how balanced the tree is and how many
//! polygons get cut during construction.

use crate::{Classification, Polygon};

/// Strategy for picking the polygon whose plane splits a region.
pub trait PartitionSelector {
    /// Returns the index of the dividing polygon in `polygons`, or `None` if
    /// no polygon can split the set so that both sides receive geometry.
    ///
    /// Polygons already used as dividers must not be returned.
    fn select(&self, polygons: &[Polygon]) -> Option<usize>;
}

/// How the rest of a region falls against one candidate plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandidateScore {
    pub front: usize,
    pub back: usize,
    pub splits: usize,
}

impl CandidateScore {
    /// Scores `polygons[candidate]` against every other polygon in the set.
    /// Coincident polygons count on neither side.
    pub fn compute(polygons: &[Polygon], candidate: usize) -> Self {
        let plane = polygons[candidate].plane();
        polygons
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != candidate)
            .fold(Self::default(), |mut score, (_, polygon)| {
                match polygon.classify(plane) {
                    Classification::Front => score.front += 1,
                    Classification::Back => score.back += 1,
                    Classification::Intersects => score.splits += 1,
                    Classification::Coincident => {}
                }
                score
            })
    }

    /// `min(front, back) / max(front, back)`, zero when both sides are empty.
    pub fn balance(&self) -> f32 {
        let max = self.front.max(self.back);
        if max == 0 {
            0.0
        } else {
            self.front.min(self.back) as f32 / max as f32
        }
    }

    /// Whether both children would receive geometry. The divider itself always
    /// lands in front, so only the back side can end up empty.
    pub fn is_viable(&self) -> bool {
        self.back + self.splits > 0
    }
}

/// Minimizes splits among candidates whose balance clears a threshold,
/// halving the threshold after every pass without a winner.
#[derive(Debug, Clone, Copy)]
pub struct BalancedSelector {
    /// Starting balance threshold.
    pub min_relation: f32,
    /// Passes with a halved threshold before falling back to the least
    /// splitting viable candidate.
    pub max_relaxations: usize,
}

impl Default for BalancedSelector {
    fn default() -> Self {
        Self {
            min_relation: 0.5,
            max_relaxations: 16,
        }
    }
}

impl PartitionSelector for BalancedSelector {
    /// # Panics
    /// Panics if `polygons` is empty.
    fn select(&self, polygons: &[Polygon]) -> Option<usize> {
        assert!(
            !polygons.is_empty(),
            "Cannot select a partition plane from an empty polygon set"
        );

        let candidates: Vec<(usize, CandidateScore)> = polygons
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_used_as_divider())
            .map(|(i, _)| (i, CandidateScore::compute(polygons, i)))
            .collect();

        let mut min_relation = self.min_relation;
        for _ in 0..=self.max_relaxations {
            let mut best: Option<(usize, CandidateScore)> = None;
            for &(i, score) in &candidates {
                let relation = score.balance();
                let better = match best {
                    None => relation > min_relation,
                    Some((_, b)) => {
                        (relation > min_relation && score.splits < b.splits)
                            || (score.splits == b.splits && relation > b.balance())
                    }
                };
                if better {
                    best = Some((i, score));
                }
            }
            if let Some((i, _)) = best {
                return Some(i);
            }
            min_relation /= 2.0;
        }

        // Only one-sided candidates remain; take the one cutting the fewest polygons.
        candidates
            .iter()
            .filter(|(_, score)| score.is_viable())
            .min_by(|(_, a), (_, b)| {
                a.splits
                    .cmp(&b.splits)
                    .then(b.balance().total_cmp(&a.balance()))
            })
            .map(|&(i, _)| i)
    }
}
