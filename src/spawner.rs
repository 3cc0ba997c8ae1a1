use std::collections::VecDeque;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::config::Dimensions;
use crate::state::Obstacle;

/// Source of gap placements, the only randomness in the simulation.
pub trait GapSource {
    /// Returns a gap start in `low..=high`.
    fn gap_start(&mut self, low: f32, high: f32) -> f32;
}

/// Uniform gap placement backed by any `rand` generator.
#[derive(Debug)]
pub struct RandomGaps<R = SmallRng> {
    rng: R,
}

impl RandomGaps<SmallRng> {
    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomGaps<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> GapSource for RandomGaps<R> {
    fn gap_start(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Replays a fixed list of gap starts, clamped into the requested range.
/// Repeats the last value once the list runs out.
#[derive(Clone, Debug, Default)]
pub struct ScriptedGaps {
    queue: VecDeque<f32>,
    last: Option<f32>,
}

impl ScriptedGaps {
    pub fn new(starts: impl IntoIterator<Item = f32>) -> Self {
        Self {
            queue: starts.into_iter().collect(),
            last: None,
        }
    }
}

impl GapSource for ScriptedGaps {
    fn gap_start(&mut self, low: f32, high: f32) -> f32 {
        if let Some(next) = self.queue.pop_front() {
            self.last = Some(next);
        }
        self.last.unwrap_or(low).clamp(low, high.max(low))
    }
}

/// Appends one obstacle at the right edge of the field and returns a copy.
pub fn spawn<G: GapSource + ?Sized>(
    obstacles: &mut Vec<Obstacle>,
    dims: &Dimensions,
    gaps: &mut G,
) -> Obstacle {
    let (low, high) = dims.gap_bounds();
    let obstacle = Obstacle::new(dims.field_width, gaps.gap_start(low, high));
    obstacles.push(obstacle);
    obstacle
}
