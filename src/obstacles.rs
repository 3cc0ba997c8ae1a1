use crate::config::{Dimensions, Tuning};
use crate::state::{Bird, Obstacle, SimState};

/// What one obstacle sweep observed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Sweep {
    /// Pass events fired this tick.
    pub passed: u32,
    /// Obstacles removed after scrolling off the left edge.
    pub pruned: usize,
    pub collision: bool,
}

/// Scrolls, prunes, scores and collision-checks every obstacle for one tick.
///
/// Obstacles are visited oldest first and the sweep stops at the first
/// collision, leaving later obstacles unscored for this tick.
pub fn advance(state: &mut SimState, tuning: &Tuning, dims: &Dimensions) -> Sweep {
    let mut sweep = Sweep::default();

    for obstacle in &mut state.obstacles {
        obstacle.x -= tuning.obstacle_speed;
    }

    let before = state.obstacles.len();
    state
        .obstacles
        .retain(|obstacle| obstacle.right(dims.obstacle_width) >= 0.0);
    sweep.pruned = before - state.obstacles.len();

    for obstacle in &mut state.obstacles {
        if !obstacle.passed && obstacle.right(dims.obstacle_width) < dims.bird_x {
            obstacle.passed = true;
            state.score += 1;
            sweep.passed += 1;
        }
        if collides(&state.bird, obstacle, dims) {
            sweep.collision = true;
            break;
        }
    }

    sweep
}

/// True when the bird overlaps the obstacle's column without fitting inside its gap.
pub fn collides(bird: &Bird, obstacle: &Obstacle, dims: &Dimensions) -> bool {
    let overlaps = dims.bird_x < obstacle.right(dims.obstacle_width)
        && dims.bird_right() > obstacle.x;
    if !overlaps {
        return false;
    }
    let top = bird.y;
    let bottom = bird.y + dims.bird_size;
    top < obstacle.gap_start || bottom > obstacle.gap_start + dims.gap_size
}
