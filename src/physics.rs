use crate::config::{Dimensions, Tuning};
use crate::state::Bird;

/// Result of advancing the bird by one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Integration {
    Moved,
    /// The step would leave the field; the bird was left untouched.
    OutOfBounds,
}

/// Moves the bird by its current velocity, then applies gravity.
///
/// A step that would put the bird above the top edge or below
/// `field_height - bird_size` is discarded as a whole so the last in-bounds
/// position stays available to the renderer.
pub fn integrate(bird: &mut Bird, tuning: &Tuning, dims: &Dimensions) -> Integration {
    let next_y = bird.y + bird.velocity;
    if next_y < 0.0 || next_y > dims.max_bird_y() {
        return Integration::OutOfBounds;
    }
    bird.y = next_y;
    bird.velocity += tuning.gravity;
    Integration::Moved
}

/// Overrides the velocity with the upward impulse. Repeated calls do not stack.
pub fn jump(bird: &mut Bird, tuning: &Tuning) {
    bird.velocity = tuning.jump_impulse;
}
