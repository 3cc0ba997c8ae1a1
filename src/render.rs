use bytemuck::{Pod, Zeroable};

use crate::config::Dimensions;
use crate::state::{Bird, Obstacle};

pub const KIND_BIRD: u32 = 0;
pub const KIND_UPPER_BARRIER: u32 = 1;
pub const KIND_LOWER_BARRIER: u32 = 2;

/// One axis-aligned rectangle in field pixels, ready for an instanced quad draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub kind: u32,
}

/// Bird first, then the upper and lower barrier of every obstacle.
/// Zero-height barriers are skipped.
pub fn instances(dims: &Dimensions, bird: &Bird, obstacles: &[Obstacle]) -> Vec<InstanceData> {
    let mut instances = Vec::with_capacity(1 + obstacles.len() * 2);
    instances.push(InstanceData {
        position: [dims.bird_x, bird.y],
        size: [dims.bird_size, dims.bird_size],
        kind: KIND_BIRD,
    });

    for obstacle in obstacles {
        let top_h = obstacle.gap_start.max(0.0);
        if top_h > 0.0 {
            instances.push(InstanceData {
                position: [obstacle.x, 0.0],
                size: [dims.obstacle_width, top_h],
                kind: KIND_UPPER_BARRIER,
            });
        }
        let bottom_y = obstacle.gap_start + dims.gap_size;
        let bottom_h = (dims.field_height - bottom_y).max(0.0);
        if bottom_h > 0.0 {
            instances.push(InstanceData {
                position: [obstacle.x, bottom_y],
                size: [dims.obstacle_width, bottom_h],
                kind: KIND_LOWER_BARRIER,
            });
        }
    }

    instances
}

/// Raw bytes of `instances`, laid out for a GPU vertex buffer.
pub fn as_bytes(instances: &[InstanceData]) -> &[u8] {
    bytemuck::cast_slice(instances)
}
