//! Point clouds for the stock shapes
//!
//! Boxes are given as their eight corners and turned into shapes with
//! [`Shape::box_from_points`](crate::physics::Shape::box_from_points).

use std::f32::consts::PI;

use crate::foundation::math::{Quat, Vec3};

/// Half width of the arena along x
pub const ARENA_HALF_WIDTH: f32 = 50.0;

/// Half depth of the arena along y
pub const ARENA_HALF_DEPTH: f32 = 25.0;

/// Height of the arena walls
pub const WALL_HEIGHT: f32 = 5.0;

/// Corners of the axis-aligned box spanning `min` to `max`
pub fn box_points(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, max.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(max.x, max.y, min.z),
    ]
}

/// Centered box with the given half extents
pub fn centered_box_points(half_extents: Vec3) -> [Vec3; 8] {
    box_points(-half_extents, half_extents)
}

/// Arena floor; its top face is at z = 0
pub fn ground_points() -> [Vec3; 8] {
    box_points(
        Vec3::new(-ARENA_HALF_WIDTH, -ARENA_HALF_DEPTH, -1.0),
        Vec3::new(ARENA_HALF_WIDTH, ARENA_HALF_DEPTH, 0.0),
    )
}

/// Wall closing the arena along x
pub fn wall_x_points() -> [Vec3; 8] {
    box_points(
        Vec3::new(-1.0, -ARENA_HALF_DEPTH, 0.0),
        Vec3::new(1.0, ARENA_HALF_DEPTH, WALL_HEIGHT),
    )
}

/// Wall closing the arena along y
pub fn wall_y_points() -> [Vec3; 8] {
    box_points(
        Vec3::new(-ARENA_HALF_WIDTH, -1.0, 0.0),
        Vec3::new(ARENA_HALF_WIDTH, 1.0, WALL_HEIGHT),
    )
}

/// Two-unit cube
pub fn unit_box_points() -> [Vec3; 8] {
    centered_box_points(Vec3::repeat(1.0))
}

/// Half-unit cube
pub fn small_box_points() -> [Vec3; 8] {
    centered_box_points(Vec3::repeat(0.25))
}

/// Long bar along x
pub fn beam_points() -> [Vec3; 8] {
    centered_box_points(Vec3::new(3.0, 0.25, 0.25))
}

/// Flat slab
pub fn platform_points() -> [Vec3; 8] {
    centered_box_points(Vec3::new(3.0, 3.0, 0.25))
}

/// Ragdoll torso
pub fn torso_points() -> [Vec3; 8] {
    centered_box_points(Vec3::new(0.25, 0.5, 1.0))
}

/// Ragdoll arm or leg, long along x
pub fn limb_points() -> [Vec3; 8] {
    centered_box_points(Vec3::new(1.0, 0.25, 0.25))
}

/// Ragdoll head
pub fn head_points() -> [Vec3; 8] {
    centered_box_points(Vec3::repeat(0.25))
}

/// Gem-like cloud: one profile of seven points swept eight times about z
pub fn diamond_points() -> Vec<Vec3> {
    let half_turn = Quat::from_axis_angle(&Vec3::z_axis(), PI / 8.0);
    let profile = [
        Vec3::new(0.1, 0.0, -1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.1),
        Vec3::new(0.4, 0.0, 0.4),
        half_turn * Vec3::new(0.8, 0.0, 0.3),
        half_turn * Vec3::new(1.0, 0.0, 0.0),
        half_turn * Vec3::new(1.0, 0.0, 0.1),
    ];

    (0..8u8)
        .flat_map(|step| {
            let turn = Quat::from_axis_angle(&Vec3::z_axis(), f32::from(step) * PI / 4.0);
            profile.iter().map(move |point| turn * point)
        })
        .collect()
}
