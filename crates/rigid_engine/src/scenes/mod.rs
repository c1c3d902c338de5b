//! Ready-made levels
//!
//! [`sandbox`] builds the demo level: a ragdoll, a hanging chain, a box
//! stack, a sphere and a hull, a motor, a moving platform, one of each joint
//! type, a pair of fast projectiles and a weld, all inside a walled arena.

pub mod presets;

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::sync::Arc;

use crate::config::SimulationConfig;
use crate::foundation::math::{Quat, Unit, Vec3};
use crate::physics::constraints::{
    ConstantVelocityLimitedConstraint, DistanceConstraint, HingeLimitedConstraint, MotorConstraint,
    MoverConstraint, OrientationConstraint,
};
use crate::physics::shapes::{ConvexHull, Shape};
use crate::physics::{Body, BodyHandle, PhysicsResult, Scene};

/// Mass sampling resolution for the diamond hull
const DIAMOND_MASS_SAMPLES: usize = 40;

/// Links hanging from the chain's anchor
const CHAIN_LINKS: usize = 5;

/// Boxes in the stack
const STACK_HEIGHT: usize = 5;

fn boxed(points: &[Vec3]) -> PhysicsResult<Arc<Shape>> {
    Ok(Arc::new(Shape::box_from_points(points)?))
}

fn rotation(axis: Vec3, angle: f32) -> Quat {
    Quat::from_axis_angle(&Unit::new_normalize(axis), angle)
}

/// Shapes shared by the sandbox bodies
struct ShapeSet {
    unit: Arc<Shape>,
    small: Arc<Shape>,
    beam: Arc<Shape>,
    platform: Arc<Shape>,
    torso: Arc<Shape>,
    limb: Arc<Shape>,
    head: Arc<Shape>,
    diamond: Arc<Shape>,
}

impl ShapeSet {
    fn new() -> PhysicsResult<Self> {
        let diamond = ConvexHull::with_mass_samples(&presets::diamond_points(), DIAMOND_MASS_SAMPLES)?;
        Ok(Self {
            unit: boxed(&presets::unit_box_points())?,
            small: boxed(&presets::small_box_points())?,
            beam: boxed(&presets::beam_points())?,
            platform: boxed(&presets::platform_points())?,
            torso: boxed(&presets::torso_points())?,
            limb: boxed(&presets::limb_points())?,
            head: boxed(&presets::head_points())?,
            diamond: Arc::new(Shape::Convex(diamond)),
        })
    }
}

/// Static floor and the four walls around it
pub fn add_standard_sandbox(scene: &mut Scene) -> PhysicsResult<()> {
    let ground = boxed(&presets::ground_points())?;
    let wall_x = boxed(&presets::wall_x_points())?;
    let wall_y = boxed(&presets::wall_y_points())?;

    scene.add_body(Body::new(ground).with_elasticity(0.5).with_friction(0.5));

    let walls = [
        (Vec3::new(presets::ARENA_HALF_WIDTH, 0.0, 0.0), &wall_x),
        (Vec3::new(-presets::ARENA_HALF_WIDTH, 0.0, 0.0), &wall_x),
        (Vec3::new(0.0, presets::ARENA_HALF_DEPTH, 0.0), &wall_y),
        (Vec3::new(0.0, -presets::ARENA_HALF_DEPTH, 0.0), &wall_y),
    ];
    for (position, shape) in walls {
        scene.add_body(
            Body::new(Arc::clone(shape))
                .with_position(position)
                .with_elasticity(0.5)
                .with_friction(0.0),
        );
    }
    Ok(())
}

/// Build the demo level
pub fn sandbox(config: &SimulationConfig) -> PhysicsResult<Scene> {
    let mut scene = Scene::new(config);
    let shapes = ShapeSet::new()?;

    add_ragdoll(&mut scene, &shapes, Vec3::new(-5.0, 0.0, 0.0))?;
    add_chain(&mut scene, &shapes)?;
    add_stack(&mut scene, &shapes);
    add_sphere_and_diamond(&mut scene, &shapes);
    add_motor(&mut scene, &shapes)?;
    add_mover(&mut scene, &shapes)?;
    add_hinge(&mut scene, &shapes)?;
    add_constant_velocity(&mut scene, &shapes)?;
    add_projectiles(&mut scene, &shapes);
    add_weld(&mut scene, &shapes)?;
    add_standard_sandbox(&mut scene)?;

    log::info!(
        "Sandbox ready: {} bodies, {} constraints",
        scene.bodies().len(),
        scene.constraints().len()
    );
    Ok(scene)
}

fn add_ragdoll(scene: &mut Scene, shapes: &ShapeSet, offset: Vec3) -> PhysicsResult<()> {
    let part = |shape: &Arc<Shape>, position: Vec3, orientation: Quat, inv_mass: f32| {
        Body::new(Arc::clone(shape))
            .with_position(position + offset)
            .with_orientation(orientation)
            .with_inv_mass(inv_mass)
            .with_elasticity(1.0)
            .with_friction(1.0)
    };

    let head = scene.add_body(part(&shapes.head, Vec3::new(0.0, 0.0, 5.5), Quat::identity(), 2.0));
    let torso = scene.add_body(part(&shapes.torso, Vec3::new(0.0, 0.0, 4.0), Quat::identity(), 0.5));
    let arm_left = scene.add_body(part(
        &shapes.limb,
        Vec3::new(0.0, 2.0, 4.75),
        rotation(Vec3::z(), -FRAC_PI_2),
        1.0,
    ));
    let arm_right = scene.add_body(part(
        &shapes.limb,
        Vec3::new(0.0, -2.0, 4.75),
        rotation(Vec3::z(), FRAC_PI_2),
        1.0,
    ));
    let leg_left = scene.add_body(part(
        &shapes.limb,
        Vec3::new(0.0, 1.0, 2.5),
        rotation(Vec3::y(), FRAC_PI_2),
        1.0,
    ));
    let leg_right = scene.add_body(part(
        &shapes.limb,
        Vec3::new(0.0, -1.0, 2.5),
        rotation(Vec3::y(), FRAC_PI_2),
        1.0,
    ));

    let neck = scene.bodies()[head].position + Vec3::new(0.0, 0.0, -0.5);
    let frame = scene.joint_frame(head, torso, neck, Vec3::y())?;
    scene.add_constraint(HingeLimitedConstraint::new(frame))?;

    let shoulder = scene.bodies()[arm_left].position + Vec3::new(0.0, -1.0, 0.0);
    let frame = scene.joint_frame(torso, arm_left, shoulder, Vec3::y())?;
    scene.add_constraint(ConstantVelocityLimitedConstraint::new(frame))?;

    let shoulder = scene.bodies()[arm_right].position + Vec3::new(0.0, 1.0, 0.0);
    let frame = scene.joint_frame(torso, arm_right, shoulder, -Vec3::y())?;
    scene.add_constraint(ConstantVelocityLimitedConstraint::new(frame))?;

    for leg in [leg_left, leg_right] {
        let hip = scene.bodies()[leg].position + Vec3::new(0.0, 0.0, 0.5);
        let frame = scene.joint_frame(torso, leg, hip, Vec3::y())?;
        scene.add_constraint(HingeLimitedConstraint::new(frame))?;
    }
    Ok(())
}

fn add_chain(scene: &mut Scene, shapes: &ShapeSet) -> PhysicsResult<()> {
    let mut previous = scene.add_body(
        Body::new(Arc::clone(&shapes.small))
            .with_position(Vec3::new(0.0, 5.0, CHAIN_LINKS as f32 + 3.0))
            .with_elasticity(1.0)
            .with_friction(1.0),
    );

    for _ in 0..CHAIN_LINKS {
        let anchor = scene.bodies()[previous].position;
        let link = scene.add_body(
            Body::new(Arc::clone(&shapes.small))
                .with_position(anchor + Vec3::x())
                .with_inv_mass(1.0)
                .with_elasticity(1.0)
                .with_friction(1.0),
        );

        let frame = scene.joint_frame(previous, link, anchor, Vec3::z())?;
        scene.add_constraint(DistanceConstraint::new(frame))?;
        previous = link;
    }
    Ok(())
}

fn add_stack(scene: &mut Scene, shapes: &ShapeSet) {
    const GAP: f32 = 0.04;
    let spacing = 2.0 + GAP;

    for level in 0..STACK_HEIGHT {
        let offset = if level % 2 == 0 { 0.0 } else { 0.15 };
        scene.add_body(
            Body::new(Arc::clone(&shapes.unit))
                .with_position(Vec3::new(
                    offset * spacing,
                    offset * spacing,
                    1.0 + GAP + level as f32 * spacing,
                ))
                .with_inv_mass(1.0)
                .with_elasticity(0.5)
                .with_friction(0.5),
        );
    }
}

fn add_sphere_and_diamond(scene: &mut Scene, shapes: &ShapeSet) {
    scene.add_body(
        Body::new(Arc::new(Shape::sphere(1.0)))
            .with_position(Vec3::new(-10.0, 0.0, 5.0))
            .with_inv_mass(1.0)
            .with_elasticity(0.9)
            .with_friction(0.5),
    );
    scene.add_body(
        Body::new(Arc::clone(&shapes.diamond))
            .with_position(Vec3::new(-10.0, 0.0, 10.0))
            .with_inv_mass(1.0)
            .with_elasticity(1.0)
            .with_friction(0.5),
    );
}

fn add_motor(scene: &mut Scene, shapes: &ShapeSet) -> PhysicsResult<()> {
    let position = Vec3::new(5.0, 0.0, 2.0);
    let axis = Vec3::z();

    let base = scene.add_body(
        Body::new(Arc::clone(&shapes.small))
            .with_position(position)
            .with_elasticity(0.9)
            .with_friction(0.5),
    );
    let beam = scene.add_body(
        Body::new(Arc::clone(&shapes.beam))
            .with_position(position - axis)
            .with_orientation(rotation(Vec3::x(), PI))
            .with_inv_mass(0.01)
            .with_elasticity(1.0)
            .with_friction(0.5),
    );

    let frame = scene.joint_frame(base, beam, position, axis)?;
    scene.add_constraint(MotorConstraint::new(frame, 2.0))?;
    Ok(())
}

fn add_mover(scene: &mut Scene, shapes: &ShapeSet) -> PhysicsResult<()> {
    let platform = scene.add_body(
        Body::new(Arc::clone(&shapes.platform))
            .with_position(Vec3::new(10.0, 0.0, 5.0))
            .with_elasticity(0.1)
            .with_friction(0.9),
    );
    scene.add_constraint(MoverConstraint::new(platform))?;

    scene.add_body(
        Body::new(Arc::clone(&shapes.unit))
            .with_position(Vec3::new(10.0, 0.0, 6.3))
            .with_inv_mass(1.0)
            .with_elasticity(0.1)
            .with_friction(0.9),
    );
    Ok(())
}

/// Static small box with a dynamic one hanging a unit below it
fn add_hanging_pair(scene: &mut Scene, shapes: &ShapeSet, position: Vec3, base: Quat) -> (BodyHandle, BodyHandle) {
    let fixed = scene.add_body(
        Body::new(Arc::clone(&shapes.small))
            .with_position(position)
            .with_orientation(base)
            .with_elasticity(0.9)
            .with_friction(0.5),
    );
    let hanging = scene.add_body(
        Body::new(Arc::clone(&shapes.small))
            .with_position(position - Vec3::z())
            .with_orientation(rotation(Vec3::new(0.0, 1.0, 1.0), FRAC_PI_2))
            .with_inv_mass(1.0)
            .with_elasticity(1.0)
            .with_friction(0.5),
    );
    (fixed, hanging)
}

fn add_hinge(scene: &mut Scene, shapes: &ShapeSet) -> PhysicsResult<()> {
    let position = Vec3::new(-2.0, -5.0, 6.0);
    let (fixed, hanging) = add_hanging_pair(scene, shapes, position, rotation(Vec3::repeat(1.0), FRAC_PI_4));

    let frame = scene.joint_frame(fixed, hanging, position, Vec3::x())?;
    scene.add_constraint(HingeLimitedConstraint::new(frame))?;
    Ok(())
}

fn add_constant_velocity(scene: &mut Scene, shapes: &ShapeSet) -> PhysicsResult<()> {
    let position = Vec3::new(2.0, -5.0, 6.0);
    let (fixed, hanging) = add_hanging_pair(scene, shapes, position, rotation(Vec3::repeat(1.0), FRAC_PI_2));

    let frame = scene.joint_frame(fixed, hanging, position, Vec3::z())?;
    scene.add_constraint(ConstantVelocityLimitedConstraint::new(frame))?;
    Ok(())
}

/// A small sphere and a spinning diamond fired at each other fast enough to
/// pass through one another without continuous collision
fn add_projectiles(scene: &mut Scene, shapes: &ShapeSet) {
    scene.add_body(
        Body::new(Arc::new(Shape::sphere(0.5)))
            .with_position(Vec3::new(10.0, -10.0, 3.0))
            .with_linear_velocity(Vec3::new(-100.0, 0.0, 0.0))
            .with_inv_mass(1.0)
            .with_elasticity(0.5)
            .with_friction(0.5),
    );
    scene.add_body(
        Body::new(Arc::clone(&shapes.diamond))
            .with_position(Vec3::new(-10.0, -10.0, 3.0))
            .with_linear_velocity(Vec3::new(100.0, 0.0, 0.0))
            .with_angular_velocity(Vec3::new(0.0, 10.0, 0.0))
            .with_inv_mass(1.0)
            .with_elasticity(0.5)
            .with_friction(0.5),
    );
}

fn add_weld(scene: &mut Scene, shapes: &ShapeSet) -> PhysicsResult<()> {
    let position = Vec3::new(5.0, 0.0, 5.0);
    let fixed = scene.add_body(
        Body::new(Arc::clone(&shapes.small))
            .with_position(position)
            .with_elasticity(0.9)
            .with_friction(0.5),
    );
    let welded = scene.add_body(
        Body::new(Arc::clone(&shapes.small))
            .with_position(position + Vec3::x())
            .with_inv_mass(0.001)
            .with_elasticity(1.0)
            .with_friction(0.5),
    );

    let frame = scene.joint_frame(fixed, welded, position, Vec3::z())?;
    scene.add_constraint(OrientationConstraint::new(frame))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Constraint;

    #[test]
    fn test_standard_sandbox_is_static() {
        let mut scene = Scene::default();
        add_standard_sandbox(&mut scene).unwrap();

        assert_eq!(scene.bodies().len(), 5);
        assert!(scene.bodies().iter().all(Body::is_static));
        assert_eq!(scene.bodies()[1].friction, 0.0);
    }

    #[test]
    fn test_sandbox_contents() {
        let scene = sandbox(&SimulationConfig::default()).unwrap();

        // 6 ragdoll + 6 chain + 5 stack + 2 + 2 motor + 2 mover + 2 hinge + 2 cv
        // + 2 projectiles + 2 weld + 5 arena
        assert_eq!(scene.bodies().len(), 36);
        assert_eq!(scene.constraints().len(), 5 + CHAIN_LINKS + 5);

        let count = |pred: fn(&Constraint) -> bool| scene.constraints().iter().filter(|c| pred(c)).count();
        assert_eq!(count(|c| matches!(c, Constraint::HingeLimited(_))), 4);
        assert_eq!(count(|c| matches!(c, Constraint::ConstantVelocityLimited(_))), 3);
        assert_eq!(count(|c| matches!(c, Constraint::Distance(_))), CHAIN_LINKS);
    }

    #[test]
    fn test_sandbox_steps_without_blowing_up() {
        let mut scene = sandbox(&SimulationConfig::default()).unwrap();
        for _ in 0..30 {
            scene.update(1.0 / 60.0);
        }

        for body in scene.bodies() {
            assert!(body.position.iter().all(|v| v.is_finite()));
            assert!(body.linear_velocity.iter().all(|v| v.is_finite()));
            assert!((body.orientation.norm() - 1.0).abs() < 1e-3);
        }
    }
}
