//! Thin ownership layer over the rapier rigid-body engine.
//!
//! The adapter exclusively owns every set the engine works on (bodies,
//! colliders, joints, broad/narrow phase) together with a named collision
//! shape registry. Callers only ever hold rapier's generational handles;
//! rebuild-on-reset therefore cannot leak or dangle.

use std::collections::HashMap;

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use rapier3d::prelude::{
    BroadPhaseMultiSap, CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, GenericJointBuilder,
    Group, ImpulseJointHandle, ImpulseJointSet, IntegrationParameters, InteractionGroups,
    IslandManager, JointAxesMask, JointAxis, MassProperties, MultibodyJointSet, NarrowPhase,
    PhysicsPipeline, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, SharedShape,
};
use thiserror::Error;

/// Ground and other immovable geometry.
pub const STATIC_GROUP: Group = Group::GROUP_1;
/// Creature links.
pub const DYNAMIC_GROUP: Group = Group::GROUP_2;

/// Ground collides with everything except other static geometry.
#[must_use]
pub fn static_groups() -> InteractionGroups {
    InteractionGroups::new(STATIC_GROUP, Group::ALL ^ STATIC_GROUP)
}

/// Dynamic bodies collide with everything.
#[must_use]
pub fn dynamic_groups() -> InteractionGroups {
    InteractionGroups::new(DYNAMIC_GROUP, Group::ALL)
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("shape '{0}' already registered")]
    DuplicateShape(String),
    #[error("shape '{0}' not registered")]
    UnknownShape(String),
    #[error("degenerate collision geometry for shape '{0}'")]
    DegenerateShape(String),
}

/// Owns the physics engine's world state and exposes handle-based access.
pub struct PhysicsWorld {
    gravity: Vector3<f32>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    shapes: HashMap<String, SharedShape>,
}

impl PhysicsWorld {
    #[must_use]
    pub fn new(gravity_y: f32) -> Self {
        Self {
            gravity: Vector3::new(0.0, gravity_y, 0.0),
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            shapes: HashMap::new(),
        }
    }

    /// Registers a named collision shape for reuse across episodes.
    ///
    /// # Errors
    ///
    /// [`WorldError::DuplicateShape`] if the name is taken.
    pub fn register_shape(&mut self, name: &str, shape: SharedShape) -> Result<(), WorldError> {
        if self.shapes.contains_key(name) {
            return Err(WorldError::DuplicateShape(name.to_owned()));
        }
        self.shapes.insert(name.to_owned(), shape);
        Ok(())
    }

    /// # Errors
    ///
    /// [`WorldError::UnknownShape`] if no shape was registered under `name`.
    pub fn shape(&self, name: &str) -> Result<SharedShape, WorldError> {
        self.shapes
            .get(name)
            .cloned()
            .ok_or_else(|| WorldError::UnknownShape(name.to_owned()))
    }

    #[must_use]
    pub fn try_shape(&self, name: &str) -> Option<SharedShape> {
        self.shapes.get(name).cloned()
    }

    /// Creates an immovable body from a registered shape.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownShape`] for an unregistered shape name.
    pub fn create_static(
        &mut self,
        shape_name: &str,
        transform: Isometry3<f32>,
        groups: InteractionGroups,
        friction: f32,
        restitution: f32,
    ) -> Result<(RigidBodyHandle, ColliderHandle), WorldError> {
        let shape = self.shape(shape_name)?;
        let body = RigidBodyBuilder::fixed().position(transform).build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::new(shape)
            .collision_groups(groups)
            .friction(friction)
            .restitution(restitution)
            .build();
        let collider_handle = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        Ok((handle, collider_handle))
    }

    /// Registers the `ground` half-space at y = 0 and instantiates it.
    ///
    /// # Errors
    ///
    /// [`WorldError::DuplicateShape`] if a ground already exists.
    pub fn create_ground(
        &mut self,
        friction: f32,
        restitution: f32,
    ) -> Result<(RigidBodyHandle, ColliderHandle), WorldError> {
        self.register_shape("ground", SharedShape::halfspace(Vector3::y_axis()))?;
        self.create_static(
            "ground",
            Isometry3::identity(),
            static_groups(),
            friction,
            restitution,
        )
    }

    /// Creates a dynamic body with explicit mass and principal inertia.
    ///
    /// Sleeping is disabled: the training loop needs every body simulated
    /// on every step, actuated or not.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn create_dynamic(
        &mut self,
        shape: &SharedShape,
        transform: Isometry3<f32>,
        groups: InteractionGroups,
        mass: f32,
        inertia: Vector3<f32>,
        friction: f32,
        restitution: f32,
        user_data: u128,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .position(transform)
            .can_sleep(false)
            .additional_mass_properties(MassProperties::new(
                nalgebra::Point3::origin(),
                mass,
                inertia,
            ))
            .user_data(user_data)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::new(shape.clone())
            .collision_groups(groups)
            .friction(friction)
            .restitution(restitution)
            .density(0.0)
            .user_data(user_data)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Constrains two bodies with a pin joint: all linear axes locked, the
    /// joint-frame X rotation limited to `[lower, upper]` radians, the
    /// remaining rotations locked. Contacts between the linked bodies are
    /// disabled.
    pub fn create_hinge(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        frame1: Isometry3<f32>,
        frame2: Isometry3<f32>,
        lower: f32,
        upper: f32,
    ) -> ImpulseJointHandle {
        let joint = GenericJointBuilder::new(JointAxesMask::LOCKED_REVOLUTE_AXES)
            .local_frame1(frame1)
            .local_frame2(frame2)
            .limits(JointAxis::AngX, [lower, upper])
            .contacts_enabled(false)
            .build();
        self.joints.insert(body1, body2, joint, true)
    }

    /// Removes all constraints, then all (or all non-static) bodies.
    /// Colliders are released together with their parents; registered
    /// shapes survive for the next episode.
    pub fn reset_world(&mut self, keep_static: bool) {
        let joint_handles: Vec<_> = self.joints.iter().map(|(handle, _)| handle).collect();
        for handle in joint_handles {
            self.joints.remove(handle, true);
        }

        let body_handles: Vec<_> = self
            .bodies
            .iter()
            .filter(|(_, body)| !(keep_static && body.is_fixed()))
            .map(|(handle, _)| handle)
            .collect();
        for handle in body_handles {
            self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    /// Advances the solver by one substep of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );
    }

    /// Adds to the body's torque accumulator for the next substep.
    pub fn apply_torque(&mut self, handle: RigidBodyHandle, torque: Vector3<f32>) {
        self.bodies[handle].add_torque(torque, true);
    }

    /// Clears every force and torque accumulator. Called once per substep
    /// before torques are reapplied; rapier accumulators persist otherwise.
    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(true);
            body.reset_torques(true);
        }
    }

    #[must_use]
    pub fn body_position(&self, handle: RigidBodyHandle) -> Isometry3<f32> {
        *self.bodies[handle].position()
    }

    #[must_use]
    pub fn body_linvel(&self, handle: RigidBodyHandle) -> Vector3<f32> {
        *self.bodies[handle].linvel()
    }

    #[must_use]
    pub fn body_angvel(&self, handle: RigidBodyHandle) -> Vector3<f32> {
        *self.bodies[handle].angvel()
    }

    /// Signed rotation of the joint's second frame relative to its first,
    /// about the joint-frame X axis.
    #[must_use]
    pub fn hinge_angle(&self, handle: ImpulseJointHandle) -> f32 {
        let (frame1, frame2) = self.hinge_world_frames(handle);
        (frame1.inverse() * frame2).scaled_axis().x
    }

    /// World-space hinge axes as attached to each body.
    #[must_use]
    pub fn hinge_axes(&self, handle: ImpulseJointHandle) -> (Vector3<f32>, Vector3<f32>) {
        let (frame1, frame2) = self.hinge_world_frames(handle);
        (frame1 * Vector3::x(), frame2 * Vector3::x())
    }

    fn hinge_world_frames(
        &self,
        handle: ImpulseJointHandle,
    ) -> (UnitQuaternion<f32>, UnitQuaternion<f32>) {
        let joint = self.joints.get(handle).unwrap();
        let rot1 = self.bodies[joint.body1].position().rotation;
        let rot2 = self.bodies[joint.body2].position().rotation;
        (
            rot1 * joint.data.local_frame1.rotation,
            rot2 * joint.data.local_frame2.rotation,
        )
    }

    /// User tags of every collider in an active contact with `collider`.
    #[must_use]
    pub fn contacts_with(&self, collider: ColliderHandle) -> impl Iterator<Item = u128> + '_ {
        self.narrow_phase
            .contact_pairs_with(collider)
            .filter(|pair| pair.has_any_active_contact)
            .map(move |pair| {
                let other = if pair.collider1 == collider {
                    pair.collider2
                } else {
                    pair.collider1
                };
                self.colliders[other].user_data
            })
    }

    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_shape_names_are_rejected() {
        let mut world = PhysicsWorld::new(-9.81);
        world
            .register_shape("ball", SharedShape::ball(0.5))
            .unwrap();
        assert!(matches!(
            world.register_shape("ball", SharedShape::ball(1.0)),
            Err(WorldError::DuplicateShape(_))
        ));
    }

    #[test]
    fn reset_world_keeps_static_bodies_when_asked() {
        let mut world = PhysicsWorld::new(-9.81);
        world.create_ground(0.8, 0.0).unwrap();
        let shape = SharedShape::ball(0.5);
        let a = world.create_dynamic(
            &shape,
            Isometry3::translation(0.0, 1.0, 0.0),
            dynamic_groups(),
            1.0,
            Vector3::new(0.1, 0.1, 0.1),
            0.8,
            0.0,
            1,
        );
        let b = world.create_dynamic(
            &shape,
            Isometry3::translation(0.0, 2.0, 0.0),
            dynamic_groups(),
            1.0,
            Vector3::new(0.1, 0.1, 0.1),
            0.8,
            0.0,
            2,
        );
        world.create_hinge(
            a,
            b,
            Isometry3::identity(),
            Isometry3::translation(0.0, -1.0, 0.0),
            -1.0,
            1.0,
        );
        assert_eq!(world.body_count(), 3);
        assert_eq!(world.joint_count(), 1);

        world.reset_world(true);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.joint_count(), 0);

        world.reset_world(false);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn hinge_angle_is_zero_at_rest_pose() {
        let mut world = PhysicsWorld::new(0.0);
        let shape = SharedShape::ball(0.5);
        let a = world.create_dynamic(
            &shape,
            Isometry3::identity(),
            dynamic_groups(),
            1.0,
            Vector3::new(0.1, 0.1, 0.1),
            0.8,
            0.0,
            0,
        );
        let b = world.create_dynamic(
            &shape,
            Isometry3::translation(0.0, -1.0, 0.0),
            dynamic_groups(),
            1.0,
            Vector3::new(0.1, 0.1, 0.1),
            0.8,
            0.0,
            0,
        );
        let joint = world.create_hinge(
            a,
            b,
            Isometry3::translation(0.0, -0.5, 0.0),
            Isometry3::translation(0.0, 0.5, 0.0),
            -1.0,
            1.0,
        );
        assert!(world.hinge_angle(joint).abs() < 1e-6);
        let (axis1, axis2) = world.hinge_axes(joint);
        assert!((axis1 - Vector3::x()).norm() < 1e-6);
        assert!((axis2 - Vector3::x()).norm() < 1e-6);
    }
}
