//! The articulated creature environment: builds the rigid-body assembly
//! described by a [`BodySpec`], actuates its powered joints with torques,
//! assembles the observation vector and computes the composite shaped
//! reward.

use morph::BodySpec;
use nalgebra::Vector3;
use rapier3d::prelude::{ColliderHandle, ImpulseJointHandle, RigidBodyHandle, SharedShape};

use crate::episode::Episode;
use crate::goal::{GoalOutcome, GoalTracker};
use crate::world::{dynamic_groups, PhysicsWorld, WorldError};
use crate::{Env, StepError};

// Triangular prism used as the collision primitive for every link, shrunk
// by a margin so adjacent primitives in one compound do not interpenetrate.
// The center of gravity sits a third of the height above the base.
const PRISM_HEIGHT: f32 = 1.0;
const PRISM_BASE: f32 = 2.0 * PRISM_HEIGHT;
const PRISM_MARGIN: f32 = 0.04;

const PRISM_SHAPE: &str = "prism";

// Hinge angles within this fraction of a declared limit count as "at the
// limit" for the joint-limit cost.
const JOINT_LIMIT_SLACK: f32 = 0.99;

fn prism_shape() -> Option<SharedShape> {
    let half_height = PRISM_HEIGHT / 2.0;
    let half_base = PRISM_BASE / 2.0;
    let half_side = (PRISM_BASE).sqrt() / 2.0;
    let margin_diag = PRISM_MARGIN * std::f32::consts::FRAC_PI_4.cos();
    let cg_dy = half_height - PRISM_HEIGHT / 3.0;

    let bottom_x = half_base - 2.0 * margin_diag - PRISM_MARGIN;
    let bottom_y = -half_height + cg_dy + PRISM_MARGIN;
    let top_y = half_height + cg_dy - 2.0 * margin_diag;
    let side_z = half_side - PRISM_MARGIN;

    let points = [
        nalgebra::Point3::new(-bottom_x, bottom_y, -side_z),
        nalgebra::Point3::new(-bottom_x, bottom_y, side_z),
        nalgebra::Point3::new(0.0, top_y, -side_z),
        nalgebra::Point3::new(0.0, top_y, side_z),
        nalgebra::Point3::new(bottom_x, bottom_y, -side_z),
        nalgebra::Point3::new(bottom_x, bottom_y, side_z),
    ];
    SharedShape::convex_hull(&points)
}

/// Physics-backed environment for one articulated creature.
///
/// Bodies and constraints are destroyed and rebuilt on every reset;
/// collision shapes are built lazily per link and cached for the lifetime
/// of the environment.
pub struct CreatureEnv {
    spec: BodySpec,
    world: PhysicsWorld,
    episode: Episode,
    goal: GoalTracker,
    ground: ColliderHandle,
    bodies: Vec<RigidBodyHandle>,
    joints: Vec<ImpulseJointHandle>,
    trunk: Option<RigidBodyHandle>,
}

impl CreatureEnv {
    /// Builds the world around a validated spec: gravity, ground plane and
    /// the shared prism shape. No creature exists until the first reset.
    ///
    /// # Errors
    ///
    /// [`WorldError::DegenerateShape`] if the prism hull cannot be built.
    pub fn new(spec: BodySpec) -> Result<Self, WorldError> {
        let mut world = PhysicsWorld::new(spec.gravity);
        let (_, ground) = world.create_ground(spec.ground_friction, spec.ground_restitution)?;
        let prism =
            prism_shape().ok_or_else(|| WorldError::DegenerateShape(PRISM_SHAPE.to_owned()))?;
        world.register_shape(PRISM_SHAPE, prism)?;

        let episode = Episode::new(spec.observation_len(), spec.action_len(), spec.episode_steps);
        let goal = GoalTracker::new(spec.target_distance);

        Ok(Self {
            spec,
            world,
            episode,
            goal,
            ground,
            bodies: Vec::new(),
            joints: Vec::new(),
            trunk: None,
        })
    }

    #[must_use]
    pub fn spec(&self) -> &BodySpec {
        &self.spec
    }

    #[must_use]
    pub fn move_number(&self) -> u32 {
        self.episode.move_number()
    }

    /// World position of the trunk link, once an episode is running.
    #[must_use]
    pub fn trunk_position(&self) -> Option<Vector3<f32>> {
        self.trunk
            .map(|handle| self.world.body_position(handle).translation.vector)
    }

    #[must_use]
    pub fn goal_target(&self) -> Vector3<f32> {
        self.goal.target()
    }

    /// Tears down the previous runtime body and instantiates a fresh one
    /// from the spec. The ground and the cached link shapes survive.
    pub fn reset(&mut self) {
        self.episode.reset();
        self.world.reset_world(true);
        self.bodies.clear();
        self.joints.clear();
        self.trunk = None;

        // The new target is placed before the trunk exists, i.e. relative
        // to the origin, which is where the creature respawns.
        self.goal.reset_target(None, self.episode.rng());

        for index in 0..self.spec.links.len() {
            let shape = self.link_shape(index);
            let link = &self.spec.links[index];
            let handle = self.world.create_dynamic(
                &shape,
                link.transform,
                dynamic_groups(),
                link.mass,
                link.inertia,
                self.spec.body_friction,
                self.spec.body_restitution,
                link_tag(index),
            );
            if index == self.spec.base_link {
                self.trunk = Some(handle);
            }
            self.bodies.push(handle);
        }

        for joint in &self.spec.joints {
            let base = &self.spec.links[joint.base_link];
            let target = &self.spec.links[joint.target_link];
            let frame1 = base.transform.inverse() * joint.transform;
            let frame2 = target.transform.inverse() * joint.transform;
            let handle = self.world.create_hinge(
                self.bodies[joint.base_link],
                self.bodies[joint.target_link],
                frame1,
                frame2,
                joint.lower_angle_deg.to_radians(),
                joint.upper_angle_deg.to_radians(),
            );
            self.joints.push(handle);
        }
    }

    fn link_shape(&mut self, index: usize) -> SharedShape {
        let name = format!("link{index}");
        if let Some(shape) = self.world.try_shape(&name) {
            return shape;
        }
        // First episode touching this link: compound all of its primitives
        // around the shared prism and cache the result.
        let prism = self
            .world
            .try_shape(PRISM_SHAPE)
            .unwrap_or_else(|| SharedShape::ball(PRISM_HEIGHT / 2.0));
        let parts = self.spec.links[index]
            .primitives
            .iter()
            .map(|primitive| (primitive.transform, prism.clone()))
            .collect();
        let shape = SharedShape::compound(parts);
        // Registration only fails on a duplicate name, which the lookup
        // above just excluded.
        let _ = self.world.register_shape(&name, shape.clone());
        shape
    }

    /// Consumes one scalar per active joint, applying equal-and-opposite
    /// torques about the hinge axis to the two connected bodies.
    fn apply_forces(&mut self, action: &[f32]) {
        let mut actions = action.iter();
        for (index, joint) in self.spec.joints.iter().enumerate() {
            if !joint.is_active() {
                continue;
            }
            let Some(value) = actions.next() else { break };
            let torque = value * joint.power;
            let (axis1, axis2) = self.world.hinge_axes(self.joints[index]);
            self.world
                .apply_torque(self.bodies[joint.target_link], axis2 * torque);
            self.world
                .apply_torque(self.bodies[joint.base_link], axis1 * -torque);
        }
    }

    /// Recomputes the observation from the current physical state:
    /// 10 goal-frame values, (angle, speed) per active joint, then one
    /// ground-contact flag per link. Trunk-ground contact ends the episode
    /// only while the alive reward is in effect.
    pub fn update(&mut self) {
        let Some(trunk) = self.trunk else { return };
        let info = self.goal.info(
            &self.world.body_position(trunk),
            &self.world.body_linvel(trunk),
            &self.world.body_angvel(trunk),
        );

        let mut values = Vec::with_capacity(10 + 2 * self.spec.active_joint_count());
        values.extend_from_slice(&[
            info.angle_to_goal.cos(),
            info.angle_to_goal.sin(),
            info.pitch,
            info.roll,
            info.linear_velocity.x,
            info.linear_velocity.y,
            info.linear_velocity.z,
            info.angular_velocity.x,
            info.angular_velocity.y,
            info.angular_velocity.z,
        ]);

        for (index, joint) in self.spec.joints.iter().enumerate() {
            if !joint.is_active() {
                continue;
            }
            let handle = self.joints[index];
            let (_, axis) = self.world.hinge_axes(handle);
            let speed = axis.dot(&self.world.body_angvel(self.bodies[joint.target_link]));
            values.push(self.world.hinge_angle(handle));
            values.push(speed);
        }

        let contact_base = values.len();
        let observation = self.episode.observation_mut();
        observation[..contact_base].copy_from_slice(&values);
        for flag in &mut observation[contact_base..] {
            *flag = 0.0;
        }

        let mut trunk_grounded = false;
        let contacts: Vec<u128> = self.world.contacts_with(self.ground).collect();
        for tag in contacts {
            let Some(link) = link_from_tag(tag) else {
                continue;
            };
            if link >= self.spec.links.len() {
                continue;
            }
            if link == self.spec.base_link {
                trunk_grounded = true;
            }
            self.episode.observation_mut()[contact_base + link] = 1.0;
        }
        if trunk_grounded && self.spec.alive_reward != 0.0 {
            self.episode.set_done(true);
        }
    }

    /// Composite shaped reward for the step just simulated. Reads the
    /// pre-step observation for the forward bonus; every term is disabled
    /// entirely by a zero coefficient.
    fn react(&mut self, action: &[f32], dt: f32) -> f32 {
        let trunk_pos = self
            .trunk
            .map(|handle| self.world.body_position(handle).translation.vector)
            .unwrap_or_else(Vector3::zeros);
        let (goal_reward, outcome) = self.goal.advance(&trunk_pos, dt, self.episode.rng());
        if outcome == GoalOutcome::Lost {
            self.episode.set_done(true);
        }

        let mut reward = self.spec.advance_reward * goal_reward + self.spec.alive_reward;

        if self.spec.forward_reward != 0.0 && self.episode.observation()[0] > 0.0 {
            reward += self.spec.forward_reward;
        }

        let mut electricity = 0.0;
        let mut action_index = 0;
        for (index, joint) in self.spec.joints.iter().enumerate() {
            if !joint.is_active() {
                continue;
            }
            let handle = self.joints[index];
            let angle = self.world.hinge_angle(handle);
            let (_, axis) = self.world.hinge_axes(handle);
            let speed = axis.dot(&self.world.body_angvel(self.bodies[joint.target_link]));

            let lower = joint.lower_angle_deg.to_radians();
            let upper = joint.upper_angle_deg.to_radians();
            if joint.lower_angle_deg < joint.upper_angle_deg
                && ((angle < 0.0 && angle < lower * JOINT_LIMIT_SLACK)
                    || (angle > 0.0 && angle > upper * JOINT_LIMIT_SLACK))
            {
                reward += self.spec.joint_limit_cost;
            }

            let torque = action[action_index];
            electricity += self.spec.drive_cost * (torque * speed).abs()
                + self.spec.stall_torque_cost * torque * torque;
            action_index += 1;
        }
        if action_index > 0 {
            electricity /= action_index as f32;
        }
        reward + electricity
    }
}

impl Env for CreatureEnv {
    fn restart(&mut self) {
        self.reset();
        self.update();
    }

    fn step(&mut self, action: &[f32]) -> Result<f32, StepError> {
        self.episode.begin_step(action)?;

        let dt = self.spec.time_step;
        for _ in 0..self.spec.frame_steps {
            self.world.clear_forces();
            self.apply_forces(action);
            self.world.step(dt);
        }

        let reward = self.react(action, self.spec.frame_steps as f32 * dt);
        self.episode.finish_step();
        self.update();
        Ok(reward)
    }

    fn observation(&self) -> &[f32] {
        self.episode.observation()
    }

    fn done(&self) -> bool {
        self.episode.done()
    }

    fn timeout(&self) -> bool {
        self.episode.timeout()
    }

    fn action_len(&self) -> usize {
        self.episode.action_len()
    }

    fn random_action(&mut self) -> Vec<f32> {
        self.episode.random_action()
    }
}

fn link_tag(index: usize) -> u128 {
    index as u128 + 1
}

fn link_from_tag(tag: u128) -> Option<usize> {
    tag.checked_sub(1).map(|link| link as usize)
}
