//! Goal-directed reward shaping: a moving target point in the ground
//! plane, ego-centric trunk kinematics and the distance-progress reward.

use nalgebra::{Isometry3, UnitQuaternion, Vector3};

/// Trunk kinematics expressed relative to the goal, as consumed by the
/// policy network.
#[derive(Clone, Copy, Debug)]
pub struct GoalInfo {
    /// Bearing to the goal minus the trunk yaw.
    pub angle_to_goal: f32,
    pub pitch: f32,
    pub roll: f32,
    /// Linear velocity rotated into the yaw-aligned frame.
    pub linear_velocity: Vector3<f32>,
    /// Angular velocity rotated into the yaw-aligned frame.
    pub angular_velocity: Vector3<f32>,
}

/// What happened to the goal during one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalOutcome {
    /// Plain progress; the target stays where it was.
    Advanced,
    /// The creature closed within the reach threshold; the target has
    /// already been respawned.
    Reached,
    /// The creature wandered beyond the alive distance and is lost; the
    /// episode should end.
    Lost,
}

/// Moving target in the ground plane. Reach and alive thresholds scale
/// with the configured start distance, so episode difficulty follows the
/// target distance.
pub struct GoalTracker {
    target: Vector3<f32>,
    start_distance: f32,
    reached_distance: f32,
    alive_distance: f32,
    prev_distance: f32,
}

impl GoalTracker {
    #[must_use]
    pub fn new(distance: f32) -> Self {
        let mut tracker = Self {
            target: Vector3::zeros(),
            start_distance: 0.0,
            reached_distance: 0.0,
            alive_distance: 0.0,
            prev_distance: 0.0,
        };
        tracker.set_distance(distance);
        tracker
    }

    /// Reach threshold is 10% of the start distance, alive threshold 200%.
    pub fn set_distance(&mut self, distance: f32) {
        self.start_distance = distance;
        self.reached_distance = 0.1 * distance;
        self.alive_distance = 2.0 * distance;
        self.prev_distance = distance;
    }

    #[must_use]
    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    /// Places the target at the start distance from the trunk (or the
    /// origin when no trunk exists yet), at a uniform random bearing.
    pub fn reset_target(&mut self, trunk: Option<Vector3<f32>>, rng: &mut fastrand::Rng) {
        let angle = rng.f32() * std::f32::consts::TAU;
        let from = trunk.unwrap_or_else(Vector3::zeros);
        self.target = Vector3::new(
            from.x + self.start_distance * angle.cos(),
            0.0,
            from.z + self.start_distance * angle.sin(),
        );
        self.prev_distance = self.start_distance;
    }

    /// Derives yaw/pitch/roll from the trunk basis and rotates the
    /// velocities into the yaw-aligned frame, so the network always sees
    /// the world from the creature's heading.
    #[must_use]
    pub fn info(
        &self,
        trunk: &Isometry3<f32>,
        linear_velocity: &Vector3<f32>,
        angular_velocity: &Vector3<f32>,
    ) -> GoalInfo {
        let position = trunk.translation.vector;
        let m = trunk.rotation.to_rotation_matrix();
        let m = m.matrix();

        let yaw = m[(2, 0)].atan2(m[(0, 0)]);
        let pitch = (-m[(1, 0)]).atan2((m[(1, 1)].powi(2) + m[(1, 2)].powi(2)).sqrt());
        let roll = m[(1, 2)].atan2(m[(1, 1)]);

        let goal_angle = (self.target.z - position.z).atan2(self.target.x - position.x);
        let angle_to_goal = goal_angle - yaw;

        let inv_yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
        GoalInfo {
            angle_to_goal,
            pitch,
            roll,
            linear_velocity: inv_yaw * linear_velocity,
            angular_velocity: inv_yaw * angular_velocity,
        }
    }

    fn ground_distance(&self, trunk: &Vector3<f32>) -> f32 {
        // Target and trunk are compared in the ground plane.
        let dx = trunk.x - self.target.x;
        let dz = trunk.z - self.target.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Progress reward for one step: the instantaneous closing speed
    /// toward the goal. Exactly one outcome applies; a reached target is
    /// respawned here, a lost creature is reported but left to the caller
    /// to terminate.
    pub fn advance(
        &mut self,
        trunk: &Vector3<f32>,
        dt: f32,
        rng: &mut fastrand::Rng,
    ) -> (f32, GoalOutcome) {
        let distance = self.ground_distance(trunk);
        let reward = (self.prev_distance - distance) / dt;
        self.prev_distance = distance;

        let outcome = if distance < self.reached_distance {
            self.reset_target(Some(*trunk), rng);
            GoalOutcome::Reached
        } else if distance > self.alive_distance {
            GoalOutcome::Lost
        } else {
            GoalOutcome::Advanced
        };
        (reward, outcome)
    }
}
