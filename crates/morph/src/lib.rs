#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::float_cmp
)]

//! Body specification parser.
//!
//! A body spec is a line-oriented text description of an articulated
//! creature: rigid links, collision primitives attached to them, powered or
//! passive joints, and the simulation/reward constants of the environment
//! it is trained in. Parsing produces an immutable [`BodySpec`] or fails
//! with a descriptive [`SpecError`]; nothing is silently defaulted.
//!
//! Each line starts with a one-character tag:
//!
//! | tag | record |
//! |-----|--------|
//! | `o` | object name |
//! | `s` | simulation constants |
//! | `c` | reward constants |
//! | `l` | link (mass, inertia, transform) |
//! | `p` | collision primitive attached to the most recent link |
//! | `j` | joint between two links |
//! | `b` | base (trunk) link index |
//!
//! Transforms are a position (3 floats) followed by a quaternion (4 floats,
//! normalized on read). This crate is pure: it never touches the physics
//! engine.

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

const DEFAULT_TIME_STEP: f32 = 0.01;
const DEFAULT_FRAME_STEPS: u32 = 4;
const DEFAULT_EPISODE_STEPS: u32 = 1000;
const DEFAULT_GRAVITY: f32 = -9.81;
const DEFAULT_TARGET_DISTANCE: f32 = 30.0;
const DEFAULT_GROUND_FRICTION: f32 = 0.8;
const DEFAULT_BODY_FRICTION: f32 = 0.8;
const DEFAULT_GROUND_RESTITUTION: f32 = 0.0;
const DEFAULT_BODY_RESTITUTION: f32 = 0.0;

const DEFAULT_ADVANCE_REWARD: f32 = 1.0;
const DEFAULT_ALIVE_REWARD: f32 = 0.0;
const DEFAULT_FORWARD_REWARD: f32 = 0.0;
const DEFAULT_JOINT_LIMIT_COST: f32 = -10.0;
const DEFAULT_DRIVE_COST: f32 = 0.0;
const DEFAULT_STALL_TORQUE_COST: f32 = 0.0;

/// A malformed spec line. Fatal at startup.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("body data must not be empty")]
    Empty,
    #[error("line {number}: invalid line: '{text}'")]
    InvalidLine { number: usize, text: String },
    #[error("line {number}: unknown record type '{tag}'")]
    UnknownTag { number: usize, tag: char },
    #[error("line {number}: missing value for {field}")]
    MissingValue { number: usize, field: &'static str },
    #[error("line {number}: invalid value '{value}' for {field}")]
    InvalidValue {
        number: usize,
        field: &'static str,
        value: String,
    },
    #[error("line {number}: primitive declared before any link")]
    PrimitiveWithoutLink { number: usize },
    #[error("line {number}: multiple base links not supported")]
    DuplicateBase { number: usize },
}

/// A well-formed but inconsistent spec. Fatal at startup.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no base link declared")]
    NoBase,
    #[error("out of range base link index ({0})")]
    BaseOutOfRange(i64),
    #[error("no collision primitive for link with index {0}")]
    LinkWithoutPrimitive(usize),
    #[error("out of range base index ({index}) for joint with index {joint}")]
    JointBaseOutOfRange { joint: usize, index: i64 },
    #[error("out of range target index ({index}) for joint with index {joint}")]
    JointTargetOutOfRange { joint: usize, index: i64 },
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One collision primitive, placed relative to its link frame.
#[derive(Clone, Debug)]
pub struct Primitive {
    pub transform: Isometry3<f32>,
}

/// One rigid segment of the articulated body.
#[derive(Clone, Debug)]
pub struct Link {
    pub mass: f32,
    pub inertia: Vector3<f32>,
    pub transform: Isometry3<f32>,
    pub primitives: Vec<Primitive>,
}

/// A hinge connection between two links. `power == 0` marks a passive
/// joint that contributes no action or observation dimensions.
#[derive(Clone, Debug)]
pub struct Joint {
    pub base_link: usize,
    pub target_link: usize,
    pub lower_angle_deg: f32,
    pub upper_angle_deg: f32,
    pub power: f32,
    pub transform: Isometry3<f32>,
}

impl Joint {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.power != 0.0
    }
}

/// Immutable body model, built once from text and never mutated.
#[derive(Clone, Debug)]
pub struct BodySpec {
    pub name: String,
    pub time_step: f32,
    pub frame_steps: u32,
    pub episode_steps: u32,
    pub gravity: f32,
    pub target_distance: f32,
    pub ground_friction: f32,
    pub body_friction: f32,
    pub ground_restitution: f32,
    pub body_restitution: f32,
    pub advance_reward: f32,
    pub alive_reward: f32,
    pub forward_reward: f32,
    pub joint_limit_cost: f32,
    pub drive_cost: f32,
    pub stall_torque_cost: f32,
    pub links: Vec<Link>,
    pub joints: Vec<Joint>,
    pub base_link: usize,
}

impl BodySpec {
    /// Parses and validates a body spec from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Parse`] for malformed lines and
    /// [`SpecError::Validation`] for a well-formed spec that is internally
    /// inconsistent (missing base, dangling joint indices, bare links).
    pub fn parse(data: &str) -> Result<Self, SpecError> {
        let raw = RawSpec::parse(data)?;
        Ok(raw.validate()?)
    }

    /// Number of joints with non-zero power.
    #[must_use]
    pub fn active_joint_count(&self) -> usize {
        self.joints.iter().filter(|j| j.is_active()).count()
    }

    /// Length of the observation vector the environment produces:
    /// 10 goal-frame values, an (angle, speed) pair per active joint and
    /// one ground-contact flag per link.
    #[must_use]
    pub fn observation_len(&self) -> usize {
        10 + 2 * self.active_joint_count() + self.links.len()
    }

    /// One torque scalar per active joint.
    #[must_use]
    pub fn action_len(&self) -> usize {
        self.active_joint_count()
    }
}

impl std::str::FromStr for BodySpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct RawJoint {
    base: i64,
    target: i64,
    lower_angle_deg: f32,
    upper_angle_deg: f32,
    power: f32,
    transform: Isometry3<f32>,
}

/// Parsed but not yet validated spec; joint and base indices are kept
/// signed so range checks can report the offending value.
struct RawSpec {
    name: String,
    time_step: f32,
    frame_steps: u32,
    episode_steps: u32,
    gravity: f32,
    target_distance: f32,
    ground_friction: f32,
    body_friction: f32,
    ground_restitution: f32,
    body_restitution: f32,
    advance_reward: f32,
    alive_reward: f32,
    forward_reward: f32,
    joint_limit_cost: f32,
    drive_cost: f32,
    stall_torque_cost: f32,
    links: Vec<Link>,
    joints: Vec<RawJoint>,
    base: Option<i64>,
}

impl RawSpec {
    fn parse(data: &str) -> Result<Self, ParseError> {
        if data.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let mut spec = Self {
            name: String::new(),
            time_step: DEFAULT_TIME_STEP,
            frame_steps: DEFAULT_FRAME_STEPS,
            episode_steps: DEFAULT_EPISODE_STEPS,
            gravity: DEFAULT_GRAVITY,
            target_distance: DEFAULT_TARGET_DISTANCE,
            ground_friction: DEFAULT_GROUND_FRICTION,
            body_friction: DEFAULT_BODY_FRICTION,
            ground_restitution: DEFAULT_GROUND_RESTITUTION,
            body_restitution: DEFAULT_BODY_RESTITUTION,
            advance_reward: DEFAULT_ADVANCE_REWARD,
            alive_reward: DEFAULT_ALIVE_REWARD,
            forward_reward: DEFAULT_FORWARD_REWARD,
            joint_limit_cost: DEFAULT_JOINT_LIMIT_COST,
            drive_cost: DEFAULT_DRIVE_COST,
            stall_torque_cost: DEFAULT_STALL_TORQUE_COST,
            links: Vec::new(),
            joints: Vec::new(),
            base: None,
        };

        for (index, line) in data.lines().enumerate() {
            let number = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            if line.len() < 2 {
                return Err(ParseError::InvalidLine {
                    number,
                    text: line.to_owned(),
                });
            }
            let tag = line.chars().next().unwrap_or(' ');
            if !tag.is_ascii() {
                return Err(ParseError::UnknownTag { number, tag });
            }
            let mut fields = Fields::new(number, &line[1..]);
            match tag {
                'o' => spec.name = fields.word("name")?,
                's' => {
                    spec.time_step = fields.f32("timeStep")?;
                    spec.frame_steps = fields.u32("frameSteps")?;
                    spec.episode_steps = fields.u32("episodeStepCount")?;
                    spec.gravity = fields.f32("gravity")?;
                    spec.target_distance = fields.f32("targetDistance")?;
                    spec.ground_friction = fields.f32("groundFriction")?;
                    spec.body_friction = fields.f32("bodyFriction")?;
                    spec.ground_restitution = fields.f32("groundRestitution")?;
                    spec.body_restitution = fields.f32("bodyRestitution")?;
                }
                'c' => {
                    spec.advance_reward = fields.f32("advanceReward")?;
                    spec.alive_reward = fields.f32("aliveReward")?;
                    spec.forward_reward = fields.f32("forwardReward")?;
                    spec.joint_limit_cost = fields.f32("jointLimitCost")?;
                    spec.drive_cost = fields.f32("driveCost")?;
                    spec.stall_torque_cost = fields.f32("stallTorqueCost")?;
                }
                'l' => {
                    spec.links.push(Link {
                        mass: fields.f32("mass")?,
                        inertia: fields.vector("inertia")?,
                        transform: fields.transform("transform")?,
                        primitives: Vec::new(),
                    });
                }
                'p' => {
                    let transform = fields.transform("transform")?;
                    let link = spec
                        .links
                        .last_mut()
                        .ok_or(ParseError::PrimitiveWithoutLink { number })?;
                    link.primitives.push(Primitive { transform });
                }
                'j' => {
                    spec.joints.push(RawJoint {
                        base: fields.i64("baseLinkIndex")?,
                        target: fields.i64("targetLinkIndex")?,
                        lower_angle_deg: fields.f32("lowerAngle")?,
                        upper_angle_deg: fields.f32("upperAngle")?,
                        power: fields.f32("power")?,
                        transform: fields.transform("transform")?,
                    });
                }
                'b' => {
                    if spec.base.is_some() {
                        return Err(ParseError::DuplicateBase { number });
                    }
                    spec.base = Some(fields.i64("baseLinkIndex")?);
                }
                _ => return Err(ParseError::UnknownTag { number, tag }),
            }
        }

        Ok(spec)
    }

    #[allow(clippy::cast_sign_loss)]
    fn validate(self) -> Result<BodySpec, ValidationError> {
        let link_count = self.links.len() as i64;

        let base = self.base.ok_or(ValidationError::NoBase)?;
        if base < 0 || base >= link_count {
            return Err(ValidationError::BaseOutOfRange(base));
        }

        for (index, link) in self.links.iter().enumerate() {
            if link.primitives.is_empty() {
                return Err(ValidationError::LinkWithoutPrimitive(index));
            }
        }

        let mut joints = Vec::with_capacity(self.joints.len());
        for (index, joint) in self.joints.into_iter().enumerate() {
            if joint.base < 0 || joint.base >= link_count {
                return Err(ValidationError::JointBaseOutOfRange {
                    joint: index,
                    index: joint.base,
                });
            }
            if joint.target < 0 || joint.target >= link_count {
                return Err(ValidationError::JointTargetOutOfRange {
                    joint: index,
                    index: joint.target,
                });
            }
            joints.push(Joint {
                base_link: joint.base as usize,
                target_link: joint.target as usize,
                lower_angle_deg: joint.lower_angle_deg,
                upper_angle_deg: joint.upper_angle_deg,
                power: joint.power,
                transform: joint.transform,
            });
        }

        Ok(BodySpec {
            name: self.name,
            time_step: self.time_step,
            frame_steps: self.frame_steps,
            episode_steps: self.episode_steps,
            gravity: self.gravity,
            target_distance: self.target_distance,
            ground_friction: self.ground_friction,
            body_friction: self.body_friction,
            ground_restitution: self.ground_restitution,
            body_restitution: self.body_restitution,
            advance_reward: self.advance_reward,
            alive_reward: self.alive_reward,
            forward_reward: self.forward_reward,
            joint_limit_cost: self.joint_limit_cost,
            drive_cost: self.drive_cost,
            stall_torque_cost: self.stall_torque_cost,
            links: self.links,
            joints,
            base_link: base as usize,
        })
    }
}

/// Whitespace-separated field reader for one spec line.
struct Fields<'a> {
    number: usize,
    tokens: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(number: usize, rest: &'a str) -> Self {
        Self {
            number,
            tokens: rest.split_whitespace(),
        }
    }

    fn token(&mut self, field: &'static str) -> Result<&'a str, ParseError> {
        self.tokens.next().ok_or(ParseError::MissingValue {
            number: self.number,
            field,
        })
    }

    fn word(&mut self, field: &'static str) -> Result<String, ParseError> {
        Ok(self.token(field)?.to_owned())
    }

    fn f32(&mut self, field: &'static str) -> Result<f32, ParseError> {
        let token = self.token(field)?;
        token.parse().map_err(|_| ParseError::InvalidValue {
            number: self.number,
            field,
            value: token.to_owned(),
        })
    }

    fn i64(&mut self, field: &'static str) -> Result<i64, ParseError> {
        let token = self.token(field)?;
        token.parse().map_err(|_| ParseError::InvalidValue {
            number: self.number,
            field,
            value: token.to_owned(),
        })
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, ParseError> {
        let token = self.token(field)?;
        token.parse().map_err(|_| ParseError::InvalidValue {
            number: self.number,
            field,
            value: token.to_owned(),
        })
    }

    fn vector(&mut self, field: &'static str) -> Result<Vector3<f32>, ParseError> {
        Ok(Vector3::new(
            self.f32(field)?,
            self.f32(field)?,
            self.f32(field)?,
        ))
    }

    fn transform(&mut self, field: &'static str) -> Result<Isometry3<f32>, ParseError> {
        let position = self.vector(field)?;
        // Spec order is x y z w; nalgebra's constructor wants w first.
        let x = self.f32(field)?;
        let y = self.f32(field)?;
        let z = self.f32(field)?;
        let w = self.f32(field)?;
        let orientation = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
        Ok(Isometry3::from_parts(Translation3::from(position), orientation))
    }
}
