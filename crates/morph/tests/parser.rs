use morph::{BodySpec, ParseError, SpecError, ValidationError};

const HOPPER: &str = "\
o hopper
s 0.01 4 500 -9.81 20 0.8 0.7 0 0.1
c 1 0.5 0.25 -10 -0.001 -0.0001
l 1.5 0.1 0.2 0.1 0 1 0 0 0 0 1
p 0 0 0 0 0 0 1
p 0.5 0 0 0 0 0.3826834 0.9238795
l 0.5 0.05 0.05 0.05 0.6 1 0 0 0 0 1
p 0 0 0 0 0 0 1
j 0 1 -45 45 1000 0.3 1 0 0 0 0 1
j 0 1 0 0 0 0.3 0.8 0 0 0 0 1
b 0
";

#[test]
fn parse_full_spec() {
    let spec = BodySpec::parse(HOPPER).unwrap();
    assert_eq!(spec.name, "hopper");
    assert_eq!(spec.links.len(), 2);
    assert_eq!(spec.joints.len(), 2);
    assert_eq!(spec.base_link, 0);
    assert_eq!(spec.episode_steps, 500);
    assert_eq!(spec.frame_steps, 4);
    assert!((spec.target_distance - 20.0).abs() < 1e-6);
    assert!((spec.alive_reward - 0.5).abs() < 1e-6);
    assert!((spec.stall_torque_cost - -0.0001).abs() < 1e-9);
    assert_eq!(spec.links[0].primitives.len(), 2);
    assert_eq!(spec.links[1].primitives.len(), 1);
}

#[test]
fn active_joints_drive_lengths() {
    let spec = BodySpec::parse(HOPPER).unwrap();
    // One powered and one passive joint.
    assert_eq!(spec.active_joint_count(), 1);
    assert_eq!(spec.action_len(), 1);
    assert_eq!(spec.observation_len(), 10 + 2 + 2);
}

#[test]
fn quaternions_are_normalized_on_read() {
    let text = "\
l 1 0.1 0.1 0.1 0 1 0 0 0 0 2
p 0 0 0 0 0 0 1
b 0
";
    let spec = BodySpec::parse(text).unwrap();
    let q = spec.links[0].transform.rotation;
    assert!((q.norm() - 1.0).abs() < 1e-6);
}

#[test]
fn defaults_apply_when_constants_omitted() {
    let text = "\
l 1 0.1 0.1 0.1 0 1 0 0 0 0 1
p 0 0 0 0 0 0 1
b 0
";
    let spec = BodySpec::parse(text).unwrap();
    assert_eq!(spec.episode_steps, 1000);
    assert!((spec.gravity - -9.81).abs() < 1e-6);
    assert!((spec.advance_reward - 1.0).abs() < 1e-6);
    assert!((spec.joint_limit_cost - -10.0).abs() < 1e-6);
}

#[test]
fn empty_input_is_a_parse_error() {
    assert!(matches!(
        BodySpec::parse("   \n  "),
        Err(SpecError::Parse(ParseError::Empty))
    ));
}

#[test]
fn unknown_tag_is_rejected() {
    assert!(matches!(
        BodySpec::parse("x 1 2 3"),
        Err(SpecError::Parse(ParseError::UnknownTag { tag: 'x', .. }))
    ));
}

#[test]
fn primitive_before_link_is_rejected() {
    let text = "p 0 0 0 0 0 0 1\n";
    assert!(matches!(
        BodySpec::parse(text),
        Err(SpecError::Parse(ParseError::PrimitiveWithoutLink { number: 1 }))
    ));
}

#[test]
fn second_base_is_rejected() {
    let text = "\
l 1 0.1 0.1 0.1 0 1 0 0 0 0 1
p 0 0 0 0 0 0 1
b 0
b 0
";
    assert!(matches!(
        BodySpec::parse(text),
        Err(SpecError::Parse(ParseError::DuplicateBase { number: 4 }))
    ));
}

#[test]
fn missing_value_names_the_field() {
    let err = BodySpec::parse("l 1 0.1 0.1\n").unwrap_err();
    match err {
        SpecError::Parse(ParseError::MissingValue { field, .. }) => {
            assert_eq!(field, "inertia");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_number_is_rejected() {
    let err = BodySpec::parse("s 0.01 four 1000 -9.81 30 0.8 0.8 0 0\n").unwrap_err();
    assert!(matches!(
        err,
        SpecError::Parse(ParseError::InvalidValue {
            field: "frameSteps",
            ..
        })
    ));
}

#[test]
fn missing_base_fails_validation() {
    let text = "\
l 1 0.1 0.1 0.1 0 1 0 0 0 0 1
p 0 0 0 0 0 0 1
";
    assert!(matches!(
        BodySpec::parse(text),
        Err(SpecError::Validation(ValidationError::NoBase))
    ));
}

#[test]
fn negative_base_fails_validation() {
    let text = "\
l 1 0.1 0.1 0.1 0 1 0 0 0 0 1
p 0 0 0 0 0 0 1
b -1
";
    assert!(matches!(
        BodySpec::parse(text),
        Err(SpecError::Validation(ValidationError::BaseOutOfRange(-1)))
    ));
}

#[test]
fn link_without_primitive_fails_validation() {
    let text = "\
l 1 0.1 0.1 0.1 0 1 0 0 0 0 1
p 0 0 0 0 0 0 1
l 1 0.1 0.1 0.1 0 2 0 0 0 0 1
b 0
";
    assert!(matches!(
        BodySpec::parse(text),
        Err(SpecError::Validation(ValidationError::LinkWithoutPrimitive(1)))
    ));
}

#[test]
fn joint_index_out_of_range_fails_validation() {
    let text = "\
l 1 0.1 0.1 0.1 0 1 0 0 0 0 1
p 0 0 0 0 0 0 1
j 0 3 -45 45 100 0 0 0 0 0 0 1
b 0
";
    assert!(matches!(
        BodySpec::parse(text),
        Err(SpecError::Validation(ValidationError::JointTargetOutOfRange {
            joint: 0,
            index: 3,
        }))
    ));
}
