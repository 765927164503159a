#![cfg(feature = "serde")]

use tripath_core::{NodeId, ProjectionPlane, Vec3};

#[test]
fn projection_planes_use_lowercase_names() {
    assert_eq!(
        serde_json::to_string(&ProjectionPlane::Yz).expect("serialize"),
        "\"yz\""
    );
    let plane: ProjectionPlane = serde_json::from_str("\"xy\"").expect("deserialize");
    assert_eq!(plane, ProjectionPlane::Xy);
}

#[test]
fn points_and_ids_serialize_as_plain_values() {
    let json = serde_json::to_string(&(NodeId(4), Vec3::new(1.0, -2.5, 0.0))).expect("serialize");
    assert_eq!(json, r#"[4,{"x":1.0,"y":-2.5,"z":0.0}]"#);
    let back: (NodeId, Vec3) = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, (NodeId(4), Vec3::new(1.0, -2.5, 0.0)));
}
