use std::io::Cursor;

use tripath_core::{PlaneProjection, Vec3};
use tripath_mesh::mesh_data::{DEGENERATE_EPSILON, MERGE_GAP};
use tripath_mesh::{MeshDataError, MeshError, PathfindingConfig, RouteCost, TriangleMeshData};

fn square() -> TriangleMeshData {
    TriangleMeshData::new(
        vec![0, 1, 2, 0, 2, 3],
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
    )
}

#[test]
fn binary_layout_is_little_endian_counts_then_payload() {
    let data = TriangleMeshData::new(vec![0, 1, 2], vec![Vec3::new(1.5, -2.0, 0.25)]);
    let bytes = data.to_bytes();

    let mut expected = Vec::new();
    expected.extend_from_slice(&3i32.to_le_bytes());
    for i in [0i32, 1, 2] {
        expected.extend_from_slice(&i.to_le_bytes());
    }
    expected.extend_from_slice(&1i32.to_le_bytes());
    for c in [1.5f32, -2.0, 0.25] {
        expected.extend_from_slice(&c.to_le_bytes());
    }
    assert_eq!(bytes, expected);
    assert_eq!(TriangleMeshData::from_bytes(&bytes).expect("decode"), data);
}

#[test]
fn absent_sections_use_minus_one() {
    let data = TriangleMeshData {
        indices: None,
        vertices: Some(vec![Vec3::ZERO]),
    };
    let bytes = data.to_bytes();
    assert_eq!(&bytes[..4], &(-1i32).to_le_bytes());

    let decoded = TriangleMeshData::from_bytes(&bytes).expect("decode");
    assert_eq!(decoded.indices, None);
    assert_eq!(decoded.vertex_count(), 1);

    let empty = TriangleMeshData::default().to_bytes();
    assert_eq!(empty, [(-1i32).to_le_bytes(), (-1i32).to_le_bytes()].concat());
}

#[test]
fn truncated_input_is_an_error() {
    let bytes = square().to_bytes();
    for cut in [0, 3, 10, bytes.len() - 1] {
        let err = TriangleMeshData::from_bytes(&bytes[..cut]).unwrap_err();
        assert!(
            matches!(err, MeshDataError::Truncated { .. }),
            "cut at {cut}: {err}"
        );
    }

    // A count that promises more than the buffer holds fails before allocating.
    let mut huge = i32::MAX.to_le_bytes().to_vec();
    huge.extend_from_slice(&[0; 8]);
    assert!(matches!(
        TriangleMeshData::from_bytes(&huge),
        Err(MeshDataError::Truncated { .. })
    ));
}

#[test]
fn reader_and_writer_round_trip_through_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = square();

    let bin = dir.path().join("square.bytes");
    data.save(&bin).expect("save binary");
    assert_eq!(std::fs::read(&bin).expect("read"), data.to_bytes());
    assert_eq!(TriangleMeshData::load(&bin).expect("load binary"), data);

    let obj = dir.path().join("square.obj");
    data.save(&obj).expect("save obj");
    assert_eq!(TriangleMeshData::load(&obj).expect("load obj"), data);

    let mut sink = Vec::new();
    data.write_to(&mut sink).expect("write");
    let back = TriangleMeshData::read_from(Cursor::new(sink)).expect("read");
    assert_eq!(back, data);
}

#[test]
fn obj_parser_handles_suffixes_polygons_and_other_records() {
    let text = "\
# exported floor
o floor
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
vn 0 1 0
vt 0 0
f 1/1/1 2/2/1 3/3/1 4/4/1
s off
";
    let data = TriangleMeshData::from_obj(text).expect("parse");
    assert_eq!(data.vertex_count(), 4);
    assert_eq!(data.indices, Some(vec![0, 1, 2, 0, 2, 3]));

    let text = data.to_obj();
    assert!(text.contains("f 1 2 3\n"));
    assert!(text.contains("v 1 0 1\n"));
}

#[test]
fn obj_parse_errors_name_the_line() {
    let err = TriangleMeshData::from_obj("v 0 0 0\nv 1 0\n").unwrap_err();
    assert!(matches!(err, MeshDataError::Obj { line: 2, .. }));

    let err = TriangleMeshData::from_obj("v 0 0 0\nf 1 2 3\n").unwrap_err();
    assert!(matches!(err, MeshDataError::Obj { line: 2, .. }));
}

#[test]
fn merge_collapses_near_vertices_and_drops_degenerate_triangles() {
    let mut data = TriangleMeshData::new(
        vec![
            0, 1, 2, // kept
            3, 2, 4, // vertex 3 lands on vertex 0
            0, 5, 1, // edge 0-5 shorter than the degenerate epsilon
        ],
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.02, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0005),
        ],
    );

    let report = data.merge_vertices(MERGE_GAP, DEGENERATE_EPSILON);
    assert_eq!(report.vertices_before, 6);
    assert_eq!(report.vertices_after, 4);
    assert_eq!(report.triangles_before, 3);
    assert_eq!(report.triangles_after, 2);
    assert_eq!(data.indices, Some(vec![0, 1, 2, 0, 2, 3]));

    let mesh = data
        .to_mesh(PlaneProjection::IDENTITY, RouteCost::Unit)
        .expect("mesh");
    assert_eq!(mesh.route_count(), 2);
}

#[test]
fn weld_points_duplicates_at_the_first_index() {
    let mut data = TriangleMeshData::new(
        vec![0, 1, 2, 3, 2, 4],
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
    );
    assert_eq!(data.weld_same_vertices(), 1);
    assert_eq!(data.indices, Some(vec![0, 1, 2, 0, 2, 4]));
}

#[test]
fn conversion_to_mesh_validates_indices() {
    let missing = TriangleMeshData {
        indices: None,
        vertices: Some(Vec::new()),
    };
    assert_eq!(
        missing
            .to_mesh(PlaneProjection::IDENTITY, RouteCost::Unit)
            .unwrap_err(),
        MeshError::Missing("indices")
    );

    let negative = TriangleMeshData::new(vec![0, -4, 1], vec![Vec3::ZERO; 2]);
    assert!(matches!(
        negative.to_mesh(PlaneProjection::IDENTITY, RouteCost::Unit),
        Err(MeshError::IndexOutOfRange {
            position: 1,
            index: -4,
            ..
        })
    ));
}

#[test]
fn config_file_drives_merge_and_cost_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tripath.yaml");
    std::fs::write(
        &path,
        "route_cost: metric\nsearch:\n  max_expansions: 64\nfunnel:\n  timeout_ms: 250\nmerge:\n  enabled: true\n  gap: 0.1\n",
    )
    .expect("write config");

    let config = PathfindingConfig::load(&path).expect("load");
    assert_eq!(config.route_cost, RouteCost::Metric);
    assert_eq!(config.search_config().max_expansions, 64);
    assert_eq!(config.funnel_budget().timeout.as_millis(), 250);
    assert!(config.merge.enabled);
    assert_eq!(config.merge.gap, 0.1);
    assert_eq!(config.merge.degenerate_epsilon, DEGENERATE_EPSILON);

    let missing = dir.path().join("absent.yaml");
    assert!(PathfindingConfig::load(&missing).is_err());
}
