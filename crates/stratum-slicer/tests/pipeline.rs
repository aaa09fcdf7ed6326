//! End-to-end runs of the slicing pipeline on small meshes.

use approx::assert_relative_eq;
use stratum_math::Point3;
use stratum_mesh::SurfaceMesh;
use stratum_slicer::contour::ContourKernel;
use stratum_slicer::seams::align_seams;
use stratum_slicer::{
    slice_interpolation, slice_planar, EdgeWalkTracer, GeodesicsMethod, OrganizedPrint, PathKey,
    PlanarSlicer, PrintSettings, SeamOrientation, SliceResult, SlicerError, UnionMethod,
};

fn make_cube_mesh(height: f64) -> SurfaceMesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, height),
        Point3::new(1.0, 0.0, height),
        Point3::new(1.0, 1.0, height),
        Point3::new(0.0, 1.0, height),
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [2, 3, 7],
        [2, 7, 6],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    SurfaceMesh::new(positions, faces).unwrap()
}

/// A single vertical wall in the xz plane, open on every side.
fn make_wall_mesh() -> SurfaceMesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, 1.0),
    ];
    SurfaceMesh::new(positions, vec![[0, 1, 2], [0, 2, 3]]).unwrap()
}

/// Open tube of radius 5 with `rings` rings of 12 vertices, 2.5 apart.
fn make_tube_mesh(rings: usize) -> SurfaceMesh {
    let m = 12;
    let mut positions = Vec::new();
    for j in 0..rings {
        for i in 0..m {
            let a = std::f64::consts::TAU * i as f64 / m as f64;
            positions.push(Point3::new(5.0 * a.cos(), 5.0 * a.sin(), j as f64 * 2.5));
        }
    }
    let mut faces = Vec::new();
    for j in 0..rings - 1 {
        for i in 0..m {
            let a = j * m + i;
            let b = j * m + (i + 1) % m;
            faces.push([a, b, b + m]);
            faces.push([a, b + m, a + m]);
        }
    }
    SurfaceMesh::new(positions, faces).unwrap()
}

fn settings(layer_height: f64) -> PrintSettings {
    let mut settings = PrintSettings::default();
    settings.slicing.layer_height = layer_height;
    settings
}

#[test]
fn test_cube_three_layers_of_squares() {
    let mesh = make_cube_mesh(1.5);
    let output = slice_planar(&mesh, &settings(0.5)).unwrap();

    assert_eq!(output.stats.layer_count, 3);
    let groups = output.slices.groups();
    assert_eq!(groups.len(), 3);
    for (paths, z) in groups.iter().zip([0.25, 0.75, 1.25]) {
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_closed);
        assert_eq!(paths[0].len(), 4);
        for p in &paths[0].points {
            assert_relative_eq!(p.z, z, epsilon = 1e-9);
            assert!(p.x.abs() < 1e-9 || (p.x - 1.0).abs() < 1e-9);
            assert!(p.y.abs() < 1e-9 || (p.y - 1.0).abs() < 1e-9);
        }
    }
}

#[test]
fn test_output_contract() {
    let mesh = make_cube_mesh(1.5);
    let output = slice_planar(&mesh, &settings(0.5)).unwrap();
    let print = &output.print;

    assert_eq!(print.number_of_paths(), output.slices.num_paths());
    assert!(print.points().all(|p| p.extruder_toggle.is_some() && p.velocity.is_some()));
    assert_eq!(print.points().last().unwrap().extruder_toggle, Some(false));
    assert!(output.stats.print_time_seconds.is_some());
}

#[test]
fn test_open_path_ends_with_extruder_off() {
    let mesh = make_wall_mesh();
    let mut settings = settings(0.5);
    settings.organization.add_safety_points = false;
    let output = slice_planar(&mesh, &settings).unwrap();

    assert_eq!(output.stats.layer_count, 2);
    for (key, points) in output.print.paths() {
        let path = &output.slices.groups()[key.layer][key.path];
        assert!(!path.is_closed);
        assert_eq!(points.last().unwrap().extruder_toggle, Some(false));
        assert!(points[..points.len() - 1]
            .iter()
            .all(|p| p.extruder_toggle == Some(true)));
    }
}

#[test]
fn test_tracer_paths_are_well_formed() {
    let mesh = make_cube_mesh(1.0);
    let tracer = EdgeWalkTracer::default();
    let elevation = mesh.elevation();
    for iso in [0.1, 0.5, 0.9] {
        let paths = tracer.contours(&mesh, &elevation, iso).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert!(path.is_closed);
        assert!(path.len() >= 3);
        assert_ne!(path.first(), path.last());
    }
}

#[test]
fn test_simplification_keeps_original_points() {
    let mesh = make_cube_mesh(1.5);
    let raw = PlanarSlicer::new(0.5).slice(&mesh).unwrap();
    let output = slice_planar(&mesh, &settings(0.5)).unwrap();

    for (raw_paths, paths) in raw.groups().iter().zip(output.slices.groups()) {
        assert!(paths[0].len() <= raw_paths[0].len());
        for p in &paths[0].points {
            assert!(raw_paths[0].points.iter().any(|q| (p - q).norm() < 1e-12));
        }
    }
}

#[test]
fn test_seam_alignment_is_idempotent() {
    let mesh = make_cube_mesh(1.5);
    let output = slice_planar(&mesh, &settings(0.5)).unwrap();

    for orientation in [SeamOrientation::NextPath, SeamOrientation::Origin] {
        let mut once = output.slices.clone();
        align_seams(&mut once, orientation);
        let mut twice = once.clone();
        align_seams(&mut twice, orientation);
        assert_eq!(once, twice);
    }
}

#[test]
fn test_json_round_trip() {
    let mesh = make_cube_mesh(1.5);
    let output = slice_planar(&mesh, &settings(0.5)).unwrap();

    let text = output.print.to_json().unwrap();
    let back = OrganizedPrint::from_json(&text).unwrap();
    assert_eq!(back.number_of_paths(), output.print.number_of_paths());
    for (a, b) in output.print.points().zip(back.points()) {
        assert_relative_eq!(a.point, b.point, epsilon = 1e-9);
        assert_eq!(a.extruder_toggle, b.extruder_toggle);
        assert_relative_eq!(a.velocity.unwrap(), b.velocity.unwrap());
        assert_relative_eq!(a.blend_radius, b.blend_radius);
    }
    assert_eq!(back.get(PathKey::new(2, 0)).unwrap()[0].parent, PathKey::new(2, 0));

    let slices = SliceResult::from_json(&output.slices.to_json().unwrap()).unwrap();
    assert_eq!(slices.num_paths(), output.slices.num_paths());
}

#[test]
fn test_settings_from_toml() {
    let settings = PrintSettings::from_toml_str(
        r#"
        [slicing]
        layer_height = 0.5

        [organization]
        add_safety_points = false

        [velocity]
        velocity_type = "constant"
        constant = 40.0
        "#,
    )
    .unwrap();
    let output = slice_planar(&make_cube_mesh(1.5), &settings).unwrap();
    assert_eq!(output.stats.point_count, 12);
    assert!(output.print.points().all(|p| p.velocity == Some(40.0)));
}

#[test]
fn test_interpolation_pipeline_reads_target_settings() {
    let mut mesh = make_tube_mesh(5);
    let bottom: Vec<usize> = (0..12).collect();
    let top: Vec<usize> = (48..60).collect();
    let mut settings = PrintSettings::default();
    settings.slicing.avg_layer_height = 2.5;
    settings.targets.high_union = UnionMethod::Smooth { radius: 1.0 };

    let output = slice_interpolation(&mut mesh, &bottom, Some(&top), &settings, None).unwrap();
    assert!(!output.slices.is_horizontal());
    assert_eq!(output.slices.num_paths(), 5);
    assert_eq!(output.print.number_of_paths(), 5);
    assert_eq!(output.print.points().last().unwrap().extruder_toggle, Some(false));

    settings.targets.high_geodesics = GeodesicsMethod::External;
    assert!(matches!(
        slice_interpolation(&mut mesh, &bottom, Some(&top), &settings, None),
        Err(SlicerError::NotInstalled(_))
    ));
    // LOW alone never consults the HIGH solver.
    assert!(slice_interpolation(&mut mesh, &bottom, None, &settings, None).is_ok());
}

#[test]
fn test_interpolation_settings_from_toml() {
    let settings = PrintSettings::from_toml_str(
        r#"
        [targets]
        low_geodesics = "external"
        "#,
    )
    .unwrap();
    let mut mesh = make_tube_mesh(3);
    let bottom: Vec<usize> = (0..12).collect();
    assert!(matches!(
        slice_interpolation(&mut mesh, &bottom, None, &settings, None),
        Err(SlicerError::NotInstalled(_))
    ));
}
