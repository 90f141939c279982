//! Tests for merging single-color 3MF files

mod common;

use color3mf::opc::Package;
use color3mf::slicer::MODEL_SETTINGS_PATH;
use color3mf::{
    Error, MergeConfig, MergeWarning, Model, ObjectShape, Resource, Transform, Triangle, merge,
    merge_to_file,
};
use common::{
    model_with_meshes, write_corrupt, write_model, write_raw_package, write_single_triangle,
};
use std::fs::File;

/// Read the slicer document of a written package
fn slicer_document(path: &std::path::Path) -> String {
    let mut package = Package::open(File::open(path).unwrap()).unwrap();
    package.get_file(MODEL_SETTINGS_PATH).unwrap()
}

/// (color, vertices, triangles) of every mesh object, sorted
fn color_bindings(model: &Model) -> Vec<((u8, u8, u8, u8), String, Vec<Triangle>)> {
    let mut bindings: Vec<_> = model
        .resources
        .mesh_objects()
        .map(|(object, mesh)| {
            let group = model
                .resources
                .color_group(object.pid.expect("mesh bound to a color group"))
                .expect("color group exists");
            let color = group.colors[object.pindex.expect("color index")];
            (color, format!("{:?}", mesh.vertices), mesh.triangles.clone())
        })
        .collect();
    bindings.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    bindings
}

#[test]
fn test_end_to_end_red_and_blue() {
    let dir = tempfile::tempdir().unwrap();
    let red = write_single_triangle(dir.path(), "red.3mf");
    let blue = write_single_triangle(dir.path(), "blue.3mf");
    let dest = dir.path().join("merged.3mf");

    let report = merge_to_file([&red, &blue], &dest, &MergeConfig::default()).unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(report.output, dest);

    let model = Model::from_file(&dest).unwrap();
    let resources = &model.resources;

    assert_eq!(resources.mesh_objects().count(), 2);
    assert_eq!(resources.color_groups.len(), 2);
    let colors: Vec<_> = resources.color_groups.iter().map(|g| g.colors.clone()).collect();
    assert_eq!(colors, vec![vec![(255, 0, 0, 255)], vec![(0, 0, 255, 255)]]);

    let aggregates: Vec<_> = resources
        .iter()
        .filter_map(|resource| match resource {
            Resource::Components(object, components) => Some((object.id, components)),
            _ => None,
        })
        .collect();
    assert_eq!(aggregates.len(), 1);
    let (aggregate_id, components) = aggregates[0];
    assert_eq!(components.len(), 2);
    for component in components {
        assert!(resources.object(component.objectid).unwrap().as_mesh().is_some());
        assert_eq!(component.transform, Some(Transform::IDENTITY));
    }

    assert_eq!(model.build.items.len(), 1);
    assert_eq!(model.build.items[0].objectid, aggregate_id);

    let names: Vec<_> = resources
        .mesh_objects()
        .map(|(object, _)| object.name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["red", "blue"]);

    let document = slicer_document(&dest);
    assert!(document.contains(&format!("<object id=\"{}\">", aggregate_id)));
    for part in &report.parts {
        assert!(document.contains(&format!(
            "<part id=\"{}\" subtype=\"normal_part\">",
            part.resource_id
        )));
    }
    assert!(document.contains(r#"<metadata key="name" value="red"/>"#));
    assert!(document.contains(r#"<metadata key="name" value="blue"/>"#));
}

#[test]
fn test_partial_failure_skips_corrupt_input() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = [
        write_single_triangle(dir.path(), "red.3mf"),
        write_corrupt(dir.path(), "not_a_color.3mf"),
        write_single_triangle(dir.path(), "blue.3mf"),
    ];
    let dest = dir.path().join("merged.3mf");

    let report = merge_to_file(&inputs, &dest, &MergeConfig::default()).unwrap();

    assert_eq!(report.warnings.len(), 2);
    assert!(matches!(report.warnings[0], MergeWarning::ColorParse { .. }));
    assert!(matches!(report.warnings[1], MergeWarning::ModelRead { .. }));
    assert!(report.warnings.iter().all(|w| w.path() == inputs[1]));

    let model = Model::from_file(&dest).unwrap();
    assert_eq!(model.resources.mesh_objects().count(), 2);
    assert_eq!(model.build.items.len(), 1);
    assert!(model.resources.object(model.build.items[0].objectid).is_some());
}

#[test]
fn test_unknown_label_is_colored_black() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_single_triangle(dir.path(), "blurple.3mf");

    let output = merge([&input], &MergeConfig::default()).unwrap();
    assert_eq!(output.parts.len(), 1);
    assert!(matches!(
        &output.warnings[..],
        [MergeWarning::ColorParse { warning, .. }] if warning.token == "blurple"
    ));
    assert_eq!(output.model.resources.color_groups[0].colors, vec![(0, 0, 0, 255)]);
}

#[test]
fn test_input_order_changes_ids_only() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_model(
        dir.path(),
        "red.3mf",
        &model_with_meshes(vec![vec![Triangle::new(0, 1, 2), Triangle::new(3, 1, 0)]]),
    );
    let b = write_model(
        dir.path(),
        "green.3mf",
        &model_with_meshes(vec![vec![Triangle::new(2, 3, 1)]]),
    );

    let ab = merge([&a, &b], &MergeConfig::default()).unwrap();
    let ba = merge([&b, &a], &MergeConfig::default()).unwrap();

    assert_eq!(color_bindings(&ab.model), color_bindings(&ba.model));
    assert_ne!(ab.parts[0].label, ba.parts[0].label);
}

#[test]
fn test_triangle_order_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_model(
        dir.path(),
        "red.3mf",
        &model_with_meshes(vec![vec![
            Triangle::new(0, 1, 2),
            Triangle::new(3, 1, 0),
            Triangle::new(2, 3, 0),
        ]]),
    );
    let second_dir = tempfile::tempdir().unwrap();
    let second = write_model(
        second_dir.path(),
        "red.3mf",
        &model_with_meshes(vec![vec![
            Triangle::new(0, 2, 3),
            Triangle::new(1, 2, 0),
            Triangle::new(1, 0, 3),
        ]]),
    );

    let one = merge([&first], &MergeConfig::default()).unwrap();
    let two = merge([&second], &MergeConfig::default()).unwrap();

    let triangles = |model: &Model| {
        model
            .resources
            .mesh_objects()
            .map(|(_, mesh)| mesh.triangles.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(triangles(&one.model), triangles(&two.model));
    assert_eq!(
        triangles(&one.model)[0],
        vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3), Triangle::new(0, 3, 1)]
    );
}

#[test]
fn test_every_mesh_of_a_file_becomes_a_part() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_model(
        dir.path(),
        "orange.3mf",
        &model_with_meshes(vec![vec![Triangle::new(0, 1, 2)], vec![Triangle::new(1, 2, 3)]]),
    );

    let output = merge([&input], &MergeConfig::default()).unwrap();
    assert_eq!(output.parts.len(), 2);
    assert!(output.parts.iter().all(|p| p.label == "orange"));

    // Both parts share the file's single color group
    let resources = &output.model.resources;
    assert_eq!(resources.color_groups.len(), 1);
    let group_id = resources.color_groups[0].id;
    assert!(
        resources
            .mesh_objects()
            .all(|(object, _)| object.pid == Some(group_id) && object.pindex == Some(0))
    );
}

#[test]
fn test_components_in_input_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw_package(
        dir.path(),
        "purple.3mf",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="0" y="1" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="1" v2="2" v3="0"/>
        </triangles>
      </mesh>
    </object>
    <object id="2" type="model">
      <components>
        <component objectid="1"/>
      </components>
    </object>
  </resources>
  <build>
    <item objectid="2"/>
  </build>
</model>"#,
    );

    let output = merge([&input], &MergeConfig::default()).unwrap();
    assert_eq!(output.parts.len(), 1);

    let mesh = output
        .model
        .resources
        .object(output.parts[0].resource_id)
        .unwrap()
        .as_mesh()
        .unwrap();
    assert_eq!(mesh.triangles, vec![Triangle::new(0, 1, 2)]);
}

#[test]
fn test_file_without_meshes_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let empty = write_raw_package(
        dir.path(),
        "white.3mf",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources/>
  <build/>
</model>"#,
    );
    let red = write_single_triangle(dir.path(), "red.3mf");

    let output = merge([&empty, &red], &MergeConfig::default()).unwrap();
    assert!(matches!(&output.warnings[..], [MergeWarning::NoMeshes { .. }]));
    assert_eq!(output.model.resources.color_groups.len(), 1);
    assert_eq!(output.parts.len(), 1);
}

#[test]
fn test_duplicate_labels_stay_separate_parts() {
    let dir = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    let first = write_single_triangle(dir.path(), "red.3mf");
    let second = write_single_triangle(other.path(), "red.3mf");
    let dest = dir.path().join("merged.3mf");

    let report = merge_to_file([&first, &second], &dest, &MergeConfig::default()).unwrap();
    assert_eq!(report.parts.len(), 2);
    assert_ne!(report.parts[0].resource_id, report.parts[1].resource_id);

    let document = slicer_document(&dest);
    assert_eq!(document.matches(r#"value="red""#).count(), 2);
}

#[test]
fn test_label_is_escaped_in_slicer_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_single_triangle(dir.path(), "a&\"b.3mf");
    let dest = dir.path().join("merged.3mf");

    let report = merge_to_file([&input], &dest, &MergeConfig::default()).unwrap();
    assert_eq!(report.parts[0].label, "a&\"b");

    let document = slicer_document(&dest);
    assert!(document.contains(r#"value="a&amp;&quot;b""#));

    // The part name survives a full read of the written package
    let model = Model::from_file(&dest).unwrap();
    let (object, _) = model.resources.mesh_objects().next().unwrap();
    assert_eq!(object.name.as_deref(), Some("a&\"b"));
}

#[test]
fn test_slicer_metadata_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_single_triangle(dir.path(), "red.3mf");
    let dest = dir.path().join("merged.3mf");

    let config = MergeConfig::new().with_slicer_metadata(false);
    merge_to_file([&input], &dest, &config).unwrap();

    let mut package = Package::open(File::open(&dest).unwrap()).unwrap();
    assert!(!package.has_file(MODEL_SETTINGS_PATH));
}

#[test]
fn test_nothing_to_merge_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = [
        write_corrupt(dir.path(), "red.3mf"),
        dir.path().join("missing.3mf"),
    ];
    let dest = dir.path().join("merged.3mf");

    let err = merge_to_file(&inputs, &dest, &MergeConfig::default()).unwrap_err();
    assert!(matches!(err, Error::AggregateBuild(_)));
    assert!(!dest.exists());
}

#[test]
fn test_write_failure_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_single_triangle(dir.path(), "red.3mf");
    let dest = dir.path().join("no_such_dir").join("merged.3mf");

    let err = merge_to_file([&input], &dest, &MergeConfig::default()).unwrap_err();
    match err {
        Error::Write { path, .. } => assert_eq!(path, dest),
        other => panic!("expected a write error, got {}", other),
    }
    assert!(!dest.exists());
}

#[test]
fn test_merged_output_can_be_merged_again() {
    // A merged file can itself be used as input: its aggregate is ignored and
    // its color-bound meshes are re-bound to the new label
    let dir = tempfile::tempdir().unwrap();
    let red = write_single_triangle(dir.path(), "red.3mf");
    let merged = dir.path().join("navy.3mf");
    merge_to_file([&red], &merged, &MergeConfig::default()).unwrap();

    let output = merge([&merged], &MergeConfig::default()).unwrap();
    assert_eq!(output.parts.len(), 1);
    assert_eq!(output.model.resources.color_groups[0].colors, vec![(0, 0, 128, 255)]);
    let aggregate = output.model.resources.object(1).unwrap();
    assert!(matches!(aggregate.shape, ObjectShape::Components(ref c) if c.len() == 1));
}

#[cfg(unix)]
#[test]
fn test_merged_output_has_default_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let red = write_single_triangle(dir.path(), "red.3mf");
    let dest = dir.path().join("merged.3mf");
    merge_to_file([&red], &dest, &MergeConfig::default()).unwrap();

    let plain = dir.path().join("plain.bin");
    File::create(&plain).unwrap();

    let mode = |path: &std::path::Path| {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    };
    assert_eq!(mode(&dest), mode(&plain));
}
