//! Configuration file tests

use object_projector::{
    config::{Config, StaticTransform, EXAMPLE_CONFIG},
    geometry::RigidTransform,
    localizer::LocalizationStrategy,
    point_cloud::RegionPolicy,
};
use nalgebra::{Point3, Vector3};
use std::time::Duration;

#[test]
fn test_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projector.yaml");

    let mut config = Config::default();
    config.localization.strategy = LocalizationStrategy::MeanOfInliers;
    config.region.policy = RegionPolicy::Clamp;
    config.ransac.distance_threshold = 0.02;
    config.transforms.lookup_timeout_ms = 500;
    config.transforms.static_transforms.push(StaticTransform {
        parent: "base_link".to_string(),
        child: "camera_rgb_optical_frame".to_string(),
        transform: RigidTransform::from_yaw(0.25, Vector3::new(0.1, 0.0, 0.4)),
    });
    config.debug.inliers = false;

    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.localization.strategy, LocalizationStrategy::MeanOfInliers);
    assert_eq!(loaded.region.policy, RegionPolicy::Clamp);
    assert!((loaded.ransac.distance_threshold - 0.02).abs() < 1e-12);
    assert_eq!(loaded.lookup_timeout(), Duration::from_millis(500));
    assert!(!loaded.debug.inliers);
    assert_eq!(loaded.frames, config.frames);
    assert_eq!(loaded.topics, config.topics);

    let original = &config.transforms.static_transforms[0].transform;
    let restored = &loaded.transforms.static_transforms[0].transform;
    assert!((original.translation() - restored.translation()).norm() < 1e-12);
    for p in [Point3::origin(), Point3::new(1.0, -2.0, 0.5)] {
        assert!((original.apply_point(&p) - restored.apply_point(&p)).norm() < 1e-12);
    }
    assert!((original.rotation().matrix() - restored.rotation().matrix()).norm() < 1e-12);
}

#[test]
fn test_example_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("example.yaml");
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config, {
        let mut expected = Config::default();
        expected.transforms.static_transforms = config.transforms.static_transforms.clone();
        expected
    });
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yaml");
    std::fs::write(&path, "{}\n").unwrap();
    assert_eq!(Config::from_file(&path).unwrap(), Config::default());
}

#[test]
fn test_region_and_strategy_names() {
    let config: Config = serde_yaml::from_str(
        "region:\n  policy: clamp\nlocalization:\n  strategy: projected_midpoint\n",
    )
    .unwrap();
    assert_eq!(config.region.policy, RegionPolicy::Clamp);
    assert_eq!(config.localization.strategy, LocalizationStrategy::ProjectedMidpoint);

    assert!(serde_yaml::from_str::<Config>("region:\n  policy: crop\n").is_err());
}
