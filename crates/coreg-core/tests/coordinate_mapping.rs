use coreg_core::spatial::{Direction, Direction3, Point3, Spacing3};
use coreg_core::{Matrix44, Volume, VolumeGeometry};
use proptest::prelude::*;

fn make_rotation(ax: f64, ay: f64, az: f64) -> Direction3 {
    let m = Matrix44::rotation_x(ax) * Matrix44::rotation_y(ay) * Matrix44::rotation_z(az);
    Direction::<3>(m.0.fixed_view::<3, 3>(0, 0).into_owned())
}

proptest! {
    #[test]
    fn test_coordinate_roundtrip(
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ax in -180.0f64..180.0, ay in -180.0f64..180.0, az in -180.0f64..180.0,
        px in -50.0f64..50.0, py in -50.0f64..50.0, pz in -50.0f64..50.0
    ) {
        let geometry = VolumeGeometry::new(
            Point3::new([ox, oy, oz]),
            Spacing3::new([sx, sy, sz]),
            make_rotation(ax, ay, az),
        ).unwrap();

        let point = Point3::new([px, py, pz]);
        let index = geometry.world_to_index(&point);
        let back = geometry.index_to_world(&index);

        for i in 0..3 {
            prop_assert!((back[i] - point[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_matrix_agrees_with_point_mapping(
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ix in 0.0f64..64.0, iy in 0.0f64..64.0, iz in 0.0f64..64.0
    ) {
        let geometry = VolumeGeometry::new(
            Point3::new([-12.0, 3.0, 40.0]),
            Spacing3::new([sx, sy, sz]),
            make_rotation(10.0, -20.0, 30.0),
        ).unwrap();
        let index = Point3::new([ix, iy, iz]);
        let a = geometry.index_to_world(&index);
        let b = geometry.index_to_world_matrix().apply(&index);
        for i in 0..3 {
            prop_assert!((a[i] - b[i]).abs() < 1e-9);
        }
    }
}

#[test]
fn test_volume_center_maps_to_world() {
    let geometry = VolumeGeometry::new(
        Point3::new([-10.0, -10.0, -10.0]),
        Spacing3::uniform(2.0),
        Direction3::identity(),
    )
    .unwrap();
    let volume = Volume::new([11, 11, 11]).with_geometry(geometry);
    let center = volume.geometry().index_to_world(&volume.center());
    assert_eq!(center, Point3::new([0.0, 0.0, 0.0]));
}
