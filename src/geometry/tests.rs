use super::*;
use approx::assert_relative_eq;

#[test]
fn ray_hits_axis_aligned_triangle_head_on() {
    // Triangle in the z=0.5 plane, spanning x,y in [0,1]; segment runs
    // along +z through its centroid.
    let v0 = WorldPoint::new(0.0, 0.0, 0.5);
    let v1 = WorldPoint::new(1.0, 0.0, 0.5);
    let v2 = WorldPoint::new(0.0, 1.0, 0.5);
    let normal = WorldPoint::Z;
    let hit = segment_triangle_intersect(
        WorldPoint::new(0.2, 0.2, -1.0),
        WorldPoint::Z,
        3.0,
        v0,
        v1,
        v2,
        normal,
        0.0,
    )
    .expect("segment should hit the triangle");
    assert_relative_eq!(hit.t, 1.5, epsilon = 1e-9);
    assert_relative_eq!(hit.incidence_deg, 90.0, epsilon = 1e-6);
}

#[test]
fn parallel_segment_misses() {
    let v0 = WorldPoint::new(0.0, 0.0, 0.5);
    let v1 = WorldPoint::new(1.0, 0.0, 0.5);
    let v2 = WorldPoint::new(0.0, 1.0, 0.5);
    let hit = segment_triangle_intersect(
        WorldPoint::new(0.2, 0.2, 0.5),
        WorldPoint::X,
        3.0,
        v0,
        v1,
        v2,
        WorldPoint::Z,
        0.0,
    );
    assert!(hit.is_none());
}

#[test]
fn segment_s1_unit_cube_face_intersection() {
    // Segment (-2,0,0)->(2,0,0) crosses a face at x=0.5,
    // t=2.5 from the segment origin at x=-2.
    let v0 = WorldPoint::new(0.5, -1.0, -1.0);
    let v1 = WorldPoint::new(0.5, 1.0, -1.0);
    let v2 = WorldPoint::new(0.5, -1.0, 1.0);
    let hit = segment_triangle_intersect(
        WorldPoint::new(-2.0, 0.0, 0.0),
        WorldPoint::X,
        4.0,
        v0,
        v1,
        v2,
        WorldPoint::X,
        0.0,
    )
    .expect("must intersect");
    assert_relative_eq!(hit.t, 2.5, epsilon = 1e-9);
}

#[test]
fn voxel_triangle_overlap_matches_s2() {
    // Triangle (0,0,0)-(1,0,0)-(0,1,0).
    let v0 = WorldPoint::new(0.0, 0.0, 0.0);
    let v1 = WorldPoint::new(1.0, 0.0, 0.0);
    let v2 = WorldPoint::new(0.0, 1.0, 0.0);

    // Voxel centred at (0.25, 0.25, 0) in world coords -> triangle coords
    // relative to the voxel centre.
    let shift = WorldPoint::new(0.25, 0.25, 0.0);
    assert!(voxel_triangle_overlap(v0 - shift, v1 - shift, v2 - shift, 0.5, 0.0));

    let shift2 = WorldPoint::new(0.25, 0.25, 1.0);
    assert!(!voxel_triangle_overlap(v0 - shift2, v1 - shift2, v2 - shift2, 0.5, 0.0));
}

#[test]
fn too_short_segment_misses_even_on_line() {
    let v0 = WorldPoint::new(-1.0, -1.0, 1.0);
    let v1 = WorldPoint::new(1.0, -1.0, 1.0);
    let v2 = WorldPoint::new(0.0, 1.0, 1.0);
    let hit = segment_triangle_intersect(WorldPoint::ZERO, WorldPoint::Z, 0.5, v0, v1, v2, WorldPoint::Z, 0.0);
    assert!(hit.is_none());
}
