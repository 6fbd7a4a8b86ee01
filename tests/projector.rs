//! Tests for trajectory to tile projection

use explorer_tiles::projector::{
    collapse_runs, mercator_tile_float, project_points, rollup, tiles_from_points, LineWalk,
};
use explorer_tiles::{ExplorerError, Tile, TileTouch, TimeSeriesRow, TrajectoryPoint, MAX_ZOOM};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SCALE: f64 = (1u64 << MAX_ZOOM) as f64;

/// Point in the middle of a finest-zoom tile.
fn at_tile(time: i64, x: f64, y: f64, segment: u32) -> TrajectoryPoint {
    TrajectoryPoint::new(time, (x + 0.5) / SCALE, (y + 0.5) / SCALE, segment)
}

fn tiles(touches: &[TileTouch]) -> Vec<(u32, u32)> {
    touches.iter().map(|t| (t.tile.x, t.tile.y)).collect()
}

#[test]
fn test_gap_is_interpolated_within_segment() {
    let points = vec![at_tile(0, 0.0, 0.0, 0), at_tile(10, 3.0, 0.0, 0)];
    let touches: Vec<TileTouch> = tiles_from_points(&points, MAX_ZOOM).collect();

    assert_eq!(tiles(&touches), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    // Interpolated tiles carry the later point's time
    assert_eq!(touches[1].time, 10);
    assert_eq!(touches[2].time, 10);
}

#[test]
fn test_no_interpolation_across_segments() {
    let points = vec![at_tile(0, 0.0, 0.0, 0), at_tile(10, 3.0, 0.0, 1)];
    let touches: Vec<TileTouch> = tiles_from_points(&points, MAX_ZOOM).collect();

    assert_eq!(tiles(&touches), vec![(0, 0), (3, 0)]);
}

#[test]
fn test_diagonal_neighbor_is_not_interpolated() {
    let points = vec![at_tile(0, 5.0, 5.0, 0), at_tile(1, 6.0, 6.0, 0)];
    let touches: Vec<TileTouch> = tiles_from_points(&points, MAX_ZOOM).collect();

    assert_eq!(tiles(&touches), vec![(5, 5), (6, 6)]);
}

#[test]
fn test_interpolation_stays_on_line() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let from = (rng.gen_range(0.0..200.0), rng.gen_range(0.0..200.0));
        let to = (rng.gen_range(0.0..200.0), rng.gen_range(0.0..200.0));
        let walk: Vec<Tile> = LineWalk::new(from, to, 1023).collect();

        let start = Tile::new(from.0 as u32, from.1 as u32);
        let end = Tile::new(to.0 as u32, to.1 as u32);
        let (min_x, max_x) = (start.x.min(end.x), start.x.max(end.x));
        let (min_y, max_y) = (start.y.min(end.y), start.y.max(end.y));

        // Strictly between the endpoints, inside their bounding box
        let mut chain = vec![start];
        chain.extend(walk.iter().copied());
        chain.push(end);
        for tile in &walk {
            assert!(tile.x >= min_x && tile.x <= max_x, "{tile} outside x range");
            assert!(tile.y >= min_y && tile.y <= max_y, "{tile} outside y range");
            assert_ne!(*tile, start);
            assert_ne!(*tile, end);
        }

        // The chain is 4-connected whenever there is something to fill
        if start != end {
            for pair in chain.windows(2) {
                let d = pair[0].x.abs_diff(pair[1].x) + pair[0].y.abs_diff(pair[1].y);
                assert_eq!(d, 1, "gap between {} and {}", pair[0], pair[1]);
            }
        }
    }
}

#[test]
fn test_rollup_halves_coordinates() {
    let touches = vec![
        TileTouch { time: 0, tile: Tile::new(10, 7) },
        TileTouch { time: 1, tile: Tile::new(11, 6) },
        TileTouch { time: 2, tile: Tile::new(12, 6) },
        TileTouch { time: 3, tile: Tile::new(13, 7) },
    ];

    let parents = rollup(&touches);
    // (10,7) and (11,6) share parent (5,3), as do (12,6) and (13,7)
    assert_eq!(
        parents,
        vec![
            TileTouch { time: 0, tile: Tile::new(5, 3) },
            TileTouch { time: 2, tile: Tile::new(6, 3) },
        ]
    );
    for touch in &touches {
        assert_eq!(touch.tile.parent(), Tile::new(touch.tile.x / 2, touch.tile.y / 2));
    }
}

#[test]
fn test_collapse_keeps_revisits() {
    let t = |time, x| TileTouch { time, tile: Tile::new(x, 0) };
    let collapsed = collapse_runs(vec![t(0, 1), t(1, 1), t(2, 1), t(3, 2), t(4, 1)]);
    assert_eq!(collapsed.len(), 3);
    assert_eq!(collapsed[0].time, 0);
    assert_eq!(collapsed[2].time, 4);
}

#[test]
fn test_project_from_lat_lon() {
    let rows = vec![
        TimeSeriesRow::from_lat_lon(0, 47.3769, 8.5417, 0),
        TimeSeriesRow::from_xy(1, 0.25, 0.75, 0),
    ];
    let points = project_points(1, &rows).unwrap();

    let (x, y) = mercator_tile_float(47.3769, 8.5417, 0);
    assert!((points[0].x - x).abs() < 1e-12);
    assert!((points[0].y - y).abs() < 1e-12);
    assert_eq!(points[1].x, 0.25);

    // Zurich at zoom 14 lands in tile (8580, 5737)
    let (tx, ty) = mercator_tile_float(47.3769, 8.5417, 14);
    assert_eq!((tx as u32, ty as u32), (8580, 5737));
}

#[test]
fn test_missing_coordinates_fail_projection() {
    let mut row = TimeSeriesRow::from_lat_lon(0, 47.0, 8.0, 0);
    row.latitude = None;

    let err = project_points(9, &[TimeSeriesRow::from_xy(0, 0.5, 0.5, 0), row]).unwrap_err();
    match err {
        ExplorerError::InvalidTrajectory {
            activity_id, index, ..
        } => {
            assert_eq!(activity_id, 9);
            assert_eq!(index, 1);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_non_finite_coordinates_fail_projection() {
    let rows = vec![TimeSeriesRow::from_xy(0, f64::NAN, 0.5, 0)];
    assert!(project_points(1, &rows).is_err());

    let rows = vec![TimeSeriesRow::from_lat_lon(0, 47.0, f64::INFINITY, 0)];
    assert!(project_points(1, &rows).is_err());
}

#[test]
fn test_polar_points_clamp_to_edge_tiles() {
    let rows = vec![
        TimeSeriesRow::from_lat_lon(0, 85.2, 10.0, 0),
        TimeSeriesRow::from_lat_lon(1, -85.2, 10.0, 0),
        TimeSeriesRow::from_xy(2, 1.5, 0.5, 0),
    ];
    let points = project_points(7, &rows).unwrap();
    assert_eq!(points[0].y, 0.0);
    assert_eq!(points[1].y, 1.0);
    assert_eq!(points[2].x, 1.0);

    let max = (1u32 << MAX_ZOOM) - 1;
    let tiles: Vec<Tile> = tiles_from_points(&points[..1], MAX_ZOOM)
        .map(|touch| touch.tile)
        .collect();
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].y, 0);
    assert!(tiles[0].x <= max);
}
