//! Trajectory to tile projection.
//!
//! Turns an activity's time series into the ordered sequence of quad-tree
//! tiles it passes through:
//! - Points are validated and converted to normalized Web-Mercator coordinates
//! - Consecutive points of the same recording segment are joined by a grid
//!   walk so a fast-moving track never skips a tile
//! - Segment boundaries are never bridged
//! - Coarser zooms are derived by quad-tree rollup with run collapsing

use std::f64::consts::PI;

use crate::error::{ExplorerError, OptionExt, Result};
use crate::{ActivityId, Tile, TileTouch, TimeSeriesRow, Timestamp};

/// A validated trajectory point in normalized Web-Mercator space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub time: Timestamp,
    /// Normalized x in `[0, 1]`
    pub x: f64,
    /// Normalized y in `[0, 1]`
    pub y: f64,
    pub segment_id: u32,
}

impl TrajectoryPoint {
    pub fn new(time: Timestamp, x: f64, y: f64, segment_id: u32) -> Self {
        Self {
            time,
            x,
            y,
            segment_id,
        }
    }

    fn scaled(&self, scale: f64) -> (f64, f64) {
        (self.x * scale, self.y * scale)
    }
}

/// Fractional tile coordinates of a geographic point at `zoom`.
///
/// With `zoom == 0` this yields the normalized Mercator coordinates.
pub fn mercator_tile_float(latitude: f64, longitude: f64, zoom: u8) -> (f64, f64) {
    let n = (1u64 << zoom) as f64;
    let lat_rad = latitude.to_radians();
    let x = (longitude + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    (x, y)
}

/// Validate an activity's time series and convert it to trajectory points.
///
/// Rows without usable Mercator coordinates fall back to latitude/longitude.
/// A row with neither, or with non-finite values, is a contract violation and
/// fails the whole activity. Finite values are clamped to `[0, 1]`.
pub fn project_points(
    activity_id: ActivityId,
    rows: &[TimeSeriesRow],
) -> Result<Vec<TrajectoryPoint>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let (x, y) = match (row.x, row.y) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    let lat = row
                        .latitude
                        .ok_or_invalid_point(activity_id, index, "missing latitude")?;
                    let lon = row
                        .longitude
                        .ok_or_invalid_point(activity_id, index, "missing longitude")?;
                    mercator_tile_float(lat, lon, 0)
                }
            };

            if !x.is_finite() || !y.is_finite() {
                return Err(ExplorerError::InvalidTrajectory {
                    activity_id,
                    index,
                    reason: "non-finite coordinates".to_string(),
                });
            }

            // Beyond ~85.05 degrees latitude Mercator leaves [0, 1]; such
            // points belong to the edge tiles.
            Ok(TrajectoryPoint::new(
                row.time,
                x.clamp(0.0, 1.0),
                y.clamp(0.0, 1.0),
                row.segment_id,
            ))
        })
        .collect()
}

/// Lazily emit the tiles touched by a trajectory at `zoom`.
///
/// Every point yields its own tile. Between two points of the same segment
/// whose tiles are more than one tile apart on either axis, the tiles crossed
/// by the straight line between them are emitted first, stamped with the
/// later point's time.
pub fn tiles_from_points(points: &[TrajectoryPoint], zoom: u8) -> TileWalk<'_> {
    TileWalk::new(points, zoom)
}

/// Iterator returned by [`tiles_from_points`].
pub struct TileWalk<'a> {
    points: &'a [TrajectoryPoint],
    scale: f64,
    max_index: u32,
    next: usize,
    line: Option<(Timestamp, LineWalk)>,
}

impl<'a> TileWalk<'a> {
    fn new(points: &'a [TrajectoryPoint], zoom: u8) -> Self {
        let extent = 1u64 << zoom;
        Self {
            points,
            scale: extent as f64,
            max_index: (extent - 1) as u32,
            next: 0,
            line: None,
        }
    }

    fn tile_of(&self, point: &TrajectoryPoint) -> Tile {
        let (fx, fy) = point.scaled(self.scale);
        Tile::new(
            clamp_index(fx.floor() as i64, self.max_index),
            clamp_index(fy.floor() as i64, self.max_index),
        )
    }

    fn emit_point(&mut self) -> Option<TileTouch> {
        let point = self.points.get(self.next)?;
        self.next += 1;
        Some(TileTouch {
            time: point.time,
            tile: self.tile_of(point),
        })
    }
}

impl Iterator for TileWalk<'_> {
    type Item = TileTouch;

    fn next(&mut self) -> Option<TileTouch> {
        if let Some((time, walk)) = self.line.as_mut() {
            if let Some(tile) = walk.next() {
                return Some(TileTouch { time: *time, tile });
            }
            self.line = None;
            return self.emit_point();
        }

        let point = *self.points.get(self.next)?;
        if self.next > 0 {
            let prev = self.points[self.next - 1];
            if prev.segment_id == point.segment_id {
                let a = self.tile_of(&prev);
                let b = self.tile_of(&point);
                if a.x.abs_diff(b.x) > 1 || a.y.abs_diff(b.y) > 1 {
                    let walk = LineWalk::new(
                        prev.scaled(self.scale),
                        point.scaled(self.scale),
                        self.max_index,
                    );
                    self.line = Some((point.time, walk));
                    return self.next();
                }
            }
        }
        self.emit_point()
    }
}

fn clamp_index(value: i64, max_index: u32) -> u32 {
    value.clamp(0, max_index as i64) as u32
}

/// Grid traversal between two points in fractional tile space.
///
/// Yields the 4-connected chain of tiles strictly between the start tile and
/// the end tile, in order of crossing.
#[derive(Debug, Clone)]
pub struct LineWalk {
    cell: (i64, i64),
    end: (i64, i64),
    step: (i64, i64),
    t_max: (f64, f64),
    t_delta: (f64, f64),
    remaining: u64,
    max_index: u32,
}

impl LineWalk {
    pub fn new(from: (f64, f64), to: (f64, f64), max_index: u32) -> Self {
        let cell = (from.0.floor() as i64, from.1.floor() as i64);
        let end = (to.0.floor() as i64, to.1.floor() as i64);
        let (sx, tmx, tdx) = axis_setup(from.0, to.0, cell.0);
        let (sy, tmy, tdy) = axis_setup(from.1, to.1, cell.1);
        let manhattan = cell.0.abs_diff(end.0) + cell.1.abs_diff(end.1);

        Self {
            cell,
            end,
            step: (sx, sy),
            t_max: (tmx, tmy),
            t_delta: (tdx, tdy),
            remaining: manhattan.saturating_sub(1),
            max_index,
        }
    }
}

/// Per-axis step direction, parameter of the first boundary crossing and
/// parameter distance between crossings.
fn axis_setup(from: f64, to: f64, cell: i64) -> (i64, f64, f64) {
    let delta = to - from;
    if delta > 0.0 {
        (1, (cell as f64 + 1.0 - from) / delta, 1.0 / delta)
    } else if delta < 0.0 {
        (-1, (from - cell as f64) / -delta, 1.0 / -delta)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

impl Iterator for LineWalk {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.remaining == 0 {
            return None;
        }

        // Move along x unless the y boundary is strictly closer, or only y
        // still needs to move.
        let x_done = self.cell.0 == self.end.0;
        let y_done = self.cell.1 == self.end.1;
        if !x_done && (y_done || self.t_max.0 <= self.t_max.1) {
            self.cell.0 += self.step.0;
            self.t_max.0 += self.t_delta.0;
        } else {
            self.cell.1 += self.step.1;
            self.t_max.1 += self.t_delta.1;
        }

        if self.cell == self.end {
            self.remaining = 0;
            return None;
        }
        self.remaining -= 1;

        Some(Tile::new(
            clamp_index(self.cell.0, self.max_index),
            clamp_index(self.cell.1, self.max_index),
        ))
    }
}

/// Collapse runs of the same tile, keeping the first touch of each run.
pub fn collapse_runs(touches: impl IntoIterator<Item = TileTouch>) -> Vec<TileTouch> {
    let mut out: Vec<TileTouch> = Vec::new();
    for touch in touches {
        if out.last().map(|last| last.tile) != Some(touch.tile) {
            out.push(touch);
        }
    }
    out
}

/// Move a collapsed touch sequence one zoom level up the quad-tree.
pub fn rollup(touches: &[TileTouch]) -> Vec<TileTouch> {
    collapse_runs(touches.iter().map(TileTouch::parent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercator_origin() {
        let (x, y) = mercator_tile_float(0.0, 0.0, 0);
        assert!((x - 0.5).abs() < 1e-12);
        assert!((y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_line_walk_horizontal() {
        let tiles: Vec<Tile> = LineWalk::new((0.5, 0.5), (3.5, 0.5), 15).collect();
        assert_eq!(tiles, vec![Tile::new(1, 0), Tile::new(2, 0)]);
    }

    #[test]
    fn test_line_walk_adjacent_is_empty() {
        assert_eq!(LineWalk::new((0.5, 0.5), (1.5, 0.5), 15).count(), 0);
        assert_eq!(LineWalk::new((0.5, 0.5), (0.5, 0.5), 15).count(), 0);
    }

    #[test]
    fn test_collapse_runs() {
        let t = |time, x| TileTouch {
            time,
            tile: Tile::new(x, 0),
        };
        let collapsed = collapse_runs(vec![t(0, 1), t(1, 1), t(2, 2), t(3, 1)]);
        assert_eq!(collapsed, vec![t(0, 1), t(2, 2), t(3, 1)]);
    }
}
