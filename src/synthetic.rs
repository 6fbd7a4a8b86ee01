//! Synthetic activity generator for stress testing and benchmarking.
//!
//! Produces repositories of GPS tracks around an origin. Tracks either wander
//! randomly or sweep a rectangle row by row, so that a dataset fills in a
//! dense block of explorer tiles and exercises cluster and square growth.
//!
//! Feature-gated behind `synthetic`, not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use explorer_tiles::synthetic::{SyntheticScenario, TrackPattern};
//!
//! let scenario = SyntheticScenario {
//!     origin: (47.37, 8.55),
//!     activity_count: 20,
//!     pattern: TrackPattern::Sweep { rows: 4, row_spacing_m: 150.0 },
//!     track_length_m: 3_000.0,
//!     segment_break_probability: 0.0,
//!     seed: 42,
//! };
//!
//! let repo = scenario.generate();
//! assert_eq!(repo.len(), 20);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::repository::InMemoryRepository;
use crate::{ActivityMeta, TimeSeriesRow};

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Shape of generated tracks.
#[derive(Debug, Clone, Copy)]
pub enum TrackPattern {
    /// Random walk with bounded heading changes.
    Wander,
    /// Back-and-forth rows covering a rectangle next to the previous activity.
    Sweep { rows: u32, row_spacing_m: f64 },
}

/// Scenario configuration for generating synthetic data.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// (latitude, longitude) of the first track start
    pub origin: (f64, f64),
    pub activity_count: u32,
    pub pattern: TrackPattern,
    /// Approximate length of each track in meters
    pub track_length_m: f64,
    /// Chance per point of starting a new recording segment
    pub segment_break_probability: f64,
    pub seed: u64,
}

impl SyntheticScenario {
    /// Generate the repository for this scenario.
    ///
    /// Activity ids are `1..=activity_count`, one hour apart, every fifth
    /// activity is not achievement-eligible.
    pub fn generate(&self) -> InMemoryRepository {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut repo = InMemoryRepository::new();

        for i in 0..self.activity_count {
            let id = u64::from(i) + 1;
            let start = 1_600_000_000 + i64::from(i) * 3600;
            let rows = match self.pattern {
                TrackPattern::Wander => self.wander(&mut rng, start),
                TrackPattern::Sweep {
                    rows,
                    row_spacing_m,
                } => self.sweep(&mut rng, start, i, rows, row_spacing_m),
            };
            let meta = ActivityMeta::new(id, i % 5 != 4).with_start(start);
            repo.insert(meta, rows);
        }
        repo
    }

    fn wander(&self, rng: &mut StdRng, start: i64) -> Vec<TimeSeriesRow> {
        let step_m = 10.0;
        let steps = (self.track_length_m / step_m).max(2.0) as usize;
        let (mut lat, mut lon) = self.origin;
        let mut heading: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let mut segment = 0;

        (0..steps)
            .map(|k| {
                if rng.gen_bool(self.segment_break_probability) {
                    segment += 1;
                }
                heading += rng.gen_range(-0.5..0.5);
                let (dlat, dlon) = offset_degrees(lat, step_m * heading.cos(), step_m * heading.sin());
                lat += dlat;
                lon += dlon;
                TimeSeriesRow::from_lat_lon(start + k as i64 * 3, lat, lon, segment)
            })
            .collect()
    }

    fn sweep(
        &self,
        rng: &mut StdRng,
        start: i64,
        index: u32,
        rows: u32,
        row_spacing_m: f64,
    ) -> Vec<TimeSeriesRow> {
        let rows = rows.max(1);
        let row_length_m = self.track_length_m / f64::from(rows);
        let step_m = 25.0;
        let steps_per_row = (row_length_m / step_m).max(1.0) as u32;
        let band_north_m = f64::from(index) * f64::from(rows) * row_spacing_m;
        let (lat0, lon0) = self.origin;
        let mut segment = 0;
        let mut out = Vec::new();

        for row in 0..rows {
            let north_m = band_north_m + f64::from(row) * row_spacing_m;
            for k in 0..=steps_per_row {
                let along = f64::from(k) * step_m;
                let east_m = if row % 2 == 0 { along } else { row_length_m - along };
                if rng.gen_bool(self.segment_break_probability) {
                    segment += 1;
                }
                let (dlat, dlon) = offset_degrees(lat0, north_m, east_m);
                let time = start + i64::from(row * (steps_per_row + 1) + k) * 5;
                out.push(TimeSeriesRow::from_lat_lon(time, lat0 + dlat, lon0 + dlon, segment));
            }
        }
        out
    }
}

/// Convert a north/east offset in meters to degrees at `lat`.
fn offset_degrees(lat: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let dlat = north_m / METERS_PER_DEGREE_LAT;
    let dlon = east_m / (METERS_PER_DEGREE_LAT * lat.to_radians().cos());
    (dlat, dlon)
}
