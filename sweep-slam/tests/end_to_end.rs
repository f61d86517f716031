//! End-to-end tests: samples in, pose and map out.
//!
//! A ring of returns around a stationary sensor is the reference scene:
//! 360 samples at 1° spacing, 2 m range, sensor at (5, 5) on a 10 m grid.
//!
//! Most scenarios run with steep confidence deltas (hit +30000, miss -13000)
//! so a single revolution already crosses both display thresholds. With the
//! default deltas (+2000 / -500) one revolution leaves the ring Unknown; the
//! weakest ring cells gain a net 1500 per revolution and need nine identical
//! revolutions to clear the 45000 occupied threshold.

use std::thread;
use std::time::{Duration, Instant};

use sweep_io::{MockSource, Sample, SampleChannel, StreamReader, StreamReaderConfig, encode_frame};
use sweep_slam::algorithms::mapping::{
    BASELINE_CONFIDENCE, CellState, GridConfig, OccupancyGrid, cells_excluding_end,
};
use sweep_slam::algorithms::matching::{PoseEstimator, PoseEstimatorConfig};
use sweep_slam::core::types::Pose2D;
use sweep_slam::engine::slam::{SlamConfig, SlamEngine, SlamEngineConfig};

const RING_RANGE: f32 = 2.0;

fn ring_scan() -> Vec<Sample> {
    (0..360)
        .filter_map(|i| Sample::new((i as f32).to_radians(), RING_RANGE))
        .collect()
}

/// Steep deltas: one revolution settles the ring and the interior.
fn grid_config() -> GridConfig {
    GridConfig {
        width: 200,
        height: 200,
        resolution: 0.05,
        hit_increment: 30000,
        miss_decrement: 13000,
        ..Default::default()
    }
}

fn slam_config(trials: usize) -> SlamConfig {
    SlamConfig {
        grid: grid_config(),
        estimator: PoseEstimatorConfig {
            trials,
            seed: Some(3),
            ..Default::default()
        },
        engine: SlamEngineConfig::default(),
    }
}

/// Cells where the ring samples land when taken from `pose`.
fn hit_cells(grid: &OccupancyGrid, pose: &Pose2D, samples: &[Sample]) -> Vec<(i32, i32)> {
    let mut cells: Vec<(i32, i32)> = samples
        .iter()
        .map(|s| {
            let p = pose.project(s);
            grid.world_to_cell_signed(p.x, p.y)
        })
        .collect();
    cells.sort_unstable();
    cells.dedup();
    cells
}

/// Cells traversed by the rays whose centers lie within `radius` of the pose.
fn interior_cells(
    grid: &OccupancyGrid,
    pose: &Pose2D,
    samples: &[Sample],
    radius: f32,
) -> Vec<(i32, i32)> {
    let origin = grid.world_to_cell_signed(pose.x, pose.y);
    let mut cells = Vec::new();
    for (hx, hy) in hit_cells(grid, pose, samples) {
        for (x, y) in cells_excluding_end(origin, (hx, hy)) {
            let center = grid.cell_to_world(x as usize, y as usize);
            if center.distance(&pose.position()) < radius {
                cells.push((x, y));
            }
        }
    }
    cells.sort_unstable();
    cells.dedup();
    cells
}

#[test]
fn test_ring_scan_builds_map() {
    let mut engine = SlamEngine::new(slam_config(200)).unwrap();
    let pose = Pose2D::new(5.0, 5.0, 0.0);
    assert_eq!(engine.pose(), pose);

    let scan = ring_scan();
    let update = engine.process_batch(scan.clone());

    let estimate = update.estimate.unwrap();
    assert!(estimate.bootstrapped, "empty map must keep the prior");
    assert_eq!(update.pose, pose);

    let grid = engine.grid();
    let ring = hit_cells(grid, &pose, &scan);
    assert!(ring.len() > 100);
    for &(x, y) in &ring {
        assert_eq!(
            grid.state(x as usize, y as usize),
            CellState::Occupied,
            "ring cell ({}, {}) should be occupied",
            x,
            y
        );
    }

    let interior = interior_cells(grid, &pose, &scan, 1.8);
    assert!(!interior.is_empty());
    for &(x, y) in &interior {
        assert_eq!(
            grid.state(x as usize, y as usize),
            CellState::Free,
            "interior cell ({}, {}) should be free",
            x,
            y
        );
    }

    // Nothing outside the ring was observed
    let far = grid.world_to_cell(9.5, 9.5).unwrap();
    assert_eq!(grid.confidence(far.0, far.1), None);
    assert_eq!(grid.state(far.0, far.1), CellState::Unknown);
}

#[test]
fn test_default_deltas_need_several_revolutions() {
    let mut grid = OccupancyGrid::new(GridConfig::default()).unwrap();
    let pose = grid.initial_pose();
    let scan = ring_scan();
    let ring = hit_cells(&grid, &pose, &scan);

    let ring_values = |grid: &OccupancyGrid| -> Vec<u16> {
        ring.iter()
            .map(|&(x, y)| grid.confidence(x as usize, y as usize).unwrap())
            .collect()
    };
    let occupied = |grid: &OccupancyGrid| {
        ring.iter()
            .filter(|&&(x, y)| grid.state(x as usize, y as usize) == CellState::Occupied)
            .count()
    };

    grid.integrate(&scan, &pose);
    let mut previous = ring_values(&grid);
    assert!(previous.iter().all(|&c| c > BASELINE_CONFIDENCE));
    assert_eq!(occupied(&grid), 0, "one revolution must not settle the ring");
    assert_eq!(grid.counts().occupied, 0);

    let mut revolutions = 1;
    while occupied(&grid) < ring.len() {
        assert!(revolutions < 20, "ring never became occupied");
        grid.integrate(&scan, &pose);
        revolutions += 1;

        let current = ring_values(&grid);
        for (&old, &new) in previous.iter().zip(&current) {
            assert!(new >= old, "ring cell weakened {} -> {}", old, new);
        }
        previous = current;
    }

    assert_eq!(revolutions, 9);
}

#[test]
fn test_repeated_scan_keeps_pose_and_reinforces_ring() {
    let mut engine = SlamEngine::new(slam_config(500)).unwrap();
    let pose = Pose2D::new(5.0, 5.0, 0.0);
    let scan = ring_scan();

    engine.process_batch(scan.clone());
    let ring = hit_cells(engine.grid(), &pose, &scan);
    let before: Vec<u16> = ring
        .iter()
        .map(|&(x, y)| engine.grid().confidence(x as usize, y as usize).unwrap())
        .collect();

    let update = engine.process_batch(scan);
    let estimate = update.estimate.unwrap();

    // The prior already explains every scored sample, so no trial beats it
    assert!(!estimate.bootstrapped);
    assert_eq!(estimate.score, 180.0);
    assert_eq!(update.pose, pose);
    assert_eq!(engine.batches(), 2);

    for (&(x, y), &old) in ring.iter().zip(&before) {
        let new = engine.grid().confidence(x as usize, y as usize).unwrap();
        assert!(new >= old, "ring cell ({}, {}) dropped {} -> {}", x, y, old, new);
        assert_eq!(engine.grid().state(x as usize, y as usize), CellState::Occupied);
    }
}

#[test]
fn test_estimator_prefers_true_pose_over_shifted_prior() {
    let mut grid = OccupancyGrid::new(grid_config()).unwrap();
    let truth = Pose2D::new(5.0, 5.0, 0.0);
    let scan = ring_scan();
    grid.integrate(&scan, &truth);
    grid.integrate(&scan, &truth);

    let estimator = PoseEstimator::new(PoseEstimatorConfig {
        seed: Some(11),
        ..Default::default()
    })
    .unwrap();

    let shifted = truth.offset(0.15, -0.1, 0.0);
    assert!(estimator.score(&scan, &truth, &grid) > estimator.score(&scan, &shifted, &grid));
}

#[test]
fn test_samples_flow_from_reader_to_map() {
    let source = MockSource::new();
    for k in 0..10 {
        let start = k as f32 * 36.0;
        source.push_bytes(&encode_frame(0x00, start, start + 35.0, &[2000.0; 36]));
    }

    let channel = SampleChannel::new();
    let mut reader = StreamReader::new(
        Box::new(source.clone()),
        channel.clone(),
        StreamReaderConfig::default(),
    );
    reader.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while channel.len() < 360 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    reader.stop().unwrap();
    assert_eq!(channel.len(), 360);
    assert_eq!(reader.stats().frames, 10);

    let mut engine = SlamEngine::new(slam_config(100)).unwrap();
    let update = engine.process(&channel);

    assert_eq!(update.samples.len(), 360);
    assert!(update.estimate.unwrap().bootstrapped);
    assert!(channel.is_empty());

    let counts = engine.grid().counts();
    assert!(counts.occupied > 100);
    assert!(counts.free > 0);
    assert_eq!(
        engine.snapshot().count(CellState::Occupied),
        counts.occupied
    );
}

#[test]
fn test_batch_limit_spreads_scan_over_ticks() {
    let mut config = slam_config(50);
    config.engine.batch_limit = 100;
    let mut engine = SlamEngine::new(config).unwrap();

    let channel = SampleChannel::new();
    channel.push_all(ring_scan());

    let sizes: Vec<usize> = (0..5).map(|_| engine.process(&channel).samples.len()).collect();
    assert_eq!(sizes, vec![100, 100, 100, 60, 0]);
    assert_eq!(engine.batches(), 4);
}
