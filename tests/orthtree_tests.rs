use ahash::AHashSet;
use glam::{ dvec2, dvec3, DVec2 };
use orthtree::{ ItemHandle, OrthtreeConfig, OrthtreeError, OrthtreeIndex, Point, Region };
use rand::{ rngs::SmallRng, Rng, SeedableRng };

//// Utility functions

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rect(min: DVec2, max: DVec2) -> Region {
    Region::new(min.into(), max.into()).unwrap()
}

fn square_tree<T>(capacity: usize, max_depth: usize) -> OrthtreeIndex<T> {
    OrthtreeIndex::new(rect(dvec2(0.0, 0.0), dvec2(100.0, 100.0)), 2, capacity, max_depth).unwrap()
}

fn random_points(n: usize, seed: u64) -> Vec<Point> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| dvec2(rng.gen_range(0.0..=100.0), rng.gen_range(0.0..=100.0)).into())
        .collect()
}

//// Tests

#[test]
fn test_clustered_scenario() {
    init_logger();
    let mut tree = square_tree(4, 5);
    for i in 1..=5 {
        tree.insert(Point::from(dvec2(i as f64, i as f64)), i).unwrap();
    }

    // One subdivision: the root plus its four quadrants
    let stats = tree.stats();
    assert_eq!(stats.node_count, 5);
    assert_eq!(stats.item_count, 5);

    let near = tree.query_region(&rect(dvec2(0.0, 0.0), dvec2(10.0, 10.0)));
    let mut values: Vec<i32> = near.map(|item| *item.value).collect();
    values.sort();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);

    assert_eq!(tree.query_region(&rect(dvec2(50.0, 50.0), dvec2(60.0, 60.0))).count(), 0);
}

#[test]
fn test_full_bounds_round_trip() {
    init_logger();
    let capacity = 8;
    for &n in [0, 1, capacity, capacity * 10].iter() {
        let mut tree = square_tree(capacity, 8);
        let points = random_points(n, 342 + n as u64);
        let handles: Vec<ItemHandle> = points.iter()
            .enumerate()
            .map(|(i, point)| tree.insert(point.clone(), i).unwrap())
            .collect();
        assert_eq!(tree.len(), n);

        let bounds = tree.bounds().clone();
        let found: Vec<ItemHandle> = tree.query_region(&bounds).map(|item| item.handle).collect();
        assert_eq!(found.len(), n);
        let unique: AHashSet<ItemHandle> = found.iter().copied().collect();
        assert_eq!(unique.len(), n, "duplicate items returned for n = {n}");
        assert!(handles.iter().all(|handle| unique.contains(handle)));
    }
}

#[test]
fn test_query_matches_brute_force() {
    let mut tree = square_tree(4, 10);
    let points = random_points(500, 7);
    for (i, point) in points.iter().enumerate() {
        tree.insert(point.clone(), i).unwrap();
    }

    let mut rng = SmallRng::seed_from_u64(99);
    for _ in 0..50 {
        let a = dvec2(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        let b = dvec2(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        let window = rect(a.min(b), a.max(b));

        let mut found: Vec<usize> = tree.query_region(&window).map(|item| *item.value).collect();
        found.sort();
        let expected: Vec<usize> = points.iter()
            .enumerate()
            .filter(|(_, point)| window.contains(point))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(found, expected);
    }
}

#[test]
fn test_removed_items_never_returned() {
    let mut tree = square_tree(3, 6);
    let points = random_points(200, 11);
    let handles: Vec<ItemHandle> = points.iter()
        .enumerate()
        .map(|(i, point)| tree.insert(point.clone(), i).unwrap())
        .collect();

    let removed: AHashSet<ItemHandle> = handles.iter().step_by(3).copied().collect();
    for &handle in removed.iter() {
        assert!(tree.remove(handle));
    }
    assert_eq!(tree.len(), handles.len() - removed.len());

    let bounds = tree.bounds().clone();
    assert!(tree.query_region(&bounds).all(|item| !removed.contains(&item.handle)));
    for (point, handle) in points.iter().zip(handles.iter()) {
        let hits: Vec<ItemHandle> = tree.query_point(point).map(|item| item.handle).collect();
        assert_eq!(hits.contains(handle), !removed.contains(handle));
    }
}

#[test]
fn test_remove_twice() {
    let mut tree = square_tree(4, 5);
    let handle = tree.insert(Point::from(dvec2(10.0, 10.0)), "a").unwrap();
    assert!(tree.contains(handle));
    assert!(tree.remove(handle));
    assert!(!tree.remove(handle));
    assert_eq!(tree.take(handle), Err(OrthtreeError::StaleHandle));
    assert!(!tree.contains(handle));
}

#[test]
fn test_take_returns_value() {
    let mut tree = square_tree(4, 5);
    let handle = tree.insert(Point::from(dvec2(10.0, 10.0)), String::from("payload")).unwrap();
    *tree.get_mut(handle).unwrap() += "!";
    assert_eq!(tree.get(handle).map(|item| item.value.as_str()), Some("payload!"));
    assert_eq!(tree.take(handle).unwrap(), "payload!");
    assert!(tree.get(handle).is_none());
}

#[test]
fn test_subdivided_node_reverts_to_leaf() {
    init_logger();
    let mut tree = square_tree(2, 5);
    let handles: Vec<ItemHandle> = (0..6)
        .map(|i| tree.insert(Point::from(dvec2(60.0 + i as f64, 70.0)), i).unwrap())
        .collect();
    assert!(tree.stats().node_count > 1);

    for handle in handles {
        assert!(tree.remove(handle));
    }
    let stats = tree.stats();
    assert_eq!(stats.node_count, 1);
    assert_eq!(stats.leaf_count, 1);
    assert_eq!(stats.depth, 0);

    let handle = tree.insert(Point::from(dvec2(61.0, 70.0)), 42).unwrap();
    assert_eq!(tree.stats().node_count, 1);
    let found: Vec<ItemHandle> = tree.query_point(&dvec2(61.0, 70.0).into()).map(|item| item.handle).collect();
    assert_eq!(found, vec![handle]);
}

#[test]
fn test_out_of_bounds_leaves_tree_unchanged() {
    let mut tree = square_tree(4, 5);
    tree.insert(Point::from(dvec2(1.0, 1.0)), 0).unwrap();

    assert_eq!(tree.insert(Point::from(dvec2(101.0, 50.0)), 1), Err(OrthtreeError::OutOfBounds));
    assert_eq!(
        tree.insert(rect(dvec2(150.0, 150.0), dvec2(200.0, 200.0)), 2),
        Err(OrthtreeError::OutOfBounds)
    );
    assert_eq!(tree.insert(Point::from(dvec2(f64::NAN, 50.0)), 3), Err(OrthtreeError::OutOfBounds));
    assert_eq!(
        tree.insert(Point::from(dvec3(1.0, 1.0, 1.0)), 4),
        Err(OrthtreeError::DimensionMismatch { expected: 2, found: 3 })
    );
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.stats().node_count, 1);

    // Points on the boundary are inside
    assert!(tree.insert(Point::from(dvec2(100.0, 100.0)), 5).is_ok());
}

#[test]
fn test_region_items() {
    let mut tree = square_tree(2, 5);
    let wide = tree.insert(rect(dvec2(10.0, 10.0), dvec2(90.0, 20.0)), "wide").unwrap();
    let small = tree.insert(rect(dvec2(70.0, 70.0), dvec2(72.0, 72.0)), "small").unwrap();
    tree.insert(Point::from(dvec2(5.0, 5.0)), "a").unwrap();
    tree.insert(Point::from(dvec2(95.0, 5.0)), "b").unwrap();

    let hits: Vec<ItemHandle> = tree.query_point(&dvec2(50.0, 15.0).into()).map(|item| item.handle).collect();
    assert_eq!(hits, vec![wide]);
    let hits: Vec<ItemHandle> = tree.query_region(&rect(dvec2(71.0, 71.0), dvec2(80.0, 80.0)))
        .map(|item| item.handle)
        .collect();
    assert_eq!(hits, vec![small]);
    assert!(tree.get(small).unwrap().shape.as_region().is_some());
}

#[test]
fn test_query_order_is_deterministic() {
    let mut tree = square_tree(1, 4);
    // One point per quadrant, inserted out of quadrant order
    tree.insert(Point::from(dvec2(75.0, 75.0)), 3).unwrap();
    tree.insert(Point::from(dvec2(25.0, 75.0)), 2).unwrap();
    tree.insert(Point::from(dvec2(75.0, 25.0)), 1).unwrap();
    tree.insert(Point::from(dvec2(25.0, 25.0)), 0).unwrap();

    let bounds = tree.bounds().clone();
    let order: Vec<i32> = tree.query_region(&bounds).map(|item| *item.value).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
    // Restartable: a second walk gives the same answer
    let again: Vec<i32> = tree.iter().map(|item| *item.value).collect();
    assert_eq!(order, again);
}

#[test]
fn test_nearest() {
    let mut tree = square_tree(2, 6);
    tree.insert(Point::from(dvec2(10.0, 10.0)), "far").unwrap();
    tree.insert(Point::from(dvec2(52.0, 50.0)), "close").unwrap();
    tree.insert(Point::from(dvec2(50.0, 55.0)), "mid").unwrap();
    tree.insert(rect(dvec2(45.0, 40.0), dvec2(48.0, 60.0)), "box").unwrap();

    let origin: Point = dvec2(50.0, 50.0).into();
    let nearest = tree.nearest(&origin, 3);
    let names: Vec<&str> = nearest.iter().map(|n| *n.item.value).collect();
    assert_eq!(names, vec!["close", "box", "mid"]);
    assert_eq!(nearest[0].distance, 2.0);
    assert_eq!(nearest[2].distance, 5.0);

    assert_eq!(tree.nearest(&origin, 10).len(), 4);
    assert!(tree.nearest(&origin, 0).is_empty());
    assert_eq!(tree.nearest_within(&origin, 10, 2.5).len(), 2);
}

#[test]
fn test_nearest_ties_follow_insertion_order() {
    let mut tree = square_tree(1, 6);
    let origin: Point = dvec2(50.0, 50.0).into();
    // Equidistant points, spread over different quadrants
    let first = tree.insert(Point::from(dvec2(60.0, 50.0)), 0).unwrap();
    let second = tree.insert(Point::from(dvec2(40.0, 50.0)), 1).unwrap();
    let third = tree.insert(Point::from(dvec2(50.0, 40.0)), 2).unwrap();
    tree.insert(Point::from(dvec2(50.0, 30.0)), 3).unwrap();

    let handles: Vec<ItemHandle> = tree.nearest(&origin, 3).iter().map(|n| n.item.handle).collect();
    assert_eq!(handles, vec![first, second, third]);
}

#[test]
fn test_nearest_matches_brute_force() {
    let mut tree = square_tree(4, 10);
    let points = random_points(400, 1234);
    for (i, point) in points.iter().enumerate() {
        tree.insert(point.clone(), i).unwrap();
    }

    let mut rng = SmallRng::seed_from_u64(5);
    for _ in 0..25 {
        let target: Point = dvec2(rng.gen_range(-20.0..120.0), rng.gen_range(-20.0..120.0)).into();
        let found = tree.nearest(&target, 7);
        assert_eq!(found.len(), 7);
        assert!(found.windows(2).all(|pair| pair[0].distance <= pair[1].distance));

        let mut expected: Vec<f64> = points.iter().map(|point| point.distance(&target)).collect();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let distances: Vec<f64> = found.iter().map(|n| n.distance).collect();
        assert_eq!(distances, expected[..7].to_vec());
    }
}

#[test]
fn test_mismatched_queries_are_empty() {
    let mut tree = square_tree(4, 5);
    tree.insert(Point::from(dvec2(1.0, 1.0)), 0).unwrap();

    let cube = Region::new(dvec3(0.0, 0.0, 0.0).into(), dvec3(10.0, 10.0, 10.0).into()).unwrap();
    assert_eq!(tree.query_region(&cube).count(), 0);
    assert_eq!(tree.query_point(&dvec3(1.0, 1.0, 1.0).into()).count(), 0);
    assert!(tree.nearest(&dvec3(1.0, 1.0, 1.0).into(), 1).is_empty());
}

#[test]
fn test_higher_dimensions() {
    let dims = 5;
    let bounds = Region::new(Point::splat(dims, 0.0).unwrap(), Point::splat(dims, 1.0).unwrap()).unwrap();
    let mut tree = OrthtreeIndex::with_config(OrthtreeConfig::new(bounds, 4, 4)).unwrap();
    assert_eq!(tree.dimensions(), 5);

    let mut rng = SmallRng::seed_from_u64(8);
    let points: Vec<Point> = (0..300)
        .map(|_| {
            let coords: Vec<f64> = (0..dims).map(|_| rng.gen_range(0.0..1.0)).collect();
            Point::new(&coords).unwrap()
        })
        .collect();
    for (i, point) in points.iter().enumerate() {
        tree.insert(point.clone(), i).unwrap();
    }

    let stats = tree.stats();
    assert!(stats.depth <= 4);
    // Every internal node has 2^5 children
    assert_eq!((stats.node_count - 1) % 32, 0);

    let half = Region::new(Point::splat(dims, 0.0).unwrap(), Point::splat(dims, 0.5).unwrap()).unwrap();
    let expected = points.iter().filter(|point| half.contains(point)).count();
    assert_eq!(tree.query_region(&half).count(), expected);
}

#[test]
fn test_clear() {
    let mut tree = square_tree(2, 5);
    let handles: Vec<ItemHandle> = random_points(50, 3).into_iter()
        .enumerate()
        .map(|(i, point)| tree.insert(point, i).unwrap())
        .collect();
    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.stats().node_count, 1);
    assert!(!tree.remove(handles[0]));

    // New handles never collide with pre-clear ones
    let fresh = tree.insert(Point::from(dvec2(1.0, 1.0)), 0).unwrap();
    assert!(!handles.contains(&fresh));
}

#[test]
fn test_config_round_trip() {
    let tree: OrthtreeIndex<()> = square_tree(6, 3);
    let config = tree.config();
    assert_eq!(config.capacity, 6);
    assert_eq!(config.max_depth, 3);
    assert_eq!(config.dimensions, 2);
    let copy: OrthtreeIndex<()> = OrthtreeIndex::with_config(config).unwrap();
    assert_eq!(copy.bounds(), tree.bounds());
}

#[cfg(feature = "multi-thread")]
#[test]
fn test_parallel_queries() {
    let mut tree = square_tree(4, 8);
    for (i, point) in random_points(300, 21).into_iter().enumerate() {
        tree.insert(point, i).unwrap();
    }
    let windows = vec![
        rect(dvec2(0.0, 0.0), dvec2(50.0, 50.0)),
        rect(dvec2(25.0, 25.0), dvec2(75.0, 75.0)),
        rect(dvec2(90.0, 0.0), dvec2(100.0, 100.0)),
    ];
    let results = tree.par_query_regions(&windows);
    for (window, found) in windows.iter().zip(results.iter()) {
        let sequential: Vec<ItemHandle> = tree.query_region(window).map(|item| item.handle).collect();
        let parallel: Vec<ItemHandle> = found.iter().map(|item| item.handle).collect();
        assert_eq!(sequential, parallel);
    }
}
