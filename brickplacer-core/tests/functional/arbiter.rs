// vim: tw=80
//! Scenarios for the arbiter placer, using the doubles from `util`
use std::cell::Cell;

use pretty_assertions::assert_eq;
use rstest::rstest;

use brickplacer_core::{
    entries::*,
    placer::{ArbiterBrickPlacer, Placer},
    sets::BrickSet,
    Error,
};

use crate::util::*;

fn three_nodes(sizes: [u64; 3]) -> TestDeviceSource {
    let mut dsrc = TestDeviceSource::new();
    dsrc.quick_add("10000000", "11111111", sizes[0]);
    dsrc.quick_add("20000000", "22222222", sizes[1]);
    dsrc.quick_add("30000000", "33333333", sizes[2]);
    dsrc
}

#[test_log::test]
fn place_all() {
    let dsrc = three_nodes([11000, 12000, 13000]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    assert_eq!(ba.brick_sets.len(), 1);
    assert_eq!(ba.device_sets.len(), 1);
    let bs = &ba.brick_sets[0];
    assert!(bs.full());
    assert_eq!(bs.set_size, 3);
    assert_eq!(bs.bricks[0].size(), bs.bricks[1].size());
    assert!(bs.bricks[0].size() > bs.bricks[2].size());
    assert!(nodes_distinct(bs));

    // Every brick was committed to the device that hosts it
    for (brick, device) in ba.pairs() {
        assert_eq!(brick.device_id(), device.id());
        let committed = dsrc.devices[device.id()].committed();
        assert_eq!(committed, vec![brick.id().to_owned()]);
    }
}

#[test_log::test]
fn too_small() {
    let dsrc = three_nodes([810, 820, 830]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let r = placer.place_all(&dsrc, &opts(1), None);
    assert_eq!(r.unwrap_err(), Error::NoDevices);
    assert_eq!(dsrc.committed(), 0);
}

#[test]
fn devices_fail() {
    let mut dsrc = TestDeviceSource::new();
    dsrc.devices_error = Some(Error::Store("Zonk!".to_owned()));
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let r = placer.place_all(&dsrc, &opts(1), None);
    assert_eq!(r.unwrap_err(), Error::Store("Zonk!".to_owned()));
}

#[test_log::test]
fn predicate_block() {
    let dsrc = three_nodes([11000, 12000, 13000]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let pred = |_: &BrickSet, _: &dyn PlacerDevice| false;
    let r = placer.place_all(&dsrc, &opts(1), Some(&pred));
    assert_eq!(r.unwrap_err(), Error::NoDevices);
    assert_eq!(dsrc.committed(), 0);
}

/// A failure in a later set leaves no trace of the earlier ones
#[test_log::test]
fn no_partial_success() {
    let dsrc = three_nodes([11000, 12000, 13000]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let accepted = Cell::new(0);
    let pred = |_: &BrickSet, _: &dyn PlacerDevice| {
        accepted.set(accepted.get() + 1);
        accepted.get() <= 4
    };
    let r = placer.place_all(&dsrc, &opts(2), Some(&pred));
    assert_eq!(r.unwrap_err(), Error::NoDevices);
    assert_eq!(dsrc.committed(), 0);
}

#[test_log::test]
fn brick_on_arbiter_device() {
    let mut dsrc = TestDeviceSource::new();
    dsrc.quick_add("10000000", "11111111", 21000);
    dsrc.quick_add("20000000", "22222222", 22000);
    dsrc.quick_add("30000000", "a3333333", 23000);
    let placer = ArbiterBrickPlacer::new(host_arbiter, host_data);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    assert_eq!(ba.brick_sets.len(), 1);
    assert_eq!(ba.brick_sets[0].bricks[2].device_id(), "a3333333");
    assert_eq!(ba.device_sets[0].devices[2].id(), "a3333333");
}

#[rstest]
#[test_log::test]
fn three_sets(#[values(0, 1, 2, 0xdeadbeef)] seed: u64) {
    let mut dsrc = TestDeviceSource::new();
    dsrc.multi_add("10000000",
        &[("11111111", 10001), ("21111111", 10002), ("31111111", 10003)]);
    dsrc.multi_add("20000000",
        &[("41111111", 10001), ("51111111", 10002), ("61111111", 10003)]);
    dsrc.multi_add("30000000",
        &[("71111111", 10001), ("81111111", 10002), ("91111111", 10003)]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true)
        .with_seed(seed);
    let ba = placer.place_all(&dsrc, &opts(3), None).unwrap();
    assert_eq!(ba.brick_sets.len(), 3);
    assert_eq!(ba.device_sets.len(), 3);
    for (bs, ds) in ba.brick_sets.iter().zip(ba.device_sets.iter()) {
        assert!(bs.full());
        assert!(ds.full());
        assert!(nodes_distinct(bs));
        for (b, d) in bs.bricks.iter().zip(ds.devices.iter()) {
            assert_eq!(b.device_id(), d.id());
            assert_eq!(b.node_id(), d.parent_node_id());
        }
    }
    assert_eq!(dsrc.committed(), 9);
}

#[rstest]
#[test_log::test]
fn three_sets_on_arbiter_devices(#[values(0, 1, 2, 0xdeadbeef)] seed: u64) {
    let mut dsrc = TestDeviceSource::new();
    // data nodes
    dsrc.multi_add("10000000", &[("11111111", 10001), ("21111111", 10002)]);
    dsrc.multi_add("20000000", &[("31111111", 10001), ("41111111", 10002)]);
    dsrc.multi_add("30000000", &[("51111111", 10001), ("61111111", 10002)]);
    dsrc.multi_add("40000000", &[("71111111", 10001), ("81111111", 10002)]);
    // arbiter nodes
    dsrc.quick_add("50000000", "a1111111", 10001);
    dsrc.quick_add("60000000", "a2111111", 10001);
    dsrc.quick_add("70000000", "a3111111", 10001);

    let placer = ArbiterBrickPlacer::new(host_arbiter, host_data)
        .with_seed(seed);
    let ba = placer.place_all(&dsrc, &opts(3), None).unwrap();
    assert_eq!(ba.brick_sets.len(), 3);
    for bs in ba.brick_sets.iter() {
        assert!(nodes_distinct(bs));
        for (j, brick) in bs.bricks.iter().enumerate() {
            let on_arbiter = brick.device_id().starts_with('a');
            assert_eq!(on_arbiter, j == 2, "brick {} of {}", j, bs);
        }
    }
}

#[test_log::test]
fn simple_replace() {
    let mut dsrc = three_nodes([21000, 22000, 23000]);
    dsrc.quick_add("40000000", "44444444", 23000);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    assert_eq!(ba.brick_sets.len(), 1);
    assert_eq!(ba.brick_sets[0].bricks.len(), 3);
    let before = ba.brick_sets[0].to_string();

    let ba2 = placer.replace(&dsrc, &opts(1), None, &ba.brick_sets[0], 0)
        .unwrap();
    assert_eq!(ba2.brick_sets.len(), 1);
    let bs1 = &ba.brick_sets[0];
    let bs2 = &ba2.brick_sets[0];
    assert_eq!(bs2.bricks.len(), 3);
    // The replaced brick differs, and the rest are the same
    assert_ne!(bs1.bricks[0].id(), bs2.bricks[0].id());
    assert_eq!(bs1.bricks[1].id(), bs2.bricks[1].id());
    assert_eq!(bs1.bricks[2].id(), bs2.bricks[2].id());
    // The only node left is the one that didn't host the set
    let spare = dsrc.nodes.values()
        .find(|n| !bs1.node_ids().any(|id| id == n.id))
        .unwrap();
    assert_eq!(bs2.bricks[0].node_id(), spare.id);
    assert_eq!(ba2.device_sets[0].devices[0].id(), spare.devices[0]);
    assert!(nodes_distinct(bs2));
    // The input set is untouched
    assert_eq!(bs1.to_string(), before);
    // Only the new brick was committed
    assert_eq!(dsrc.committed(), 4);
    assert_eq!(dsrc.devices[&spare.devices[0]].committed(),
        vec![bs2.bricks[0].id().to_owned()]);
}

/// The arbiter brick keeps its discounted size when it moves
#[test_log::test]
fn replace_arbiter_size() {
    let mut dsrc = three_nodes([21000, 22000, 23000]);
    dsrc.quick_add("40000000", "44444444", 23000);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    let bs = &ba.brick_sets[0];
    let ba2 = placer.replace(&dsrc, &opts(1), None, bs, 2).unwrap();
    assert_eq!(ba2.brick_sets[0].bricks[2].size(), bs.bricks[2].size());
    assert!(ba2.brick_sets[0].bricks[2].size() < bs.bricks[0].size());
}

#[rstest]
fn replace_index_oob(#[values(3, 9, usize::MAX)] index: usize) {
    let dsrc = three_nodes([21000, 22000, 23000]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    assert_eq!(ba.brick_sets[0].bricks.len(), 3);
    let e = placer.replace(&dsrc, &opts(1), None, &ba.brick_sets[0], index)
        .unwrap_err();
    assert!(e.to_string().contains("out of bounds"), "{}", e);
}

#[test]
fn replace_devices_fail() {
    let mut dsrc = three_nodes([21000, 22000, 23000]);
    dsrc.quick_add("40000000", "44444444", 23000);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    assert_eq!(ba.brick_sets[0].bricks.len(), 3);

    dsrc.devices_error = Some(Error::Store("Zonk!".to_owned()));
    let r = placer.replace(&dsrc, &opts(1), None, &ba.brick_sets[0], 0);
    assert_eq!(r.unwrap_err(), Error::Store("Zonk!".to_owned()));
}

#[test_log::test]
fn replace_too_few() {
    let dsrc = three_nodes([21000, 22000, 23000]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    let bs = &ba.brick_sets[0];
    assert_eq!(bs.bricks.len(), 3);

    let old_device = bs.bricks[0].device_id().to_owned();
    let pred = move |_: &BrickSet, d: &dyn PlacerDevice| d.id() != old_device;
    let r = placer.replace(&dsrc, &opts(1), Some(&pred), bs, 0);
    assert_eq!(r.unwrap_err(), Error::NoDevices);
    assert_eq!(dsrc.committed(), 3);
}

/// With no node to spare, a brick can't move back onto its own node
#[rstest]
#[test_log::test]
fn replace_no_spare_node(#[values(0, 1, 2)] index: usize) {
    let dsrc = three_nodes([21000, 22000, 23000]);
    let placer = ArbiterBrickPlacer::new(host_true, host_true);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    let bs = &ba.brick_sets[0];
    let before = bs.to_string();

    let r = placer.replace(&dsrc, &opts(1), None, bs, index);
    assert_eq!(r.unwrap_err(), Error::NoDevices);
    assert_eq!(dsrc.committed(), 3);
    assert_eq!(bs.to_string(), before);
}

#[test_log::test]
fn replace_too_few_arbiter() {
    let mut dsrc = three_nodes([21000, 22000, 23000]);
    dsrc.quick_add("40000000", "44444444", 24000);
    dsrc.quick_add("50000000", "a5555555", 25000);
    // There are enough devices for a generic replace, but not when limited to
    // arbiter devices.
    let placer = ArbiterBrickPlacer::new(host_arbiter, host_data);
    let ba = placer.place_all(&dsrc, &opts(1), None).unwrap();
    let bs = &ba.brick_sets[0];
    assert_eq!(bs.bricks.len(), 3);
    assert_eq!(bs.bricks[2].device_id(), "a5555555");

    // No other device may host an arbiter
    let old_device = bs.bricks[2].device_id().to_owned();
    let pred = move |_: &BrickSet, d: &dyn PlacerDevice| d.id() != old_device;
    let r = placer.replace(&dsrc, &opts(1), Some(&pred), bs, 2);
    assert_eq!(r.unwrap_err(), Error::NoDevices);

    // But position 1 is a data brick, and a data device is free
    let ba2 = placer.replace(&dsrc, &opts(1), None, bs, 1).unwrap();
    assert_eq!(ba2.brick_sets.len(), 1);
    let bs2 = &ba2.brick_sets[0];
    assert_eq!(bs2.bricks.len(), 3);
    assert!(!bs2.bricks[1].device_id().starts_with('a'));
    assert!(nodes_distinct(bs2));
}

/// Every set size works, and only the last brick of each is an arbiter
#[rstest]
#[test_log::test]
fn set_sizes(#[values(1, 2, 3, 4)] set_size: usize) {
    let mut dsrc = TestDeviceSource::new();
    for i in 0..5 {
        dsrc.quick_add(&format!("n{i}"), &format!("d{i}"), 20000);
    }
    dsrc.quick_add("n5", "a5", 20000);
    let placer = ArbiterBrickPlacer::new(host_arbiter, host_data);
    let mut o = opts(1);
    o.set_size = set_size;
    let ba = placer.place_all(&dsrc, &o, None).unwrap();
    let bs = &ba.brick_sets[0];
    assert_eq!(bs.bricks.len(), set_size);
    assert_eq!(bs.bricks[set_size - 1].device_id(), "a5");
    assert!(nodes_distinct(bs));
}
