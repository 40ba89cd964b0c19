// vim: tw=80
//! The device ring: a randomized, zone-balanced traversal order over a device
//! snapshot.
//!
//! Devices are grouped by zone and then by node.  Each level is shuffled, and
//! the groups are interleaved round-robin so that consecutive ring entries
//! tend to come from different nodes and different zones.  Finally the whole
//! list is rotated by a random offset.
//!
//! Slot filling consumes the ring greedily.  Each scan resumes where the last
//! one stopped and gives up after one full lap.  The lap limit applies to
//! each slot, not to the whole placement, so a request with many slots may
//! go around the ring several times.  There is no backtracking, so some
//! topologies that could host a request under a different assignment order
//! will still fail.

use crate::entries::DeviceAndNode;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_xorshift::XorShiftRng;
use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH}
};

/// Seed derived from the wall clock.  Placements need not be reproducible.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Merge several lists by taking one element from each in turn
fn interleave<T>(lists: Vec<Vec<T>>) -> Vec<T> {
    let total = lists.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    let mut iters = lists.into_iter()
        .map(Vec::into_iter)
        .collect::<Vec<_>>();
    while out.len() < total {
        for it in iters.iter_mut() {
            if let Some(x) = it.next() {
                out.push(x);
            }
        }
    }
    out
}

pub struct Ring {
    entries: Vec<DeviceAndNode>,
    /// Index of the next entry to examine
    cursor: usize,
}

impl Ring {
    /// Build a ring from a device snapshot
    pub fn new(snapshot: Vec<DeviceAndNode>, seed: u64) -> Self {
        let mut rng = XorShiftRng::seed_from_u64(seed);

        let mut zones: BTreeMap<i32, BTreeMap<String, Vec<DeviceAndNode>>>
            = BTreeMap::new();
        for dn in snapshot {
            zones.entry(dn.node.zone())
                .or_default()
                .entry(dn.node.id().to_owned())
                .or_default()
                .push(dn);
        }

        let mut zone_lists = zones.into_values()
            .map(|nodes| {
                let mut node_lists = nodes.into_values()
                    .map(|mut devices| {
                        devices.shuffle(&mut rng);
                        devices
                    }).collect::<Vec<_>>();
                node_lists.shuffle(&mut rng);
                interleave(node_lists)
            }).collect::<Vec<_>>();
        zone_lists.shuffle(&mut rng);
        let mut entries = interleave(zone_lists);

        if !entries.is_empty() {
            let offset = rng.gen_range(0..entries.len());
            entries.rotate_left(offset);
        }
        Ring{entries, cursor: 0}
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over the whole ring in order, regardless of the cursor
    pub fn iter(&self) -> impl Iterator<Item=&DeviceAndNode> {
        self.entries.iter()
    }

    /// Scan at most one lap of the ring, starting at the cursor, for an entry
    /// that `f` accepts.
    ///
    /// On success the cursor moves just past the accepted entry.  On failure
    /// the cursor ends where it began.
    pub fn scan<T, F>(&mut self, mut f: F) -> Option<T>
        where F: FnMut(&DeviceAndNode) -> Option<T>
    {
        let n = self.entries.len();
        for step in 0..n {
            let i = (self.cursor + step) % n;
            if let Some(t) = f(&self.entries[i]) {
                self.cursor = (i + 1) % n;
                return Some(t);
            }
        }
        None
    }
}
