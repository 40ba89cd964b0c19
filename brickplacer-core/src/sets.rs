// vim: tw=80
//! The placer's output: position-aligned sets of bricks and devices

use crate::entries::{PlacerBrick, PlacerDevice};
use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc
};

/// One replica group of a volume.
///
/// No two bricks in the same set may share a node.
#[derive(Clone)]
pub struct BrickSet {
    pub set_size: usize,
    pub bricks: Vec<Arc<dyn PlacerBrick>>,
}

impl BrickSet {
    pub fn new(set_size: usize) -> Self {
        BrickSet {
            set_size,
            bricks: Vec::with_capacity(set_size)
        }
    }

    /// Append a brick.  The set must not already be full.
    pub fn add(&mut self, brick: Arc<dyn PlacerBrick>) {
        assert!(!self.full(), "BrickSet is already full");
        self.bricks.push(brick);
    }

    /// Returns a new brick set with the brick at `index` removed.
    ///
    /// Does not preserve brick positions, so it's unsuitable for position
    /// dependent allocations like arbiter sets.
    pub fn drop_brick(&self, index: usize) -> Self {
        let mut bricks = self.bricks.clone();
        bricks.remove(index);
        BrickSet{set_size: self.set_size, bricks}
    }

    pub fn full(&self) -> bool {
        self.bricks.len() == self.set_size
    }

    /// Put `brick` at position `index`, either by replacing an existing brick
    /// or by growing the set by exactly one.
    ///
    /// # Panics
    ///
    /// If `index` is beyond the set size, or would leave a hole.
    pub fn insert(&mut self, index: usize, brick: Arc<dyn PlacerBrick>) {
        assert!(index < self.set_size,
            "Insert index ({index}) out of bounds");
        match index.cmp(&self.bricks.len()) {
            std::cmp::Ordering::Less => self.bricks[index] = brick,
            std::cmp::Ordering::Equal => self.bricks.push(brick),
            std::cmp::Ordering::Greater => panic!(
                "Brick set may only be extended by one (index={}, len={})",
                index, self.bricks.len())
        }
    }

    /// Iterate over the ids of the nodes hosting this set's bricks
    pub fn node_ids(&self) -> impl Iterator<Item=&str> {
        self.bricks.iter().map(|b| b.node_id())
    }
}

impl Debug for BrickSet {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for BrickSet {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let ids = self.bricks.iter()
            .map(|b| b.id())
            .collect::<Vec<_>>();
        write!(f, "BrickSet({}){:?}", self.set_size, ids)
    }
}

/// The devices hosting a [`BrickSet`].
///
/// `devices[i]` always hosts the `BrickSet`'s `bricks[i]`.
#[derive(Clone)]
pub struct DeviceSet {
    pub set_size: usize,
    pub devices: Vec<Arc<dyn PlacerDevice>>,
}

impl DeviceSet {
    pub fn new(set_size: usize) -> Self {
        DeviceSet {
            set_size,
            devices: Vec::with_capacity(set_size)
        }
    }

    pub fn add(&mut self, device: Arc<dyn PlacerDevice>) {
        assert!(!self.full(), "DeviceSet is already full");
        self.devices.push(device);
    }

    pub fn full(&self) -> bool {
        self.devices.len() == self.set_size
    }

    /// Like [`BrickSet::insert`]
    pub fn insert(&mut self, index: usize, device: Arc<dyn PlacerDevice>) {
        assert!(index < self.set_size,
            "Insert index ({index}) out of bounds");
        match index.cmp(&self.devices.len()) {
            std::cmp::Ordering::Less => self.devices[index] = device,
            std::cmp::Ordering::Equal => self.devices.push(device),
            std::cmp::Ordering::Greater => panic!(
                "Device set may only be extended by one (index={}, len={})",
                index, self.devices.len())
        }
    }
}

impl Debug for DeviceSet {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let ids = self.devices.iter()
            .map(|d| d.id())
            .collect::<Vec<_>>();
        write!(f, "DeviceSet({}){:?}", self.set_size, ids)
    }
}

/// The result of a successful placement.
///
/// `brick_sets[i]` is hosted by `device_sets[i]`.
#[derive(Clone, Debug, Default)]
pub struct BrickAllocation {
    pub brick_sets: Vec<BrickSet>,
    pub device_sets: Vec<DeviceSet>,
}

impl BrickAllocation {
    /// Every (brick, device) pair, in set order
    pub fn pairs(&self)
        -> impl Iterator<Item=(&Arc<dyn PlacerBrick>, &Arc<dyn PlacerDevice>)>
    {
        self.brick_sets.iter()
            .zip(self.device_sets.iter())
            .flat_map(|(bs, ds)| bs.bricks.iter().zip(ds.devices.iter()))
    }
}
