// vim: tw=80
//! Greedy slot filling, shared by every [`Placer`](super::Placer).
//!
//! Placement has two phases.  First every slot of every set is filled using
//! only [`PlacerDevice::new_brick`], which probes capacity and may hold space
//! for the brick.  Only once the whole request is satisfied are the bricks
//! committed with [`PlacerDevice::brick_add`].  If the first phase fails,
//! every probed brick is handed back with [`PlacerDevice::brick_discard`], so
//! the inventory ends up as it started.

use crate::{
    entries::*,
    ring::{Ring, clock_seed},
    sets::*,
    sizing::SizeStrategy,
    types::*,
};
use std::{
    collections::HashSet,
    sync::Arc
};
use super::{DevicePredicate, SetPredicate};

/// The kind of brick occupying a position in a set
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum Role {
    Data,
    Arbiter,
}

/// Everything the placer needs to know about one slot
struct Slot<'a> {
    index: usize,
    size: u64,
    can_host: Option<&'a DevicePredicate>,
}

/// A brick chosen during the first phase, not yet committed
type Choice = (Arc<dyn PlacerBrick>, Arc<dyn PlacerDevice>, String);

pub(super) struct Engine {
    /// Whether the last brick of every set is an arbiter
    pub arbiter: bool,
    pub can_host_arbiter: Option<Box<DevicePredicate>>,
    pub can_host_data: Option<Box<DevicePredicate>>,
    pub sizing: Arc<dyn SizeStrategy>,
    pub seed: Option<u64>,
    pub span: tracing::Span,
}

/// Target brick sizes, by role
struct Sizes {
    data: u64,
    arbiter: Option<u64>,
}

impl Engine {
    fn role(&self, index: usize, set_size: usize) -> Role {
        if self.arbiter && index + 1 == set_size {
            Role::Arbiter
        } else {
            Role::Data
        }
    }

    fn sizes(&self, opts: &dyn PlacementOpts) -> Result<Sizes> {
        let data = self.sizing.data_brick_size(opts)?;
        let arbiter = if self.arbiter {
            Some(self.sizing.arbiter_brick_size(opts)?)
        } else {
            None
        };
        Ok(Sizes{data, arbiter})
    }

    fn slot<'a>(&'a self, sizes: &Sizes, index: usize, set_size: usize)
        -> Slot<'a>
    {
        match (self.role(index, set_size), sizes.arbiter) {
            (Role::Arbiter, Some(size)) => Slot {
                index,
                size,
                can_host: self.can_host_arbiter.as_deref()
            },
            _ => Slot {
                index,
                size: sizes.data,
                can_host: self.can_host_data.as_deref()
            }
        }
    }

    fn ring(&self, dsrc: &dyn DeviceSource) -> Result<Ring> {
        let snapshot = dsrc.devices()?;
        let seed = self.seed.unwrap_or_else(clock_seed);
        Ok(Ring::new(snapshot, seed))
    }

    /// Find a device for one slot, scanning the ring from its cursor.
    ///
    /// Nodes in `used` are off limits.  Returns `None` after a full lap
    /// without success.
    fn fill(
        ring: &mut Ring,
        dsrc: &dyn DeviceSource,
        opts: &dyn PlacementOpts,
        pred: Option<&SetPredicate<'_>>,
        bs: &BrickSet,
        used: &HashSet<String>,
        slot: &Slot) -> Option<Choice>
    {
        let (_, snap_factor) = opts.brick_sizes();
        let gid = opts.brick_gid();
        let owner = opts.brick_owner();
        ring.scan(|dn| {
            let device = &dn.device;
            let node_id = dn.node.id();
            if used.contains(node_id) {
                tracing::debug!(
                    "Node {} already in use by brick set (device {})",
                    node_id, device.id());
                return None;
            }
            if let Some(can_host) = slot.can_host {
                if !can_host(device.as_ref(), dsrc) {
                    tracing::debug!(
                        "Device {} can not host the brick at index {}",
                        device.id(), slot.index);
                    return None;
                }
            }
            if let Some(p) = pred {
                if !p(bs, device.as_ref()) {
                    tracing::debug!("Device {} rejected by predicate function",
                        device.id());
                    return None;
                }
            }
            match device.new_brick(slot.size, snap_factor, gid, owner) {
                Some(brick) if brick.valid() => {
                    let brick: Arc<dyn PlacerBrick> = Arc::from(brick);
                    Some((brick, device.clone(), node_id.to_owned()))
                }
                r => {
                    if let Some(brick) = r {
                        device.brick_discard(brick.id());
                    }
                    tracing::debug!("Unable to place a brick of size {} & \
                        factor {} on device {}",
                        slot.size, snap_factor, device.id());
                    None
                }
            }
        })
    }

    pub fn place_all(&self,
        dsrc: &dyn DeviceSource,
        opts: &dyn PlacementOpts,
        pred: Option<&SetPredicate<'_>>) -> Result<BrickAllocation>
    {
        let _enter = self.span.enter();
        let set_size = opts.set_size();
        let set_count = opts.set_count();
        if set_size == 0 {
            return Err(Error::InvalidArgument(
                "brick sets must hold at least one brick".to_owned()));
        }
        let sizes = self.sizes(opts)?;
        let mut ring = self.ring(dsrc)?;
        if ring.is_empty() {
            tracing::info!("No devices to place bricks upon");
            return Err(Error::NoDevices);
        }

        let mut alloc = BrickAllocation {
            brick_sets: Vec::with_capacity(set_count),
            device_sets: Vec::with_capacity(set_count),
        };
        for sn in 0..set_count {
            tracing::info!("Allocating brick set #{}", sn);
            let mut bs = BrickSet::new(set_size);
            let mut ds = DeviceSet::new(set_size);
            let mut used = HashSet::with_capacity(set_size);
            for index in 0..set_size {
                let slot = self.slot(&sizes, index, set_size);
                if slot.size != sizes.data {
                    tracing::info!("Placing brick with discounted size: {}",
                        slot.size);
                }
                let Some((brick, device, node_id)) =
                    Self::fill(&mut ring, dsrc, opts, pred, &bs, &used, &slot)
                else {
                    tracing::info!(
                        "Can not find any device for brick (set={}, index={})",
                        sn, index);
                    let partial = alloc.pairs()
                        .chain(bs.bricks.iter().zip(ds.devices.iter()));
                    for (brick, device) in partial {
                        device.brick_discard(brick.id());
                    }
                    return Err(Error::NoDevices);
                };
                tracing::debug!("Placed brick at index {} on device {}",
                    index, device.id());
                used.insert(node_id);
                bs.add(brick);
                ds.add(device);
            }
            alloc.brick_sets.push(bs);
            alloc.device_sets.push(ds);
        }

        for (brick, device) in alloc.pairs() {
            device.brick_add(brick.id());
        }
        Ok(alloc)
    }

    pub fn replace(&self,
        dsrc: &dyn DeviceSource,
        opts: &dyn PlacementOpts,
        pred: Option<&SetPredicate<'_>>,
        bs: &BrickSet,
        index: usize) -> Result<BrickAllocation>
    {
        let _enter = self.span.enter();
        if index >= bs.bricks.len() {
            return Err(Error::OutOfBounds{index, len: bs.bricks.len()});
        }
        tracing::info!("Replace brick in brick set {} with index {}", bs,
            index);
        let sizes = self.sizes(opts)?;
        let mut ring = self.ring(dsrc)?;

        let mut wds = DeviceSet::new(bs.set_size);
        for brick in bs.bricks.iter() {
            wds.add(dsrc.device(brick.device_id())?);
        }
        // The replacement must move to a node that hosts none of the set's
        // bricks, including the one being replaced.
        let used = bs.node_ids()
            .map(str::to_owned)
            .collect::<HashSet<_>>();

        let slot = self.slot(&sizes, index, bs.set_size);
        let Some((brick, device, _)) =
            Self::fill(&mut ring, dsrc, opts, pred, bs, &used, &slot)
        else {
            tracing::info!("Can not find any device for brick (index={})",
                index);
            return Err(Error::NoDevices);
        };

        device.brick_add(brick.id());
        tracing::debug!("Replaced brick at index {} with {} on device {}",
            index, brick.id(), device.id());
        let mut wbs = bs.clone();
        wbs.insert(index, brick);
        wds.insert(index, device);
        Ok(BrickAllocation {
            brick_sets: vec![wbs],
            device_sets: vec![wds],
        })
    }
}
