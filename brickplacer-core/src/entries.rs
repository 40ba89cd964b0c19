// vim: tw=80
//! Capabilities that the placer needs from the inventory.
//!
//! The placer never owns nodes, devices, or bricks.  It sees them only through
//! these traits, which the inventory layer implements.  See
//! [`inventory`](crate::inventory) for the in-memory implementation.

use crate::types::*;
#[cfg(test)] use mockall::automock;
use std::{
    collections::BTreeMap,
    sync::Arc
};

/// A node that hosts devices
#[cfg_attr(test, automock)]
pub trait PlacerNode: Send + Sync {
    /// Unique identifier of the node
    fn id(&self) -> &str;

    /// The node's failure domain.  Used as a hint to spread bricks.
    fn zone(&self) -> i32;

    /// User-supplied tags.  Nodes have none unless the inventory says so.
    fn tags(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// A brick, either speculative (freshly returned by
/// [`PlacerDevice::new_brick`]) or committed to its device.
#[cfg_attr(test, automock)]
pub trait PlacerBrick: Send + Sync {
    fn id(&self) -> &str;

    /// Unique id of the device hosting this brick
    fn device_id(&self) -> &str;

    /// Unique id of the node hosting this brick
    fn node_id(&self) -> &str;

    /// Usable size of the brick, in KiB
    fn size(&self) -> u64;

    fn set_id(&mut self, id: String);

    /// Is this brick usable?  Only a zeroed brick is not.
    fn valid(&self) -> bool {
        !self.id().is_empty()
    }
}

/// A storage device that may host bricks
#[cfg_attr(test, automock)]
pub trait PlacerDevice: Send + Sync {
    fn id(&self) -> &str;

    /// Unique id of the node that hosts this device
    fn parent_node_id(&self) -> &str;

    /// Build a brick stub hosted on this device.
    ///
    /// Returns `None` if the device lacks the free space for a brick of `size`
    /// KiB, including all of its overhead.  The device may hold that space
    /// aside until the brick is either added or discarded.
    fn new_brick(&self, size: u64, snap_factor: f64, gid: i64, owner: &str)
        -> Option<Box<dyn PlacerBrick>>;

    /// Record the given brick as resident on this device.
    fn brick_add(&self, brick_id: &str);

    /// Forget a brick from [`new_brick`](Self::new_brick) that will never be
    /// added.
    fn brick_discard(&self, _brick_id: &str) {}

    fn tags(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// One device together with the node that hosts it.
#[derive(Clone)]
pub struct DeviceAndNode {
    pub device: Arc<dyn PlacerDevice>,
    pub node: Arc<dyn PlacerNode>,
}

/// Source of the devices that bricks may be placed upon
#[cfg_attr(test, automock)]
pub trait DeviceSource {
    /// A consistent snapshot of every usable device and its node
    fn devices(&self) -> Result<Vec<DeviceAndNode>>;

    /// Look up a single device.  Fails with [`Error::NotFound`] if absent.
    fn device(&self, id: &str) -> Result<Arc<dyn PlacerDevice>>;

    /// Look up a single node.  Fails with [`Error::NotFound`] if absent.
    fn node(&self, id: &str) -> Result<Arc<dyn PlacerNode>>;
}

/// The shape and sizing of one placement request
#[cfg_attr(test, automock)]
pub trait PlacementOpts {
    /// The requested brick size in KiB, and the snapshot factor
    fn brick_sizes(&self) -> (u64, f64);

    fn brick_owner(&self) -> &str;

    fn brick_gid(&self) -> i64;

    /// Number of bricks in each brick set
    fn set_size(&self) -> usize;

    /// Number of brick sets to place
    fn set_count(&self) -> usize;

    /// Expected average size of the files in the volume, in KiB
    fn average_file_size(&self) -> u64;
}
