// vim: tw=80
//! An in-memory inventory of nodes, devices, and bricks.
//!
//! `Topology` is the simplest possible [`DeviceSource`].  It is good enough
//! for tools and tests, and shows what a persistent store must provide.

use crate::{
    config::SizingConfig,
    entries::*,
    sizing::{pool_metadata_size, reserved_size, thin_pool_size},
    types::*,
};
use serde_derive::Deserialize;
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    }
};
use uuid::Uuid;

/// Generate a fresh object id
pub fn gen_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A brick created by [`DeviceEntry::new_brick`]
#[derive(Clone, Debug)]
pub struct BrickEntry {
    id: String,
    device_id: String,
    node_id: String,
    /// Usable size in KiB
    size: u64,
    /// Size of the thin pool backing the brick, in KiB
    pub tp_size: u64,
    /// Size of the thin pool's metadata, in KiB
    pub pool_metadata_size: u64,
    pub gid: i64,
    pub owner: String,
}

impl BrickEntry {
    /// Total device space consumed by this brick
    pub fn reserved(&self) -> u64 {
        self.tp_size + self.pool_metadata_size
    }
}

impl PlacerBrick for BrickEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[derive(Debug)]
pub struct NodeEntry {
    id: String,
    zone: i32,
    tags: BTreeMap<String, String>,
    online: AtomicBool,
}

impl NodeEntry {
    pub fn new(id: String, zone: i32, tags: BTreeMap<String, String>) -> Self {
        NodeEntry{id, zone, tags, online: AtomicBool::new(true)}
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl PlacerNode for NodeEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn zone(&self) -> i32 {
        self.zone
    }

    fn tags(&self) -> BTreeMap<String, String> {
        self.tags.clone()
    }
}

#[derive(Debug)]
pub struct DeviceEntry {
    id: String,
    node_id: String,
    tags: BTreeMap<String, String>,
    /// Total size in KiB
    total: u64,
    /// Free space in KiB
    free: AtomicU64,
    /// Ids of the bricks resident on this device
    bricks: Mutex<Vec<String>>,
    /// Space promised to bricks returned by `new_brick` but not yet added,
    /// keyed by brick id
    pending: Mutex<BTreeMap<String, u64>>,
    online: AtomicBool,
    sizing: SizingConfig,
}

impl DeviceEntry {
    pub fn new(
        id: String,
        node_id: String,
        total: u64,
        tags: BTreeMap<String, String>,
        sizing: SizingConfig) -> Self
    {
        DeviceEntry {
            id,
            node_id,
            tags,
            total,
            free: AtomicU64::new(total),
            bricks: Mutex::new(Vec::new()),
            pending: Mutex::new(BTreeMap::new()),
            online: AtomicBool::new(true),
            sizing
        }
    }

    /// Ids of every brick committed to this device
    pub fn bricks(&self) -> Vec<String> {
        self.bricks.lock().unwrap().clone()
    }

    pub fn free(&self) -> u64 {
        self.free.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Free space not yet promised to any speculative brick, in KiB
    pub fn available(&self) -> u64 {
        let pending: u64 = self.pending.lock().unwrap().values().sum();
        self.free().saturating_sub(pending)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Remove `amount` KiB from the device's free space.
    ///
    /// Fails, leaving the device unchanged, if it hasn't that much free.
    pub fn storage_allocate(&self, amount: u64) -> Result<()> {
        self.free.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |free| {
            free.checked_sub(amount)
        }).map(drop)
        .map_err(|free| Error::InvalidArgument(format!(
            "device {} has only {} KiB free, needs {}", self.id, free, amount)))
    }

    /// Return `amount` KiB to the device's free space
    pub fn storage_free(&self, amount: u64) {
        let total = self.total;
        // The closure always returns Some, so this can't fail
        let _ = self.free.fetch_update(Ordering::Relaxed, Ordering::Relaxed,
            |free| Some(free.saturating_add(amount).min(total)));
    }

    /// Whether the device has room for a brick of `size` KiB
    pub fn storage_check(&self, size: u64, snap_factor: f64) -> bool {
        reserved_size(&self.sizing, size, snap_factor) <= self.available()
    }
}

impl PlacerDevice for DeviceEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_node_id(&self) -> &str {
        &self.node_id
    }

    fn new_brick(&self, size: u64, snap_factor: f64, gid: i64, owner: &str)
        -> Option<Box<dyn PlacerBrick>>
    {
        let reserved = reserved_size(&self.sizing, size, snap_factor);
        let mut pending = self.pending.lock().unwrap();
        let promised: u64 = pending.values().sum();
        if reserved > self.free().saturating_sub(promised) {
            tracing::debug!("Device {} has {} KiB available, too little for {}",
                self.id, self.free().saturating_sub(promised), size);
            return None;
        }
        let tp_size = thin_pool_size(&self.sizing, size, snap_factor);
        let brick = BrickEntry {
            id: gen_id(),
            device_id: self.id.clone(),
            node_id: self.node_id.clone(),
            size,
            tp_size,
            pool_metadata_size: pool_metadata_size(&self.sizing, tp_size),
            gid,
            owner: owner.to_owned(),
        };
        pending.insert(brick.id.clone(), reserved);
        Some(Box::new(brick))
    }

    fn brick_add(&self, brick_id: &str) {
        let reserved = self.pending.lock().unwrap().remove(brick_id);
        if let Some(amount) = reserved {
            if let Err(e) = self.storage_allocate(amount) {
                tracing::error!("Overcommitted brick {}: {}", brick_id, e);
            }
        }
        self.bricks.lock().unwrap().push(brick_id.to_owned());
    }

    fn brick_discard(&self, brick_id: &str) {
        self.pending.lock().unwrap().remove(brick_id);
    }

    fn tags(&self) -> BTreeMap<String, String> {
        self.tags.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceDesc {
    #[serde(default = "gen_id")]
    id: String,
    /// Size in KiB
    size: u64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default = "default_online")]
    online: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDesc {
    #[serde(default = "gen_id")]
    id: String,
    #[serde(default)]
    zone: i32,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default = "default_online")]
    online: bool,
    #[serde(default)]
    devices: Vec<DeviceDesc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopologyDesc {
    #[serde(default)]
    sizing: SizingConfig,
    #[serde(default)]
    nodes: Vec<NodeDesc>,
}

fn default_online() -> bool {
    true
}

/// Every node and device known to the system
#[derive(Debug, Default)]
pub struct Topology {
    sizing: SizingConfig,
    /// Nodes, in the order they were added
    nodes: Vec<Arc<NodeEntry>>,
    /// Devices, in the order they were added
    devices: Vec<Arc<DeviceEntry>>,
}

impl Topology {
    pub fn new(sizing: SizingConfig) -> Self {
        Topology {
            sizing,
            nodes: Vec::new(),
            devices: Vec::new(),
        }
    }

    /// Build a topology from a YAML description like this:
    ///
    /// ```yaml
    /// nodes:
    ///   - id: node1
    ///     zone: 1
    ///     tags:
    ///       arbiter: disabled
    ///     devices:
    ///       - id: dev1
    ///         size: 1073741824
    /// ```
    pub fn from_yaml(s: &str) -> Result<Self> {
        let desc: TopologyDesc = serde_yaml_ng::from_str(s)
            .map_err(|e| Error::Config(e.to_string()))?;
        let mut topo = Topology::new(desc.sizing);
        for nd in desc.nodes {
            let node = topo.add_node(nd.id, nd.zone, nd.tags)?;
            node.set_online(nd.online);
            for dd in nd.devices {
                let dev = topo.add_device(&node.id, dd.id, dd.size, dd.tags)?;
                dev.set_online(dd.online);
            }
        }
        Ok(topo)
    }

    pub fn add_node(&mut self,
        id: String,
        zone: i32,
        tags: BTreeMap<String, String>) -> Result<Arc<NodeEntry>>
    {
        if self.node_entry(&id).is_some() {
            return Err(Error::InvalidArgument(format!("duplicate node {id}")));
        }
        let node = Arc::new(NodeEntry::new(id, zone, tags));
        self.nodes.push(node.clone());
        Ok(node)
    }

    /// Add a device of `size` KiB to the node named `node_id`
    pub fn add_device(&mut self,
        node_id: &str,
        id: String,
        size: u64,
        tags: BTreeMap<String, String>) -> Result<Arc<DeviceEntry>>
    {
        if self.node_entry(node_id).is_none() {
            return Err(Error::NotFound(node_id.to_owned()));
        }
        if self.device_entry(&id).is_some() {
            return Err(Error::InvalidArgument(
                format!("duplicate device {id}")));
        }
        let device = Arc::new(DeviceEntry::new(id, node_id.to_owned(), size,
            tags, self.sizing.clone()));
        self.devices.push(device.clone());
        Ok(device)
    }

    pub fn node_entry(&self, id: &str) -> Option<&Arc<NodeEntry>> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn device_entry(&self, id: &str) -> Option<&Arc<DeviceEntry>> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Iterate over every node, online or not
    pub fn nodes(&self) -> impl Iterator<Item=&Arc<NodeEntry>> {
        self.nodes.iter()
    }
}

impl DeviceSource for Topology {
    fn devices(&self) -> Result<Vec<DeviceAndNode>> {
        let mut out = Vec::with_capacity(self.devices.len());
        for device in self.devices.iter() {
            let node = self.node_entry(&device.node_id)
                .ok_or_else(|| Error::NotFound(device.node_id.clone()))?;
            if !node.is_online() || !device.is_online() {
                continue;
            }
            out.push(DeviceAndNode {
                device: device.clone(),
                node: node.clone(),
            });
        }
        Ok(out)
    }

    fn device(&self, id: &str) -> Result<Arc<dyn PlacerDevice>> {
        self.device_entry(id)
            .map(|d| d.clone() as Arc<dyn PlacerDevice>)
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    fn node(&self, id: &str) -> Result<Arc<dyn PlacerNode>> {
        self.node_entry(id)
            .map(|n| n.clone() as Arc<dyn PlacerNode>)
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }
}
