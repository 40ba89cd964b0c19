// vim: tw=80
//! Concrete placement options, derived from a volume request

use crate::{
    config::PlacerConfig,
    entries::PlacementOpts,
    placer::{Placer, placer_for_volume},
    sizing::{BrickSizeGenerator, SizeStrategy},
    types::*,
};
use serde_derive::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_REPLICA: usize = 2;

/// Used when a volume request doesn't say how big its files will be
pub const DEFAULT_AVERAGE_FILE_SIZE: u64 = 64 * KIB;

/// Durability by plain replication: every brick set holds `replica` copies.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplicaDurability {
    pub replica: usize,
}

impl ReplicaDurability {
    /// A replica count of 0 selects the default
    pub fn new(replica: usize) -> Self {
        let replica = if replica == 0 { DEFAULT_REPLICA } else { replica };
        ReplicaDurability{replica}
    }

    pub fn bricks_in_set(&self) -> usize {
        self.replica
    }

    /// Candidate `(set count, brick size)` splits for a volume of `size` KiB
    pub fn brick_size_generator(&self, size: u64, config: &PlacerConfig)
        -> BrickSizeGenerator
    {
        BrickSizeGenerator::new(size, config.brick_min_size,
            config.brick_max_size)
    }
}

impl Default for ReplicaDurability {
    fn default() -> Self {
        ReplicaDurability::new(DEFAULT_REPLICA)
    }
}

/// What a caller asks for when creating a volume
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeRequest {
    /// Owner of the volume's bricks
    pub id: String,
    /// Usable size in KiB
    pub size: u64,
    pub durability: ReplicaDurability,
    /// Make the last brick of every set an arbiter
    pub arbiter: bool,
    pub gid: i64,
    pub snapshot_factor: f64,
    /// Expected average file size in KiB
    pub average_file_size: u64,
}

impl Default for VolumeRequest {
    fn default() -> Self {
        VolumeRequest {
            id: String::new(),
            size: 0,
            durability: ReplicaDurability::default(),
            arbiter: false,
            gid: 0,
            snapshot_factor: 1.0,
            average_file_size: DEFAULT_AVERAGE_FILE_SIZE,
        }
    }
}

impl VolumeRequest {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidArgument(
                "volume size must be nonzero".to_owned()));
        }
        if self.arbiter && self.durability.bricks_in_set() != 3 {
            return Err(Error::InvalidArgument(format!(
                "arbiter volumes require replica 3, not {}",
                self.durability.bricks_in_set())));
        }
        Ok(())
    }

    /// The placer suited to this volume
    pub fn placer(&self, sizing: Arc<dyn SizeStrategy>) -> Box<dyn Placer> {
        placer_for_volume(self.arbiter, sizing)
    }

    /// Every way to split this volume into brick sets, from fewest and
    /// biggest bricks to most and smallest.
    ///
    /// The sequence ends with [`Error::MinimumBrickSize`].  Which split to use
    /// is the caller's choice.
    pub fn placement_options<'a>(&'a self, config: &PlacerConfig)
        -> impl Iterator<Item=Result<PlacementOptions>> + 'a
    {
        self.durability.brick_size_generator(self.size, config)
            .map(move |r| r.map(|(sets, brick_size)| PlacementOptions {
                brick_size,
                snap_factor: self.snapshot_factor,
                owner: self.id.clone(),
                gid: self.gid,
                set_size: self.durability.bricks_in_set(),
                set_count: sets,
                average_file_size: self.average_file_size,
            }))
    }
}

/// A plain [`PlacementOpts`]
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementOptions {
    pub brick_size: u64,
    pub snap_factor: f64,
    pub owner: String,
    pub gid: i64,
    pub set_size: usize,
    pub set_count: usize,
    pub average_file_size: u64,
}

impl PlacementOptions {
    pub fn new(brick_size: u64, set_size: usize, set_count: usize) -> Self {
        PlacementOptions {
            brick_size,
            snap_factor: 1.0,
            owner: String::new(),
            gid: 0,
            set_size,
            set_count,
            average_file_size: DEFAULT_AVERAGE_FILE_SIZE,
        }
    }

    pub fn with_snap_factor(mut self, snap_factor: f64) -> Self {
        self.snap_factor = snap_factor;
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_owned();
        self
    }

    pub fn with_gid(mut self, gid: i64) -> Self {
        self.gid = gid;
        self
    }

    pub fn with_average_file_size(mut self, afs: u64) -> Self {
        self.average_file_size = afs;
        self
    }
}

impl PlacementOpts for PlacementOptions {
    fn brick_sizes(&self) -> (u64, f64) {
        (self.brick_size, self.snap_factor)
    }

    fn brick_owner(&self) -> &str {
        &self.owner
    }

    fn brick_gid(&self) -> i64 {
        self.gid
    }

    fn set_size(&self) -> usize {
        self.set_size
    }

    fn set_count(&self) -> usize {
        self.set_count
    }

    fn average_file_size(&self) -> u64 {
        self.average_file_size
    }
}
