// vim: tw=80
//! Brick sizing.
//!
//! Data bricks and arbiter bricks are sized independently.  A data brick holds
//! file contents, so it gets the requested brick size.  An arbiter brick holds
//! only directory entries and metadata, so its size follows from the number of
//! files the volume is expected to hold.

use crate::{
    config::SizingConfig,
    entries::PlacementOpts,
    types::*,
};
#[cfg(test)] use mockall::automock;

/// Computes target brick sizes for each role in a brick set
#[cfg_attr(test, automock)]
pub trait SizeStrategy: Send + Sync {
    /// Size in KiB of a brick that stores file data
    fn data_brick_size(&self, opts: &dyn PlacementOpts) -> Result<u64>;

    /// Size in KiB of an arbiter brick
    fn arbiter_brick_size(&self, opts: &dyn PlacementOpts) -> Result<u64>;
}

/// The default [`SizeStrategy`].
///
/// An arbiter needs one entry of `arbiter_entry_size` per expected file, and
/// never more than a data brick.
#[derive(Clone, Debug, Default)]
pub struct ArbiterSizing {
    config: SizingConfig,
}

impl ArbiterSizing {
    pub fn new(config: SizingConfig) -> Self {
        ArbiterSizing{config}
    }
}

impl SizeStrategy for ArbiterSizing {
    fn data_brick_size(&self, opts: &dyn PlacementOpts) -> Result<u64> {
        let (size, _) = opts.brick_sizes();
        if size == 0 {
            return Err(Error::InvalidArgument(
                "brick size must be nonzero".to_owned()));
        }
        Ok(size)
    }

    fn arbiter_brick_size(&self, opts: &dyn PlacementOpts) -> Result<u64> {
        let data = self.data_brick_size(opts)?;
        let afs = opts.average_file_size();
        if afs == 0 {
            return Err(Error::InvalidArgument(
                "average file size must be nonzero".to_owned()));
        }
        let files = data.div_ceil(afs);
        let size = files.saturating_mul(self.config.arbiter_entry_size);
        Ok(size.min(data))
    }
}

/// Round `x` up to a multiple of `align`
fn align_up(x: u64, align: u64) -> u64 {
    if align == 0 {
        x
    } else {
        x.div_ceil(align) * align
    }
}

/// Size in KiB of the thin pool backing a brick of `size` KiB.
///
/// The pool must be at least as large as the brick, and grows with the
/// snapshot factor to leave room for snapshots.
pub fn thin_pool_size(config: &SizingConfig, size: u64, snap_factor: f64)
    -> u64
{
    let factor = if snap_factor.is_finite() && snap_factor > 1.0 {
        snap_factor
    } else {
        1.0
    };
    let tp = (size as f64 * factor).ceil() as u64;
    align_up(tp, config.extent_size)
}

/// Size in KiB of the metadata for a thin pool of `tp_size` KiB
pub fn pool_metadata_size(config: &SizingConfig, tp_size: u64) -> u64 {
    let md = (tp_size as f64 * config.metadata_ratio) as u64;
    align_up(md.min(config.metadata_max), config.extent_size)
}

/// Total space in KiB that a device must have free to host a brick of `size`
/// KiB with the given snapshot factor.
pub fn reserved_size(config: &SizingConfig, size: u64, snap_factor: f64)
    -> u64
{
    let tp = thin_pool_size(config, size, snap_factor);
    tp + pool_metadata_size(config, tp)
}

/// Splits a volume into brick sets.
///
/// Each step doubles the number of sets, halving the brick size, until the
/// brick fits under the maximum.  Once the brick would shrink below the
/// minimum, or the set count can't double any more, the generator fails and
/// stops.
#[derive(Clone, Debug)]
pub struct BrickSizeGenerator {
    size: u64,
    sets: usize,
    min: u64,
    max: u64,
    done: bool,
}

impl BrickSizeGenerator {
    pub fn new(size: u64, min: u64, max: u64) -> Self {
        BrickSizeGenerator{size, sets: 1, min, max, done: false}
    }
}

impl Iterator for BrickSizeGenerator {
    /// `(set count, brick size)`
    type Item = Result<(usize, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some(sets) = self.sets.checked_mul(2) else {
                self.done = true;
                return Some(Err(Error::MinimumBrickSize));
            };
            self.sets = sets;
            let brick_size = self.size / self.sets as u64;
            if brick_size < self.min {
                self.done = true;
                return Some(Err(Error::MinimumBrickSize));
            } else if brick_size <= self.max {
                return Some(Ok((self.sets, brick_size)));
            }
        }
    }
}
