// vim: tw=80
//! Brick placers
//!
//! A placer turns an abstract request (brick size, set size, set count) into
//! concrete bricks on concrete devices, and can later move a single brick of
//! an existing set elsewhere.
//!
//! Placement is synchronous and single-pass.  It is not safe to run two
//! placements concurrently against the same inventory: capacity is probed and
//! committed in separate phases, so the caller must serialize them.

use crate::{
    entries::*,
    sets::*,
    sizing::{ArbiterSizing, SizeStrategy},
    tags,
    types::*,
};
use std::sync::Arc;

mod arbiter;
mod engine;
mod standard;

pub use self::arbiter::ArbiterBrickPlacer;
pub use self::standard::StandardBrickPlacer;

/// Decides whether a device may host a given role of brick
pub type DevicePredicate =
    dyn Fn(&dyn PlacerDevice, &dyn DeviceSource) -> bool + Send + Sync;

/// Caller-supplied test of a candidate device against the set built so far
pub type SetPredicate<'a> = dyn Fn(&BrickSet, &dyn PlacerDevice) -> bool + 'a;

pub trait Placer {
    /// Place `opts.set_count()` full brick sets.
    ///
    /// Either every set is placed and committed, or nothing is committed and
    /// [`Error::NoDevices`] is returned.  Errors from `dsrc` are returned
    /// unchanged.
    fn place_all(&self,
        dsrc: &dyn DeviceSource,
        opts: &dyn PlacementOpts,
        pred: Option<&SetPredicate<'_>>) -> Result<BrickAllocation>;

    /// Move the brick at `index` of `bs` to a new device.
    ///
    /// The new brick will land on a node that hosts none of `bs`'s bricks,
    /// including the one being replaced.  The returned allocation holds a
    /// single set, identical to `bs` except at `index`.  `bs` itself is never
    /// modified.
    fn replace(&self,
        dsrc: &dyn DeviceSource,
        opts: &dyn PlacementOpts,
        pred: Option<&SetPredicate<'_>>,
        bs: &BrickSet,
        index: usize) -> Result<BrickAllocation>;
}

/// Choose the placer for a new volume.
///
/// Arbiter volumes get an [`ArbiterBrickPlacer`] that honors the `arbiter`
/// tags of nodes and devices.  Everything else gets a
/// [`StandardBrickPlacer`].
pub fn placer_for_volume(has_arbiter: bool, sizing: Arc<dyn SizeStrategy>)
    -> Box<dyn Placer>
{
    if has_arbiter {
        Box::new(
            ArbiterBrickPlacer::new(tags::can_host_arbiter, tags::can_host_data)
            .with_sizing(sizing)
        )
    } else {
        Box::new(StandardBrickPlacer::new().with_sizing(sizing))
    }
}

/// The sizing used when a placer is not told otherwise
fn default_sizing() -> Arc<dyn SizeStrategy> {
    Arc::new(ArbiterSizing::default())
}
