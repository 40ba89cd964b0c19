// vim: tw=80
//! Placement for arbiter volumes

use crate::{
    entries::*,
    sets::*,
    sizing::SizeStrategy,
    types::*,
};
use std::sync::Arc;
use super::{
    engine::Engine,
    Placer,
    SetPredicate,
    default_sizing,
};

/// Places bricks for volumes that use the arbiter feature.
///
/// The last brick of every set is the arbiter.  It is sized for metadata only
/// and may go only on devices accepted by `can_host_arbiter`.  Every other
/// brick is a data brick, and may go only on devices accepted by
/// `can_host_data`.  A device may well satisfy both.
pub struct ArbiterBrickPlacer {
    engine: Engine,
}

impl ArbiterBrickPlacer {
    pub fn new<A, D>(can_host_arbiter: A, can_host_data: D) -> Self
        where A: Fn(&dyn PlacerDevice, &dyn DeviceSource) -> bool
                 + Send + Sync + 'static,
              D: Fn(&dyn PlacerDevice, &dyn DeviceSource) -> bool
                 + Send + Sync + 'static
    {
        let engine = Engine {
            arbiter: true,
            can_host_arbiter: Some(Box::new(can_host_arbiter)),
            can_host_data: Some(Box::new(can_host_data)),
            sizing: default_sizing(),
            seed: None,
            span: tracing::Span::none(),
        };
        ArbiterBrickPlacer{engine}
    }

    /// Seed the device ring, for reproducible placements.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.engine.seed = Some(seed);
        self
    }

    pub fn with_sizing(mut self, sizing: Arc<dyn SizeStrategy>) -> Self {
        self.engine.sizing = sizing;
        self
    }

    /// Record this placer's events under `span`
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.engine.span = span;
        self
    }
}

impl Placer for ArbiterBrickPlacer {
    fn place_all(&self,
        dsrc: &dyn DeviceSource,
        opts: &dyn PlacementOpts,
        pred: Option<&SetPredicate<'_>>) -> Result<BrickAllocation>
    {
        self.engine.place_all(dsrc, opts, pred)
    }

    fn replace(&self,
        dsrc: &dyn DeviceSource,
        opts: &dyn PlacementOpts,
        pred: Option<&SetPredicate<'_>>,
        bs: &BrickSet,
        index: usize) -> Result<BrickAllocation>
    {
        self.engine.replace(dsrc, opts, pred, bs, index)
    }
}
