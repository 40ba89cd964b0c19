// vim: tw=80
//! Placement for ordinary replicated volumes

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

/// Places bricks where every member of a set is an equal data brick.
pub struct StandardBrickPlacer {
    engine: Engine,
}

impl StandardBrickPlacer {
    pub fn new() -> Self {
        let engine = Engine {
            arbiter: false,
            can_host_arbiter: None,
            can_host_data: None,
            sizing: default_sizing(),
            seed: None,
            span: tracing::Span::none(),
        };
        StandardBrickPlacer{engine}
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.engine.seed = Some(seed);
        self
    }

    pub fn with_sizing(mut self, sizing: Arc<dyn SizeStrategy>) -> Self {
        self.engine.sizing = sizing;
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.engine.span = span;
        self
    }
}

impl Default for StandardBrickPlacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Placer for StandardBrickPlacer {
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
