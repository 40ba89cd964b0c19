// vim: tw=80
//! Brick placement for replicated and arbiter volumes.
//!
//! Given an inventory of nodes and devices, a [`placer::Placer`] chooses a
//! device for every brick of a volume so that no two bricks of a set share a
//! node, and so that arbiter bricks land only where they are allowed.

// I don't find this lint very helpful
#![allow(clippy::type_complexity)]

pub mod config;
pub mod entries;
pub mod inventory;
pub mod opts;
pub mod placer;
pub mod ring;
pub mod sets;
pub mod sizing;
pub mod tags;
pub mod types;

pub use crate::types::*;
