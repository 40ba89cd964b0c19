// vim: tw=80
//! Common type definitions used throughout the placer

use thiserror::Error;

/// Sizes are always expressed in KiB.  This is the unit.
pub const KIB: u64 = 1;

/// One MiB, in KiB
pub const MIB: u64 = 1024 * KIB;

/// One GiB, in KiB
pub const GIB: u64 = 1024 * MIB;

/// One TiB, in KiB
pub const TIB: u64 = 1024 * GIB;

/// The placer's error type.
///
/// Errors must compare equal after being passed through the placer, so every
/// variant carries only plain, clonable data.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// No device could host some brick of the request.  Nothing was
    /// committed.
    #[error("No devices available for brick placement.")]
    NoDevices,

    /// A brick index lies outside of its brick set.
    #[error("brick replace index out of bounds (got {index}, set length {len})")]
    OutOfBounds {
        index: usize,
        len: usize,
    },

    /// A point lookup named an object that does not exist.
    #[error("Unknown ID: {0}")]
    NotFound(String),

    /// The backing store failed.  The message is opaque to the placer.
    #[error("{0}")]
    Store(String),

    /// A request value makes no sense.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Splitting a volume would need bricks smaller than the allowed minimum
    #[error("Minimum brick size limit reached.  Out of space.")]
    MinimumBrickSize,

    /// The configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
