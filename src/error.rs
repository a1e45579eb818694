use thiserror::Error;

/// Errors surfaced by the engine's public constructors and builders.
///
/// Runtime operations (`insert`, `remove`, `calculate`) are total for
/// well-formed inputs and do not return errors; a member whose point group
/// cannot be triangulated simply scores a fitness of zero.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// fewer than 3 points, or all points collinear: no triangulation exists.
    #[error("degenerate input: point set has no Delaunay triangulation")]
    DegenerateInput,

    /// a pixel coordinate left the image domain. callers are expected to
    /// clamp normalized points before conversion; this is a programming error.
    #[error("pixel coordinate ({x}, {y}) outside image bounds")]
    OutOfBounds { x: i32, y: i32 },

    /// the shared triangle cache must have a power-of-two capacity that
    /// fits in memory.
    #[error("cache capacity must be a power of two between 2^1 and 2^31 (got 2^{bits})")]
    CacheDisabled { bits: u32 },
}
