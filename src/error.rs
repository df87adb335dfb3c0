//! Error conditions reported by the driver components.
//!
//! The component types (`MatrixStack`, `ClipStack`, `VertexBuffer`, the
//! image and offscreen arenas) return these through `Result`. The drawing
//! API on [`GraphicsDriver`](crate::driver::GraphicsDriver) never does: it
//! records the error on the driver state and carries on, so callers can
//! draw against any backend without checking every call.

use thiserror::Error;

use crate::vertex::PrimitiveKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("matrix stack overflow (capacity {0})")]
    MatrixStackOverflow(usize),
    #[error("matrix stack underflow")]
    MatrixStackUnderflow,
    #[error("clip stack overflow (capacity {0})")]
    ClipStackOverflow(usize),
    #[error("clip stack underflow")]
    ClipStackUnderflow,
    #[error("begin_{requested} called while a {active} primitive is being built")]
    NestedBegin {
        active: PrimitiveKind,
        requested: PrimitiveKind,
    },
    #[error("end_{0} called without a matching begin")]
    EndWithoutBegin(PrimitiveKind),
    #[error("end_{found} called while a {expected} primitive is being built")]
    MismatchedEnd {
        expected: PrimitiveKind,
        found: PrimitiveKind,
    },
    #[error("vertex added outside a begin/end bracket")]
    VertexOutsidePrimitive,
    #[error("gap() is only valid inside begin_complex_polygon/end_complex_polygon")]
    GapOutsideComplexPolygon,
    #[error("circle() must be called inside a begin/end bracket")]
    CircleOutsidePrimitive,
    #[error("arc angles must be finite")]
    NonFiniteArc,
    #[error("stale or unknown {kind} handle (index {index}, generation {generation})")]
    StaleHandle {
        kind: &'static str,
        index: u32,
        generation: u32,
    },
    #[error("unsupported image depth {0}, expected 1 to 4 bytes per pixel")]
    UnsupportedDepth(u32),
    #[error("image data too short: need {needed} bytes, got {got}")]
    ShortImageData { needed: usize, got: usize },
    #[error("out of memory growing the {0}")]
    OutOfMemory(&'static str),
}

pub type Result<T> = std::result::Result<T, DriverError>;
