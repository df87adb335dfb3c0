//! A 2D graphics driver layer.
//!
//! Drawing code talks to a [`GraphicsDriver`](driver::GraphicsDriver):
//! transforms, clip regions, vertex-buffer shapes, arcs and curves, text
//! and images. Backends only supply a handful of device primitives; the
//! trait's default methods build the rest on top of them.
//!
//! ```ignore
//! use etcher::prelude::*;
//!
//! let mut d = RasterDriver::new(200, 100);
//! d.translate(100.0, 50.0);
//! d.set_color(Color::RED);
//! d.begin_polygon();
//! d.circle(0.0, 0.0, 40.0);
//! d.end_polygon();
//! ```

pub mod backends;
pub mod clip;
pub mod color;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod font;
pub mod handle;
pub mod image_source;
pub mod line_style;
pub mod offscreen;
pub mod transform;
pub mod vertex;

pub mod prelude {
    pub use crate::backends::{BackendKind, DrawCommand, RasterDriver, RecordingDriver};
    pub use crate::clip::{ClipStatus, IRect, Region};
    pub use crate::color::{Color, Palette};
    pub use crate::config::{create_driver, DriverConfig};
    pub use crate::context::{
        current, make_current, shared, with_current, with_offscreen, with_surface, DriverRef,
    };
    pub use crate::driver::{DriverFeatures, DriverState, GraphicsDriver, Pixels};
    pub use crate::error::DriverError;
    pub use crate::font::{Font, FontDescriptor, FontMetrics, TextExtents};
    pub use crate::image_source::{BufferSource, ImageId, ImageSource, MonoSource, ScanlineSource};
    pub use crate::line_style::{Dash, LineCap, LineJoin, LineStyle};
    pub use crate::offscreen::OffscreenId;
    pub use crate::transform::Matrix;
    pub use crate::vertex::{DevicePoint, PrimitiveKind};
}
