//! Concrete drivers.

pub mod raster;
pub mod recording;

pub use raster::RasterDriver;
pub use recording::{DrawCommand, RecordingDriver};

/// Which backend [`create_driver`](crate::config::create_driver) builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Raster,
    Recording,
}

impl BackendKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "raster" | "software" => Some(Self::Raster),
            "recording" | "record" => Some(Self::Recording),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raster => "raster",
            Self::Recording => "recording",
        }
    }
}
