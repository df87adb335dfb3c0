//! Driver construction.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::backends::{BackendKind, RasterDriver, RecordingDriver};
use crate::color::Color;
use crate::context::DriverRef;

/// Environment variable naming the default backend (`raster` or
/// `recording`).
pub const BACKEND_ENV: &str = "ETCHER_BACKEND";

static ENV_BACKEND: OnceLock<BackendKind> = OnceLock::new();

fn backend_from(value: Option<&str>) -> BackendKind {
    match value {
        None => BackendKind::default(),
        Some(name) => BackendKind::parse(name).unwrap_or_else(|| {
            log::warn!(
                "{}={:?} is not a known backend, using {}",
                BACKEND_ENV,
                name,
                BackendKind::default().as_str()
            );
            BackendKind::default()
        }),
    }
}

impl BackendKind {
    /// The backend selected by `ETCHER_BACKEND`, read once per process.
    pub fn from_env() -> Self {
        *ENV_BACKEND.get_or_init(|| backend_from(std::env::var(BACKEND_ENV).ok().as_deref()))
    }
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub backend: BackendKind,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            background: Color::WHITE,
            backend: BackendKind::from_env(),
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}

/// Build the driver `config` asks for.
pub fn create_driver(config: &DriverConfig) -> DriverRef {
    log::info!(
        "creating {} driver ({}x{})",
        config.backend.as_str(),
        config.width,
        config.height
    );
    match config.backend {
        BackendKind::Raster => Rc::new(RefCell::new(RasterDriver::with_background(
            config.width,
            config.height,
            config.background,
        ))),
        BackendKind::Recording => Rc::new(RefCell::new(RecordingDriver::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverFeatures, GraphicsDriver};

    #[test]
    fn test_backend_from_value() {
        assert_eq!(backend_from(None), BackendKind::Raster);
        assert_eq!(backend_from(Some("recording")), BackendKind::Recording);
        assert_eq!(backend_from(Some("nonsense")), BackendKind::Raster);
    }

    #[test]
    fn test_create_driver_honours_backend() {
        let config = DriverConfig::new()
            .width(32)
            .height(16)
            .backend(BackendKind::Recording);
        let driver = create_driver(&config);
        assert_eq!(driver.borrow().name(), "RecordingDriver");

        let raster = create_driver(&config.backend(BackendKind::Raster));
        let raster = raster.borrow();
        assert_eq!(raster.name(), "RasterDriver");
        assert!(raster.has_feature(DriverFeatures::NATIVE));
    }
}
