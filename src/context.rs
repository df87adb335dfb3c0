//! The current driver of this thread.
//!
//! Drawing code reaches its surface through [`with_current`]. Switching
//! surfaces is scoped: [`make_current`] returns a guard that puts the
//! previous driver back when it goes out of scope, unwinding included.

use std::cell::RefCell;
use std::rc::Rc;

use crate::backends::RasterDriver;
use crate::driver::GraphicsDriver;
use crate::offscreen::OffscreenId;

/// Shared handle to a driver.
pub type DriverRef = Rc<RefCell<dyn GraphicsDriver>>;

thread_local! {
    static CURRENT: RefCell<Option<DriverRef>> = const { RefCell::new(None) };
}

/// Wrap a driver so it can be made current.
pub fn shared<D: GraphicsDriver + 'static>(driver: D) -> DriverRef {
    Rc::new(RefCell::new(driver))
}

pub fn current() -> Option<DriverRef> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Restores the previously current driver on drop.
#[must_use = "the previous driver is restored as soon as the guard is dropped"]
pub struct CurrentGuard {
    previous: Option<DriverRef>,
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|c| *c.borrow_mut() = previous);
    }
}

pub fn make_current(driver: DriverRef) -> CurrentGuard {
    log::debug!("switching current driver to {}", name_of(&driver));
    let previous = CURRENT.with(|c| c.replace(Some(driver)));
    CurrentGuard { previous }
}

fn name_of(driver: &DriverRef) -> &'static str {
    driver.try_borrow().map_or("<busy>", |d| d.name())
}

/// Run `f` on the current driver. `None` when there is no current driver
/// or it is already borrowed further up the stack.
pub fn with_current<R>(f: impl FnOnce(&mut dyn GraphicsDriver) -> R) -> Option<R> {
    let driver = current()?;
    let mut borrowed = match driver.try_borrow_mut() {
        Ok(borrowed) => borrowed,
        Err(_) => {
            log::warn!("current driver is already in use");
            return None;
        }
    };
    Some(f(&mut *borrowed))
}

/// Run `f` with `driver` current, then restore the previous one.
pub fn with_surface<R>(driver: DriverRef, f: impl FnOnce() -> R) -> R {
    let _guard = make_current(driver);
    f()
}

/// Hands the pixels of a borrowed offscreen buffer back to its owner on
/// drop, unwinding included.
struct OffscreenLease<'a> {
    owner: &'a DriverRef,
    id: OffscreenId,
    surface: Rc<RefCell<RasterDriver>>,
}

impl Drop for OffscreenLease<'_> {
    fn drop(&mut self) {
        let pixels = match self.surface.try_borrow_mut() {
            Ok(mut surface) => surface.take_image(),
            Err(_) => {
                log::error!("offscreen {:?} is still in use, its drawing is lost", self.id);
                return;
            }
        };
        let mut owner = match self.owner.try_borrow_mut() {
            Ok(owner) => owner,
            Err(_) => {
                log::error!("cannot return offscreen {:?}: its driver is in use", self.id);
                return;
            }
        };
        let restored = owner.state_mut().offscreens_mut().restore(self.id, pixels);
        if let Err(err) = restored {
            owner.state_mut().report(err);
        }
    }
}

/// Run `f` with an offscreen buffer of `owner` as the current surface.
///
/// The buffer's pixels move into a raster driver for the duration and go
/// back to `owner` afterwards, also when `f` panics. `None` if `id` is
/// stale or `owner` is borrowed, e.g. because it is the driver `f` would
/// be called from.
pub fn with_offscreen<R>(owner: &DriverRef, id: OffscreenId, f: impl FnOnce() -> R) -> Option<R> {
    let pixels = {
        let Ok(mut driver) = owner.try_borrow_mut() else {
            log::warn!("cannot draw into offscreen {:?}: its driver is in use", id);
            return None;
        };
        let taken = driver.state_mut().offscreens_mut().take(id);
        match taken {
            Ok(pixels) => pixels,
            Err(err) => {
                driver.state_mut().report(err);
                return None;
            }
        }
    };

    let lease = OffscreenLease {
        owner,
        id,
        surface: Rc::new(RefCell::new(RasterDriver::from_image(pixels))),
    };
    Some(with_surface(lease.surface.clone(), f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::RecordingDriver;
    use crate::color::Color;

    #[test]
    fn test_guard_restores_previous_driver() {
        let a = shared(RecordingDriver::new());
        let b = shared(RecordingDriver::new());
        {
            let _outer = make_current(a.clone());
            {
                let _inner = make_current(b.clone());
                assert!(Rc::ptr_eq(&current().unwrap(), &b));
            }
            assert!(Rc::ptr_eq(&current().unwrap(), &a));
        }
        assert!(current().is_none());
    }

    #[test]
    fn test_guard_restores_on_unwind() {
        let a = shared(RecordingDriver::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_surface(a.clone(), || panic!("drawing failed"))
        }));
        assert!(result.is_err());
        assert!(current().is_none());
    }

    #[test]
    fn test_with_current_refuses_reentry() {
        let a = shared(RecordingDriver::new());
        with_surface(a, || {
            let nested = with_current(|_| with_current(|_| ()));
            assert_eq!(nested, Some(None));
        });
        assert_eq!(with_current(|_| ()), None);
    }

    #[test]
    fn test_drawing_into_offscreen() {
        let owner = shared(RecordingDriver::new());
        let id = owner.borrow_mut().create_offscreen(8, 8);
        let drawn = with_offscreen(&owner, id, || {
            with_current(|d| d.rectf_color(0, 0, 4, 4, Color::RED))
        });
        assert_eq!(drawn, Some(Some(())));

        let owner = owner.borrow();
        let pixels = owner.state().offscreens().get(id).unwrap();
        assert_eq!(pixels.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(pixels.get_pixel(4, 4).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_offscreen_of_busy_driver_is_refused() {
        let owner = shared(RecordingDriver::new());
        let id = owner.borrow_mut().create_offscreen(4, 4);
        let nested = with_surface(owner.clone(), || {
            with_current(|_| with_offscreen(&owner, id, || ()))
        });
        assert_eq!(nested, Some(None));

        let owner = owner.borrow();
        let pixels = owner.state().offscreens().get(id).unwrap();
        assert_eq!(pixels.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_offscreen_survives_panicking_drawing() {
        let owner = shared(RecordingDriver::new());
        let id = owner.borrow_mut().create_offscreen(4, 4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_offscreen(&owner, id, || {
                with_current(|d| d.rectf_color(0, 0, 2, 2, Color::RED));
                panic!("drawing failed")
            })
        }));
        assert!(result.is_err());
        assert!(current().is_none());

        let owner = owner.borrow();
        let pixels = owner.state().offscreens().get(id).unwrap();
        assert_eq!(pixels.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(pixels.get_pixel(3, 3).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_stale_offscreen_is_reported() {
        let owner = shared(RecordingDriver::new());
        let id = owner.borrow_mut().create_offscreen(4, 4);
        assert!(owner.borrow_mut().delete_offscreen(id));
        assert_eq!(with_offscreen(&owner, id, || ()), None);
        assert!(owner.borrow_mut().take_error().is_some());
    }
}
