//! Content measurement seam.

use std::sync::atomic::{AtomicU32, Ordering};

use framelink_core::protocol::SizeReport;

/// Reports the current content box of the embedded document.
pub trait Layout: Send + Sync {
    fn content_size(&self) -> SizeReport;
}

/// Layout with a settable size (headless rendering, tests).
#[derive(Debug, Default)]
pub struct FixedLayout {
    width: AtomicU32,
    height: AtomicU32,
}

impl FixedLayout {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.width.store(width, Ordering::Relaxed);
        self.height.store(height, Ordering::Relaxed);
    }
}

impl Layout for FixedLayout {
    fn content_size(&self) -> SizeReport {
        SizeReport {
            height: self.height.load(Ordering::Relaxed),
            width: self.width.load(Ordering::Relaxed),
        }
    }
}
