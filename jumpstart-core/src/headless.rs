//! A platform without a display server.
//!
//! Windows are synthetic handles. Close requests are injected by the caller, which
//! makes the whole event path testable on machines with no windowing system.

use std::collections::{BTreeMap, VecDeque};

use log::debug;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::platform::{PlatformEvent, PlatformKind, PlatformWindow};
use crate::window::{NativeWindowHandle, WindowConfig};
use crate::{JumpstartError, JumpstartResult};

#[derive(Debug)]
pub struct HeadlessPlatform {
    next_handle: u64,
    windows: BTreeMap<NativeWindowHandle, WindowConfig>,
    pending: VecDeque<PlatformEvent>,
    window_limit: Option<usize>,
    created: usize,
    destroyed: Vec<NativeWindowHandle>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self {
            next_handle: 0x1000,
            windows: BTreeMap::new(),
            pending: VecDeque::new(),
            window_limit: None,
            created: 0,
            destroyed: Vec::new(),
        }
    }
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses to create more than `limit` live windows, like a platform out of resources.
    pub fn with_window_limit(limit: usize) -> Self {
        Self {
            window_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Queues a close request as if the user clicked the window's close button.
    pub fn request_close(&mut self, handle: NativeWindowHandle) {
        self.pending.push_back(PlatformEvent::CloseRequested(handle));
    }

    pub fn is_alive(&self, handle: NativeWindowHandle) -> bool {
        self.windows.contains_key(&handle)
    }

    pub fn live_windows(&self) -> usize {
        self.windows.len()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Every handle passed to a successful `destroy`, in call order.
    pub fn destroyed(&self) -> &[NativeWindowHandle] {
        &self.destroyed
    }

    pub fn config(&self, handle: NativeWindowHandle) -> Option<&WindowConfig> {
        self.windows.get(&handle)
    }
}

impl PlatformWindow for HeadlessPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Headless
    }

    fn create(&mut self, config: &WindowConfig) -> JumpstartResult<NativeWindowHandle> {
        if let Some(limit) = self.window_limit {
            if self.windows.len() >= limit {
                return Err(JumpstartError::WindowCreation {
                    code: Some(8),
                    message: format!("headless window limit of {} reached", limit),
                });
            }
        }

        let handle = NativeWindowHandle(self.next_handle);
        self.next_handle += 1;
        self.windows.insert(handle, config.clone());
        self.created += 1;
        debug!("Headless window {} created ({}x{})", handle, config.width, config.height);
        Ok(handle)
    }

    fn destroy(&mut self, handle: NativeWindowHandle) {
        if self.windows.remove(&handle).is_some() {
            self.destroyed.push(handle);
        }
    }

    fn raw_handles(
        &self,
        handle: NativeWindowHandle,
    ) -> JumpstartResult<(RawDisplayHandle, RawWindowHandle)> {
        Err(JumpstartError::surface_creation(format!(
            "headless window {} has no presentation target",
            handle
        )))
    }

    fn poll_events(&mut self, sink: &mut dyn FnMut(PlatformEvent)) {
        while let Some(event) = self.pending.pop_front() {
            sink(event);
        }
    }
}
