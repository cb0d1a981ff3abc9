//! Routes platform events to the window they belong to.
//!
//! Platform callbacks only know the native handle of the window that produced an
//! event, so every live window is recorded here under that handle. The registry holds
//! weak references: it never keeps a window's state alive on its own.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use log::{debug, trace};

use crate::platform::PlatformEvent;
use crate::window::{NativeWindowHandle, WindowState};

#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: HashMap<NativeWindowHandle, Weak<WindowState>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: NativeWindowHandle, state: &Rc<WindowState>) {
        if self.windows.insert(handle, Rc::downgrade(state)).is_some() {
            debug!("Window handle {} re-registered", handle);
        }
    }

    pub fn remove(&mut self, handle: NativeWindowHandle) -> bool {
        self.windows.remove(&handle).is_some()
    }

    /// Unregisters every window whose owner dropped it and returns their handles.
    pub fn take_dropped(&mut self) -> Vec<NativeWindowHandle> {
        let dropped: Vec<_> = self
            .windows
            .iter()
            .filter(|(_, state)| state.strong_count() == 0)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &dropped {
            self.windows.remove(handle);
        }
        dropped
    }

    pub fn lookup(&self, handle: NativeWindowHandle) -> Option<Rc<WindowState>> {
        self.windows.get(&handle).and_then(Weak::upgrade)
    }

    pub fn contains(&self, handle: NativeWindowHandle) -> bool {
        self.windows.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Applies `event` to its window. Returns `false` when the handle is unknown or the
    /// window's owner already dropped it.
    pub fn dispatch(&self, event: PlatformEvent) -> bool {
        match event {
            PlatformEvent::CloseRequested(handle) => match self.lookup(handle) {
                Some(state) => {
                    debug!("Close requested for window {}", handle);
                    state.request_close();
                    true
                }
                None => {
                    trace!("Ignoring close request for unregistered window {}", handle);
                    false
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_request_reaches_registered_window() {
        let mut registry = WindowRegistry::new();
        let state = Rc::new(WindowState::default());
        registry.insert(NativeWindowHandle(1), &state);

        assert!(registry.dispatch(PlatformEvent::CloseRequested(NativeWindowHandle(1))));
        assert!(state.should_close());
    }

    #[test]
    fn unknown_handle_is_ignored() {
        let mut registry = WindowRegistry::new();
        let state = Rc::new(WindowState::default());
        registry.insert(NativeWindowHandle(1), &state);

        assert!(!registry.dispatch(PlatformEvent::CloseRequested(NativeWindowHandle(2))));
        assert!(!state.should_close());
    }

    #[test]
    fn dropped_state_is_not_resurrected() {
        let mut registry = WindowRegistry::new();
        let state = Rc::new(WindowState::default());
        registry.insert(NativeWindowHandle(5), &state);
        drop(state);

        assert!(registry.lookup(NativeWindowHandle(5)).is_none());
        assert!(!registry.dispatch(PlatformEvent::CloseRequested(NativeWindowHandle(5))));
    }

    #[test]
    fn take_dropped_only_removes_dead_entries() {
        let mut registry = WindowRegistry::new();
        let kept = Rc::new(WindowState::default());
        let dropped = Rc::new(WindowState::default());
        registry.insert(NativeWindowHandle(1), &kept);
        registry.insert(NativeWindowHandle(2), &dropped);
        drop(dropped);

        assert_eq!(registry.take_dropped(), vec![NativeWindowHandle(2)]);
        assert!(registry.contains(NativeWindowHandle(1)));
        assert!(!registry.contains(NativeWindowHandle(2)));
        assert!(registry.take_dropped().is_empty());
    }
}
