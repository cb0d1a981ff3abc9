//! Scoped ownership of externally allocated handles.
//!
//! A [`ScopedHandle`] owns one raw handle and the closure that releases it. The
//! closure is bound once, at construction, and runs at most once per non-null value
//! the wrapper ever holds: when a different value is assigned, when
//! [`ScopedHandle::replace`] hands the slot out for re-creation, or on drop.
//!
//! Destroyers that need a parent (an instance or a device) capture the parent wrapper
//! by reference through [`ScopedHandle::with_parent`]. The borrow keeps the parent alive
//! for as long as any child exists, so parents must be declared before their children.

use std::fmt;
use std::ops::Deref;

/// A copyable handle whose `Default` value is the null sentinel.
pub trait RawHandle: Copy + PartialEq + Default {}

impl<T: Copy + PartialEq + Default> RawHandle for T {}

pub struct ScopedHandle<'a, T: RawHandle> {
    handle: T,
    destroyer: Box<dyn Fn(T) + 'a>,
}

impl<'a, T: RawHandle> ScopedHandle<'a, T> {
    /// Binds a destroyer that needs nothing but the handle itself.
    pub fn new(destroyer: impl Fn(T) + 'a) -> Self {
        Self {
            handle: T::default(),
            destroyer: Box::new(destroyer),
        }
    }

    /// Binds a destroyer that also receives the parent's current handle, read at the
    /// moment of destruction.
    pub fn with_parent<P: RawHandle>(
        parent: &'a ScopedHandle<'_, P>,
        destroyer: impl Fn(P, T) + 'a,
    ) -> Self {
        Self::new(move |handle| destroyer(parent.get(), handle))
    }

    pub fn get(&self) -> T {
        self.handle
    }

    pub fn is_null(&self) -> bool {
        self.handle == T::default()
    }

    /// Destroys the held handle and returns the empty slot so a "create into" call can
    /// write the new handle directly.
    pub fn replace(&mut self) -> &mut T {
        self.cleanup();
        &mut self.handle
    }

    /// Takes ownership of `handle`. The previous value is destroyed first unless it is
    /// the very same handle.
    pub fn assign(&mut self, handle: T) {
        if handle != self.handle {
            self.cleanup();
            self.handle = handle;
        }
    }

    /// Gives up ownership without destroying.
    pub fn release(&mut self) -> T {
        std::mem::take(&mut self.handle)
    }

    fn cleanup(&mut self) {
        if !self.is_null() {
            let handle = std::mem::take(&mut self.handle);
            (self.destroyer)(handle);
        }
    }
}

impl<T: RawHandle> Deref for ScopedHandle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.handle
    }
}

impl<T: RawHandle + fmt::Debug> fmt::Debug for ScopedHandle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedHandle").field(&self.handle).finish()
    }
}

impl<T: RawHandle> Drop for ScopedHandle<'_, T> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn drop_destroys_held_handle_once() {
        let destroyed = RefCell::new(Vec::new());
        {
            let mut handle = ScopedHandle::new(|h: u64| destroyed.borrow_mut().push(h));
            handle.assign(7);
            assert_eq!(*handle, 7);
        }
        assert_eq!(*destroyed.borrow(), vec![7]);
    }

    #[test]
    fn null_handle_is_never_destroyed() {
        let destroyed = RefCell::new(Vec::new());
        {
            let mut handle = ScopedHandle::new(|h: u64| destroyed.borrow_mut().push(h));
            handle.assign(0);
            let _ = handle.replace();
        }
        assert!(destroyed.borrow().is_empty());
    }

    #[test]
    fn assigning_same_value_keeps_it_alive() {
        let destroyed = RefCell::new(Vec::new());
        let mut handle = ScopedHandle::new(|h: u64| destroyed.borrow_mut().push(h));
        handle.assign(3);
        handle.assign(3);
        assert!(destroyed.borrow().is_empty());
        handle.assign(4);
        assert_eq!(*destroyed.borrow(), vec![3]);
        drop(handle);
        assert_eq!(*destroyed.borrow(), vec![3, 4]);
    }

    #[test]
    fn replace_destroys_and_exposes_slot() {
        let destroyed = RefCell::new(Vec::new());
        let mut handle = ScopedHandle::new(|h: u64| destroyed.borrow_mut().push(h));
        *handle.replace() = 11;
        *handle.replace() = 12;
        assert_eq!(*destroyed.borrow(), vec![11]);
        assert_eq!(handle.get(), 12);
    }

    #[test]
    fn release_gives_up_ownership() {
        let destroyed = RefCell::new(Vec::new());
        let mut handle = ScopedHandle::new(|h: u64| destroyed.borrow_mut().push(h));
        handle.assign(9);
        assert_eq!(handle.release(), 9);
        assert!(handle.is_null());
        drop(handle);
        assert!(destroyed.borrow().is_empty());
    }

    #[test]
    fn every_owned_value_is_destroyed_exactly_once() {
        enum Step {
            Assign(u64),
            Replace(u64),
        }
        use Step::*;

        let steps = [
            Assign(1),
            Assign(1),
            Replace(2),
            Assign(0),
            Assign(3),
            Assign(3),
            Replace(0),
            Replace(4),
            Assign(5),
            Assign(0),
            Assign(6),
        ];

        let destroyed = RefCell::new(Vec::new());
        let mut owned = Vec::new();
        {
            let mut handle = ScopedHandle::new(|h: u64| destroyed.borrow_mut().push(h));
            for step in steps {
                match step {
                    Assign(value) => handle.assign(value),
                    Replace(value) => *handle.replace() = value,
                }
                if !handle.is_null() && owned.last() != Some(&handle.get()) {
                    owned.push(handle.get());
                }
            }
        }

        assert!(!destroyed.borrow().contains(&0));
        assert_eq!(*destroyed.borrow(), owned);
        assert_eq!(owned, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn child_destroyer_sees_parent_handle() {
        let destroyed = RefCell::new(Vec::new());
        let mut parent = ScopedHandle::new(|h: u32| destroyed.borrow_mut().push((h as u64, 0)));
        parent.assign(1);
        {
            let mut child = ScopedHandle::with_parent(&parent, |p: u32, h: u64| {
                destroyed.borrow_mut().push((p as u64, h))
            });
            child.assign(50);
        }
        drop(parent);
        assert_eq!(*destroyed.borrow(), vec![(1, 50), (1, 0)]);
    }
}
