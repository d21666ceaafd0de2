#![forbid(unsafe_code)]

//! The observable collaborator seam.
//!
//! The tracker only ever creates handles and pokes them; subscription and
//! recomputation belong to whatever implements [`ObservableHandle`].

use ktrack_core::Value;
use ktrack_reactive::Observable;

/// A value holder that can be read, written and told it changed.
pub trait ObservableHandle: Clone + 'static {
    /// Current value.
    fn read(&self) -> Value;

    /// Store a new value, triggering the handle's own change propagation.
    fn write(&self, value: Value);

    /// Signal that the current value changed in place without an assignment.
    fn value_has_mutated(&self);

    /// Whether `self` and `other` are the same handle.
    fn same_handle(&self, other: &Self) -> bool;
}

/// Creates observable handles seeded with an initial value.
///
/// This is the host a [`PropertyTracker`](crate::PropertyTracker) is attached
/// to.
pub trait ObservableFactory {
    type Handle: ObservableHandle;

    fn observable(&self, initial: Value) -> Self::Handle;
}

impl ObservableHandle for Observable<Value> {
    fn read(&self) -> Value {
        self.get()
    }

    fn write(&self, value: Value) {
        self.set(value);
    }

    fn value_has_mutated(&self) {
        self.notify();
    }

    fn same_handle(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Factory backed by [`ktrack_reactive::Observable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Reactive;

impl ObservableFactory for Reactive {
    type Handle = Observable<Value>;

    fn observable(&self, initial: Value) -> Self::Handle {
        Observable::new(initial)
    }
}
