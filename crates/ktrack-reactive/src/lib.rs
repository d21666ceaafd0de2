#![forbid(unsafe_code)]

//! Reactive values for ktrack.
//!
//! - [`Observable`]: a shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per notification.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. [`Observable::notify`] notifies even though the value is unchanged.

pub mod observable;

pub use observable::{Observable, Subscription};
