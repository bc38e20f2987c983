#![forbid(unsafe_code)]

//! Observed value graph and fine-grained mutation tracking for Tessera.
//!
//! This crate turns plain hierarchical data (nested mappings and
//! sequences) into an observed graph: every read performed inside a
//! tracked computation is recorded, and every write re-runs exactly the
//! computations that read the changed value. It is the dependency layer a
//! view-rendering system relies on to know what must re-render after a
//! state mutation, without re-scanning the whole data graph.
//!
//! - [`Value`], [`MapRef`], [`SeqRef`]: the plain-data tree.
//! - [`observe`]: attach an [`Observer`] to a container, instrumenting
//!   every key (and, recursively, every nested container).
//! - [`set`] / [`del`]: the sanctioned way to add or remove keys after
//!   observation; keeps accessors, notifications, and owner proxies
//!   consistent.
//! - [`proxy`] / [`unproxy`]: expose backing-store keys on an owning
//!   instance.
//! - Sequence mutators (`push`, `splice`, ..): operation-level
//!   interception for structural changes per-key cells cannot see.
//!
//! The computation type is not part of this crate; anything implementing
//! [`Subscriber`](tessera_core::Subscriber) and evaluating inside a
//! [`CaptureGuard`](tessera_core::CaptureGuard) scope participates.
//!
//! # Architecture
//!
//! Single-threaded shared ownership throughout: containers are
//! `Rc<RefCell<..>>` handles, observers attach once per container for its
//! lifetime, and all outward references from the observer (container,
//! owners) are weak. Notification is synchronous; batching, scheduling,
//! and rendering belong to the layers above.

pub mod mutate;
pub mod observe;
pub mod prop;
pub mod proxy;
pub mod seq;
pub mod value;

pub use mutate::{Key, del, set};
pub use observe::{Observer, observe};
pub use prop::{ReactiveProp, define_reactive};
pub use proxy::{SCOPE_KEYS, is_reserved, proxy, unproxy};
pub use value::{Getter, MapRef, Property, SeqRef, Setter, Value, WeakMapRef, WeakSeqRef};

pub use tessera_core::{CaptureGuard, Dep, Subscriber};
