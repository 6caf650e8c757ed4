//! Periodic backend probing.
//!
//! Two independent workers write into the registry:
//!
//! - [`ReadinessProber`] — fast interval; `node_isReady` plus
//!   `node_getBlockNumber`, one fire-and-forget task per backend.
//! - [`IntegrityProber`] — slow interval; fetches validator statistics from
//!   every *healthy* backend, scores its epoch history and rewrites the
//!   integrity record in a single registry update.
//!
//! Failures in one backend's probe never affect another's; there is no
//! cross-backend coordination beyond the integrity prober awaiting its own
//! fan-out before the next tick.

pub mod integrity;
pub mod readiness;

pub use integrity::IntegrityProber;
pub use readiness::ReadinessProber;
