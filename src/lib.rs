//! A replicated append-only log with one master and N secondaries.
//!
//! The master sequences and fans out appends; each secondary receives
//! deliveries in possibly-out-of-order arrival and reconstructs the total
//! order before committing. Write concern `w` tunes how many replicas
//! (including the master) must hold a message before an append acknowledges,
//! independent of the background replication that eventually reaches every
//! secondary regardless of `w`.
//!
//! - [`config`] — environment-driven configuration for both node roles.
//! - [`message`] — the immutable `Message` record and its dedup hash.
//! - [`log_store`] — the append-only, gap-free message store.
//! - [`net`] — the HTTP client and wire types used between nodes.
//! - [`master`] — the append coordinator, replication workers, health
//!   monitors, ack tracker and secondary registry.
//! - [`secondary`] — the receiver: dedup, total-order buffer, commit.

pub mod config;
pub mod error;
pub mod log_store;
pub mod master;
pub mod message;
pub mod net;
pub mod secondary;
