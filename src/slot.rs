//! Connection table keying.
//!
//! Spec §9 flags the original design's trick of overloading an integer
//! range to distinguish listener / broadcast-ingress / connection slots as
//! unsafe and calls for an explicit sum type in its place. This crate's
//! event loop (`event_loop.rs`) doesn't need a tag at all: the listener,
//! the broadcast/write/close command queue, and per-connection reads are
//! three distinct `tokio::select!` branches, so "what kind of event is
//! this" is a compile-time structural fact, never a runtime value decoded
//! from a pointer. Where a tag genuinely is a runtime value — what mutation
//! a queued command represents — `broadcast::LoopCommand` is that explicit
//! enum (`Broadcast`/`Write`/`Close`).

use slab::Slab;

/// The key used to index a live connection within the server's connection
/// table.
pub type ConnId = usize;

/// The connection table: a slab keyed by `ConnId`. `Slab` reuses freed
/// indices and its iterator visits each live entry exactly once, without
/// requiring manual compaction.
pub type ConnTable<C> = Slab<C>;
