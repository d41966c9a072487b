// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xc-storage: durable snapshots of the arbitration state
//!
//! The controller keeps no local files. Its state survives restarts as two
//! retained bus payloads, the holder snapshot and the queue snapshot. This
//! crate encodes them and rebuilds a consistent state from whatever the
//! broker hands back.

mod snapshot;
mod state;

pub use snapshot::{
    encode, encode_holders, encode_queues, parse_holders, parse_queues, HolderEntry, Parsed,
    QueueGroup, SnapshotError, SnapshotPayloads,
};
pub use state::{restore, Dropped, RestoreReport, Restored};
