// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod cross;
pub mod report;
pub mod request;
pub mod status;
pub mod watch;
