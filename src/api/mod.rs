// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP and WebSocket API surface

mod errors;
mod handlers;
mod server;
mod ws;

pub use errors::{ApiFailure, ErrorBody};
pub use server::{build_router, start_server, AppState};
