// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod parse;
pub mod ui;

pub use errors::{ApiError, ApiErrorResponse, ErrorResponse};
pub use http_server::{create_app, start_server, AppState, HealthResponse, ModelsResponse};
pub use parse::{parse_handler, upload_handler, ParseApiRequest, ParseResponse};
