// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Screen parsing endpoints
//!
//! Provides POST /v1/parse (JSON) and POST /v1/parse/upload (multipart).

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{parse_handler, upload_handler};
pub use request::{ParseApiRequest, UploadFields};
pub use response::ParseResponse;
