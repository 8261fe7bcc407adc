// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
}

/// Liveness probe.
///
/// Always returns 200 while the process is running. Does not contact the
/// identity provider.
#[utoipa::path(
    get,
    path = "/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = PingResponse)
    )
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
    })
}
