//! Request handlers

pub mod claims;
pub mod health;
pub mod wizard;

use axum::Json;
use serde::Serialize;

pub const SERVICE_BANNER: &str = "保险理赔助手API服务正在运行";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
}

/// Service banner
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_BANNER.to_string(),
    })
}
