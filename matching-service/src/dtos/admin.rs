use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
pub struct RescoreRequest {
    pub tenant_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RescoreResponse {
    pub enqueued: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExpireRequest {
    pub older_than_days: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpireResponse {
    pub expired: u64,
}
