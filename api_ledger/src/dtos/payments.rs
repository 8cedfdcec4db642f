use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct PreCheckoutRequest {
    pub payload: String,
}
