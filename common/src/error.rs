use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === STORAGE ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    // === LEDGER ERRORS ===
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource conflict: {0}")]
    Conflict(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    #[error("Payment received but activation failed: {0}")]
    ActivationFailed(String),

    // === REQUEST ERRORS ===
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// True for failures of the underlying persistence layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }

    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg })
            } else {
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        match self {
            // === STORAGE ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::Storage(error) => {
                log::error!("Storage error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }

            // === LEDGER ERRORS ===
            AppError::NotFound(_) => {
                HttpResponse::NotFound().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::Conflict(_) => {
                HttpResponse::Conflict().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::InvalidPayload(_) => HttpResponse::UnprocessableEntity()
                .json(serde_json::json!({ "error": self.to_string() })),
            AppError::Timeout(error) => {
                log::error!("Deadline exceeded: {}", error);
                HttpResponse::GatewayTimeout().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::ActivationFailed(error) => {
                log::error!("Activation failed after payment: {}", error);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Payment received, but there was an error activating your subscription. Our support team will contact you.",
                    "payment_received": true,
                }))
            }

            // === REQUEST ERRORS ===
            AppError::BadRequest(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}
