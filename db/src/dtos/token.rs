use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::token::TokenKind;

pub struct TokenCreateRequest {
    pub user_id: Uuid,
    pub code: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}
