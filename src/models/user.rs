//! User model.
//!
//! Authentication is handled elsewhere; the core only needs the fields
//! required for ownership checks and notification addressing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with generated id.
    pub fn new(email: String, full_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
