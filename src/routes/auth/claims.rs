use serde::{Deserialize, Serialize};

use crate::models::user::UserRole;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub sub: String, // user UUID
    pub email: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}
