use serde::{Deserialize, Serialize};

use crate::auth::repo_types::Role;

/// JWT payload carried by session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,         // user ID
    pub username: String, // username at issuance
    pub role: Role,       // role at issuance
    pub iat: usize,       // issued at (unix timestamp)
    pub exp: usize,       // expires at (unix timestamp)
    pub iss: String,      // issuer
    pub aud: String,      // audience
}
