//! User accounts. The credential is stored as an argon2 hash; the server
//! never returns this document directly, it maps to a view without the hash.

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime,
}

impl User {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            phone: None,
            bio: None,
            created_at: DateTime::now(),
        }
    }
}
