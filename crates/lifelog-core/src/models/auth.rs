// ABOUTME: Caller identity handed to the core by the authentication collaborator
// ABOUTME: Treated as trusted input; every persistence filter is scoped by it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity extracted from a verified bearer token
///
/// The core never re-verifies it. It is the only source of `user_id` for
/// reads and writes, so payloads cannot address another user's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    /// Owning user id
    pub user_id: Uuid,
    /// Email of the user, used for shadow rows in the secondary store
    pub email: String,
}

impl AuthContext {
    /// Create a new caller identity
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    /// User id rendered the way it is stored
    #[must_use]
    pub fn user_key(&self) -> String {
        self.user_id.to_string()
    }
}
