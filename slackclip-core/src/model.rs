use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Browser session cookie shared by every workspace the user is signed into.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceToken {
    pub token: String,
    pub name: String,
}

impl WorkspaceToken {
    pub fn new(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
        }
    }
}

impl fmt::Debug for WorkspaceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceToken")
            .field("token", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

/// Everything needed to call the API as the signed-in user.
///
/// `tokens` is keyed by workspace origin, e.g. `https://example.slack.com/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub tokens: BTreeMap<String, WorkspaceToken>,
    pub cookie: SessionCookie,
}

impl CredentialBundle {
    pub fn new(cookie: SessionCookie) -> Self {
        Self {
            tokens: BTreeMap::new(),
            cookie,
        }
    }

    #[must_use]
    pub fn with_workspace(mut self, origin: impl Into<String>, token: WorkspaceToken) -> Self {
        self.tokens.insert(origin.into(), token);
        self
    }
}

/// A single message as returned by `conversations.replies`.
///
/// Bot and system messages carry no `user`; they deserialize with an empty id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub user: String,
    pub ts: String,
    #[serde(default)]
    pub text: String,
}

impl Message {
    pub fn new(user: impl Into<String>, ts: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ts: ts.into(),
            text: text.into(),
        }
    }
}
