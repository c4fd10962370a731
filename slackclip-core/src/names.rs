use std::collections::HashMap;

use tracing::debug;

use crate::client::ThreadClient;
use crate::error::Result;
use crate::model::SessionCookie;

/// Memoized user id to display name lookups for one (token, cookie) pair.
///
/// Build a new cache for every render; names resolved under one workspace's
/// credentials must never leak into another's.
pub struct DisplayNameCache<'a, C: ThreadClient + ?Sized> {
    client: &'a C,
    token: &'a str,
    cookie: &'a SessionCookie,
    names: HashMap<String, String>,
    lookups: usize,
}

impl<'a, C: ThreadClient + ?Sized> DisplayNameCache<'a, C> {
    pub fn new(client: &'a C, token: &'a str, cookie: &'a SessionCookie) -> Self {
        Self {
            client,
            token,
            cookie,
            names: HashMap::new(),
            lookups: 0,
        }
    }

    /// Failed lookups are not cached.
    pub fn resolve(&mut self, user_id: &str) -> Result<String> {
        if let Some(name) = self.names.get(user_id) {
            debug!(user = user_id, "display name cache hit");
            return Ok(name.clone());
        }

        debug!(user = user_id, "display name cache miss");
        self.lookups += 1;
        let name = self
            .client
            .fetch_display_name(self.token, self.cookie, user_id)?;
        self.names.insert(user_id.to_string(), name.clone());
        Ok(name)
    }

    /// Number of calls made to the client so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
