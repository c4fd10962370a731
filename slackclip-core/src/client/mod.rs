use crate::error::Result;
use crate::model::{Message, SessionCookie};

pub mod http;

/// The two API calls rendering a thread depends on.
pub trait ThreadClient {
    /// Root message and replies of the thread containing `timestamp`, oldest first.
    fn fetch_replies(
        &self,
        token: &str,
        cookie: &SessionCookie,
        channel_id: &str,
        timestamp: &str,
    ) -> Result<Vec<Message>>;

    /// Display name for `user_id`, or the real name when the display name is blank.
    fn fetch_display_name(
        &self,
        token: &str,
        cookie: &SessionCookie,
        user_id: &str,
    ) -> Result<String>;
}

impl<T: ThreadClient + ?Sized> ThreadClient for &T {
    fn fetch_replies(
        &self,
        token: &str,
        cookie: &SessionCookie,
        channel_id: &str,
        timestamp: &str,
    ) -> Result<Vec<Message>> {
        (**self).fetch_replies(token, cookie, channel_id, timestamp)
    }

    fn fetch_display_name(
        &self,
        token: &str,
        cookie: &SessionCookie,
        user_id: &str,
    ) -> Result<String> {
        (**self).fetch_display_name(token, cookie, user_id)
    }
}
