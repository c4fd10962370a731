use chrono::DateTime;
use tracing::{debug, info};

use crate::client::ThreadClient;
use crate::credentials::CredentialStore;
use crate::error::{Result, SlackclipError};
use crate::link::MessageLink;
use crate::model::Message;
use crate::mrkdwn;
use crate::names::DisplayNameCache;

const ANONYMOUS: &str = "Anonymous";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turns a message permalink into a Markdown copy of its whole thread.
pub struct ThreadRenderer<'a, C: ThreadClient> {
    store: &'a CredentialStore,
    client: C,
}

impl<'a, C: ThreadClient> ThreadRenderer<'a, C> {
    pub fn new(store: &'a CredentialStore, client: C) -> Self {
        Self { store, client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Stops at the first failure; no partial document is returned.
    pub fn render(&self, link: &str) -> Result<String> {
        if !self.store.present() {
            return Err(SlackclipError::CredentialsMissing);
        }

        let link = MessageLink::parse(link)?;
        let (token, cookie) = self.store.token_and_cookie(&link.origin)?;

        info!(origin = %link.origin, channel = %link.channel_id, "fetching thread");
        let messages =
            self.client
                .fetch_replies(&token, &cookie, &link.channel_id, &link.timestamp)?;

        let mut names = DisplayNameCache::new(&self.client, &token, &cookie);
        let mut output = String::new();
        for message in &messages {
            output.push_str(&render_message(message, &mut names)?);
        }

        debug!(
            messages = messages.len(),
            users = names.len(),
            lookups = names.lookups(),
            "rendered thread"
        );
        Ok(output)
    }
}

fn render_message<C: ThreadClient + ?Sized>(
    message: &Message,
    names: &mut DisplayNameCache<'_, C>,
) -> Result<String> {
    let name = if message.user.is_empty() {
        String::new()
    } else {
        names.resolve(&message.user)?
    };
    let when = format_slack_ts(&message.ts)?;
    let text = mrkdwn::convert(&message.text, |user_id| names.resolve(user_id))?;
    Ok(render_message_block(&name, &when, &text))
}

/// `**{name}, at {when}:**` followed by the text and a blank line.
pub fn render_message_block(name: &str, when: &str, text: &str) -> String {
    let name = if name.is_empty() { ANONYMOUS } else { name };
    format!("**{name}, at {when}:**\n{text}\n\n")
}

/// Format the seconds part of a platform `ts` (`<unix seconds>.<sequence>`)
/// as a UTC `YYYY-MM-DD HH:MM:SS` string.
pub fn format_slack_ts(ts: &str) -> Result<String> {
    let seconds = ts.split_once('.').map_or(ts, |(seconds, _)| seconds);
    let seconds = seconds
        .parse::<i64>()
        .map_err(|err| SlackclipError::InvalidTimestamp(format!("{ts}: {err}")))?;
    let datetime = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| SlackclipError::InvalidTimestamp(format!("{ts}: out of range")))?;
    Ok(datetime.format(TIMESTAMP_FORMAT).to_string())
}
