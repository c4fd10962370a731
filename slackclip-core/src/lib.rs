pub mod client;
pub mod credentials;
pub mod error;
pub mod link;
pub mod model;
pub mod mrkdwn;
pub mod names;
pub mod render;

pub use client::ThreadClient;
pub use client::http::{ApiConfig, HttpThreadClient};
pub use credentials::{
    CommandExtractor, CredentialExtractor, CredentialStore, FileExtractor, StorePaths,
};
pub use error::{Result, SlackclipError};
pub use link::{LinkProblem, MessageLink};
pub use model::{CredentialBundle, Message, SessionCookie, WorkspaceToken};
pub use names::DisplayNameCache;
pub use render::{ThreadRenderer, format_slack_ts, render_message_block};
