use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, SlackclipError};

const ARCHIVES_SEGMENT: &str = "archives";
const SECONDS_DIGITS: usize = 10;
const SEQUENCE_DIGITS: usize = 6;
const TIMESTAMP_SEGMENT_LEN: usize = 1 + SECONDS_DIGITS + SEQUENCE_DIGITS;

/// Why a permalink was rejected. Each variant has its own stable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProblem {
    MissingScheme,
    NotArchives,
    MissingSegments,
    MissingTimestampPrefix,
    NonNumericTimestamp,
    TimestampLength,
    TrailingSegments,
}

impl fmt::Display for LinkProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingScheme => write!(f, "link must include a scheme (eg. \"http\")."),
            Self::NotArchives => write!(f, "first part of path must be \"archives\"."),
            Self::MissingSegments => {
                write!(f, "path must be /archives/<channel ID>/p<timestamp>.")
            }
            Self::MissingTimestampPrefix => {
                write!(f, "timestamp part of path must start with 'p'.")
            }
            Self::NonNumericTimestamp => {
                write!(f, "timestamp part of path after 'p' must be numeric.")
            }
            Self::TimestampLength => write!(f, "timestamp must be 16 digits long."),
            Self::TrailingSegments => write!(f, "timestamp must be last part of path."),
        }
    }
}

/// A message permalink reduced to the parameters the API wants.
///
/// `https://example.slack.com/archives/C03FH4UM3/p1650893759330519` becomes
/// origin `https://example.slack.com/`, channel `C03FH4UM3` and timestamp
/// `1650893759.330519`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLink {
    pub origin: String,
    pub channel_id: String,
    pub timestamp: String,
}

impl MessageLink {
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }
}

impl FromStr for MessageLink {
    type Err = SlackclipError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |problem| SlackclipError::InvalidLink {
            link: input.replace("\\%", ""),
            problem,
        };

        let without_fragment = input.split_once('#').map_or(input, |(head, _)| head);
        let without_query = without_fragment
            .split_once('?')
            .map_or(without_fragment, |(head, _)| head);

        let (scheme, rest) = without_query
            .split_once("://")
            .ok_or_else(|| invalid(LinkProblem::MissingScheme))?;
        if scheme.is_empty() {
            return Err(invalid(LinkProblem::MissingScheme));
        }

        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let mut segments = path.split('/');

        if segments.next() != Some(ARCHIVES_SEGMENT) {
            return Err(invalid(LinkProblem::NotArchives));
        }

        let (Some(channel_id), Some(ts_segment)) = (segments.next(), segments.next()) else {
            return Err(invalid(LinkProblem::MissingSegments));
        };

        let Some(digits) = ts_segment.strip_prefix('p') else {
            return Err(invalid(LinkProblem::MissingTimestampPrefix));
        };
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid(LinkProblem::NonNumericTimestamp));
        }
        if ts_segment.len() != TIMESTAMP_SEGMENT_LEN {
            return Err(invalid(LinkProblem::TimestampLength));
        }
        if segments.next().is_some() {
            return Err(invalid(LinkProblem::TrailingSegments));
        }

        let (seconds, sequence) = digits.split_at(SECONDS_DIGITS);
        let link = Self {
            origin: format!("{scheme}://{host}/"),
            channel_id: channel_id.to_string(),
            timestamp: format!("{seconds}.{sequence}"),
        };
        debug!(origin = %link.origin, channel = %link.channel_id, ts = %link.timestamp, "parsed message link");

        Ok(link)
    }
}
