//! Conversion from the chat platform's `mrkdwn` dialect to Markdown.
//!
//! Rules run in a fixed order because later ones see earlier output: bold,
//! channel references, mentions, labelled links, emoji shortcodes, and
//! finally HTML entity unescaping.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::Result;

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`.*?`|\*").expect("valid regex"));
static CHANNEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<#(.*?)>").expect("valid regex"));
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@(.*?)>").expect("valid regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(.*?)\|(.*?)>").expect("valid regex"));
static SHORTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([A-Za-z0-9_+\-]+):").expect("valid regex"));

/// Convert one message body. `resolve_mention` maps a user id to the name
/// shown in `[@name]`; its first failure aborts the conversion.
pub fn convert<F>(text: &str, mut resolve_mention: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let text = convert_bold(text);
    let text = CHANNEL_RE.replace_all(&text, "[#$1]");
    let text = replace_mentions(&text, &mut resolve_mention)?;
    let text = LINK_RE.replace_all(&text, "[$2]($1)");
    let text = emojize(&text);
    Ok(unescape_entities(&text))
}

/// Every `*` outside a backtick code span becomes `**`.
///
/// Opening and closing asterisks are indistinguishable in the source, so a
/// literal asterisk in prose is converted too.
fn convert_bold(text: &str) -> String {
    BOLD_RE
        .replace_all(text, |caps: &Captures| {
            let matched = &caps[0];
            if matched.starts_with('`') && matched.ends_with('`') {
                matched.to_string()
            } else {
                "**".to_string()
            }
        })
        .into_owned()
}

fn replace_mentions<F>(text: &str, resolve_mention: &mut F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for caps in MENTION_RE.captures_iter(text) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Mentions sometimes carry a trailing `|label`, occasionally empty.
        let user_id = target
            .as_str()
            .split_once('|')
            .map_or(target.as_str(), |(id, _)| id);
        let name = resolve_mention(user_id)?;

        output.push_str(&text[last..whole.start()]);
        output.push_str("[@");
        output.push_str(&name);
        output.push(']');
        last = whole.end();
    }

    output.push_str(&text[last..]);
    Ok(output)
}

/// Replace `:alias:` shortcodes known to the gemoji alias table with their
/// glyph. Unknown shortcodes are left as typed.
fn emojize(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    let mut position = 0;

    while let Some(caps) = SHORTCODE_RE.captures_at(text, position) {
        let (Some(whole), Some(alias)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        if let Some(emoji) = emojis::get_by_shortcode(alias.as_str()) {
            output.push_str(&text[last..whole.start()]);
            output.push_str(emoji.as_str());
            last = whole.end();
            position = whole.end();
        } else {
            // The closing colon may open the next shortcode, as in `10:30:smile:`.
            position = whole.end() - 1;
        }
    }

    output.push_str(&text[last..]);
    output
}

/// Undo the three entities the platform escapes, `&amp;` first.
pub fn unescape_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
