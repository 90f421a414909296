//! MIME parsing — turns raw message text into a [`ParsedEmail`].
//!
//! One parse pass serves both the general parser surface and the sink
//! stage; every field the warehouse needs comes from the same pass.

pub mod address;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, ParsedMail, parse_mail};

pub use address::{local_part, split_address_list};

use crate::error::ParseError;

/// A raw MIME message normalized into structured fields.
#[derive(Debug, Clone)]
pub struct ParsedEmail {
    pub message_id: Option<String>,
    /// Parsed Date header; `None` when absent or unparseable.
    pub date: Option<DateTime<Utc>>,
    /// First address of the normalized From list.
    pub sender_email: String,
    pub to_emails: Vec<String>,
    pub cc_emails: Vec<String>,
    pub bcc_emails: Vec<String>,
    pub subject: Option<String>,
    /// Every text/plain leaf concatenated in document order, no separator.
    pub content: String,
    pub mime_version: Option<String>,
    pub content_type: Option<String>,
    pub content_transfer: Option<String>,
    /// Every top-level header name to its value. Last occurrence wins when
    /// a header repeats.
    pub metadata: HashMap<String, String>,
}

/// Parse raw message text into a [`ParsedEmail`].
///
/// Fails with [`ParseError::MalformedMessage`] when the text is not a
/// structured message at all, and [`ParseError::MissingSender`] when the
/// From header is absent or empty.
pub fn parse_message(raw: &str) -> Result<ParsedEmail, ParseError> {
    let message = parse_mail(raw.as_bytes())?;

    let mut content = String::new();
    collect_plain_text(&message, &mut content);

    let mut metadata = HashMap::new();
    for header in &message.headers {
        metadata.insert(header.get_key(), header.get_value());
    }

    let from = split_address_list(message.headers.get_first_value("From").as_deref());
    let sender_email = from.into_iter().next().ok_or(ParseError::MissingSender)?;

    Ok(ParsedEmail {
        message_id: message.headers.get_first_value("Message-ID"),
        date: message
            .headers
            .get_first_value("Date")
            .and_then(|raw| DateTime::parse_from_rfc2822(&raw).ok())
            .map(|date| date.with_timezone(&Utc)),
        sender_email,
        to_emails: split_address_list(message.headers.get_first_value("To").as_deref()),
        cc_emails: split_address_list(message.headers.get_first_value("Cc").as_deref()),
        bcc_emails: split_address_list(message.headers.get_first_value("Bcc").as_deref()),
        subject: message.headers.get_first_value("Subject"),
        content,
        mime_version: message.headers.get_first_value("MIME-Version"),
        content_type: message.headers.get_first_value("Content-Type"),
        content_transfer: message
            .headers
            .get_first_value("Content-Transfer-Encoding"),
        metadata,
    })
}

/// Append the decoded payload of every text/plain leaf, in document order.
fn collect_plain_text(part: &ParsedMail<'_>, out: &mut String) {
    if part.subparts.is_empty() {
        if part.ctype.mimetype == "text/plain" {
            out.push_str(&part.get_body().unwrap_or_default());
        }
    } else {
        for sub in &part.subparts {
            collect_plain_text(sub, out);
        }
    }
}
