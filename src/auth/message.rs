//! Canonical challenge messages
//!
//! Layout (one field per line):
//!
//! ```text
//! <domain> wants you to sign in with your <network> account:
//! <identity>
//!
//! <statement>
//!
//! URI: <uri>
//! Version: <version>
//! Chain ID: <chain id>
//! Nonce: <nonce>
//! Issued At: <RFC 3339 timestamp>
//! ```
//!
//! The labelled block is always the last five lines, so parsing anchors on the
//! tail of the message and the statement can never shadow a labelled field.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

const HEADER_INFIX: &str = " wants you to sign in with your ";
const HEADER_SUFFIX: &str = " account:";

const URI_LABEL: &str = "URI: ";
const VERSION_LABEL: &str = "Version: ";
const CHAIN_ID_LABEL: &str = "Chain ID: ";
const NONCE_LABEL: &str = "Nonce: ";
const ISSUED_AT_LABEL: &str = "Issued At: ";

/// Number of lines outside the statement: header, identity, two blank
/// separators and the five labelled fields
const FIXED_LINES: usize = 9;

/// Challenge parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("Malformed challenge header")]
    InvalidHeader,

    #[error("Missing identity line")]
    MissingIdentity,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Unexpected message layout")]
    InvalidLayout,
}

/// Structured challenge, rendered to and parsed from the canonical text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMessage {
    pub domain: String,
    pub network: String,
    pub identity: String,
    pub statement: String,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
}

impl ChallengeMessage {
    /// Render the canonical message. Identical inputs give identical output.
    pub fn build(&self) -> String {
        format!(
            "{domain}{HEADER_INFIX}{network}{HEADER_SUFFIX}\n\
             {identity}\n\
             \n\
             {statement}\n\
             \n\
             {URI_LABEL}{uri}\n\
             {VERSION_LABEL}{version}\n\
             {CHAIN_ID_LABEL}{chain_id}\n\
             {NONCE_LABEL}{nonce}\n\
             {ISSUED_AT_LABEL}{issued_at}",
            domain = self.domain,
            network = self.network,
            identity = self.identity,
            statement = self.statement,
            uri = self.uri,
            version = self.version,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = format_timestamp(&self.issued_at),
        )
    }

    /// Parse a canonical message back into its fields
    ///
    /// Lines are `\n`-separated; a message containing `\r` is rejected.
    pub fn parse(message: &str) -> Result<Self, MessageError> {
        if message.contains('\r') {
            return Err(MessageError::InvalidLayout);
        }

        let lines: Vec<&str> = message.split('\n').collect();
        if lines.len() < FIXED_LINES {
            return Err(MessageError::InvalidLayout);
        }

        let (domain, network) = parse_header(lines[0])?;

        let identity = lines[1];
        if identity.is_empty() || identity.chars().any(char::is_whitespace) {
            return Err(MessageError::MissingIdentity);
        }

        let tail = lines.len() - 5;
        if !lines[2].is_empty() || !lines[tail - 1].is_empty() {
            return Err(MessageError::InvalidLayout);
        }

        let statement = lines[3..tail - 1].join("\n");

        let uri = labelled(lines[tail], URI_LABEL, "URI")?;
        let version = labelled(lines[tail + 1], VERSION_LABEL, "Version")?;
        let chain_id = labelled(lines[tail + 2], CHAIN_ID_LABEL, "Chain ID")?
            .parse::<u64>()
            .map_err(|e| MessageError::InvalidField {
                field: "Chain ID",
                reason: e.to_string(),
            })?;
        let nonce = labelled(lines[tail + 3], NONCE_LABEL, "Nonce")?;
        let issued_at = labelled(lines[tail + 4], ISSUED_AT_LABEL, "Issued At")?;
        let issued_at = DateTime::parse_from_rfc3339(issued_at)
            .map_err(|e| MessageError::InvalidField {
                field: "Issued At",
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            domain: domain.to_string(),
            network: network.to_string(),
            identity: identity.to_string(),
            statement,
            uri: uri.to_string(),
            version: version.to_string(),
            chain_id,
            nonce: nonce.to_string(),
            issued_at,
        })
    }
}

fn parse_header(line: &str) -> Result<(&str, &str), MessageError> {
    let rest = line
        .strip_suffix(HEADER_SUFFIX)
        .ok_or(MessageError::InvalidHeader)?;
    let (domain, network) = rest
        .split_once(HEADER_INFIX)
        .ok_or(MessageError::InvalidHeader)?;

    if domain.is_empty() || network.is_empty() {
        return Err(MessageError::InvalidHeader);
    }
    Ok((domain, network))
}

fn labelled<'a>(
    line: &'a str,
    label: &str,
    field: &'static str,
) -> Result<&'a str, MessageError> {
    let value = line
        .strip_prefix(label)
        .ok_or(MessageError::MissingField(field))?;
    if value.is_empty() {
        return Err(MessageError::MissingField(field));
    }
    Ok(value)
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ChallengeMessage {
        ChallengeMessage {
            domain: "app.example.com".to_string(),
            network: "Ethereum".to_string(),
            identity: "0xabc0000000000000000000000000000000000001".to_string(),
            statement: "Sign in to Example".to_string(),
            uri: "https://app.example.com".to_string(),
            version: "1".to_string(),
            chain_id: 1,
            nonce: "f00dbabe".repeat(8),
            issued_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_build_layout() {
        let text = sample().build();
        let expected = format!(
            "app.example.com wants you to sign in with your Ethereum account:\n\
             0xabc0000000000000000000000000000000000001\n\
             \n\
             Sign in to Example\n\
             \n\
             URI: https://app.example.com\n\
             Version: 1\n\
             Chain ID: 1\n\
             Nonce: {}\n\
             Issued At: 2024-05-01T12:00:00.000Z",
            "f00dbabe".repeat(8)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(sample().build(), sample().build());
    }

    #[test]
    fn test_parse_recovers_fields() {
        let original = sample();
        let parsed = ChallengeMessage::parse(&original.build()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_statement_cannot_shadow_fields() {
        let mut message = sample();
        message.statement =
            "Nonce: 1234 and 0x1111111111111111111111111111111111111111".to_string();

        let parsed = ChallengeMessage::parse(&message.build()).unwrap();
        assert_eq!(parsed.nonce, message.nonce);
        assert_eq!(parsed.identity, message.identity);
        assert_eq!(parsed.statement, message.statement);
    }

    #[test]
    fn test_multiline_statement_with_fake_block() {
        let mut message = sample();
        message.statement = "hello\n\nURI: https://evil.example\nNonce: evil".to_string();

        let parsed = ChallengeMessage::parse(&message.build()).unwrap();
        assert_eq!(parsed.nonce, message.nonce);
        assert_eq!(parsed.uri, message.uri);
        assert_eq!(parsed.statement, message.statement);
    }

    #[test]
    fn test_empty_statement() {
        let mut message = sample();
        message.statement = String::new();
        let parsed = ChallengeMessage::parse(&message.build()).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_missing_nonce() {
        let text = sample().build().replace("Nonce: ", "Nonse: ");
        assert_eq!(
            ChallengeMessage::parse(&text),
            Err(MessageError::MissingField("Nonce"))
        );
    }

    #[test]
    fn test_bad_header() {
        let text = sample().build().replace("wants you to", "would like you to");
        assert_eq!(
            ChallengeMessage::parse(&text),
            Err(MessageError::InvalidHeader)
        );
    }

    #[test]
    fn test_missing_identity() {
        let text = sample()
            .build()
            .replace("0xabc0000000000000000000000000000000000001", "");
        assert_eq!(
            ChallengeMessage::parse(&text),
            Err(MessageError::MissingIdentity)
        );
    }

    #[test]
    fn test_truncated_message() {
        assert_eq!(
            ChallengeMessage::parse("example.com wants you to sign in"),
            Err(MessageError::InvalidLayout)
        );
    }

    #[test]
    fn test_crlf_line_endings_rejected() {
        let crlf = sample().build().replace('\n', "\r\n");
        assert!(matches!(
            ChallengeMessage::parse(&crlf),
            Err(MessageError::InvalidLayout)
        ));

        let trailing_cr = format!("{}\r", sample().build());
        assert!(matches!(
            ChallengeMessage::parse(&trailing_cr),
            Err(MessageError::InvalidLayout)
        ));
    }

    #[test]
    fn test_bad_timestamp() {
        let text = sample()
            .build()
            .replace("2024-05-01T12:00:00.000Z", "yesterday");
        assert!(matches!(
            ChallengeMessage::parse(&text),
            Err(MessageError::InvalidField {
                field: "Issued At",
                ..
            })
        ));
    }
}
