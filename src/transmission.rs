use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::projection::Recipient;

pub const CAMPAIGN_ID: &str = "some text";

/// JSON body of `POST /api/v1/transmissions`.
#[derive(Debug, Clone, Serialize)]
pub struct Transmission {
    pub content: Content,
    pub recipients: Vec<RecipientEntry>,
    pub campaign_id: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub email_rfc822: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientEntry {
    pub address: Recipient,
}

/// The `results` object of an accepted transmission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransmissionResults {
    pub total_accepted_recipients: u64,
    pub total_rejected_recipients: u64,
    pub id: String,
}

impl Transmission {
    pub fn build(
        header_block: &str,
        body: &[u8],
        recipients: Vec<Recipient>,
        config: &Config,
    ) -> Transmission {
        println!("Headers: {} bytes", header_block.len());
        println!("Body:    {} bytes\n", body.len());

        let mut metadata = BTreeMap::new();
        metadata.insert("example1".to_string(), "newsletter".to_string());
        if !config.binding.is_empty() {
            metadata.insert("binding".to_string(), config.binding.clone());
        }

        Transmission {
            content: Content {
                email_rfc822: rfc822_blob(header_block, body),
            },
            recipients: recipients
                .into_iter()
                .map(|address| RecipientEntry { address })
                .collect(),
            campaign_id: CAMPAIGN_ID.to_string(),
            metadata,
            return_path: Some(config.return_path.clone()).filter(|rp| !rp.is_empty()),
        }
    }
}

/// Header block, blank line, body, with every line ending as `\n` to match
/// the header block. The API takes a JSON string, so a body that is not
/// UTF-8 goes out lossily converted.
fn rfc822_blob(header_block: &str, body: &[u8]) -> String {
    let text = match std::str::from_utf8(body) {
        Ok(text) => std::borrow::Cow::Borrowed(text),
        Err(e) => {
            warn!(
                "[transmission] body is not valid UTF-8 (first bad byte at {}), invalid bytes become U+FFFD",
                e.valid_up_to()
            );
            String::from_utf8_lossy(body)
        }
    };
    format!("{}\n{}", header_block, text.replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_HOST;
    use serde_json::json;

    fn config(return_path: &str, binding: &str) -> Config {
        Config {
            api_key: "key".to_string(),
            host: DEFAULT_HOST.to_string(),
            return_path: return_path.to_string(),
            binding: binding.to_string(),
        }
    }

    fn alice() -> Recipient {
        Recipient {
            name: "Alice".to_string(),
            address: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn plain_transmission_json() {
        let t = Transmission::build("Subject: Hi\n", b"Hello\n", vec![alice()], &config("", ""));
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({
                "content": { "email_rfc822": "Subject: Hi\n\nHello\n" },
                "recipients": [
                    { "address": { "name": "Alice", "email": "alice@example.com" } }
                ],
                "campaign_id": "some text",
                "metadata": { "example1": "newsletter" }
            })
        );
    }

    #[test]
    fn return_path_and_binding_are_attached() {
        let t = Transmission::build(
            "Subject: Hi\n",
            b"x",
            vec![alice()],
            &config("bounce@example.com", "pool-a"),
        );
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["return_path"], "bounce@example.com");
        assert_eq!(v["metadata"]["binding"], "pool-a");
        assert_eq!(v["metadata"]["example1"], "newsletter");
    }

    #[test]
    fn rfc822_round_trips_through_parser() {
        let headers = "From: a@example.com\nTo: \"Alice\" <alice@example.com>\nSubject: Round trip\n";
        let t = Transmission::build(headers, b"Body text\n", vec![alice()], &config("", ""));
        let parsed = mailparse::parse_mail(t.content.email_rfc822.as_bytes()).unwrap();
        assert_eq!(parsed.headers.len(), 3);
        assert_eq!(parsed.headers[2].get_value(), "Round trip");
        assert_eq!(parsed.get_body().unwrap(), "Body text\n");
    }

    #[test]
    fn crlf_body_is_joined_with_lf_endings() {
        let blob = rfc822_blob("Subject: x\n", b"line one\r\nline two\r\n");
        assert_eq!(blob, "Subject: x\n\nline one\nline two\n");
    }

    #[test]
    fn latin1_body_is_sent_without_failing() {
        let message = crate::message::ParsedMessage::parse(
            b"Content-Type: text/plain; charset=iso-8859-1\n\
              Content-Transfer-Encoding: quoted-printable\n\n\
              caf=E9 cr=E8me\n",
        )
        .unwrap();
        let t = Transmission::build("Subject: x\n", &message.body, vec![alice()], &config("", ""));
        let blob = &t.content.email_rfc822;
        assert!(blob.starts_with("Subject: x\n\ncaf\u{FFFD} cr\u{FFFD}me"));
        assert!(!blob.contains('\r'));
    }

    #[test]
    fn results_deserialize_from_api_shape() {
        let body = r#"{"total_rejected_recipients":0,"total_accepted_recipients":2,"id":"11668787484950529"}"#;
        let r: TransmissionResults = serde_json::from_str(body).unwrap();
        assert_eq!(r.total_accepted_recipients, 2);
        assert_eq!(r.total_rejected_recipients, 0);
        assert_eq!(r.id, "11668787484950529");
    }
}
