//! Selects which source headers survive into the outgoing message and
//! collects the envelope recipients from To, Cc and Bcc.

use log::{debug, warn};
use mailparse::MailAddr;
use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::message::Header;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    To,
    Cc,
    Bcc,
}

impl Bucket {
    const ORDER: [Bucket; 3] = [Bucket::To, Bucket::Cc, Bucket::Bcc];

    fn label(self) -> &'static str {
        match self {
            Bucket::To => "to",
            Bucket::Cc => "cc",
            Bucket::Bcc => "bcc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Copy,
    CopyOrOverride,
    AddressesAndCopy(Bucket),
    AddressesOnly(Bucket),
    Drop,
}

const POLICIES: &[(&str, Policy)] = &[
    ("subject", Policy::Copy),
    ("content-type", Policy::Copy),
    ("date", Policy::Copy),
    ("from", Policy::CopyOrOverride),
    ("to", Policy::AddressesAndCopy(Bucket::To)),
    ("cc", Policy::AddressesAndCopy(Bucket::Cc)),
    ("bcc", Policy::AddressesOnly(Bucket::Bcc)),
];

fn policy_for(name: &str) -> Policy {
    let lower = name.to_ascii_lowercase();
    POLICIES
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, policy)| *policy)
        .unwrap_or(Policy::Drop)
}

/// A delivery address. `name` is empty when the source had no display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "email")]
    pub address: String,
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" <{}>", self.name, self.address)
    }
}

/// Result of walking the source headers once.
#[derive(Debug, Default)]
pub struct Projection {
    pub header_block: String,
    pub to: Vec<Recipient>,
    pub cc: Vec<Recipient>,
    pub bcc: Vec<Recipient>,
}

impl Projection {
    pub fn project(headers: &[Header], forced_from: Option<&str>) -> Projection {
        let mut out = Projection::default();

        for header in headers {
            let policy = policy_for(&header.name);
            match policy {
                Policy::Copy => out.push_line(&header.name, &header.value),
                Policy::CopyOrOverride => match forced_from {
                    Some(from) => {
                        println!("Forced From:\t{}", from);
                        out.push_line(&header.name, from);
                    }
                    None => out.push_line(&header.name, &header.value),
                },
                Policy::AddressesAndCopy(bucket) => {
                    out.collect(bucket, header);
                    out.push_line(&header.name, &header.value);
                }
                Policy::AddressesOnly(bucket) => out.collect(bucket, header),
                Policy::Drop => debug!("[projection] dropping header {}", header.name),
            }
        }

        out
    }

    fn push_line(&mut self, name: &str, value: &str) {
        self.header_block.push_str(&capitalize(name));
        self.header_block.push_str(": ");
        self.header_block.push_str(value);
        self.header_block.push('\n');
    }

    fn collect(&mut self, bucket: Bucket, header: &Header) {
        let parsed = match parse_addresses(&header.decoded) {
            Ok(list) => list,
            Err(e) => {
                warn!(
                    "[projection] can't parse {} header {:?}: {}",
                    header.name, header.decoded, e
                );
                return;
            }
        };
        self.bucket_mut(bucket).extend(parsed);
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<Recipient> {
        match bucket {
            Bucket::To => &mut self.to,
            Bucket::Cc => &mut self.cc,
            Bucket::Bcc => &mut self.bcc,
        }
    }

    fn bucket(&self, bucket: Bucket) -> &[Recipient] {
        match bucket {
            Bucket::To => &self.to,
            Bucket::Cc => &self.cc,
            Bucket::Bcc => &self.bcc,
        }
    }

    /// Final recipient list: the single forced address when given, otherwise
    /// every bucket flattened in to, cc, bcc order. Each entry is echoed.
    pub fn recipients(&self, forced_to: Option<&str>) -> Result<Vec<Recipient>> {
        if let Some(forced) = forced_to {
            let recipient = parse_addresses(forced)
                .ok()
                .and_then(|list| list.into_iter().next())
                .ok_or_else(|| Error::ForcedRecipient(forced.to_string()))?;
            println!("Forced To: \t{}", recipient);
            return Ok(vec![recipient]);
        }

        let mut all = Vec::new();
        for bucket in Bucket::ORDER {
            for recipient in self.bucket(bucket) {
                println!("{}\t{}", bucket.label(), recipient);
                all.push(recipient.clone());
            }
        }
        Ok(all)
    }
}

/// Upper-cases the first letter and leaves the rest alone.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parses an address header value, flattening groups into their members.
pub fn parse_addresses(
    value: &str,
) -> std::result::Result<Vec<Recipient>, mailparse::MailParseError> {
    let list = mailparse::addrparse(value)?;
    let mut out = Vec::new();
    for addr in list.iter() {
        match addr {
            MailAddr::Single(info) => out.push(Recipient {
                name: info.display_name.clone().unwrap_or_default(),
                address: info.addr.clone(),
            }),
            MailAddr::Group(group) => {
                out.extend(group.addrs.iter().map(|info| Recipient {
                    name: info.display_name.clone().unwrap_or_default(),
                    address: info.addr.clone(),
                }))
            }
        }
    }
    Ok(out)
}
