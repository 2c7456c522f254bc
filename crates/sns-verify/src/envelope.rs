//! Typed view over the fields of one SNS notification.
//!
//! An [`Envelope`] is validated once at construction: `Type` must be present
//! and every field required for that type must be present. Absent means
//! missing or null; an empty string is a present value.
//!
//! # Signing string
//!
//! ```text
//! {key}\n{value}\n   for each signable key present, in this order:
//! Message, MessageId, Subject, SubscribeURL, Timestamp, Token, TopicArn, Type
//! ```
//!
//! Deserializing keeps string fields only. Non-string values such as
//! `MessageAttributes` are never signed and are dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VerifyError, VerifyResult};

pub const MESSAGE: &str = "Message";
pub const MESSAGE_ID: &str = "MessageId";
pub const SIGNATURE: &str = "Signature";
pub const SIGNATURE_VERSION: &str = "SignatureVersion";
pub const SIGNING_CERT_URL: &str = "SigningCertURL";
pub const SUBJECT: &str = "Subject";
pub const SUBSCRIBE_URL: &str = "SubscribeURL";
pub const TIMESTAMP: &str = "Timestamp";
pub const TOKEN: &str = "Token";
pub const TOPIC_ARN: &str = "TopicArn";
pub const TYPE: &str = "Type";
pub const UNSUBSCRIBE_URL: &str = "UnsubscribeURL";

/// Fields every message must carry.
static BASE_REQUIRED_KEYS: [&str; 7] = [
    MESSAGE,
    MESSAGE_ID,
    TIMESTAMP,
    TOPIC_ARN,
    TYPE,
    SIGNATURE,
    SIGNING_CERT_URL,
];

/// Extra fields for subscription handshakes.
static CONFIRMATION_REQUIRED_KEYS: [&str; 2] = [SUBSCRIBE_URL, TOKEN];

/// Fields covered by the signature, in signing order.
pub const SIGNABLE_KEYS: [&str; 8] = [
    MESSAGE,
    MESSAGE_ID,
    SUBJECT,
    SUBSCRIBE_URL,
    TIMESTAMP,
    TOKEN,
    TOPIC_ARN,
    TYPE,
];

/// Key spellings used by Lambda event records, mapped to the HTTP spelling.
const LAMBDA_KEY_ALIASES: [(&str, &str); 2] = [
    ("SigningCertUrl", SIGNING_CERT_URL),
    ("UnsubscribeUrl", UNSUBSCRIBE_URL),
];

/// Declared message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    Notification,
    SubscriptionConfirmation,
    UnsubscribeConfirmation,
    /// Any other value; only the base required set applies.
    Other(String),
}

impl MessageType {
    pub fn parse(value: &str) -> Self {
        match value {
            "Notification" => Self::Notification,
            "SubscriptionConfirmation" => Self::SubscriptionConfirmation,
            "UnsubscribeConfirmation" => Self::UnsubscribeConfirmation,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Notification => "Notification",
            Self::SubscriptionConfirmation => "SubscriptionConfirmation",
            Self::UnsubscribeConfirmation => "UnsubscribeConfirmation",
            Self::Other(value) => value,
        }
    }

    /// Fields that must be present for this type.
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> {
        let extra: &'static [&'static str] = match self {
            Self::SubscriptionConfirmation | Self::UnsubscribeConfirmation => {
                &CONFIRMATION_REQUIRED_KEYS
            }
            Self::Notification | Self::Other(_) => &[],
        };
        BASE_REQUIRED_KEYS.iter().chain(extra).copied()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated SNS message fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, String>"
)]
pub struct Envelope {
    fields: BTreeMap<String, String>,
}

impl Envelope {
    /// Build an envelope from raw fields.
    ///
    /// `None` values are treated as absent. Fails with
    /// [`VerifyError::Validation`] when `Type` or any field required for
    /// that type is absent.
    pub fn new<I, K, V>(fields: I) -> VerifyResult<Self>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields: BTreeMap<String, String> = fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.into(), v.into())))
            .collect();

        Self::from_present_fields(fields)
    }

    /// Build an envelope from fields as delivered in a Lambda event record.
    ///
    /// Lambda spells `SigningCertUrl` and `UnsubscribeUrl`; those are copied
    /// onto `SigningCertURL` and `UnsubscribeURL` when the latter are absent.
    pub fn from_lambda_fields<I, K, V>(fields: I) -> VerifyResult<Self>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: BTreeMap<String, String> = fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.into(), v.into())))
            .collect();

        for (alias, canonical) in LAMBDA_KEY_ALIASES {
            if fields.contains_key(canonical) {
                continue;
            }
            if let Some(value) = fields.get(alias).cloned() {
                fields.insert(canonical.to_string(), value);
            }
        }

        Self::from_present_fields(fields)
    }

    fn from_present_fields(fields: BTreeMap<String, String>) -> VerifyResult<Self> {
        let message_type = fields
            .get(TYPE)
            .map(|t| MessageType::parse(t))
            .ok_or_else(|| VerifyError::validation("the \"Type\" field must be provided"))?;

        if let Some(missing) = message_type
            .required_keys()
            .find(|key| !fields.contains_key(*key))
        {
            return Err(VerifyError::validation(format!(
                "missing field {missing} for message type {message_type}"
            )));
        }

        Ok(Self { fields })
    }

    /// Field value, or `None` when absent. Unknown keys are simply absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Replace (or add) a field, returning the previous value.
    ///
    /// Fields cannot be removed, so the required set stays satisfied.
    /// Replacing `Type` does not re-check the required set for the new type.
    pub fn replace(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// All present fields.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    pub fn message_type(&self) -> MessageType {
        // Presence of Type is a construction invariant.
        MessageType::parse(self.get(TYPE).unwrap_or_default())
    }

    pub fn message(&self) -> Option<&str> {
        self.get(MESSAGE)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.get(MESSAGE_ID)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get(SUBJECT)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get(TIMESTAMP)
    }

    pub fn topic_arn(&self) -> Option<&str> {
        self.get(TOPIC_ARN)
    }

    pub fn signature(&self) -> Option<&str> {
        self.get(SIGNATURE)
    }

    pub fn signature_version(&self) -> Option<&str> {
        self.get(SIGNATURE_VERSION)
    }

    pub fn signing_cert_url(&self) -> Option<&str> {
        self.get(SIGNING_CERT_URL)
    }

    pub fn subscribe_url(&self) -> Option<&str> {
        self.get(SUBSCRIBE_URL)
    }

    pub fn unsubscribe_url(&self) -> Option<&str> {
        self.get(UNSUBSCRIBE_URL)
    }

    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN)
    }

    /// Canonical newline-framed string the signature was computed over.
    ///
    /// Absent signable keys contribute nothing.
    pub fn string_to_sign(&self) -> String {
        let mut out = String::new();
        for key in SIGNABLE_KEYS {
            if let Some(value) = self.get(key) {
                out.push_str(key);
                out.push('\n');
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }
}

impl TryFrom<BTreeMap<String, Option<String>>> for Envelope {
    type Error = VerifyError;

    fn try_from(fields: BTreeMap<String, Option<String>>) -> VerifyResult<Self> {
        Self::new(fields)
    }
}

impl TryFrom<BTreeMap<String, Value>> for Envelope {
    type Error = VerifyError;

    fn try_from(fields: BTreeMap<String, Value>) -> VerifyResult<Self> {
        Self::new(fields.into_iter().map(|(key, value)| match value {
            Value::String(s) => (key, Some(s)),
            _ => (key, None),
        }))
    }
}

impl From<Envelope> for BTreeMap<String, String> {
    fn from(envelope: Envelope) -> Self {
        envelope.fields
    }
}
