use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;

/// Payload published on the `comment_notifications` exchange.
///
/// Fields are not validated. Unknown keys are ignored and missing or `null`
/// keys fall back to their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentNotification {
    #[serde(deserialize_with = "null_as_default")]
    pub author_name: String,

    #[serde(deserialize_with = "null_as_default")]
    pub message: String,

    #[serde(deserialize_with = "null_as_default")]
    pub is_public: bool,
}

impl CommentNotification {
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
