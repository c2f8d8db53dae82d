use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::AdminError;

/// `{success, data, error, message}` as returned by every endpoint. `data`
/// stays untyped until the status checks pass, so a failure payload of any
/// shape still yields the server's message.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// List endpoints return either a bare array or `{items, stats}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListData<T> {
    Plain(Vec<T>),
    Wrapped {
        items: Vec<T>,
        #[serde(default)]
        stats: Option<serde_json::Value>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Aggregates some list endpoints attach; passed through untouched.
    pub stats: Option<serde_json::Value>,
}

fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

fn parse(status: u16, body: &str) -> Result<Envelope, AdminError> {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(err) if is_success_status(status) => return Err(AdminError::Decode(err.to_string())),
        Err(_) => {
            let message = body.trim();
            return Err(AdminError::Server {
                status,
                message: if message.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    message.to_string()
                },
            });
        }
    };

    if !is_success_status(status) || envelope.success == Some(false) {
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        return Err(AdminError::Server { status, message });
    }

    Ok(envelope)
}

pub fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, AdminError> {
    match parse(status, body)?.data {
        Some(serde_json::Value::Null) | None => Err(AdminError::Decode(
            "response did not include data".to_string(),
        )),
        Some(data) => serde_json::from_value(data).map_err(|e| AdminError::Decode(e.to_string())),
    }
}

pub fn decode_list<T: DeserializeOwned>(status: u16, body: &str) -> Result<Listing<T>, AdminError> {
    let data: ListData<T> = decode(status, body)?;
    Ok(match data {
        ListData::Plain(items) => Listing { items, stats: None },
        ListData::Wrapped { items, stats } => Listing { items, stats },
    })
}

/// For endpoints whose payload is irrelevant (deletes, fire-and-forget actions).
pub fn decode_ack(status: u16, body: &str) -> Result<(), AdminError> {
    parse(status, body).map(|_| ())
}
