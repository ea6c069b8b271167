// Data Models and Types
//
// The synthetic identities handed to each job and the two request body shapes
// the tracking API accepts from this tool.

use std::fmt;

use serde::Serialize;

/// Kind of call sent to the tracking API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Attach a static trait to a fresh user
    Identify,
    /// Record an "Adwords Test" event carrying a synthetic profile
    Track,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Identify => "identify",
            EventKind::Track => "track",
        }
    }

    /// Parse the command line spelling back to the enum
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "identify" => Some(EventKind::Identify),
            "track" => Some(EventKind::Track),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plausible-looking person attached to track calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub crm_id: String,
}

/// Synthetic identity for one job, shaped by the kind of call it will be sent as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticEvent {
    Identify { user_id: String },
    Track { user_id: String, profile: Profile },
}

impl SyntheticEvent {
    pub fn user_id(&self) -> &str {
        match self {
            SyntheticEvent::Identify { user_id } | SyntheticEvent::Track { user_id, .. } => user_id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            SyntheticEvent::Identify { .. } => EventKind::Identify,
            SyntheticEvent::Track { .. } => EventKind::Track,
        }
    }
}

// Wire shapes. Field names follow the tracking API's camelCase JSON.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyBody<'a> {
    pub user_id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub context: serde_json::Map<String, serde_json::Value>,
    pub integrations: serde_json::Map<String, serde_json::Value>,
    pub event: &'static str,
    pub traits: IdentifyTraits,
}

#[derive(Debug, Serialize)]
pub struct IdentifyTraits {
    #[serde(rename = "Bought Joggers")]
    pub bought_joggers: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBody<'a> {
    pub user_id: &'a str,
    pub event: &'static str,
    pub properties: TrackProperties,
    pub context: TrackContext<'a>,
}

#[derive(Debug, Serialize)]
pub struct TrackProperties {
    pub name: &'static str,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct TrackContext<'a> {
    pub traits: TrackTraits<'a>,
    pub ip: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackTraits<'a> {
    pub name: String,
    pub email: &'a str,
    pub crm_id: &'a str,
}
