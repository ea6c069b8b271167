// Request Body Builders
//
// One pure function per event kind; `build_body` picks between them. Nothing
// here touches the network, so the shapes can be checked in isolation.

use crate::models::{
    IdentifyBody, IdentifyTraits, Profile, SyntheticEvent, TrackBody, TrackContext, TrackProperties,
    TrackTraits,
};

const IDENTIFY_EVENT_NAME: &str = "Bought Joggers";
const TRACK_EVENT_NAME: &str = "Adwords Test";
const TRACK_PROPERTY_NAME: &str = "some property";
const TRACK_REVENUE: f64 = 14.99;
const TRACK_CONTEXT_IP: &str = "24.5.68.47";

/// Serialize the request body for a generated event
pub fn build_body(event: &SyntheticEvent) -> serde_json::Result<String> {
    match event {
        SyntheticEvent::Identify { user_id } => identify_body(user_id),
        SyntheticEvent::Track { user_id, profile } => track_body(user_id, profile),
    }
}

pub fn identify_body(user_id: &str) -> serde_json::Result<String> {
    serde_json::to_string(&IdentifyBody {
        user_id,
        kind: "identify",
        context: serde_json::Map::new(),
        integrations: serde_json::Map::new(),
        event: IDENTIFY_EVENT_NAME,
        traits: IdentifyTraits { bought_joggers: true },
    })
}

/// Track body; the display name is rendered "Last, First"
pub fn track_body(user_id: &str, profile: &Profile) -> serde_json::Result<String> {
    serde_json::to_string(&TrackBody {
        user_id,
        event: TRACK_EVENT_NAME,
        properties: TrackProperties {
            name: TRACK_PROPERTY_NAME,
            revenue: TRACK_REVENUE,
        },
        context: TrackContext {
            traits: TrackTraits {
                name: format!("{}, {}", profile.last_name, profile.first_name),
                email: &profile.email,
                crm_id: &profile.crm_id,
            },
            ip: TRACK_CONTEXT_IP,
        },
    })
}
