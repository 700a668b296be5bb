use crate::providers::ToolDeclaration;
use crate::store::Store;
use serde_json::{Value, json};

pub mod exec;
pub mod resolver;

/// The operations the model may invoke. Parameter schemas must stay in
/// lock-step with the executors in [`exec`]; this list is the only
/// contract the model sees.
pub fn declarations() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: "create_event",
            description: "Creates a new event with title, description, date, and banner URL",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The event title"
                    },
                    "description": {
                        "type": "string",
                        "description": "The event description"
                    },
                    "date": {
                        "type": "string",
                        "description": "The event date in natural language format (e.g., '2025-10-20 20:00' or 'tomorrow at 5pm')"
                    },
                    "banner_url": {
                        "type": "string",
                        "description": "The URL of the event banner image"
                    }
                },
                "required": ["title", "description", "date", "banner_url"]
            }),
        },
        ToolDeclaration {
            name: "update_event",
            description: "Updates an existing event by ID or name",
            parameters: json!({
                "type": "object",
                "properties": {
                    "event_id": {
                        "type": "string",
                        "description": "The event ID (UUID)"
                    },
                    "event_name": {
                        "type": "string",
                        "description": "The event name/title (if ID not provided)"
                    },
                    "field": {
                        "type": "string",
                        "description": "Field to update: title, description, date, or banner_url",
                        "enum": ["title", "description", "date", "banner_url"]
                    },
                    "value": {
                        "type": "string",
                        "description": "The new value for the field"
                    }
                },
                "required": ["field", "value"]
            }),
        },
        ToolDeclaration {
            name: "delete_event",
            description: "Deletes an event by ID or name",
            parameters: json!({
                "type": "object",
                "properties": {
                    "event_id": {
                        "type": "string",
                        "description": "The event ID (UUID)"
                    },
                    "event_name": {
                        "type": "string",
                        "description": "The event name/title (if ID not provided)"
                    }
                }
            }),
        },
        ToolDeclaration {
            name: "list_events",
            description: "Lists events based on time filter",
            parameters: json!({
                "type": "object",
                "properties": {
                    "event_type": {
                        "type": "string",
                        "description": "Type of events to list: 'upcoming' (default), 'past', or 'all'",
                        "enum": ["upcoming", "past", "all"]
                    }
                },
                "required": ["event_type"]
            }),
        },
        ToolDeclaration {
            name: "get_event_details",
            description: "Shows full details of one event, including its registration count",
            parameters: json!({
                "type": "object",
                "properties": {
                    "event_id": {
                        "type": "string",
                        "description": "The event ID (UUID)"
                    },
                    "event_name": {
                        "type": "string",
                        "description": "The event name/title (if ID not provided)"
                    }
                }
            }),
        },
        ToolDeclaration {
            name: "get_event_registrations",
            description: "Lists everyone registered for an event",
            parameters: json!({
                "type": "object",
                "properties": {
                    "event_id": {
                        "type": "string",
                        "description": "The event ID (UUID)"
                    },
                    "event_name": {
                        "type": "string",
                        "description": "The event name/title (if ID not provided)"
                    }
                }
            }),
        },
    ]
}

/// Routes a model-selected call to its executor. Always yields text; a
/// name outside the declared set is answered, not raised.
pub async fn dispatch(store: &Store, name: &str, args: &Value) -> String {
    match name {
        "create_event" => exec::create_event(store, args).await,
        "update_event" => exec::update_event(store, args).await,
        "delete_event" => exec::delete_event(store, args).await,
        "list_events" => exec::list_events(store, args).await,
        "get_event_details" => exec::get_event_details(store, args).await,
        "get_event_registrations" => exec::get_event_registrations(store, args).await,
        _ => "Function not found".to_string(),
    }
}
