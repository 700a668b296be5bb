//! Executors behind the chat tool calls. Every function returns plain
//! text for the assistant to relay; store failures are folded into the
//! text rather than raised, so one bad call never aborts the chat turn.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::models::{Event, NewEvent};
use crate::store::{EventScope, Store};
use crate::tools::resolver::{Resolution, resolve};
use crate::utils::when::{format_long, format_short, parse_when};

const UPDATABLE_FIELDS: [&str; 4] = ["title", "description", "date", "banner_url"];

fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn event_ref<'a>(args: &'a Value) -> (Option<&'a str>, Option<&'a str>) {
    (string_arg(args, "event_id"), string_arg(args, "event_name"))
}

pub async fn create_event(store: &Store, args: &Value) -> String {
    let title = string_arg(args, "title");
    let description = string_arg(args, "description");
    let date = string_arg(args, "date");
    let banner_url = string_arg(args, "banner_url");

    let mut missing = Vec::new();
    if title.is_none() {
        missing.push("title");
    }
    if description.is_none() {
        missing.push("description");
    }
    if date.is_none() {
        missing.push("date");
    }
    if banner_url.is_none() {
        missing.push("banner_url");
    }
    if !missing.is_empty() {
        return format!("Missing required fields: {}.", missing.join(", "));
    }

    let parsed = match date.and_then(parse_when) {
        Some(parsed) => parsed,
        None => {
            return "Sorry, I couldn't understand the event date. \
                    Please use format like '2025-10-20 20:00'."
                .to_string();
        }
    };

    let new_event = NewEvent {
        title: title.unwrap_or_default().to_string(),
        description: description.map(str::to_string),
        date: parsed,
        banner_url: banner_url.map(str::to_string),
        created_by: None,
    };
    match store.insert_event(&new_event).await {
        Ok(event) => format!(
            "Event \"{}\" created successfully for {}!",
            event.title,
            format_long(&event.date)
        ),
        Err(e) => format!("Failed to create event: {e}"),
    }
}

pub async fn update_event(store: &Store, args: &Value) -> String {
    let field = string_arg(args, "field");
    let value = args.get("value").and_then(Value::as_str);

    let mut missing = Vec::new();
    if field.is_none() {
        missing.push("field");
    }
    if value.is_none() {
        missing.push("value");
    }
    if !missing.is_empty() {
        return format!("Missing required fields: {}.", missing.join(", "));
    }
    let field = field.unwrap_or_default();
    let value = value.unwrap_or_default();

    let (event_id, event_name) = event_ref(args);
    let id = match resolve(store, event_id, event_name).await {
        Resolution::Resolved(id) => id,
        Resolution::Failed(message) => return message,
    };
    let id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(_) => return format!("Failed to update event: invalid event id '{id}'"),
    };

    if !UPDATABLE_FIELDS.contains(&field) {
        return format!(
            "Field '{field}' cannot be updated. Allowed fields: title, description, date, banner_url."
        );
    }

    let stored_value = if field == "date" {
        match parse_when(value) {
            Some(parsed) => parsed.to_rfc3339_opts(SecondsFormat::Secs, true),
            None => {
                return "Couldn't parse the date. Use format like '2025-10-20 20:00'.".to_string();
            }
        }
    } else {
        value.to_string()
    };

    let patch = json!({ field: stored_value });
    match store.update_event(id, &patch).await {
        Ok(_) => format!("Event {field} updated successfully."),
        Err(e) => format!("Failed to update event: {e}"),
    }
}

pub async fn delete_event(store: &Store, args: &Value) -> String {
    let (event_id, event_name) = event_ref(args);
    let id = match resolve(store, event_id, event_name).await {
        Resolution::Resolved(id) => id,
        Resolution::Failed(message) => return message,
    };
    let id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(_) => return format!("Failed to delete event: invalid event id '{id}'"),
    };

    match store.delete_event(id).await {
        Ok(_) => "Event deleted successfully.".to_string(),
        Err(e) => format!("Failed to delete event: {e}"),
    }
}

pub async fn list_events(store: &Store, args: &Value) -> String {
    let scope = string_arg(args, "event_type")
        .and_then(EventScope::parse)
        .unwrap_or(EventScope::Upcoming);
    let now = Utc::now();

    if scope == EventScope::All {
        return match store.list_events(EventScope::All, now).await {
            Ok(events) if events.is_empty() => "There are no events in the system.".to_string(),
            Ok(events) => {
                let (upcoming, past): (Vec<&Event>, Vec<&Event>) =
                    events.iter().partition(|e| e.date >= now);
                let mut out = format!("Here are all events ({} total):\n\n", events.len());
                if !upcoming.is_empty() {
                    out.push_str(&format!("\u{1F4C5} UPCOMING EVENTS ({}):\n", upcoming.len()));
                    out.push_str(&render_entries(upcoming));
                }
                if !past.is_empty() {
                    out.push_str(&format!("\n\u{1F552} PAST EVENTS ({}):\n", past.len()));
                    out.push_str(&render_entries(past));
                }
                out
            }
            Err(e) => format!("Error loading all events: {e}"),
        };
    }

    let label = scope.as_str();
    match store.list_events(scope, now).await {
        Ok(events) if events.is_empty() => format!("There are no {label} events."),
        Ok(events) => format!(
            "Here are {label} events ({} total):\n\n{}",
            events.len(),
            render_entries(events.iter())
        ),
        Err(e) => format!("Error loading {label} events: {e}"),
    }
}

pub async fn get_event_details(store: &Store, args: &Value) -> String {
    let (event_id, event_name) = event_ref(args);
    let id = match resolve(store, event_id, event_name).await {
        Resolution::Resolved(id) => id,
        Resolution::Failed(message) => return message,
    };
    let id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(_) => return format!("Failed to load event details: invalid event id '{id}'"),
    };

    let event = match store.find_event(id).await {
        Ok(Some(event)) => event,
        Ok(None) => return "Event not found.".to_string(),
        Err(e) => return format!("Failed to load event details: {e}"),
    };
    let count = match store.count_registrations(id).await {
        Ok(count) => count,
        Err(e) => return format!("Failed to load event details: {e}"),
    };

    let mut out = format!("\u{1F4CB} **{}**\n", event.title);
    out.push_str(&format!("\u{1F4C5} {}\n", format_long(&event.date)));
    out.push_str(&format!(
        "\u{1F4DD} {}\n",
        event.description.as_deref().unwrap_or("N/A")
    ));
    out.push_str(&format!("\u{1F465} {count} registered\n"));
    if let Some(banner) = &event.banner_url {
        out.push_str(&format!("\u{1F5BC}\u{FE0F} {banner}\n"));
    }
    out.push_str(&format!("\u{1F194} {}", event.id));
    out
}

pub async fn get_event_registrations(store: &Store, args: &Value) -> String {
    let (event_id, event_name) = event_ref(args);
    let id = match resolve(store, event_id, event_name).await {
        Resolution::Resolved(id) => id,
        Resolution::Failed(message) => return message,
    };
    let id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(_) => return format!("Failed to load registrations: invalid event id '{id}'"),
    };

    let event = match store.find_event(id).await {
        Ok(Some(event)) => event,
        Ok(None) => return "Event not found.".to_string(),
        Err(e) => return format!("Failed to load registrations: {e}"),
    };
    let attendees = match store.event_attendees(id).await {
        Ok(attendees) => attendees,
        Err(e) => return format!("Failed to load registrations: {e}"),
    };

    if attendees.is_empty() {
        return format!("No one has registered for \"{}\" yet.", event.title);
    }
    let mut out = format!(
        "Registrations for \"{}\" ({} total):\n",
        event.title,
        attendees.len()
    );
    for (i, attendee) in attendees.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} ({})\n",
            i + 1,
            attendee.user.email,
            attendee.user.role.as_str()
        ));
    }
    out
}

fn entry(event: &Event) -> String {
    format!(
        "\u{2022} ID: {}\n  Title: {}\n  Date: {}\n  Description: {}\n",
        event.id,
        event.title,
        format_short(&event.date),
        event.description.as_deref().unwrap_or("N/A"),
    )
}

fn render_entries<'a, I>(events: I) -> String
where
    I: IntoIterator<Item = &'a Event>,
{
    events
        .into_iter()
        .map(entry)
        .collect::<Vec<_>>()
        .join("\n")
}
