use crate::store::Store;
use crate::utils::when::format_short;

/// Outcome of turning a model-supplied id/name pair into an event id.
///
/// `Resolved` carries the id as text, untouched when it came straight
/// from the caller. `Failed` carries a user-facing explanation and
/// means no event operation should run.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(String),
    Failed(String),
}

/// Resolves an event reference. An explicit id wins and is passed
/// through without an existence check; a name goes through a substring
/// title search and must match exactly one event.
pub async fn resolve(
    store: &Store,
    event_id: Option<&str>,
    event_name: Option<&str>,
) -> Resolution {
    if let Some(id) = event_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Resolution::Resolved(id.to_string());
    }

    let name = match event_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => {
            return Resolution::Failed(
                "Either event_id or event_name must be provided".to_string(),
            );
        }
    };

    let matches = match store.search_events_by_title(name).await {
        Ok(matches) => matches,
        Err(e) => return Resolution::Failed(format!("Event lookup failed: {e}")),
    };

    match matches.len() {
        0 => Resolution::Failed("No event found with that name.".to_string()),
        1 => Resolution::Resolved(matches[0].id.to_string()),
        _ => {
            let mut message =
                String::from("Multiple events found with that name. Please specify by ID:\n");
            for event in &matches {
                message.push_str(&format!(
                    "• {} ({}) [ID: {}]\n",
                    event.title,
                    format_short(&event.date),
                    event.id
                ));
            }
            Resolution::Failed(message)
        }
    }
}
