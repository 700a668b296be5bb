use crate::core::error::{AppError, AppResult};
use crate::models::{Attendee, Event, NewEvent, Registration, User};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

/// Which slice of the calendar a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Upcoming,
    Past,
    All,
}

impl EventScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(EventScope::Upcoming),
            "past" => Some(EventScope::Past),
            "all" => Some(EventScope::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventScope::Upcoming => "upcoming",
            EventScope::Past => "past",
            EventScope::All => "all",
        }
    }
}

/// Client for the hosted data service's table-level REST interface.
///
/// Every call authenticates with the service credential, so row-level
/// policies do not apply; authorization is decided before a handler ever
/// reaches this client.
#[derive(Clone)]
pub struct Store {
    client: Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct RegisteredEvent {
    events: Option<Event>,
}

impl Store {
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Upstream failure bodies carry a `message` field; keep it, but never
    /// echo the credential headers anywhere.
    async fn read_error(table: &str, response: Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            })
            .unwrap_or(body);
        if status == StatusCode::CONFLICT {
            AppError::Conflict(message)
        } else {
            AppError::Api(format!("{} request failed ({}): {}", table, status, message))
        }
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        builder: RequestBuilder,
    ) -> AppResult<Vec<T>> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(Self::read_error(table, response).await);
        }
        Ok(response.json().await?)
    }

    async fn expect_success(&self, table: &str, builder: RequestBuilder) -> AppResult<Response> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(Self::read_error(table, response).await);
        }
        Ok(response)
    }

    pub async fn list_events(
        &self,
        scope: EventScope,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Event>> {
        let cutoff = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut builder = self
            .request(Method::GET, "events")
            .query(&[("select", "*")]);
        builder = match scope {
            EventScope::All => builder.query(&[("order", "date.asc")]),
            EventScope::Upcoming => builder.query(&[
                ("date", format!("gte.{}", cutoff)),
                ("order", "date.asc".to_string()),
            ]),
            EventScope::Past => builder.query(&[
                ("date", format!("lt.{}", cutoff)),
                ("order", "date.desc".to_string()),
            ]),
        };
        self.fetch_rows("events", builder).await
    }

    pub async fn find_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let builder = self
            .request(Method::GET, "events")
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);
        let rows: Vec<Event> = self.fetch_rows("events", builder).await?;
        Ok(rows.into_iter().next())
    }

    /// Case-insensitive substring match on the title.
    pub async fn search_events_by_title(&self, needle: &str) -> AppResult<Vec<Event>> {
        let builder = self.request(Method::GET, "events").query(&[
            ("select", "*".to_string()),
            ("title", format!("ilike.*{}*", needle)),
            ("order", "date.asc".to_string()),
        ]);
        self.fetch_rows("events", builder).await
    }

    pub async fn insert_event(&self, new_event: &NewEvent) -> AppResult<Event> {
        let builder = self
            .request(Method::POST, "events")
            .header("Prefer", "return=representation")
            .json(&json!([new_event]));
        let rows: Vec<Event> = self.fetch_rows("events", builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Api("events insert returned no row".to_string()))
    }

    /// Applies a partial column patch. Returns the rows that matched the
    /// id filter; an empty vec means the event no longer exists.
    pub async fn update_event(&self, id: Uuid, patch: &Value) -> AppResult<Vec<Event>> {
        let builder = self
            .request(Method::PATCH, "events")
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(patch);
        self.fetch_rows("events", builder).await
    }

    pub async fn delete_event(&self, id: Uuid) -> AppResult<Vec<Event>> {
        let builder = self
            .request(Method::DELETE, "events")
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation");
        self.fetch_rows("events", builder).await
    }

    pub async fn count_registrations(&self, event_id: Uuid) -> AppResult<u64> {
        let builder = self
            .request(Method::HEAD, "registrations")
            .query(&[
                ("select", "user_id".to_string()),
                ("event_id", format!("eq.{}", event_id)),
            ])
            .header("Prefer", "count=exact");
        let response = self.expect_success("registrations", builder).await?;
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<u64>().ok());
        total.ok_or_else(|| AppError::Api("registrations count missing from response".to_string()))
    }

    pub async fn event_attendees(&self, event_id: Uuid) -> AppResult<Vec<Attendee>> {
        let builder = self.request(Method::GET, "registrations").query(&[
            (
                "select",
                "user_id,users(email,role,is_blocked)".to_string(),
            ),
            ("event_id", format!("eq.{}", event_id)),
        ]);
        self.fetch_rows("registrations", builder).await
    }

    /// The store's uniqueness constraint turns a duplicate pair into a
    /// conflict error rather than a second row.
    pub async fn register(&self, user_id: Uuid, event_id: Uuid) -> AppResult<()> {
        let builder = self
            .request(Method::POST, "registrations")
            .header("Prefer", "return=minimal")
            .json(&json!([Registration { user_id, event_id }]));
        self.expect_success("registrations", builder).await?;
        Ok(())
    }

    pub async fn unregister(&self, event_id: Uuid, user_id: Uuid) -> AppResult<Vec<Registration>> {
        let builder = self
            .request(Method::DELETE, "registrations")
            .query(&[
                ("event_id", format!("eq.{}", event_id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .header("Prefer", "return=representation");
        self.fetch_rows("registrations", builder).await
    }

    pub async fn registration_exists(&self, user_id: Uuid, event_id: Uuid) -> AppResult<bool> {
        let builder = self.request(Method::GET, "registrations").query(&[
            ("select", "user_id,event_id".to_string()),
            ("user_id", format!("eq.{}", user_id)),
            ("event_id", format!("eq.{}", event_id)),
        ]);
        let rows: Vec<Registration> = self.fetch_rows("registrations", builder).await?;
        Ok(!rows.is_empty())
    }

    pub async fn events_registered_by(&self, user_id: Uuid) -> AppResult<Vec<Event>> {
        let builder = self.request(Method::GET, "registrations").query(&[
            ("select", "events(*)".to_string()),
            ("user_id", format!("eq.{}", user_id)),
        ]);
        let rows: Vec<RegisteredEvent> = self.fetch_rows("registrations", builder).await?;
        Ok(rows.into_iter().filter_map(|r| r.events).collect())
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let builder = self
            .request(Method::GET, "users")
            .query(&[("select", "*"), ("order", "email.asc")]);
        self.fetch_rows("users", builder).await
    }

    pub async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let builder = self
            .request(Method::GET, "users")
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);
        let rows: Vec<User> = self.fetch_rows("users", builder).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert_user(&self, user: &User) -> AppResult<User> {
        let builder = self
            .request(Method::POST, "users")
            .header("Prefer", "return=representation")
            .json(&json!([user]));
        let rows: Vec<User> = self.fetch_rows("users", builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Api("users insert returned no row".to_string()))
    }

    pub async fn set_user_blocked(&self, id: Uuid, blocked: bool) -> AppResult<Vec<User>> {
        let builder = self
            .request(Method::PATCH, "users")
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&json!({ "is_blocked": blocked }));
        self.fetch_rows("users", builder).await
    }

    pub async fn delete_user(&self, id: Uuid) -> AppResult<Vec<User>> {
        let builder = self
            .request(Method::DELETE, "users")
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation");
        self.fetch_rows("users", builder).await
    }
}
