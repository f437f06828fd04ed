use super::{CATEGORIES_TABLE, EXECUTIONS_TABLE, ExecutionFilter, SCRIPTS_TABLE, Store, StoreError};
use crate::model::{Category, Execution, ExecutionUpdate, NewExecution, Script};
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REST_PREFIX: &str = "rest/v1";

/// Hosted table store reached through its PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

impl RestStore {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| StoreError::Config(format!("url: {e}")))?;

        if api_key.trim().is_empty() {
            return Err(StoreError::Config("api key is required".to_string()));
        }

        let timeout = if timeout.is_zero() {
            Duration::from_secs(10)
        } else {
            timeout
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Config(format!("build client: {e}")))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{REST_PREFIX}/{table}", self.base_url)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn select_ordered<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, StoreError> {
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*"), ("order", "display_order.asc")])
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        decode_rows(table, check(response)?)
    }
}

impl Store for RestStore {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.select_ordered(CATEGORIES_TABLE)
    }

    fn list_scripts(&self) -> Result<Vec<Script>, StoreError> {
        self.select_ordered(SCRIPTS_TABLE)
    }

    fn create_execution(&self, new: &NewExecution) -> Result<String, StoreError> {
        let response = self
            .request(Method::POST, EXECUTIONS_TABLE)
            .header("Prefer", "return=representation")
            .json(new)
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let rows: Vec<IdRow> = decode_rows(EXECUTIONS_TABLE, check(response)?)?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| StoreError::Decode {
                table: EXECUTIONS_TABLE.to_string(),
                message: "insert returned no rows".to_string(),
            })
    }

    fn update_execution(&self, id: &str, update: &ExecutionUpdate) -> Result<(), StoreError> {
        let filter = format!("eq.{id}");
        let response = self
            .request(Method::PATCH, EXECUTIONS_TABLE)
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(update)
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let rows: Vec<IdRow> = decode_rows(EXECUTIONS_TABLE, check(response)?)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                table: EXECUTIONS_TABLE.to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    fn list_executions(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>, StoreError> {
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("order", "started_at.desc".to_string()),
        ];
        if let Some(status) = filter.status {
            query.push(("status", format!("eq.{}", status.as_str())));
        }
        if let Some(script_id) = &filter.script_id {
            query.push(("script_id", format!("eq.{script_id}")));
        }
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .request(Method::GET, EXECUTIONS_TABLE)
            .query(&query)
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        decode_rows(EXECUTIONS_TABLE, check(response)?)
    }
}

fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: rejection_message(&body),
    })
}

fn decode_rows<T: DeserializeOwned>(table: &str, response: Response) -> Result<Vec<T>, StoreError> {
    response.json::<Vec<T>>().map_err(|e| StoreError::Decode {
        table: table.to_string(),
        message: e.to_string(),
    })
}

/// Pulls the `message` field out of a PostgREST error body, falling back to
/// the raw text.
pub fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("message").and_then(|m| m.as_str()) {
            Some(message) => message.to_string(),
            None => body.trim().to_string(),
        },
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
