use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::{DbError, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            api_key: config.store_key().to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, DbError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| DbError::InvalidRequest("API key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", auth_token.unwrap_or(&self.api_key)))
            .map_err(|_| DbError::InvalidRequest("Token is not a valid header value".to_string()))?;

        headers.insert(HeaderName::from_static("apikey"), api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Response, DbError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            if status.is_server_error() {
                error!("API error ({}): {}", status, error_text);
            } else {
                warn!("API error ({}): {}", status, error_text);
            }
            return Err(classify_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, auth_token, body, headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Sends a statement whose response body is not needed (PATCH/DELETE
    /// without `return=representation`).
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), DbError> {
        self.send(method, path, auth_token, body, None).await?;
        Ok(())
    }

    /// Calls a Postgres function through PostgREST. The function body runs in
    /// a single database transaction.
    pub async fn rpc(&self, function: &str, args: Value) -> Result<(), DbError> {
        let path = format!("/rest/v1/rpc/{}", function);
        self.execute(Method::POST, &path, None, Some(args)).await
    }
}

/// Maps a PostgREST failure onto a typed error, using the SQLSTATE in the body
/// when one is present.
fn classify_error(status: u16, body: String) -> DbError {
    let sqlstate = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("code").and_then(|c| c.as_str()).map(str::to_owned));

    match (status, sqlstate.as_deref()) {
        (_, Some(UNIQUE_VIOLATION)) => DbError::UniqueViolation(body),
        (_, Some(FOREIGN_KEY_VIOLATION)) => DbError::ForeignKeyViolation(body),
        (409, None) => DbError::UniqueViolation(body),
        (401 | 403, _) => DbError::Auth(body),
        (404, _) => DbError::NotFound(body),
        _ => DbError::Api { status, message: body },
    }
}
