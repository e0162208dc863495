use carta_core::{CartaError, CartaResult};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

mod catalog;

pub use catalog::{Banner, Brochure, PageMeta, PageQuery, Paginated, Product, PromoCode, Shop};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("carta-cli/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct StorefrontApi {
    base_url: String,
    client: Client,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub user: Option<UserData>,
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCard {
    pub ccnum: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientCardsData {
    #[serde(default)]
    pub card: Option<ClientCard>,
    #[serde(default)]
    pub virtual_available: bool,
    #[serde(default)]
    pub virtual_ccnum: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetCardData {
    #[serde(default)]
    pub card: Option<ClientCard>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VirtualCardRequest {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub egn: String,
    pub post_code: String,
    pub phone: String,
    pub email: String,
    pub wants_games: bool,
    pub city: String,
    pub street_or_district: String,
    pub street_no: String,
    pub block: String,
    pub entrance: String,
    pub apartment: String,
    pub consent: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VirtualCardData {
    #[serde(default)]
    pub ccnum: Option<String>,
    #[serde(default)]
    pub card: Option<ClientCard>,
    #[serde(default)]
    pub virtual_ccnum: Option<String>,
}

impl VirtualCardData {
    pub fn issued_ccnum(&self) -> Option<&str> {
        self.ccnum
            .as_deref()
            .or_else(|| self.card.as_ref().map(|card| card.ccnum.as_str()))
            .or(self.virtual_ccnum.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Server(i64),
    Local(String),
}

impl ItemId {
    pub fn parse(input: &str) -> Self {
        input
            .parse::<i64>()
            .map(Self::Server)
            .unwrap_or_else(|_| Self::Local(input.to_string()))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn numeric(&self) -> i64 {
        match self {
            Self::Server(id) => *id,
            Self::Local(_) => 0,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => write!(f, "{id}"),
            Self::Local(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_done: u8,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub created_at_ts: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

impl StorefrontApi {
    pub fn new(base_url: &str) -> CartaResult<Self> {
        let trimmed = base_url.trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(CartaError::usage("server URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| CartaError::io(format!("failed to construct API client: {err}")))?;

        Ok(Self {
            base_url: trimmed,
            client,
        })
    }

    pub fn login(&self, email: &str, password: &str) -> CartaResult<AuthResponse> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CartaError::usage("email and password are required for login"));
        }

        let body = serde_json::json!({
            "email": email,
            "password": password,
        });

        self.post_json("/login", &body, None)
    }

    pub fn register(&self, email: &str, password: &str, name: &str) -> CartaResult<AuthResponse> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CartaError::usage(
                "email and password are required for registration",
            ));
        }

        let body = serde_json::json!({
            "email": email,
            "password": password,
            "name": name,
        });

        self.post_json("/register", &body, None)
    }

    pub fn client_cards(&self, access_token: Option<&str>) -> CartaResult<ClientCardsData> {
        self.get_json("/client-cards", &[], access_token)
    }

    pub fn set_card(&self, access_token: Option<&str>, ccnum: &str) -> CartaResult<SetCardData> {
        let body = serde_json::json!({ "ccnum": ccnum });
        self.post_json("/client-cards", &body, access_token)
    }

    pub fn remove_card(&self, access_token: Option<&str>) -> CartaResult<()> {
        let request = self.with_bearer(self.client.delete(self.url("/client-cards")), access_token);
        parse_no_content_response(request.send().map_err(network_error)?)
    }

    pub fn create_virtual_card(
        &self,
        access_token: Option<&str>,
        form: &VirtualCardRequest,
    ) -> CartaResult<VirtualCardData> {
        let payload = serde_json::to_value(form)
            .map_err(|err| CartaError::api(format!("failed to encode virtual card form: {err}")))?;
        self.post_json("/client-cards/virtual", &payload, access_token)
    }

    pub fn shopping_list(&self, access_token: Option<&str>) -> CartaResult<Vec<ShoppingItem>> {
        self.get_json("/shopping-list", &[], access_token)
    }

    pub fn create_item(
        &self,
        access_token: Option<&str>,
        title: &str,
    ) -> CartaResult<Option<ShoppingItem>> {
        let body = serde_json::json!({ "title": title });
        let value: Value = self.post_json("/shopping-list", &body, access_token)?;

        if value.get("id").is_none_or(Value::is_null) {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| CartaError::api(format!("failed to map created shopping list item: {err}")))
    }

    pub fn update_item(
        &self,
        access_token: Option<&str>,
        id: &ItemId,
        title: &str,
    ) -> CartaResult<()> {
        let body = serde_json::json!({ "id": id, "title": title });
        let request = self
            .with_bearer(self.client.put(self.url("/shopping-list")), access_token)
            .json(&body);
        parse_no_content_response(request.send().map_err(network_error)?)
    }

    pub fn toggle_item(
        &self,
        access_token: Option<&str>,
        id: &ItemId,
        is_done: u8,
    ) -> CartaResult<()> {
        let body = serde_json::json!({ "id": id, "is_done": is_done });
        let request = self
            .with_bearer(self.client.patch(self.url("/shopping-list")), access_token)
            .json(&body);
        parse_no_content_response(request.send().map_err(network_error)?)
    }

    pub fn delete_item(&self, access_token: Option<&str>, id: &ItemId) -> CartaResult<()> {
        let body = serde_json::json!({ "id": id });
        let request = self
            .with_bearer(self.client.delete(self.url("/shopping-list")), access_token)
            .json(&body);
        parse_no_content_response(request.send().map_err(network_error)?)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        access_token: Option<&str>,
    ) -> CartaResult<T> {
        let mut request = self.client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        request = self.with_bearer(request, access_token);
        parse_json_response(request.send().map_err(network_error)?)
    }

    pub(crate) fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &Value,
        access_token: Option<&str>,
    ) -> CartaResult<T> {
        let request = self
            .with_bearer(self.client.post(self.url(path)), access_token)
            .json(payload);
        parse_json_response(request.send().map_err(network_error)?)
    }

    fn with_bearer(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        match access_token {
            Some(token) if !token.trim().is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_no_content_response(response: Response) -> CartaResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body_text = response.text().unwrap_or_default();
    Err(parse_error_response(status, &body_text))
}

fn parse_json_response<T: DeserializeOwned>(response: Response) -> CartaResult<T> {
    let status = response.status();
    let body_text = response.text().unwrap_or_default();

    if !status.is_success() {
        return Err(parse_error_response(status, &body_text));
    }

    let value = serde_json::from_str::<Value>(&body_text)
        .map_err(|err| CartaError::api(format!("failed to decode API response JSON: {err}")))?;

    if let Some(data) = value.get("data")
        && !data.is_null()
        && let Ok(parsed) = serde_json::from_value::<T>(data.clone())
    {
        return Ok(parsed);
    }

    serde_json::from_value::<T>(value).map_err(|err| {
        CartaError::api(format!(
            "failed to map API response to expected shape: {err}"
        ))
    })
}

fn parse_error_response(status: StatusCode, body_text: &str) -> CartaError {
    let body_trimmed = body_text.trim();
    let fallback = if body_trimmed.is_empty() {
        format!("request failed with status {}", status.as_u16())
    } else {
        format!(
            "request failed with status {}: {}",
            status.as_u16(),
            truncate_for_error(body_trimmed, 240)
        )
    };

    let parsed = serde_json::from_str::<ErrorEnvelope>(body_text).ok();
    let message = parsed
        .as_ref()
        .and_then(|payload| payload.error.clone())
        .or_else(|| parsed.as_ref().and_then(|payload| payload.message.clone()))
        .unwrap_or(fallback);

    let tagged = format!("{} [http_status={}]", message, status.as_u16());

    // Only 401/403 count as authorization failures.
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        CartaError::auth(tagged)
    } else {
        CartaError::api(tagged)
    }
}

fn truncate_for_error(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

fn network_error(err: reqwest::Error) -> CartaError {
    CartaError::api(format!("network request failed: {err}"))
}
