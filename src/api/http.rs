//! The banking API over HTTP.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Error,
    account::{Account, AccountId},
    api::{
        AccessToken, AccountApi, AuthApi, ProfileApi, SignInResponse, TransactionApi, TransferApi,
    },
    config::ClientConfig,
    dashboard::UserProfile,
    endpoints::{self, endpoint_segments},
    history::TransactionQuery,
    logging::{log_request, log_response},
    pagination::Page,
    transaction::Transaction,
    transfer::{TransferRequest, TransferResult},
};

/// The error body the server sends with a failed request.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// A client for the banking REST API.
///
/// Every request is sent at most once. Requests that take longer than the
/// configured timeout fail with [Error::Timeout].
#[derive(Debug, Clone)]
pub struct HttpBankApi {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBankApi {
    /// Create a client for the API at `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidUrl] if the API URL cannot be parsed.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&config.api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::InvalidUrl(config.api_url.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Transport(error.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// The URL of `endpoint_path` under the path of the base URL.
    fn url(&self, endpoint_path: &str) -> Result<Url, Error> {
        self.url_with_id(endpoint_path, "")
    }

    fn url_with_id(&self, endpoint_path: &str, id: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(endpoint_segments(endpoint_path, id));

        Ok(url)
    }

    fn account_url(&self, endpoint_path: &str, id: &AccountId) -> Result<Url, Error> {
        // `.` and `..` cannot be sent as a path segment.
        if matches!(id.as_str(), "" | "." | "..") {
            return Err(Error::InvalidUrl(format!("invalid account id {:?}", id.as_str())));
        }

        self.url_with_id(endpoint_path, id.as_str())
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, token: &AccessToken) -> Result<T, Error> {
        let request = self
            .client
            .request(Method::GET, url.clone())
            .bearer_auth(token.as_str());
        let body = self.send(Method::GET, url, request, String::new()).await?;

        decode(&body)
    }

    /// Send `request` and return the body of a successful response.
    async fn send(
        &self,
        method: Method,
        url: Url,
        request: RequestBuilder,
        body: String,
    ) -> Result<String, Error> {
        log_request(&method, &url, &body);

        let request = if body.is_empty() {
            request
        } else {
            request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
        };

        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_send_error)?;

        log_response(&method, &url, status, &text);

        handle_response(status, text)
    }
}

fn map_send_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport(error.to_string())
    }
}

fn handle_response(status: StatusCode, text: String) -> Result<String, Error> {
    if status.is_success() {
        return Ok(text);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Unauthenticated),
        StatusCode::FORBIDDEN => Err(Error::Forbidden(error_message(status, text))),
        StatusCode::NOT_FOUND => Err(Error::NotFound),
        _ => Err(Error::Rejected {
            status: status.as_u16(),
            message: error_message(status, text),
        }),
    }
}

/// The server's `message` if the body is an error response, otherwise the
/// raw body.
fn error_message(status: StatusCode, text: String) -> String {
    if let Ok(ErrorResponse {
        message: Some(message),
    }) = serde_json::from_str(&text)
    {
        return message;
    }

    if text.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned();
    }

    text
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|error| Error::InvalidResponse(error.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|error| Error::InvalidResponse(error.to_string()))
}

#[async_trait]
impl AuthApi for HttpBankApi {
    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInResponse, Error> {
        let url = self.url(endpoints::SIGN_IN)?;
        let body = encode(&SignInRequest { username, password })?;
        let request = self.client.request(Method::POST, url.clone());

        let response = self.send(Method::POST, url, request, body).await?;

        decode(&response)
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), Error> {
        let url = self.url(endpoints::SIGN_OUT)?;
        let request = self
            .client
            .request(Method::POST, url.clone())
            .bearer_auth(token.as_str());

        self.send(Method::POST, url, request, String::new())
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl AccountApi for HttpBankApi {
    async fn my_accounts(&self, token: &AccessToken) -> Result<Vec<Account>, Error> {
        let url = self.url(endpoints::MY_ACCOUNTS)?;

        self.get(url, token).await
    }

    async fn account(&self, token: &AccessToken, id: &AccountId) -> Result<Account, Error> {
        let url = self.account_url(endpoints::ACCOUNT, id)?;

        self.get(url, token).await
    }
}

#[async_trait]
impl ProfileApi for HttpBankApi {
    async fn profile(&self, token: &AccessToken) -> Result<UserProfile, Error> {
        let url = self.url(endpoints::PROFILE)?;

        self.get(url, token).await
    }
}

#[async_trait]
impl TransferApi for HttpBankApi {
    async fn submit_transfer(
        &self,
        token: &AccessToken,
        request: &TransferRequest,
    ) -> Result<TransferResult, Error> {
        let url = self.url(endpoints::TRANSFERS)?;
        let body = encode(request)?;
        let builder = self
            .client
            .request(Method::POST, url.clone())
            .bearer_auth(token.as_str())
            .header(
                endpoints::IDEMPOTENCY_KEY_HEADER,
                request.idempotency_key().as_str(),
            );

        let response = self.send(Method::POST, url, builder, body).await?;

        decode(&response)
    }
}

#[async_trait]
impl TransactionApi for HttpBankApi {
    async fn account_transactions(
        &self,
        token: &AccessToken,
        account_id: &AccountId,
        query: &TransactionQuery,
    ) -> Result<Page<Transaction>, Error> {
        let mut url = self.account_url(endpoints::ACCOUNT_TRANSACTIONS, account_id)?;
        let query_string = serde_urlencoded::to_string(query)
            .map_err(|error| Error::InvalidUrl(error.to_string()))?;
        url.set_query(Some(&query_string));

        self.get(url, token).await
    }
}
