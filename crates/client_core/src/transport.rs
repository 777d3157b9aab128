//! HTTP access to the auth and real-estate-object endpoints.

use std::{fmt, str::FromStr, time::Duration};

use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ObjectId, ObjectType, ResourceObject},
    error::ApiError,
    protocol::{
        AuthResponse, CreateObjectRequest, EmailVerificationRequest, ForgotPasswordRequest,
        PasswordResetRequest, SigninRequest, SignupRequest, UserProfile,
    },
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_PROFILE_PATH: &str = "/users/info";
pub const SESSION_COOKIE_NAME: &str = "token";

/// How the session token travels with authenticated requests. One per
/// deployment; the two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialTransport {
    #[default]
    Bearer,
    Cookie,
}

impl FromStr for CredentialTransport {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bearer" | "header" => Ok(CredentialTransport::Bearer),
            "cookie" => Ok(CredentialTransport::Cookie),
            other => Err(ClientError::Validation(format!(
                "unknown credential transport '{other}'"
            ))),
        }
    }
}

impl fmt::Display for CredentialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialTransport::Bearer => f.write_str("bearer"),
            CredentialTransport::Cookie => f.write_str("cookie"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub profile_path: String,
    pub credential_transport: CredentialTransport,
    pub request_timeout: Option<Duration>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
            credential_transport: CredentialTransport::default(),
            request_timeout: None,
        }
    }
}

pub struct ApiClient {
    http: Client,
    server_url: String,
    profile_path: String,
    transport: CredentialTransport,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let server_url = parse_base_url(&config.base_url)?
            .as_str()
            .trim_end_matches('/')
            .to_string();
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let profile_path = match config.profile_path.trim() {
            "" => DEFAULT_PROFILE_PATH.to_string(),
            path if path.starts_with('/') => path.to_string(),
            path => format!("/{path}"),
        };

        Ok(Self {
            http: builder.build()?,
            server_url,
            profile_path,
            transport: config.credential_transport,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn credential_transport(&self) -> CredentialTransport {
        self.transport
    }

    pub async fn register(&self, request: &SignupRequest) -> Result<(), ClientError> {
        let builder = self.http.post(self.url("/auth/register-user")).json(request);
        send(builder).await?;
        Ok(())
    }

    pub async fn verify_email(&self, request: &EmailVerificationRequest) -> Result<(), ClientError> {
        let builder = self.http.post(self.url("/auth/verify-email")).json(request);
        send(builder).await?;
        Ok(())
    }

    pub async fn resend_verification(&self, email: &str) -> Result<(), ClientError> {
        let builder = self
            .http
            .post(self.url("/auth/resend-verification"))
            .query(&[("email", email)]);
        send(builder).await?;
        Ok(())
    }

    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<(), ClientError> {
        let builder = self.http.post(self.url("/auth/forgot-password")).json(request);
        send(builder).await?;
        Ok(())
    }

    pub async fn reset_password(&self, request: &PasswordResetRequest) -> Result<(), ClientError> {
        let builder = self.http.post(self.url("/auth/reset-password")).json(request);
        send(builder).await?;
        Ok(())
    }

    pub async fn login(&self, request: &SigninRequest) -> Result<AuthResponse, ClientError> {
        let builder = self.http.post(self.url("/auth/login")).json(request);
        decode(send(builder).await?).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), ClientError> {
        let builder = self.authorize(self.http.post(self.url("/auth/logout")), token);
        send_authenticated(builder).await?;
        Ok(())
    }

    pub async fn validate(&self, token: &str) -> Result<(), ClientError> {
        let builder = self.authorize(self.http.get(self.url("/auth/validate")), token);
        send_authenticated(builder).await?;
        Ok(())
    }

    pub async fn profile(&self, token: &str) -> Result<UserProfile, ClientError> {
        let builder = self.authorize(self.http.get(self.url(&self.profile_path)), token);
        decode(send_authenticated(builder).await?).await
    }

    pub async fn list_objects(&self, token: &str) -> Result<Vec<ResourceObject>, ClientError> {
        let builder = self.authorize(self.http.get(self.url("/real-estate-objects")), token);
        decode_list(send_authenticated(builder).await?).await
    }

    pub async fn list_children(
        &self,
        token: &str,
        parent_id: ObjectId,
    ) -> Result<Vec<ResourceObject>, ClientError> {
        let path = format!("/real-estate-objects/{parent_id}/children");
        let builder = self.authorize(self.http.get(self.url(&path)), token);
        decode_list(send_authenticated(builder).await?).await
    }

    pub async fn list_by_type(
        &self,
        token: &str,
        object_type: ObjectType,
    ) -> Result<Vec<ResourceObject>, ClientError> {
        let builder = self
            .authorize(self.http.get(self.url("/real-estate-objects/by-type")), token)
            .query(&[("type", object_type.as_str())]);
        decode_list(send_authenticated(builder).await?).await
    }

    /// Creates an object. The echoed record is returned when the body decodes;
    /// callers refetch the list either way.
    pub async fn create_object(
        &self,
        token: &str,
        request: &CreateObjectRequest,
    ) -> Result<Option<ResourceObject>, ClientError> {
        let builder = self
            .authorize(self.http.post(self.url("/real-estate-objects")), token)
            .json(request);
        let bytes = send_authenticated(builder).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes).ok())
    }

    pub async fn delete_object(&self, token: &str, id: ObjectId) -> Result<(), ClientError> {
        let path = format!("/real-estate-objects/{id}");
        let builder = self.authorize(self.http.delete(self.url(&path)), token);
        send_authenticated(builder).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    fn authorize(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        match self.transport {
            CredentialTransport::Bearer => builder.bearer_auth(token),
            CredentialTransport::Cookie => {
                builder.header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"))
            }
        }
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ClientError::Validation(format!("invalid api base url '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ClientError::Validation(format!(
            "api base url must be an http(s) url with a host: '{raw}'"
        )));
    }
    Ok(url)
}

async fn send(builder: RequestBuilder) -> Result<Response, ClientError> {
    let response = builder.send().await?;
    let status = response.status();
    if status.is_success() {
        debug!(status = status.as_u16(), url = %response.url(), "api request succeeded");
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), %url, "api request rejected");
    Err(ClientError::Api(ApiError::from_body(status.as_u16(), &body)))
}

/// Like [`send`], but 401/403 mean the presented token was refused.
async fn send_authenticated(builder: RequestBuilder) -> Result<Response, ClientError> {
    send(builder).await.map_err(|err| match err {
        ClientError::Api(api) if api.code.is_session_rejection() => ClientError::SessionRejected(api),
        other => other,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|err| ClientError::UnexpectedResponse(format!("malformed response body: {err}")))
}

/// An empty 2xx body counts as an empty collection.
async fn decode_list<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, ClientError> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| ClientError::UnexpectedResponse(format!("malformed response body: {err}")))
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
