use crate::{
    embedding::{ContentEmbeddingResponse, EmbedBuilder, EmbedContentRequest},
    generation::{ContentBuilder, GenerateContentRequest, GenerationResponse},
};
use reqwest::{
    Client, ClientBuilder, RequestBuilder, Response,
    header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::{
    fmt::{self, Formatter},
    sync::{Arc, LazyLock},
};
use tracing::{Level, Span, instrument};
use url::Url;

static DEFAULT_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://generativelanguage.googleapis.com/v1beta/")
        .expect("unreachable error: failed to parse default base URL")
});

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Model {
    #[default]
    #[serde(rename = "models/gemini-2.5-flash")]
    Gemini25Flash,
    #[serde(rename = "models/gemini-2.5-pro")]
    Gemini25Pro,
    #[serde(rename = "models/text-embedding-004")]
    TextEmbedding004,
    #[serde(rename = "models/gemini-embedding-001")]
    GeminiEmbedding001,
    #[serde(untagged)]
    Custom(String),
}

impl Model {
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gemini25Flash => "models/gemini-2.5-flash",
            Model::Gemini25Pro => "models/gemini-2.5-pro",
            Model::TextEmbedding004 => "models/text-embedding-004",
            Model::GeminiEmbedding001 => "models/gemini-embedding-001",
            Model::Custom(model) => model,
        }
    }

    /// Resolve a model identifier as users tend to write it.
    ///
    /// Both `gemini-2.5-flash` and `models/gemini-2.5-flash` map to the same
    /// model; unknown identifiers become [`Model::Custom`] with the `models/`
    /// prefix added when it is missing.
    pub fn from_id(id: &str) -> Self {
        let id = id.trim();
        let full = if id.starts_with("models/") || id.starts_with("tunedModels/") {
            id.to_string()
        } else {
            format!("models/{id}")
        };
        match full.as_str() {
            "models/gemini-2.5-flash" => Model::Gemini25Flash,
            "models/gemini-2.5-pro" => Model::Gemini25Pro,
            "models/text-embedding-004" => Model::TextEmbedding004,
            "models/gemini-embedding-001" => Model::GeminiEmbedding001,
            _ => Model::Custom(full),
        }
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Self::from_id(&model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Self::from_id(model)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("failed to parse API key"))]
    InvalidApiKey { source: InvalidHeaderValue },

    #[snafu(display("failed to construct URL (probably incorrect model name): {suffix}"))]
    ConstructUrl { source: url::ParseError, suffix: String },

    #[snafu(display("failed to build HTTP client"))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("failed to perform request"))]
    PerformRequest { source: reqwest::Error },

    #[snafu(display(
        "bad response from server; code {code}; description: {}",
        description.as_deref().unwrap_or("none")
    ))]
    BadResponse {
        /// HTTP status code
        code: u16,
        /// HTTP error description
        description: Option<String>,
    },

    #[snafu(display("failed to deserialize JSON response"))]
    DecodeResponse { source: reqwest::Error },
}

/// Markers in a Gemini error body that reject the caller's credentials.
/// The API reports an invalid key as `400 INVALID_ARGUMENT` with reason
/// `API_KEY_INVALID`.
const AUTH_FAILURE_MARKERS: [&str; 3] = ["API_KEY_INVALID", "PERMISSION_DENIED", "UNAUTHENTICATED"];

impl Error {
    /// Whether the server rejected this particular request rather than the
    /// caller's credentials, quota, or connectivity.
    ///
    /// Oversized or malformed inputs come back as 400/413; retrying the same
    /// payload will not help, but other payloads on the same client may
    /// still succeed. A 400 whose body names a credential failure is not
    /// client-side: every other request would fail the same way.
    pub fn is_client_side(&self) -> bool {
        match self {
            Error::BadResponse { code: 400 | 413 | 422, description } => !description
                .as_deref()
                .is_some_and(|body| AUTH_FAILURE_MARKERS.iter().any(|m| body.contains(m))),
            _ => false,
        }
    }
}

/// Internal client for making requests to the Gemini API
pub struct GeminiClient {
    http_client: Client,
    pub model: Model,
    base_url: Url,
}

impl GeminiClient {
    fn with_base_url<M: Into<Model>>(
        client_builder: ClientBuilder,
        model: M,
        base_url: Url,
        api_key: &str,
    ) -> Result<Self, Error> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("x-goog-api-key"),
            HeaderValue::from_str(api_key).context(InvalidApiKeySnafu)?,
        )]);

        let http_client =
            client_builder.default_headers(headers).build().context(BuildClientSnafu)?;

        Ok(Self { http_client, model: model.into(), base_url })
    }

    /// Check the response status code and return an error if it is not successful
    #[tracing::instrument(skip_all, err)]
    async fn check_response(response: Response) -> Result<Response, Error> {
        let status = response.status();
        if !status.is_success() {
            let description = response.text().await.ok();
            BadResponseSnafu { code: status.as_u16(), description }.fail()
        } else {
            Ok(response)
        }
    }

    /// Performs an HTTP request to the Gemini API with standardized error handling.
    ///
    /// `builder` constructs the request from the shared client, `deserializer`
    /// turns a successful response into the desired type. Non-2xx statuses are
    /// converted into [`Error::BadResponse`] before the deserializer runs.
    #[tracing::instrument(skip_all)]
    #[doc(hidden)]
    pub async fn perform_request<
        B: FnOnce(&Client) -> RequestBuilder,
        D: AsyncFn(Response) -> Result<T, Error>,
        T,
    >(
        &self,
        builder: B,
        deserializer: D,
    ) -> Result<T, Error> {
        let request = builder(&self.http_client);
        tracing::debug!("request built successfully");
        let response = request.send().await.context(PerformRequestSnafu)?;
        tracing::debug!("response received successfully");
        let response = Self::check_response(response).await?;
        tracing::debug!("response ok");
        deserializer(response).await
    }

    /// Perform a POST request with JSON body and deserialize the JSON response.
    #[tracing::instrument(skip(self, body), fields(request.type = "post", request.url = %url))]
    async fn post_json<Req: serde::Serialize, Res: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        body: &Req,
    ) -> Result<Res, Error> {
        self.perform_request(
            |c| c.post(url).json(body),
            async |r| r.json().await.context(DecodeResponseSnafu),
        )
        .await
    }

    /// Generate content
    #[instrument(skip_all, fields(
        model = %self.model,
        messages.parts.count = request.contents.len(),
        usage.prompt_tokens,
        usage.candidates_tokens,
        usage.total_tokens,
    ), ret(level = Level::TRACE), err)]
    pub(crate) async fn generate_content_raw(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerationResponse, Error> {
        let url = self.build_url("generateContent")?;
        let response: GenerationResponse = self.post_json(url, &request).await?;

        if let Some(usage) = &response.usage_metadata {
            #[rustfmt::skip]
            Span::current()
                .record("usage.prompt_tokens", usage.prompt_token_count)
                .record("usage.candidates_tokens", usage.candidates_token_count)
                .record("usage.total_tokens", usage.total_token_count);

            tracing::debug!("generation usage evaluated");
        }

        Ok(response)
    }

    /// Embed content
    #[instrument(skip_all, fields(
        model = %self.model,
        task.type = request.task_type.as_ref().map(|t| t.as_str()),
        task.output.dimensionality = request.output_dimensionality,
    ))]
    pub(crate) async fn embed_content(
        &self,
        request: EmbedContentRequest,
    ) -> Result<ContentEmbeddingResponse, Error> {
        let url = self.build_url("embedContent")?;
        self.post_json(url, &request).await
    }

    /// Build a URL for a model endpoint, e.g. `models/text-embedding-004:embedContent`
    #[tracing::instrument(skip(self), ret(level = Level::DEBUG))]
    fn build_url(&self, endpoint: &str) -> Result<Url, Error> {
        let suffix = format!("{}:{endpoint}", self.model);
        self.base_url.join(&suffix).context(ConstructUrlSnafu { suffix })
    }
}

/// A builder for the `Gemini` client.
///
/// # Examples
///
/// ```no_run
/// use docqa_gemini::{GeminiBuilder, Model};
///
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let gemini = GeminiBuilder::new("YOUR_API_KEY")
///     .with_model(Model::Gemini25Pro)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct GeminiBuilder {
    api_key: String,
    model: Model,
    base_url: Url,
}

impl GeminiBuilder {
    /// Creates a new `GeminiBuilder` with the given API key.
    pub fn new<K: Into<String>>(key: K) -> Self {
        Self {
            api_key: key.into(),
            model: Model::default(),
            base_url: DEFAULT_BASE_URL.clone(),
        }
    }

    /// Sets the model for the client.
    pub fn with_model<M: Into<Model>>(mut self, model: M) -> Self {
        self.model = model.into();
        self
    }

    /// Sets a custom base URL for the API.
    ///
    /// The URL must end with a slash, e.g. `http://127.0.0.1:8080/v1beta/`.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Builds the `Gemini` client.
    pub fn build(self) -> Result<Gemini, Error> {
        let client = GeminiClient::with_base_url(
            Client::builder(),
            self.model,
            self.base_url,
            &self.api_key,
        )?;
        Ok(Gemini { client: Arc::new(client) })
    }
}

/// Client for the Gemini API
#[derive(Clone)]
pub struct Gemini {
    client: Arc<GeminiClient>,
}

impl Gemini {
    /// Create a new client with the specified API key
    pub fn new<K: AsRef<str>>(api_key: K) -> Result<Self, Error> {
        Self::with_model(api_key, Model::default())
    }

    /// Create a new client with the specified API key and model
    pub fn with_model<K: AsRef<str>, M: Into<Model>>(api_key: K, model: M) -> Result<Self, Error> {
        GeminiBuilder::new(api_key.as_ref()).with_model(model).build()
    }

    /// Create a new client with the specified API key, model, and base URL
    pub fn with_model_and_base_url<K: AsRef<str>, M: Into<Model>>(
        api_key: K,
        model: M,
        base_url: Url,
    ) -> Result<Self, Error> {
        GeminiBuilder::new(api_key.as_ref()).with_model(model).with_base_url(base_url).build()
    }

    /// The model every request from this client targets.
    pub fn model(&self) -> &Model {
        &self.client.model
    }

    /// Start building a content generation request
    pub fn generate_content(&self) -> ContentBuilder {
        ContentBuilder::new(self.client.clone())
    }

    /// Start building a content embedding request
    pub fn embed_content(&self) -> EmbedBuilder {
        EmbedBuilder::new(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_ids_accept_bare_and_prefixed_forms() {
        assert_eq!(Model::from_id("gemini-2.5-flash"), Model::Gemini25Flash);
        assert_eq!(Model::from_id("models/text-embedding-004"), Model::TextEmbedding004);
        assert_eq!(
            Model::from_id("embedding-001"),
            Model::Custom("models/embedding-001".to_string())
        );
        assert_eq!(Model::from_id("models/gemini-1.5-flash").as_str(), "models/gemini-1.5-flash");
    }

    #[test]
    fn model_serializes_to_resource_name() {
        let json = serde_json::to_string(&Model::GeminiEmbedding001).unwrap();
        assert_eq!(json, "\"models/gemini-embedding-001\"");
    }

    #[test]
    fn build_url_targets_model_endpoint() {
        let gemini = Gemini::with_model("key", Model::TextEmbedding004).unwrap();
        let url = gemini.client.build_url("embedContent").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn invalid_api_key_is_rejected() {
        let err = Gemini::new("bad\nkey").err().expect("newline in header must fail");
        assert!(matches!(err, Error::InvalidApiKey { .. }));
    }

    #[test]
    fn client_side_errors_are_distinguished() {
        let oversized = Error::BadResponse { code: 400, description: None };
        let unauthorized = Error::BadResponse { code: 403, description: None };
        assert!(oversized.is_client_side());
        assert!(!unauthorized.is_client_side());
    }

    #[test]
    fn invalid_key_body_is_not_client_side() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT", "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID", "domain": "googleapis.com"}]}}"#;
        let invalid_key = Error::BadResponse { code: 400, description: Some(body.to_string()) };
        assert!(!invalid_key.is_client_side());

        let unauthenticated = Error::BadResponse {
            code: 400,
            description: Some(r#"{"error": {"code": 400, "status": "UNAUTHENTICATED"}}"#.into()),
        };
        assert!(!unauthenticated.is_client_side());

        let malformed = Error::BadResponse {
            code: 400,
            description: Some(r#"{"error": {"code": 400, "status": "INVALID_ARGUMENT", "message": "input too long"}}"#.into()),
        };
        assert!(malformed.is_client_side());
    }
}
