use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use scantemplate_prelude::{Value, ValueList, BLANK_TEMPLATE_PATH, TEMPLATES_PATH};
use std::collections::BTreeMap;
use std::time::Duration;

const XML_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    pub url: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request timeout in milliseconds.
    #[serde(default = "Config::default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub accept_invalid_cert: bool,
}

impl Config {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Default::default(),
            headers: Default::default(),
            timeout: Self::default_timeout(),
            accept_invalid_cert: false,
        }
    }

    fn default_timeout() -> u64 {
        30_000
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let key = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| Error::HeaderInvalid(name.clone()))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|_| Error::HeaderInvalid(name.clone()))?;
                Ok::<_, Error>((key, value))
            })
            .collect()
    }

    pub fn build(&self) -> Result<Console, Error> {
        tracing::debug!("building console client for {}", self.url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.timeout))
            .danger_accept_invalid_certs(self.accept_invalid_cert)
            .build()
            .map_err(|err| {
                tracing::error!("unable to build http client: {:?}", err);
                Error::ClientInvalid(err)
            })?;
        Ok(Console {
            client,
            url: self.url.clone(),
            params: self
                .params
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            headers: self.build_headers()?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to build http client: {0:?}")]
    ClientInvalid(reqwest::Error),
    #[error("Invalid header {0:?}")]
    HeaderInvalid(String),
    #[error("Unable to build console url: {0:?}")]
    UrlInvalid(#[from] url::ParseError),
    #[error("Unable to request console: {0:?}")]
    RequestFailed(reqwest::Error),
    #[error("Console responded with an error: {0:?}")]
    StatusFailed(reqwest::Error),
    #[error("Unable to read console response: {0:?}")]
    BodyInvalid(reqwest::Error),
}

impl Error {
    /// Status code returned by the console, when it answered with an error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::StatusFailed(inner) => inner.status(),
            _ => None,
        }
    }
}

/// Authenticated access to the scan template endpoints of a console.
#[derive(Clone, Debug)]
pub struct Console {
    client: reqwest::Client,
    url: String,
    params: Vec<(String, String)>,
    headers: HeaderMap,
}

impl Console {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            params: Default::default(),
            headers: Default::default(),
        }
    }

    fn interpolate(&self, path: &str) -> String {
        if self.url.ends_with('/') {
            format!("{}{}", self.url, path)
        } else {
            format!("{}/{}", self.url, path)
        }
    }

    fn build_url(&self, path: &str) -> Result<Url, Error> {
        let mut url = Url::parse(self.interpolate(path).as_str()).map_err(|err| {
            tracing::error!("unable to generate console url: {:?}", err);
            Error::UrlInvalid(err)
        })?;
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        Ok(url)
    }

    fn template_path(id: &str) -> String {
        format!("{}/{}", TEMPLATES_PATH, urlencoding::encode(id))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.build_url(path)?;
        let label = method.to_string();
        tracing::debug!("requesting {} {}", label, url);
        metrics::counter!("console_request", "method" => label.clone()).increment(1);
        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers.clone());
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, XML_CONTENT_TYPE).body(body);
        }
        let res = request.send().await.map_err(|err| {
            metrics::counter!("console_request_error", "method" => label.clone(), "reason" => "request")
                .increment(1);
            tracing::error!("unable to execute request: {:?}", err);
            Error::RequestFailed(err)
        })?;
        res.error_for_status().map_err(|err| {
            metrics::counter!("console_request_error", "method" => label, "reason" => "status")
                .increment(1);
            tracing::error!("console responded with an error: {:?}", err.status());
            Error::StatusFailed(err)
        })
    }

    async fn read_value(res: reqwest::Response) -> Result<String, Error> {
        let envelope: Value<String> = res.json().await.map_err(|err| {
            tracing::error!("unable to parse console response: {:?}", err);
            Error::BodyInvalid(err)
        })?;
        Ok(envelope.value)
    }

    /// Ids of every scan template known by the console, in the order it returns them.
    pub async fn list_templates(&self) -> Result<Vec<String>, Error> {
        tracing::debug!("listing scan templates");
        let res = self.execute(Method::GET, TEMPLATES_PATH, None).await?;
        let envelope: ValueList<String> = res.json().await.map_err(|err| {
            tracing::error!("unable to parse template list: {:?}", err);
            Error::BodyInvalid(err)
        })?;
        Ok(envelope.value_list)
    }

    /// Built-in templates are protected by the console itself.
    pub async fn delete_template(&self, id: &str) -> Result<(), Error> {
        tracing::debug!("deleting scan template {}", id);
        self.execute(Method::DELETE, Self::template_path(id).as_str(), None)
            .await?;
        Ok(())
    }

    pub async fn fetch_template(&self, id: &str) -> Result<String, Error> {
        tracing::debug!("loading scan template {}", id);
        let res = self
            .execute(Method::GET, Self::template_path(id).as_str(), None)
            .await?;
        Self::read_value(res).await
    }

    pub async fn fetch_blank_template(&self) -> Result<String, Error> {
        tracing::debug!("loading blank scan template");
        let res = self.execute(Method::GET, BLANK_TEMPLATE_PATH, None).await?;
        res.text().await.map_err(|err| {
            tracing::error!("unable to read blank template: {:?}", err);
            Error::BodyInvalid(err)
        })
    }

    pub async fn create_template(&self, content: String) -> Result<String, Error> {
        let res = self
            .execute(Method::POST, TEMPLATES_PATH, Some(content))
            .await?;
        Self::read_value(res).await
    }

    pub async fn update_template(&self, id: &str, content: String) -> Result<String, Error> {
        let res = self
            .execute(Method::PUT, Self::template_path(id).as_str(), Some(content))
            .await?;
        Self::read_value(res).await
    }
}
