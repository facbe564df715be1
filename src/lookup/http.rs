use super::{IspProvider, ProviderRecord, ProviderSchema};
use crate::error::{Error, LookupError};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;
use wreq::header::HeaderMap;

const IP_PLACEHOLDER: &str = "{ip}";

/// JSON lookup service reached by `GET` on a per-address URL.
pub struct HttpProvider {
    name: String,
    url_template: String,
    schema: ProviderSchema,
    client: wreq::Client,
    headers: HeaderMap,
}

impl HttpProvider {
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        schema: ProviderSchema,
        client: wreq::Client,
        headers: HeaderMap,
    ) -> Result<Self, Error> {
        let name = name.into();
        let url_template = url_template.into();

        if !url_template.contains(IP_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "provider {name}: url template has no {IP_PLACEHOLDER} placeholder"
            )));
        }
        render_url(&url_template, "192.0.2.1").map_err(|e| match e {
            LookupError::Url(e) => Error::Url(e),
            other => Error::Config(format!("provider {name}: {other}")),
        })?;

        Ok(Self {
            name,
            url_template,
            schema,
            client,
            headers,
        })
    }
}

#[async_trait]
impl IspProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, ip: &str) -> Result<ProviderRecord, LookupError> {
        let url = render_url(&self.url_template, ip)?;

        let resp = self
            .client
            .get(url.as_str())
            .headers(self.headers.clone())
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        let json: Value = serde_json::from_str(&body)?;
        self.schema.parse(&json)
    }
}

fn render_url(template: &str, ip: &str) -> Result<Url, LookupError> {
    let url = Url::parse(&template.replace(IP_PLACEHOLDER, ip))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LookupError::Malformed(format!(
            "unsupported url scheme {other}"
        ))),
    }
}
