// client.rs

use crate::error::{BotrError, Result};
use crate::format::ApiFormat;
use crate::params::{EncodedValue, ParameterSet, SignedParams};
use crate::request_signer::{RequestSigner, SignerOptions};
use crate::transport::{MultipartField, ReqwestTransport, Transport};
use crate::upload::UploadTarget;
use crate::utils::API_FORMAT;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://api.bitsontherun.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How list-valued parameters are laid out in the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayStyle {
    /// `tags[0]=a&tags[1]=b`
    #[default]
    Indexed,
    /// `tags=a&tags=b`
    Repeated,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Connect timeout, and the whole-request limit for `call`.
    pub timeout: Duration,
    /// Whole-request limit for `upload`. `None` keeps a streaming upload alive while it makes progress.
    pub upload_timeout: Option<Duration>,
    pub array_style: ArrayStyle,
    pub signer: SignerOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: None,
            array_style: ArrayStyle::default(),
            signer: SignerOptions::default(),
        }
    }
}

/// Raw response bytes and the format they were requested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub format: ApiFormat,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(|e| BotrError::InvalidResponse(e.to_string()))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.format != ApiFormat::Json {
            return Err(BotrError::UnsupportedFormat(self.format.to_string()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Debug)]
pub struct BotrClient<T = ReqwestTransport> {
    signer: RequestSigner,
    base_url: String,
    array_style: ArrayStyle,
    transport: Option<T>,
}

impl BotrClient<ReqwestTransport> {
    pub fn new(api_key: String, api_secret: String) -> Result<Self> {
        Self::with_options(api_key, api_secret, ClientOptions::default())
    }

    pub fn with_options(api_key: String, api_secret: String, options: ClientOptions) -> Result<Self> {
        let transport = ReqwestTransport::new(options.timeout, options.upload_timeout)?;
        BotrClient::with_transport(api_key, api_secret, transport, options)
    }

    /// A client that only builds signed URLs; `call` and `upload` fail with
    /// [`BotrError::NoTransport`].
    pub fn offline(api_key: String, api_secret: String, options: ClientOptions) -> Result<Self> {
        Ok(BotrClient {
            signer: RequestSigner::new(api_key, api_secret, Some(options.signer))?,
            base_url: options.base_url,
            array_style: options.array_style,
            transport: None,
        })
    }
}

impl<T: Transport> BotrClient<T> {
    pub fn with_transport(
        api_key: String,
        api_secret: String,
        transport: T,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(BotrClient {
            signer: RequestSigner::new(api_key, api_secret, Some(options.signer))?,
            base_url: options.base_url,
            array_style: options.array_style,
            transport: Some(transport),
        })
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Signed GET URL for `call` (e.g. `/videos/list`).
    pub fn call_url(&self, call: &str, params: &ParameterSet) -> Result<Url> {
        let signed = self.signer.build_authenticated_params(params)?;
        let url = self.signed_url(call, &signed)?;
        debug!(call, nonce = ?signed.get("api_nonce"), "built signed call url");
        Ok(url)
    }

    /// Serialises already signed parameters onto `base_url + call`.
    pub fn signed_url(&self, call: &str, signed: &SignedParams) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, call))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in signed.pairs() {
                append_value(&mut query, self.array_style, key, &value);
            }
        }
        Ok(url)
    }

    pub async fn call(&self, call: &str, params: &ParameterSet) -> Result<ApiResponse> {
        let transport = self.transport.as_ref().ok_or(BotrError::NoTransport)?;
        let format = self.requested_format(params)?;
        let signed = self.signer.build_authenticated_params(params)?;
        let url = self.signed_url(call, &signed)?;

        debug!(call, %format, "dispatching api call");
        let body = transport.get(&url).await?;
        Ok(ApiResponse { format, body })
    }

    /// Format the response will arrive in, read from the caller's unencoded `api_format`.
    fn requested_format(&self, params: &ParameterSet) -> Result<ApiFormat> {
        match params.get(API_FORMAT) {
            None => Ok(self.signer.default_format().clone()),
            Some(value) => value
                .as_scalar_string()
                .map(|name| ApiFormat::parse(&name))
                .ok_or_else(|| BotrError::Encoding {
                    key: API_FORMAT.to_string(),
                }),
        }
    }

    /// Posts the file at `file_path` to an upload target obtained from a previous call.
    pub async fn upload(
        &self,
        target: &UploadTarget,
        file_path: impl AsRef<Path>,
        format: Option<ApiFormat>,
    ) -> Result<ApiResponse> {
        let transport = self.transport.as_ref().ok_or(BotrError::NoTransport)?;
        let format = format.unwrap_or_else(|| self.signer.default_format().clone());
        let url = target.url(&format)?;

        let fields = vec![MultipartField::File {
            name: "file".to_string(),
            path: file_path.as_ref().to_path_buf(),
        }];

        debug!(address = %target.address, path = %target.path, "uploading file");
        let body = transport.post_multipart(&url, fields).await?;
        Ok(ApiResponse { format, body })
    }
}

// Values are sent as encoded by the signer; the query serialiser encodes them once more.
fn append_value(
    query: &mut url::form_urlencoded::Serializer<'_, url::UrlQuery<'_>>,
    style: ArrayStyle,
    key: &str,
    value: &EncodedValue,
) {
    match value {
        EncodedValue::Scalar(s) => {
            query.append_pair(key, s);
        }
        EncodedValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                let item_key = match style {
                    ArrayStyle::Indexed => format!("{}[{}]", key, i),
                    ArrayStyle::Repeated => key.to_string(),
                };
                append_value(query, style, &item_key, item);
            }
        }
    }
}
