// upload.rs

use crate::error::Result;
use crate::format::ApiFormat;
use serde::{Deserialize, Serialize};
use url::Url;

/// Single-use upload endpoint handed out by the API (the `link` object of a create call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub protocol: String,
    pub address: String,
    pub path: String,
    pub query: UploadQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadQuery {
    pub key: String,
    pub token: String,
}

impl UploadTarget {
    /// `protocol://address+path?key=..&token=..&api_format=..`. The token authorises the
    /// upload, so nothing here is signed.
    pub fn url(&self, format: &ApiFormat) -> Result<Url> {
        let mut url = Url::parse(&format!("{}://{}{}", self.protocol, self.address, self.path))?;
        url.query_pairs_mut()
            .append_pair("key", &self.query.key)
            .append_pair("token", &self.query.token)
            .append_pair("api_format", format.as_str());
        Ok(url)
    }
}
