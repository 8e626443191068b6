// src/lib.rs

pub mod client;
pub mod error;
pub mod format;
pub mod params;
pub mod request_signer;
pub mod transport;
pub mod upload;
pub mod utils;

pub use client::{ApiResponse, ArrayStyle, BotrClient, ClientOptions};
pub use error::{BotrError, Result};
pub use format::ApiFormat;
pub use params::{EncodedParams, EncodedValue, ParamValue, ParameterSet, SignedParams};
pub use request_signer::{RequestSigner, SignerOptions};
pub use transport::{MultipartField, ReqwestTransport, Transport, TransportError};
pub use upload::{UploadQuery, UploadTarget};
