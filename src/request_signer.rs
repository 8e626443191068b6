// request_signer.rs

use crate::error::{BotrError, Result};
use crate::format::ApiFormat;
use crate::params::{EncodedParams, EncodedValue, ParamValue, ParameterSet, SignedParams};
use crate::utils::{
    buf2hex, encode_rfc3986, sha1_hash, API_FORMAT, API_KEY, API_KIT, API_NONCE, API_SIGNATURE,
    API_TIMESTAMP, RESERVED_PARAMS,
};
use chrono::Utc;
use rand::Rng;
use std::fmt;
use tracing::warn;

pub const NONCE_MAX: u32 = 99_999_999;

#[derive(Debug, Clone, Default)]
pub struct SignerOptions {
    /// `api_format` used when the caller does not pass one.
    pub default_format: ApiFormat,
    /// Overrides the `api_kit` tag, `rust-<version>` otherwise.
    pub kit: Option<String>,
    /// Reject values with no scalar form instead of sending them empty.
    pub strict: bool,
}

pub struct RequestSigner {
    api_key: String,
    api_secret: String,
    default_format: ApiFormat,
    kit: String,
    strict: bool,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("default_format", &self.default_format)
            .field("kit", &self.kit)
            .field("strict", &self.strict)
            .finish()
    }
}

impl RequestSigner {
    pub fn new(api_key: String, api_secret: String, options: Option<SignerOptions>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(BotrError::MissingOption("apiKey"));
        }
        if api_secret.is_empty() {
            return Err(BotrError::MissingOption("apiSecret"));
        }

        let options = options.unwrap_or_default();
        let kit = options
            .kit
            .unwrap_or_else(|| format!("rust-{}", env!("CARGO_PKG_VERSION")));

        Ok(RequestSigner {
            api_key,
            api_secret,
            default_format: options.default_format,
            kit,
            strict: options.strict,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn default_format(&self) -> &ApiFormat {
        &self.default_format
    }

    pub fn kit(&self) -> &str {
        &self.kit
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Adds the `api_*` fields to `user_params`, encodes every value and signs the result.
    pub fn build_authenticated_params(&self, user_params: &ParameterSet) -> Result<SignedParams> {
        let nonce = rand::thread_rng().gen_range(0..=NONCE_MAX);
        let timestamp = Utc::now().timestamp();
        self.build_authenticated_params_at(user_params, nonce, timestamp)
    }

    /// Same as [`build_authenticated_params`](Self::build_authenticated_params) with the
    /// nonce and timestamp supplied by the caller.
    pub fn build_authenticated_params_at(
        &self,
        user_params: &ParameterSet,
        nonce: u32,
        timestamp: i64,
    ) -> Result<SignedParams> {
        let mut args = user_params.clone();

        for key in args.keys().filter(|k| RESERVED_PARAMS.contains(k.as_str())) {
            warn!(key = %key, "caller supplied reserved parameter, it will be replaced");
        }
        args.remove(API_SIGNATURE);

        args.insert(API_NONCE.to_string(), ParamValue::Str(format_nonce(nonce)));
        args.insert(API_TIMESTAMP.to_string(), ParamValue::Int(timestamp));
        args.insert(API_KEY.to_string(), ParamValue::Str(self.api_key.clone()));
        args.entry(API_FORMAT.to_string())
            .or_insert_with(|| ParamValue::Str(self.default_format.to_string()));
        args.insert(API_KIT.to_string(), ParamValue::Str(self.kit.clone()));

        let mut params = EncodedParams::new();
        for (key, value) in &args {
            let encoded = if self.strict {
                try_encode_value(key, value)?
            } else {
                encode_value(value)
            };
            params.insert(key.clone(), encoded);
        }

        let signature = sign(&params, &self.api_secret);
        Ok(SignedParams { params, signature })
    }

    pub fn sign(&self, params: &EncodedParams) -> String {
        sign(params, &self.api_secret)
    }

    /// Recomputes the signature over `signed.params` and compares it to the stored one.
    pub fn verify(&self, signed: &SignedParams) -> bool {
        self.sign(&signed.params) == signed.signature
    }
}

/// Fixed-width, zero-padded nonce. Values above [`NONCE_MAX`] wrap into range.
pub fn format_nonce(nonce: u32) -> String {
    format!("{:08}", nonce % (NONCE_MAX + 1))
}

/// Encodes a parameter value; values with no scalar form become the empty string.
pub fn encode_value(value: &ParamValue) -> EncodedValue {
    match value {
        ParamValue::List(items) => EncodedValue::List(items.iter().map(encode_value).collect()),
        other => EncodedValue::Scalar(
            other
                .as_scalar_string()
                .map(|s| encode_rfc3986(&s))
                .unwrap_or_default(),
        ),
    }
}

/// Strict form of [`encode_value`]: null and nested maps are an error.
pub fn try_encode_value(key: &str, value: &ParamValue) -> Result<EncodedValue> {
    match value {
        ParamValue::List(items) => items
            .iter()
            .map(|item| try_encode_value(key, item))
            .collect::<Result<Vec<_>>>()
            .map(EncodedValue::List),
        other => other
            .as_scalar_string()
            .map(|s| EncodedValue::Scalar(encode_rfc3986(&s)))
            .ok_or_else(|| BotrError::Encoding {
                key: key.to_string(),
            }),
    }
}

/// Signature base string: `key=value` pairs in byte order of the keys, joined with `&`.
pub fn canonicalize(params: &EncodedParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<String>>()
        .join("&")
}

/// `hex(SHA1(canonical string + secret))`.
pub fn sign(params: &EncodedParams, secret: &str) -> String {
    let mut base = canonicalize(params);
    base.push_str(secret);
    buf2hex(&sha1_hash(base.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::decode_url_component;
    use std::collections::BTreeMap;

    fn signer() -> RequestSigner {
        RequestSigner::new(
            "k1".to_string(),
            "s1".to_string(),
            Some(SignerOptions {
                kit: Some("kit-x.y".to_string()),
                ..SignerOptions::default()
            }),
        )
        .unwrap()
    }

    fn params(pairs: &[(&str, ParamValue)]) -> ParameterSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_reference_vector() {
        let user = params(&[("foo", "bar baz".into())]);
        let signed = signer().build_authenticated_params_at(&user, 1, 1000).unwrap();

        assert_eq!(
            canonicalize(&signed.params),
            "api_format=json&api_key=k1&api_kit=kit-x.y&api_nonce=00000001&api_timestamp=1000&foo=bar%20baz"
        );
        assert_eq!(signed.signature, "76087e0445ad6667522182b9ac9aac68df8b05ee");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let user = params(&[("title", "Holiday".into()), ("n", 3.into())]);
        let s = signer();
        let first = s.build_authenticated_params_at(&user, 42, 1_700_000_000).unwrap();
        let second = s.build_authenticated_params_at(&user, 42, 1_700_000_000).unwrap();
        assert_eq!(first, second);
        assert!(s.verify(&first));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let s = signer();
        let mut a = ParameterSet::new();
        a.insert("b".to_string(), "2".into());
        a.insert("a".to_string(), "1".into());
        a.insert("c".to_string(), "3".into());

        let mut b = ParameterSet::new();
        b.insert("c".to_string(), "3".into());
        b.insert("a".to_string(), "1".into());
        b.insert("b".to_string(), "2".into());

        assert_eq!(
            s.build_authenticated_params_at(&a, 7, 1000).unwrap().signature,
            s.build_authenticated_params_at(&b, 7, 1000).unwrap().signature
        );
    }

    #[test]
    fn test_any_mutation_changes_signature() {
        let s = signer();
        let user = params(&[("foo", "bar baz".into())]);
        let signed = s.build_authenticated_params_at(&user, 1, 1000).unwrap();

        for key in signed.params.keys() {
            let mut tampered = signed.params.clone();
            tampered.insert(key.clone(), EncodedValue::Scalar("tampered".to_string()));
            assert_ne!(s.sign(&tampered), signed.signature, "mutating {} kept signature", key);
        }

        let mut tampered = signed.params.clone();
        tampered.insert("foo".to_string(), EncodedValue::Scalar("bar%20qux".to_string()));
        assert_eq!(s.sign(&tampered), "fee939c68573a9606f6a1dea9217dd4304adf5cb");
    }

    #[test]
    fn test_secret_changes_signature() {
        let user = params(&[("foo", "bar".into())]);
        let signed = signer().build_authenticated_params_at(&user, 1, 1000).unwrap();
        assert_ne!(sign(&signed.params, "other"), signed.signature);
    }

    #[test]
    fn test_nonce_is_eight_digits() {
        assert_eq!(format_nonce(0), "00000000");
        assert_eq!(format_nonce(1), "00000001");
        assert_eq!(format_nonce(12345), "00012345");
        assert_eq!(format_nonce(NONCE_MAX), "99999999");
        assert_eq!(format_nonce(NONCE_MAX + 5), "00000004");

        let s = signer();
        for _ in 0..200 {
            let signed = s.build_authenticated_params(&ParameterSet::new()).unwrap();
            let nonce = signed.get(API_NONCE).and_then(EncodedValue::as_str).unwrap();
            assert_eq!(nonce.len(), 8);
            assert!(nonce.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_timestamp_is_current_unix_seconds() {
        let before = Utc::now().timestamp();
        let signed = signer().build_authenticated_params(&ParameterSet::new()).unwrap();
        let after = Utc::now().timestamp();
        let ts: i64 = signed
            .get(API_TIMESTAMP)
            .and_then(EncodedValue::as_str)
            .unwrap()
            .parse()
            .unwrap();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_encode_value_round_trips_reserved_characters() {
        let original = "a/b?c&d=e f~g";
        let encoded = encode_value(&original.into());
        let encoded = encoded.as_str().unwrap();
        assert!(!encoded.contains(['/', '?', '&', '=', ' ']));
        assert!(encoded.contains('~'));
        assert_eq!(decode_url_component(encoded).unwrap(), original);
    }

    #[test]
    fn test_encode_value_lists_and_non_scalars() {
        assert_eq!(
            encode_value(&vec!["a b", "c"].into()),
            EncodedValue::List(vec![
                EncodedValue::Scalar("a%20b".to_string()),
                EncodedValue::Scalar("c".to_string()),
            ])
        );
        assert_eq!(encode_value(&ParamValue::Null), EncodedValue::Scalar(String::new()));
        assert_eq!(
            encode_value(&ParamValue::Map(BTreeMap::new())),
            EncodedValue::Scalar(String::new())
        );
    }

    #[test]
    fn test_list_canonical_form() {
        let user = params(&[("tags", vec!["a,b", "c"].into())]);
        let signed = signer().build_authenticated_params_at(&user, 1, 1000).unwrap();
        assert!(canonicalize(&signed.params).ends_with("&tags=a%2Cb,c"));
        assert_eq!(signed.signature, "df96879ae66936de1206d4d09530bc1cc7f165f1");
    }

    #[test]
    fn test_strict_mode_rejects_non_scalars() {
        let strict = RequestSigner::new(
            "k1".to_string(),
            "s1".to_string(),
            Some(SignerOptions {
                strict: true,
                ..SignerOptions::default()
            }),
        )
        .unwrap();

        let user = params(&[("meta", ParamValue::Null)]);
        match strict.build_authenticated_params_at(&user, 1, 1000) {
            Err(BotrError::Encoding { key }) => assert_eq!(key, "meta"),
            other => panic!("expected encoding error, got {:?}", other),
        }

        let nested = params(&[("tags", ParamValue::List(vec!["ok".into(), ParamValue::Null]))]);
        assert!(strict.build_authenticated_params_at(&nested, 1, 1000).is_err());

        // lenient signer sends it empty
        let lenient = signer().build_authenticated_params_at(&user, 1, 1000).unwrap();
        assert_eq!(lenient.get("meta"), Some(&EncodedValue::Scalar(String::new())));
    }

    #[test]
    fn test_caller_format_kept_and_reserved_keys_replaced() {
        let user = params(&[
            ("api_format", "xml".into()),
            ("api_key", "spoofed".into()),
            ("api_signature", "forged".into()),
        ]);
        let signed = signer().build_authenticated_params_at(&user, 1, 1000).unwrap();

        assert_eq!(signed.get(API_FORMAT).and_then(EncodedValue::as_str), Some("xml"));
        assert_eq!(signed.get(API_KEY).and_then(EncodedValue::as_str), Some("k1"));
        assert!(signed.get(API_SIGNATURE).is_none());
        assert_ne!(signed.signature, "forged");
    }

    #[test]
    fn test_default_kit_carries_crate_version() {
        let s = RequestSigner::new("k".to_string(), "s".to_string(), None).unwrap();
        assert_eq!(s.kit(), format!("rust-{}", env!("CARGO_PKG_VERSION")));
        assert_eq!(s.api_key(), "k");
        assert_eq!(s.default_format(), &ApiFormat::Json);
        assert!(!s.strict());
    }

    #[test]
    fn test_missing_credentials() {
        assert!(matches!(
            RequestSigner::new(String::new(), "s".to_string(), None),
            Err(BotrError::MissingOption("apiKey"))
        ));
        assert!(matches!(
            RequestSigner::new("k".to_string(), String::new(), None),
            Err(BotrError::MissingOption("apiSecret"))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", signer());
        assert!(rendered.contains("k1"));
        assert!(!rendered.contains("\"s1\""));
    }
}
