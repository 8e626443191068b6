// format.rs

use std::fmt;

/// Response serialisation requested through `api_format`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApiFormat {
    #[default]
    Json,
    Xml,
    Php,
    Custom(String),
}

impl ApiFormat {
    pub fn as_str(&self) -> &str {
        match self {
            ApiFormat::Json => "json",
            ApiFormat::Xml => "xml",
            ApiFormat::Php => "php",
            ApiFormat::Custom(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "json" => ApiFormat::Json,
            "xml" => ApiFormat::Xml,
            "php" => ApiFormat::Php,
            other => ApiFormat::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ApiFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
