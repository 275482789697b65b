//! Record input: read the product rows from a local JSON file or a URL.
//!
//! Accepted shapes:
//!
//! ```text
//! [ {"nombre": "Mug", "precio": 4.5, ...}, ... ]
//! { "records": [ {...}, ... ] }
//! ```
//!
//! Every element must be a JSON object. Values are kept as-is; turning them
//! into display strings is the normaliser's job.

use crate::error::CatalogError;
use crate::record::Record;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL. The scheme is matched
/// case-insensitively.
pub fn is_url(input: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        input
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Load records from a local path or an HTTP(S) URL.
pub async fn load_records(input: &str, timeout_secs: u64) -> Result<Vec<Record>, CatalogError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CatalogError::InvalidInput {
            input: input.to_string(),
        });
    }

    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    let records = parse_records(&bytes, input)?;
    info!("Loaded {} records from {}", records.len(), input);
    Ok(records)
}

/// Parse a JSON document into records. `source_name` is only used in errors.
pub fn parse_records(bytes: &[u8], source_name: &str) -> Result<Vec<Record>, CatalogError> {
    let malformed = |detail: String| CatalogError::MalformedRecords {
        source_name: source_name.to_string(),
        detail,
    };

    let value: Value = serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("records") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(malformed("'records' is not an array".into())),
            None => return Err(malformed("expected an array or a 'records' field".into())),
        },
        _ => return Err(malformed("expected an array of objects".into())),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(malformed(format!(
                "row {} is {}, not an object",
                i + 1,
                kind(&other)
            ))),
        })
        .collect()
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, CatalogError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(CatalogError::PermissionDenied { path })
        }
        Err(_) => Err(CatalogError::FileNotFound { path }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, CatalogError> {
    info!("Downloading records from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CatalogError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CatalogError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CatalogError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CatalogError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CatalogError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    Ok(bytes.to_vec())
}
