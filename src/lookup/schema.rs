use super::ProviderRecord;
use crate::error::LookupError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response layout of a supported lookup service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderSchema {
    /// ipwho.is: `connection.org`, `connection.isp`, `success` flag.
    IpWhois,
    /// ipinfo.io: `org` only, `error` object on failure.
    IpInfo,
    /// ip-api.com: `isp`, `org`, `status` of `"success"` or `"fail"`.
    IpApi,
}

impl ProviderSchema {
    /// Parse a decoded body. A parseable body is conclusive even when the
    /// name fields are missing.
    pub fn parse(self, json: &Value) -> Result<ProviderRecord, LookupError> {
        if !json.is_object() {
            return Err(LookupError::Malformed("expected a json object".into()));
        }

        match self {
            ProviderSchema::IpWhois => {
                if get_value(json, &["success"]).and_then(Value::as_bool) == Some(false) {
                    return Err(LookupError::Malformed(failure_message(json, &["message"])));
                }
                Ok(ProviderRecord::new(
                    get_string(json, &["connection", "org"]),
                    get_string(json, &["connection", "isp"]),
                ))
            }
            ProviderSchema::IpInfo => {
                if json.get("error").is_some() {
                    return Err(LookupError::Malformed(failure_message(
                        json,
                        &["error", "message"],
                    )));
                }
                Ok(ProviderRecord::new(get_string(json, &["org"]), None))
            }
            ProviderSchema::IpApi => {
                if get_value(json, &["status"]).and_then(Value::as_str) == Some("fail") {
                    return Err(LookupError::Malformed(failure_message(json, &["message"])));
                }
                Ok(ProviderRecord::new(
                    get_string(json, &["org"]),
                    get_string(json, &["isp"]),
                ))
            }
        }
    }
}

fn failure_message(json: &Value, path: &[&str]) -> String {
    get_string(json, path).unwrap_or_else(|| "provider reported failure".to_string())
}

fn get_string(json: &Value, path: &[&str]) -> Option<String> {
    get_value(json, path)
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

fn get_value<'a>(json: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = json;

    for segment in path {
        current = current.get(*segment)?;
    }

    Some(current)
}
