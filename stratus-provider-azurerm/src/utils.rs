//! Helpers shared by the resource mappings

use std::collections::HashMap;

use stratus_core::resource::Value;
use stratus_core::validation::Diagnostics;
use url::Url;

/// Most tags Resource Manager accepts on one resource
const MAX_TAGS: usize = 50;
const MAX_TAG_KEY_LENGTH: usize = 512;
const MAX_TAG_VALUE_LENGTH: usize = 256;

/// Normalize a location for comparison (e.g., "West Europe" -> "westeurope")
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Tags for a request body; an empty map clears remote tags on PUT
pub fn expand_tags(tags: &HashMap<String, String>) -> Option<HashMap<String, String>> {
    Some(tags.clone())
}

pub fn flatten_tags(tags: Option<&HashMap<String, String>>) -> HashMap<String, String> {
    tags.cloned().unwrap_or_default()
}

/// Validate a `tags` map
pub fn validate_tags(value: &Value, path: &str) -> Diagnostics {
    let Some(tags) = value.as_map() else {
        return Diagnostics::error(path, "expected a map of tags");
    };

    let mut diags = Diagnostics::ok();
    if tags.len() > MAX_TAGS {
        diags.push_error(
            path,
            format!("a maximum of {} tags can be applied to each resource", MAX_TAGS),
        );
    }

    let mut keys: Vec<&String> = tags.keys().collect();
    keys.sort();
    for key in keys {
        let tag_path = format!("{}.{}", path, key);
        if key.len() > MAX_TAG_KEY_LENGTH {
            diags.push_error(
                &tag_path,
                format!("the maximum length for a tag key is {} characters", MAX_TAG_KEY_LENGTH),
            );
        }
        match &tags[key] {
            Value::String(v) if v.len() > MAX_TAG_VALUE_LENGTH => diags.push_error(
                &tag_path,
                format!(
                    "the maximum length for a tag value is {} characters",
                    MAX_TAG_VALUE_LENGTH
                ),
            ),
            Value::String(_) => {}
            other => diags.push_error(
                &tag_path,
                format!("tag values must be strings, got {}", other.type_name()),
            ),
        }
    }
    diags
}

/// A blob container addressed by URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageContainerId {
    pub account_name: String,
    pub container_name: String,
    /// e.g. `acct.blob.core.windows.net`
    pub blob_endpoint_host: String,
}

/// Parse `https://{account}.blob.{suffix}/{container}`
pub fn parse_storage_container_id(id: &str) -> Result<StorageContainerId, String> {
    let url = Url::parse(id).map_err(|e| format!("{:?} is not a URL: {}", id, e))?;
    let host = url
        .host_str()
        .ok_or_else(|| format!("{:?} has no host", id))?;

    let account_name = host
        .split('.')
        .next()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| format!("{:?} has no storage account name", id))?;

    let mut segments = url.path().trim_matches('/').split('/');
    let container_name = match (segments.next(), segments.next()) {
        (Some(container), None) if !container.is_empty() => container,
        _ => {
            return Err(format!(
                "{:?} must have exactly one path segment naming the container",
                id
            ));
        }
    };

    Ok(StorageContainerId {
        account_name: account_name.to_string(),
        container_name: container_name.to_string(),
        blob_endpoint_host: host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("eastus2"), "eastus2");
    }

    #[test]
    fn test_flatten_tags_of_nothing_is_empty() {
        assert!(flatten_tags(None).is_empty());
    }

    #[test]
    fn test_validate_tags_limits() {
        let ok = Value::Map(HashMap::from([(
            "env".to_string(),
            Value::string("prod"),
        )]));
        assert!(!validate_tags(&ok, "tags").has_errors());

        let too_many = Value::Map(
            (0..51)
                .map(|i| (format!("k{}", i), Value::string("v")))
                .collect(),
        );
        assert!(validate_tags(&too_many, "tags").has_errors());

        let long_value = Value::Map(HashMap::from([(
            "env".to_string(),
            Value::string("x".repeat(257)),
        )]));
        let diags = validate_tags(&long_value, "tags");
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].path, "tags.env");

        let long_key = Value::Map(HashMap::from([("k".repeat(513), Value::string("v"))]));
        assert!(validate_tags(&long_key, "tags").has_errors());
    }

    #[test]
    fn test_parse_storage_container_id() {
        let id = parse_storage_container_id("https://acct.blob.core.windows.net/data").unwrap();
        assert_eq!(id.account_name, "acct");
        assert_eq!(id.container_name, "data");
        assert_eq!(id.blob_endpoint_host, "acct.blob.core.windows.net");

        assert!(parse_storage_container_id("https://acct.blob.core.windows.net/").is_err());
        assert!(parse_storage_container_id("https://acct.blob.core.windows.net/a/b").is_err());
        assert!(parse_storage_container_id("not a url").is_err());
    }
}
