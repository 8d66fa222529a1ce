//! Field validators for Azure resource attributes
//!
//! Each has the [`ValidateFn`](stratus_core::validation::ValidateFn) shape so
//! schemas can attach it with `with_validation`.

use regex::Regex;
use stratus_core::resource::Value;
use stratus_core::validation::{Diagnostics, int_between, string_contains_all, string_matches};

const EVENTHUB_NAME: &str = r"^[a-zA-Z0-9]([-._a-zA-Z0-9]{0,48}[a-zA-Z0-9])?$";
const EVENTHUB_NAMESPACE_NAME: &str = r"^[a-zA-Z][-a-zA-Z0-9]{4,48}[a-zA-Z0-9]$";
/// Network resources: 1-80 characters, starting alphanumeric, ending alphanumeric or '_'
const NETWORK_RESOURCE_NAME: &str = r"^[a-zA-Z0-9]([a-zA-Z0-9_.-]{0,78}[a-zA-Z0-9_])?$";
const HDINSIGHT_CLUSTER_NAME: &str = r"^[a-zA-Z0-9][a-zA-Z0-9-]{1,57}[a-zA-Z0-9]$";
const HDINSIGHT_CLUSTER_VERSION: &str = r"^[0-9]+(\.[0-9]+){1,3}$";

const ARCHIVE_NAME_PLACEHOLDERS: &[&str] = &[
    "{Namespace}",
    "{EventHub}",
    "{PartitionId}",
    "{Year}",
    "{Month}",
    "{Day}",
    "{Hour}",
    "{Minute}",
    "{Second}",
];

fn matches_pattern(value: &Value, path: &str, pattern: &str, message: &str) -> Diagnostics {
    match Regex::new(pattern) {
        Ok(re) => string_matches(value, path, &re, message),
        Err(e) => Diagnostics::error(path, format!("invalid pattern for {}: {}", path, e)),
    }
}

pub fn eventhub_partition_count(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 1, 32)
}

pub fn eventhub_message_retention(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 1, 7)
}

pub fn eventhub_name(value: &Value, path: &str) -> Diagnostics {
    matches_pattern(
        value,
        path,
        EVENTHUB_NAME,
        "the event hub name can contain only letters, numbers, periods, hyphens and \
         underscores; it must start and end with a letter or number and be up to 50 characters",
    )
}

pub fn eventhub_namespace_name(value: &Value, path: &str) -> Diagnostics {
    matches_pattern(
        value,
        path,
        EVENTHUB_NAMESPACE_NAME,
        "the namespace can contain only letters, numbers and hyphens; it must start with a \
         letter, end with a letter or number and be 6 to 50 characters",
    )
}

pub fn firewall_name(value: &Value, path: &str) -> Diagnostics {
    network_resource_name(value, path)
}

pub fn rule_collection_name(value: &Value, path: &str) -> Diagnostics {
    network_resource_name(value, path)
}

pub fn virtual_hub_name(value: &Value, path: &str) -> Diagnostics {
    network_resource_name(value, path)
}

fn network_resource_name(value: &Value, path: &str) -> Diagnostics {
    matches_pattern(
        value,
        path,
        NETWORK_RESOURCE_NAME,
        "must be 1 to 80 characters of letters, numbers, underscores, periods or hyphens, \
         beginning with a letter or number and ending with a letter, number or underscore",
    )
}

pub fn hdinsight_cluster_name(value: &Value, path: &str) -> Diagnostics {
    matches_pattern(
        value,
        path,
        HDINSIGHT_CLUSTER_NAME,
        "must be 3 to 59 characters of letters, numbers and hyphens, beginning and ending \
         with a letter or number",
    )
}

pub fn hdinsight_cluster_version(value: &Value, path: &str) -> Diagnostics {
    matches_pattern(
        value,
        path,
        HDINSIGHT_CLUSTER_VERSION,
        "must be a dotted version such as 3.6 or 4.0",
    )
}

pub fn capture_archive_name_format(value: &Value, path: &str) -> Diagnostics {
    string_contains_all(value, path, ARCHIVE_NAME_PLACEHOLDERS)
}

pub fn capture_interval(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 60, 900)
}

pub fn capture_size_limit(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 10_485_760, 524_288_000)
}

pub fn rule_collection_priority(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 100, 65_000)
}

pub fn application_rule_port(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 0, 64_000)
}

pub fn eventhub_namespace_capacity(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 1, 20)
}

pub fn eventhub_maximum_throughput_units(value: &Value, path: &str) -> Diagnostics {
    int_between(value, path, 0, 20)
}
