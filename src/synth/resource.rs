//! Assignment of endpoint groups to resource buckets.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::group::{EndpointGroup, EndpointGroups};

static VERSION_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^v\d+$").expect("valid regex"));

/// Resource name used when a path has no segments.
pub const FALLBACK_RESOURCE: &str = "other";
/// Resource name used when sanitizing leaves nothing.
pub const UNKNOWN_RESOURCE: &str = "unknown_resource";

/// Derives the resource name for a path.
///
/// Skips `api`, version segments (`v1`, `v2`, ...) and anything in
/// `stoplist`, taking the first segment left. When every segment is skipped
/// the last one is used; a path without segments maps to `other`.
#[must_use]
pub fn resource_name(path: &str, stoplist: &[String]) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(last) = segments.last() else {
        return FALLBACK_RESOURCE.to_string();
    };

    let chosen = segments
        .iter()
        .find(|segment| {
            **segment != "api"
                && !VERSION_SEGMENT.is_match(segment)
                && !stoplist.iter().any(|stop| stop == *segment)
        })
        .unwrap_or(last);

    let sanitized: String = chosen
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        UNKNOWN_RESOURCE.to_string()
    } else {
        sanitized
    }
}

/// Buckets endpoint groups by resource name.
///
/// Groups keep their signature order inside each bucket.
#[must_use]
pub fn partition(
    groups: EndpointGroups,
    stoplist: &[String],
) -> BTreeMap<String, Vec<EndpointGroup>> {
    let mut resources: BTreeMap<String, Vec<EndpointGroup>> = BTreeMap::new();
    for (signature, group) in groups {
        resources.entry(resource_name(&signature.path, stoplist)).or_default().push(group);
    }
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RequestBody;
    use crate::synth::fixtures::tx;
    use crate::synth::group::group;

    fn stop(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn skips_api_and_version_segments() {
        assert_eq!(resource_name("/api/v1/orders/123", &stop(&["v1"])), "orders");
        assert_eq!(resource_name("/api/v2/orders/123", &[]), "orders");
        assert_eq!(resource_name("/api/greetings", &[]), "greetings");
    }

    #[test]
    fn skips_stoplisted_segments() {
        assert_eq!(resource_name("/api/workspace/reports/7", &stop(&["workspace"])), "reports");
    }

    #[test]
    fn falls_back_to_last_then_other() {
        assert_eq!(resource_name("/api/v1", &[]), "v1");
        assert_eq!(resource_name("/api", &[]), "api");
        assert_eq!(resource_name("/", &[]), "other");
        assert_eq!(resource_name("", &[]), "other");
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(resource_name("/api/user-profiles", &[]), "user_profiles");
        assert_eq!(resource_name("/api/caf\u{e9}", &[]), "caf_");
    }

    #[test]
    fn partition_buckets_groups() {
        let groups = group(vec![
            tx("GET", "/api/v1/orders", &[], RequestBody::None),
            tx("GET", "/api/v1/orders/1", &[], RequestBody::None),
            tx("GET", "/api/greetings", &[("name", "Bob")], RequestBody::None),
        ]);
        let resources = partition(groups, &[]);

        assert_eq!(resources.keys().collect::<Vec<_>>(), vec!["greetings", "orders"]);
        assert_eq!(resources["orders"].len(), 2);
    }
}
