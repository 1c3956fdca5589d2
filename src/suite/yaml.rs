//! YAML rendering of the structured test-case model.

use serde::Serialize;

use super::render::Renderer;
use super::Suite;
use crate::synth::TestCase;

/// Writes the suite as a YAML document, one entry per test case.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlRenderer;

#[derive(Serialize)]
struct Document<'a> {
    resource: &'a str,
    tests: &'a [TestCase],
}

impl Renderer for YamlRenderer {
    fn extension(&self) -> &'static str {
        "yaml"
    }

    fn render(&self, suite: &Suite) -> Result<String, String> {
        serde_yaml::to_string(&Document { resource: &suite.resource, tests: &suite.cases })
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::capture::{ParsedValue, RequestBody};
    use crate::synth::{Expected, ExpectedBody};

    #[derive(serde::Deserialize)]
    struct Back {
        tests: Vec<TestCase>,
    }

    #[test]
    fn cases_survive_a_yaml_round_trip() {
        let case = TestCase {
            name: "test_items_limit_10".into(),
            method: "GET".into(),
            path: "/api/items".into(),
            query_params: BTreeMap::from([
                ("limit".to_string(), ParsedValue::Int(10)),
                ("search".to_string(), ParsedValue::String("007".into())),
                ("deleted".to_string(), ParsedValue::Null),
            ]),
            request: RequestBody::None,
            expected: Expected {
                status: 200,
                body: ExpectedBody::Json { document: json!({"items": [], "total": 0}) },
            },
            observed: 3,
        };
        let suite = Suite { resource: "items".into(), cases: vec![case.clone()] };

        let text = YamlRenderer.render(&suite).unwrap();
        assert!(text.starts_with("resource: items\n"));
        let back: Back = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.tests, vec![case]);
    }
}
