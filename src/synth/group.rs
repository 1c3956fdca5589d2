//! Grouping of transactions into endpoint groups keyed by a stable signature.

use std::collections::BTreeMap;

use crate::capture::{coerce, ParsedValue, RequestBody, Transaction};

/// Body component of a [`Signature`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BodySignature {
    /// No request body.
    None,
    /// File upload, identified by field and filename only.
    File {
        /// Form field name.
        field_name: String,
        /// Uploaded filename.
        filename: String,
    },
    /// JSON body in canonical (key-sorted, compact) form.
    Json(String),
    /// Any other body, verbatim.
    Other(String),
}

impl BodySignature {
    /// Derives the body signature of a classified request body.
    #[must_use]
    pub fn of(body: &RequestBody) -> Self {
        match body {
            RequestBody::None => Self::None,
            RequestBody::FileUpload(upload) => Self::File {
                field_name: upload.field_name.clone(),
                filename: upload.filename.clone(),
            },
            RequestBody::Json { document } => Self::Json(canonical_json(document)),
            RequestBody::Opaque { text } => Self::Other(text.clone()),
        }
    }
}

/// Grouping key: transactions with equal signatures are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature {
    /// URL path.
    pub path: String,
    /// HTTP method.
    pub method: String,
    /// Coerced query parameters as `(key, canonical value)`, sorted by key.
    pub params: Vec<(String, String)>,
    /// Request body component.
    pub body: BodySignature,
}

impl Signature {
    /// Computes the signature of a transaction.
    #[must_use]
    pub fn of(transaction: &Transaction) -> Self {
        let params = coerced_params(&transaction.query)
            .into_iter()
            .map(|(key, value)| (key, value.signature_key()))
            .collect();
        Self {
            path: transaction.path.clone(),
            method: transaction.method.clone(),
            params,
            body: BodySignature::of(&transaction.payload),
        }
    }
}

/// Coerces query pairs, keeping the last value of a repeated key.
#[must_use]
pub fn coerced_params(query: &[(String, String)]) -> BTreeMap<String, ParsedValue> {
    query.iter().map(|(key, raw)| (key.clone(), coerce(raw))).collect()
}

/// Serializes JSON with object keys sorted at every depth.
#[must_use]
pub fn canonical_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Every transaction sharing one signature.
#[derive(Debug, Clone)]
pub struct EndpointGroup {
    /// Shared signature.
    pub signature: Signature,
    /// Coerced query parameters of the group.
    pub params: BTreeMap<String, ParsedValue>,
    /// Members in first-seen order; never empty.
    members: Vec<Transaction>,
}

impl EndpointGroup {
    /// The first member, used to derive expected output.
    ///
    /// Later members are counted but never compared against it.
    #[must_use]
    pub fn sample(&self) -> &Transaction {
        &self.members[0]
    }

    /// All members in first-seen order.
    #[must_use]
    pub fn members(&self) -> &[Transaction] {
        &self.members
    }

    /// Number of transactions observed for this signature.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`; a group exists only once it has a member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Endpoint groups keyed by signature.
pub type EndpointGroups = BTreeMap<Signature, EndpointGroup>;

/// Groups transactions by signature, keeping the first-seen member first.
#[must_use]
pub fn group(transactions: Vec<Transaction>) -> EndpointGroups {
    let mut groups = EndpointGroups::new();
    for transaction in transactions {
        let signature = Signature::of(&transaction);
        groups
            .entry(signature.clone())
            .or_insert_with(|| EndpointGroup {
                params: coerced_params(&transaction.query),
                signature,
                members: Vec::new(),
            })
            .members
            .push(transaction);
    }
    tracing::debug!(groups = groups.len(), "grouped transactions");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::fixtures::tx;
    use serde_json::json;

    #[test]
    fn query_order_does_not_change_signature() {
        let a = tx("GET", "/api/items", &[("limit", "10"), ("page", "2")], RequestBody::None);
        let b = tx("GET", "/api/items", &[("page", "2"), ("limit", "10")], RequestBody::None);
        assert_eq!(Signature::of(&a), Signature::of(&b));
    }

    #[test]
    fn coerced_values_are_part_of_signature() {
        let a = tx("GET", "/api/items", &[("limit", "10")], RequestBody::None);
        let b = tx("GET", "/api/items", &[("limit", "010")], RequestBody::None);
        let c = tx("GET", "/api/items", &[("limit", "ten")], RequestBody::None);
        assert_eq!(Signature::of(&a), Signature::of(&b));
        assert_ne!(Signature::of(&a), Signature::of(&c));
    }

    #[test]
    fn json_signature_ignores_key_order() {
        let first: serde_json::Value =
            serde_json::from_str(r#"{"b": {"y": 1, "x": 2}, "a": [1]}"#).unwrap();
        let second: serde_json::Value =
            serde_json::from_str(r#"{"a": [1], "b": {"x": 2, "y": 1}}"#).unwrap();
        assert_eq!(canonical_json(&first), canonical_json(&second));
        assert_eq!(canonical_json(&first), r#"{"a":[1],"b":{"x":2,"y":1}}"#);
    }

    #[test]
    fn repeated_keys_keep_last_value() {
        let params = coerced_params(&[("a".into(), "1".into()), ("a".into(), "2".into())]);
        assert_eq!(params.get("a"), Some(&ParsedValue::Int(2)));
    }

    #[test]
    fn duplicates_collapse_and_first_member_is_sample() {
        let body = || RequestBody::Json { document: json!({"q": 1}) };
        let mut first = tx("POST", "/api/search", &[], body());
        first.id = "first".into();
        let mut second = tx("POST", "/api/search", &[], body());
        second.id = "second".into();
        let other = tx("POST", "/api/search", &[], RequestBody::None);

        let groups = group(vec![first, other, second]);
        assert_eq!(groups.len(), 2);

        let json_group = groups.values().find(|g| g.len() == 2).unwrap();
        assert_eq!(json_group.sample().id, "first");
        assert_eq!(json_group.members()[1].id, "second");
    }

    #[test]
    fn grouping_is_idempotent_and_order_independent() {
        let items = vec![
            tx("GET", "/api/a", &[("x", "1")], RequestBody::None),
            tx("GET", "/api/b", &[], RequestBody::Opaque { text: "raw".into() }),
            tx("GET", "/api/a", &[("x", "1")], RequestBody::None),
            tx("DELETE", "/api/a", &[], RequestBody::None),
        ];
        let mut shuffled = items.clone();
        shuffled.reverse();

        let once = group(items.clone());
        let twice = group(items);
        let reversed = group(shuffled);

        let keys = |g: &EndpointGroups| g.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys(&once), keys(&twice));
        assert_eq!(keys(&once), keys(&reversed));
        for (sig, g) in &once {
            assert_eq!(g.sample(), twice[sig].sample());
            assert_eq!(g.len(), reversed[sig].len());
        }
    }

    #[test]
    fn file_signature_uses_field_and_filename() {
        let upload = |payload: &str| {
            RequestBody::FileUpload(crate::capture::FileUpload {
                field_name: "file".into(),
                filename: "a.txt".into(),
                content_type: "text/plain".into(),
                payload: payload.into(),
                is_binary: false,
            })
        };
        assert_eq!(BodySignature::of(&upload("one")), BodySignature::of(&upload("two")));
    }
}
