//! Resource fingerprints
//!
//! Every object the controller creates carries a digest of the desired state
//! that produced it in the `cassandra.apache.org/resource-hash` annotation.
//! On later passes the freshly built object's digest is compared with the
//! stored one; equal digests mean nothing to do, so no field-by-field diff
//! is ever made.
//!
//! The digest is SHA-256 over a canonical JSON encoding (object keys sorted,
//! no whitespace) of an explicit per-kind projection of the object: the
//! identity and labels from metadata plus the whole spec. Server-populated
//! metadata (resourceVersion, uid, ownerReferences) and the hash annotation
//! itself are excluded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::api::ObjectMeta;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Annotation holding the fingerprint of the desired object
pub const RESOURCE_HASH_ANNOTATION: &str = "cassandra.apache.org/resource-hash";

/// Fingerprint of a desired Service.
pub fn service_fingerprint(service: &Service) -> String {
    digest(&json!({
        "kind": "Service",
        "metadata": metadata_projection(&service.metadata),
        "spec": service.spec,
    }))
}

/// Fingerprint of a desired StatefulSet, pod template and claim templates included.
pub fn stateful_set_fingerprint(stateful_set: &StatefulSet) -> String {
    digest(&json!({
        "kind": "StatefulSet",
        "metadata": metadata_projection(&stateful_set.metadata),
        "spec": stateful_set.spec,
    }))
}

/// Identity, labels and annotations of `meta`. An absent map and an empty
/// one project to the same `null`, and the hash annotation is dropped first.
fn metadata_projection(meta: &ObjectMeta) -> Value {
    json!({
        "name": meta.name,
        "namespace": meta.namespace,
        "labels": non_empty(meta.labels.iter().flatten().collect()),
        "annotations": non_empty(
            meta.annotations
                .iter()
                .flatten()
                .filter(|(key, _)| key.as_str() != RESOURCE_HASH_ANNOTATION)
                .collect()
        ),
    })
}

fn non_empty<'a>(
    map: BTreeMap<&'a String, &'a String>,
) -> Option<BTreeMap<&'a String, &'a String>> {
    (!map.is_empty()).then_some(map)
}

fn digest(value: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    STANDARD.encode(Sha256::digest(canonical.as_bytes()))
}

/// Writes `value` as JSON with object keys in sorted order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, nested)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(nested, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // Value's Display produces a correctly escaped JSON string literal
    let _ = write!(out, "{}", Value::String(s.to_string()));
}

/// Stamps `fingerprint` onto the object's annotations.
pub fn add_hash_annotation(meta: &mut ObjectMeta, fingerprint: String) {
    meta.annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(RESOURCE_HASH_ANNOTATION.to_string(), fingerprint);
}

/// Whether two objects carry the same, present, fingerprint.
pub fn resources_have_same_hash(observed: &ObjectMeta, desired: &ObjectMeta) -> bool {
    match (hash_of(observed), hash_of(desired)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn hash_of(meta: &ObjectMeta) -> Option<&str> {
    meta.annotations
        .as_ref()?
        .get(RESOURCE_HASH_ANNOTATION)
        .map(String::as_str)
}
