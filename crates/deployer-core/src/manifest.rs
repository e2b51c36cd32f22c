//! Rendered-bundle splitting and legacy workload descriptors.

use crate::error::{DeployerError, Result};
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    items: Option<Box<RawValue>>,
}

impl Envelope {
    /// The list items, when this is a `*List` kind carrying an `items` array.
    fn into_items(self) -> Option<Vec<Box<RawValue>>> {
        if !self.kind.ends_with("List") {
            return None;
        }
        serde_json::from_str(self.items?.get()).ok()
    }
}

/// Single-pass iterator over the manifests of one rendering.
///
/// List items are yielded byte-for-byte as they appeared in the rendering.
pub struct Manifests {
    inner: Inner,
}

enum Inner {
    Single(Option<Vec<u8>>),
    List(std::vec::IntoIter<Box<RawValue>>),
}

impl Iterator for Manifests {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Single(payload) => payload.take(),
            Inner::List(items) => items.next().map(|raw| raw.get().as_bytes().to_vec()),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match &self.inner {
            Inner::Single(payload) => usize::from(payload.is_some()),
            Inner::List(items) => items.len(),
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Manifests {}

/// Split a dry-run rendering into individual manifests.
///
/// A `List` (or any `*List` kind) with an `items` array yields its items in
/// order; anything else is a single manifest yielded unchanged. An empty rendering yields nothing.
pub fn split(rendered: &[u8]) -> Result<Manifests> {
    if rendered.iter().all(u8::is_ascii_whitespace) {
        return Ok(Manifests {
            inner: Inner::Single(None),
        });
    }

    let envelope: Envelope = serde_json::from_slice(rendered)
        .map_err(|e| DeployerError::MalformedManifest(format!("rendered bundle: {e}")))?;

    let inner = match envelope.into_items() {
        Some(items) => Inner::List(items.into_iter()),
        None => Inner::Single(Some(rendered.to_vec())),
    };
    Ok(Manifests { inner })
}

// ---------------------------------------------------------------------------
// LegacyWorkload
// ---------------------------------------------------------------------------

/// A workload bridged to a legacy host.
#[derive(Debug, Clone)]
pub struct LegacyWorkload {
    pub name: String,
    /// Base URL of the legacy runtime, taken from the template annotation.
    pub routing_host: String,
    /// The rendered manifest, sent unmodified as the create body.
    pub payload: Vec<u8>,
}

impl LegacyWorkload {
    /// Read name and routing host from a rendered workload descriptor.
    ///
    /// The host comes from `spec.template.metadata.annotations[annotation]`.
    pub fn parse(payload: Vec<u8>, annotation: &str) -> Result<Self> {
        let doc: Value = serde_json::from_slice(&payload)
            .map_err(|e| DeployerError::MalformedManifest(format!("workload: {e}")))?;

        let name = doc
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DeployerError::MalformedManifest("workload has no metadata.name".into()))?
            .to_string();

        let routing_host = doc
            .pointer("/spec/template/metadata/annotations")
            .and_then(|a| a.get(annotation))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DeployerError::RoutingAnnotationMissing {
                workload: name.clone(),
                annotation: annotation.to_string(),
            })?
            .to_string();

        Ok(Self {
            name,
            routing_host,
            payload,
        })
    }

    /// `{host}/processes`, with `http://` assumed when the host has no scheme.
    pub fn processes_url(&self) -> String {
        let host = self.routing_host.trim_end_matches('/');
        if host.contains("://") {
            format!("{host}/processes")
        } else {
            format!("http://{host}/processes")
        }
    }

    /// `{host}/processes/{name}`.
    pub fn process_url(&self) -> String {
        format!("{}/{}", self.processes_url(), self.name)
    }
}
