//! Namespace list view

use k8s_openapi::api::core::v1::Namespace;
use serde::Serialize;

use super::{list_view, ListRequest, ObjectMetaView, ResourceList, TypeMetaView};
use crate::dataselect::{Cell, ComparableValue, PropertyName};
use crate::error::Result;
use crate::kind::ResourceKind;

/// Label Karmada sets on namespaces it should not propagate
pub const SKIP_AUTO_PROPAGATION_LABEL: &str = "namespace.karmada.io/skip-auto-propagation";

/// A namespace and its lifecycle phase
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceView {
    /// Metadata
    pub object_meta: ObjectMetaView,
    /// Kind marker
    pub type_meta: TypeMetaView,
    /// `Active` or `Terminating`
    pub phase: String,
    /// Whether Karmada propagates the namespace to member clusters
    pub skip_auto_propagation: bool,
}

impl From<Namespace> for NamespaceView {
    fn from(ns: Namespace) -> Self {
        let skip_auto_propagation = ns
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(SKIP_AUTO_PROPAGATION_LABEL))
            .is_some_and(|v| v == "true");
        Self {
            phase: ns
                .status
                .and_then(|s| s.phase)
                .unwrap_or_else(|| "Active".to_string()),
            object_meta: ns.metadata.into(),
            type_meta: TypeMetaView { kind: "namespace" },
            skip_auto_propagation,
        }
    }
}

impl Cell for NamespaceView {
    fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Status => Some(self.phase.as_str().into()),
            PropertyName::Kind => Some(self.type_meta.kind.into()),
            other => self.object_meta.property(other),
        }
    }
}

/// List namespaces
pub async fn list(req: &ListRequest) -> Result<ResourceList<NamespaceView>> {
    list_view::<Namespace, _, _>(req, ResourceKind::Namespace, "namespaces", NamespaceView::from).await
}
