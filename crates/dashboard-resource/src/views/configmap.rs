//! ConfigMap list view

use k8s_openapi::api::core::v1::ConfigMap;
use serde::Serialize;

use super::{list_view, ListRequest, ObjectMetaView, ResourceList, TypeMetaView};
use crate::dataselect::{Cell, ComparableValue, PropertyName};
use crate::error::Result;
use crate::kind::ResourceKind;

/// A config map without its data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapView {
    /// Metadata
    pub object_meta: ObjectMetaView,
    /// Kind marker
    pub type_meta: TypeMetaView,
    /// Number of keys across `data` and `binaryData`
    pub keys: usize,
}

impl From<ConfigMap> for ConfigMapView {
    fn from(cm: ConfigMap) -> Self {
        let keys = cm.data.as_ref().map_or(0, |d| d.len())
            + cm.binary_data.as_ref().map_or(0, |d| d.len());
        Self {
            object_meta: cm.metadata.into(),
            type_meta: TypeMetaView { kind: "configmap" },
            keys,
        }
    }
}

impl Cell for ConfigMapView {
    fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Kind => Some(self.type_meta.kind.into()),
            other => self.object_meta.property(other),
        }
    }
}

/// List config maps
pub async fn list(req: &ListRequest) -> Result<ResourceList<ConfigMapView>> {
    list_view::<ConfigMap, _, _>(req, ResourceKind::ConfigMap, "items", ConfigMapView::from).await
}
