//! Secret list view

use k8s_openapi::api::core::v1::Secret;
use serde::Serialize;

use super::{list_view, ListRequest, ObjectMetaView, ResourceList, TypeMetaView};
use crate::dataselect::{Cell, ComparableValue, PropertyName};
use crate::error::Result;
use crate::kind::ResourceKind;

/// A secret without its data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretView {
    /// Metadata
    pub object_meta: ObjectMetaView,
    /// Kind marker
    pub type_meta: TypeMetaView,
    /// Secret type, for example `Opaque`
    #[serde(rename = "type")]
    pub secret_type: String,
}

impl From<Secret> for SecretView {
    fn from(secret: Secret) -> Self {
        Self {
            object_meta: secret.metadata.into(),
            type_meta: TypeMetaView { kind: "secret" },
            secret_type: secret.type_.unwrap_or_default(),
        }
    }
}

impl Cell for SecretView {
    fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Type => Some(self.secret_type.as_str().into()),
            PropertyName::Kind => Some(self.type_meta.kind.into()),
            other => self.object_meta.property(other),
        }
    }
}

/// List secrets
pub async fn list(req: &ListRequest) -> Result<ResourceList<SecretView>> {
    list_view::<Secret, _, _>(req, ResourceKind::Secret, "secrets", SecretView::from).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{lister, request};
    use serde_json::json;
    use std::collections::HashMap;

    fn secret(name: &str, ns: &str, type_: &str) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": name, "namespace": ns},
            "type": type_,
            "data": {"password": "aHVudGVyMg=="}
        })
    }

    #[tokio::test]
    async fn test_list_secrets_filtered_by_type() {
        let lister = lister(HashMap::from([(
            ResourceKind::Secret,
            vec![
                secret("db-creds", "prod", "Opaque"),
                secret("tls", "prod", "kubernetes.io/tls"),
                secret("api-key", "dev", "Opaque"),
            ],
        )]));
        let mut req = request(lister);
        req.query = req.query.with_filter(PropertyName::Type, "Opaque");

        let list = list(&req).await.unwrap();
        assert_eq!(list.total, 3);
        assert_eq!(list.list_meta.total_items, 2);
        assert_eq!(list.items[0].object_meta.name, "db-creds");
        assert_eq!(list.items[0].secret_type, "Opaque");
    }

    #[tokio::test]
    async fn test_secret_view_omits_data() {
        let lister = lister(HashMap::from([(
            ResourceKind::Secret,
            vec![secret("db-creds", "prod", "Opaque")],
        )]));
        let list = list(&request(lister)).await.unwrap();
        let json = serde_json::to_value(&list).unwrap();
        let item = &json["secrets"][0];
        assert_eq!(item["type"], "Opaque");
        assert_eq!(item["typeMeta"]["kind"], "secret");
        assert!(item.get("data").is_none());
    }
}
