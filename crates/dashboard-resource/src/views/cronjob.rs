//! CronJob list view

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::CronJob;
use serde::Serialize;

use super::{fetch_views, ListRequest, ObjectMetaView, ResourceList, ResourceStatus, TypeMetaView};
use crate::dataselect::{select, Cell, ComparableValue, PropertyName};
use crate::error::Result;
use crate::kind::ResourceKind;

/// A cron job with its schedule and activity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobView {
    /// Metadata
    pub object_meta: ObjectMetaView,
    /// Kind marker
    pub type_meta: TypeMetaView,
    /// Cron schedule
    pub schedule: String,
    /// Whether scheduling is suspended
    pub suspend: Option<bool>,
    /// Number of currently running jobs
    pub active: usize,
    /// Last time a job was scheduled
    pub last_schedule: Option<DateTime<Utc>>,
    /// Images of the job template's containers
    pub container_images: Vec<String>,
}

impl From<CronJob> for CronJobView {
    fn from(cj: CronJob) -> Self {
        let spec = cj.spec.unwrap_or_default();
        let status = cj.status.unwrap_or_default();
        let container_images = spec
            .job_template
            .spec
            .and_then(|s| s.template.spec)
            .map(|pod| pod.containers.into_iter().filter_map(|c| c.image).collect())
            .unwrap_or_default();

        Self {
            object_meta: cj.metadata.into(),
            type_meta: TypeMetaView { kind: "cronjob" },
            schedule: spec.schedule,
            suspend: spec.suspend,
            active: status.active.map_or(0, |a| a.len()),
            last_schedule: status.last_schedule_time.map(|t| t.0),
            container_images,
        }
    }
}

impl Cell for CronJobView {
    fn property(&self, name: &PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Kind => Some(self.type_meta.kind.into()),
            PropertyName::Other(p) if p == "schedule" => Some(self.schedule.as_str().into()),
            PropertyName::Other(p) if p == "active" => Some((self.active as i64).into()),
            other => self.object_meta.property(other),
        }
    }
}

/// Unsuspended cron jobs count as running, everything else as pending
fn status_of(views: &[CronJobView]) -> ResourceStatus {
    let running = views.iter().filter(|v| v.suspend == Some(false)).count();
    ResourceStatus {
        running,
        pending: views.len() - running,
        ..Default::default()
    }
}

/// List cron jobs
pub async fn list(req: &ListRequest) -> Result<ResourceList<CronJobView>> {
    let (views, warnings) = fetch_views::<CronJob, _, _>(req, ResourceKind::CronJob, CronJobView::from).await?;
    let status = status_of(&views);
    Ok(ResourceList::from_selection("items", select(views, &req.query, req.max_page_size), warnings)
        .with_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{lister, request};
    use serde_json::json;
    use std::collections::HashMap;

    fn cronjob(name: &str, suspend: Option<bool>, active: usize) -> serde_json::Value {
        let mut spec = json!({
            "schedule": "*/5 * * * *",
            "jobTemplate": {"spec": {"template": {"spec": {
                "containers": [{"name": "main", "image": "busybox:1.36"}]
            }}}}
        });
        if let Some(s) = suspend {
            spec["suspend"] = json!(s);
        }
        let active: Vec<_> = (0..active).map(|i| json!({"name": format!("job-{}", i)})).collect();
        json!({
            "apiVersion": "batch/v1",
            "kind": "CronJob",
            "metadata": {"name": name, "namespace": "default"},
            "spec": spec,
            "status": {"active": active}
        })
    }

    #[tokio::test]
    async fn test_list_cronjobs_with_status() {
        let lister = lister(HashMap::from([(
            ResourceKind::CronJob,
            vec![
                cronjob("backup", Some(false), 2),
                cronjob("cleanup", Some(true), 0),
                cronjob("report", None, 0),
            ],
        )]));

        let list = list(&request(lister)).await.unwrap();
        assert_eq!(list.items.len(), 3);
        assert_eq!(list.items[0].active, 2);
        assert_eq!(list.items[0].container_images, vec!["busybox:1.36".to_string()]);
        assert_eq!(
            list.status,
            Some(ResourceStatus {
                running: 1,
                pending: 2,
                ..Default::default()
            })
        );
    }

    #[tokio::test]
    async fn test_status_counts_before_filtering() {
        let lister = lister(HashMap::from([(
            ResourceKind::CronJob,
            vec![cronjob("backup", Some(false), 0), cronjob("cleanup", Some(false), 0)],
        )]));
        let mut req = request(lister);
        req.query = req.query.with_filter(PropertyName::Name, "backup");

        let list = list(&req).await.unwrap();
        assert_eq!(list.list_meta.total_items, 1);
        assert_eq!(list.status.map(|s| s.running), Some(2));
    }
}
