//! Concurrent fan-out of list calls with partial-failure semantics
//!
//! [`ResourceChannelAggregator::spawn`] starts one task per requested kind.
//! Each task issues exactly one list call and always publishes exactly one
//! result on its own oneshot channel, including when the request scope is
//! cancelled or its deadline passes. [`ResourceChannelSet::drain`] reads every
//! channel once, in declared order, and splits failures into warnings and a
//! critical error.

use std::collections::HashMap;
use std::sync::Arc;

use dashboard_client::RequestScope;
use dashboard_common::metrics::{record_list_call, ListOutcome};
use dashboard_common::{ErrorPartition, UpstreamError, UpstreamErrorKind};
use kube::api::DynamicObject;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::kind::ResourceKind;
use crate::lister::{NamespaceQuery, ResourceLister};

type ListResult = Result<Vec<DynamicObject>, UpstreamError>;

/// Starts one list task per kind against one target
pub struct ResourceChannelAggregator {
    lister: Arc<dyn ResourceLister>,
}

impl ResourceChannelAggregator {
    /// Aggregator over `lister`
    pub fn new(lister: Arc<dyn ResourceLister>) -> Self {
        Self { lister }
    }

    /// Spawn one list task per kind, scoped to `scope`
    ///
    /// Dropping the returned set cancels tasks that have not finished.
    #[instrument(skip(self, scope), fields(kinds = kinds.len()))]
    pub fn spawn(
        &self,
        kinds: &[ResourceKind],
        namespaces: &NamespaceQuery,
        scope: &RequestScope,
    ) -> ResourceChannelSet {
        let scope = scope.child();
        let mut receivers = Vec::with_capacity(kinds.len());

        for &kind in kinds {
            let (tx, rx) = oneshot::channel();
            let lister = Arc::clone(&self.lister);
            let namespaces = namespaces.clone();
            let task_scope = scope.clone();

            tokio::spawn(async move {
                let started = Instant::now();
                let result: ListResult = tokio::select! {
                    biased;
                    _ = task_scope.cancelled() => {
                        Err(UpstreamError::timeout(format!("list {} cancelled", kind)))
                    }
                    result = tokio::time::timeout_at(task_scope.deadline(), lister.list(kind, &namespaces)) => {
                        result.unwrap_or_else(|_| {
                            Err(UpstreamError::timeout(format!("list {} exceeded request deadline", kind)))
                        })
                    }
                };

                let outcome = match &result {
                    Ok(_) => ListOutcome::Ok,
                    Err(e) if e.is_critical() => ListOutcome::Critical,
                    Err(_) => ListOutcome::Warning,
                };
                record_list_call(kind.as_str(), outcome, started.elapsed());

                // The receiver may already be gone when the caller gave up
                let _ = tx.send(result);
            });

            receivers.push((kind, rx));
        }

        ResourceChannelSet { receivers, scope }
    }
}

/// One pending result per requested kind
pub struct ResourceChannelSet {
    receivers: Vec<(ResourceKind, oneshot::Receiver<ListResult>)>,
    scope: RequestScope,
}

impl ResourceChannelSet {
    /// Number of channels
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    /// Whether no kinds were requested
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Read every channel once, in declared order
    ///
    /// Reading continues after a critical error so that no channel is left
    /// unread. A task that exits without publishing counts as critical.
    pub async fn drain(mut self) -> Result<ResourceLists, UpstreamError> {
        let mut items = HashMap::with_capacity(self.receivers.len());
        let mut errors = ErrorPartition::default();

        for (kind, rx) in self.receivers.drain(..) {
            let result = rx.await.unwrap_or_else(|_| {
                Err(UpstreamError::new(
                    UpstreamErrorKind::Internal,
                    format!("list task for {} exited without a result", kind),
                ))
            });
            match result {
                Ok(objects) => {
                    debug!(kind = %kind, count = objects.len(), "list call completed");
                    items.insert(kind, objects);
                }
                Err(e) => {
                    if e.is_critical() {
                        warn!(kind = %kind, error = %e, "critical list failure");
                    } else {
                        debug!(kind = %kind, error = %e, "non-critical list failure");
                    }
                    errors.push(e);
                }
            }
        }

        let warnings = errors.into_result()?;
        Ok(ResourceLists { items, warnings })
    }
}

impl Drop for ResourceChannelSet {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

/// Combined successful results of one aggregate call
#[derive(Debug, Default)]
pub struct ResourceLists {
    items: HashMap<ResourceKind, Vec<DynamicObject>>,
    warnings: Vec<UpstreamError>,
}

impl ResourceLists {
    /// Objects of `kind`; empty when the kind failed non-critically
    pub fn take(&mut self, kind: ResourceKind) -> Vec<DynamicObject> {
        self.items.remove(&kind).unwrap_or_default()
    }

    /// Number of objects of `kind`
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.items.get(&kind).map_or(0, Vec::len)
    }

    /// Non-critical failures
    pub fn warnings(&self) -> &[UpstreamError] {
        &self.warnings
    }

    /// Take the non-critical failures
    pub fn take_warnings(&mut self) -> Vec<UpstreamError> {
        std::mem::take(&mut self.warnings)
    }
}
