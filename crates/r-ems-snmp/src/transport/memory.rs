//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "SNMP switch adapter."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tracing::debug;

use super::{ErrorStatus, SnmpTarget, SnmpTransport, SnmpVersion, TransportError};
use crate::value::{Oid, TypedScalar};

/// A request observed by the [`InMemoryAgent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRequest {
    /// A get of `oid`.
    Get { oid: Oid },
    /// A set of `oid` to `value`.
    Set { oid: Oid, value: TypedScalar },
}

#[derive(Debug, Default)]
struct AgentState {
    objects: Mutex<IndexMap<Oid, TypedScalar>>,
    read_only: SyncMutex<HashSet<Oid>>,
    faults: SyncMutex<VecDeque<TransportError>>,
    latency: SyncMutex<Option<Duration>>,
    requests: SyncMutex<Vec<AgentRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// In-memory agent that simulates a device's scalar objects.
///
/// Set requests store the value and echo it back. Reads of unknown objects
/// answer `noSuchObject` (v2c/v3) or a `noSuchName` error (v1).
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgent {
    state: Arc<AgentState>,
}

impl InMemoryAgent {
    /// An agent with no objects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an agent pre-populated with objects.
    pub fn with_objects(objects: impl IntoIterator<Item = (Oid, TypedScalar)>) -> Self {
        let state = AgentState {
            objects: Mutex::new(objects.into_iter().collect()),
            ..AgentState::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Replace the value held for `oid`.
    pub async fn insert(&self, oid: Oid, value: TypedScalar) {
        self.state.objects.lock().await.insert(oid, value);
    }

    /// Current value held for `oid`.
    pub async fn value(&self, oid: &Oid) -> Option<TypedScalar> {
        self.state.objects.lock().await.get(oid).cloned()
    }

    /// Reject set requests for `oid`.
    pub fn mark_read_only(&self, oid: Oid) {
        self.state.read_only.lock().insert(oid);
    }

    /// Fail the next request with `error`. Queued faults are consumed in order.
    pub fn fail_next(&self, error: TransportError) {
        self.state.faults.lock().push_back(error);
    }

    /// Delay every request, so overlapping callers become observable.
    pub fn set_latency(&self, latency: Duration) {
        *self.state.latency.lock() = Some(latency);
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.state.requests.lock().clone()
    }

    /// Number of get requests received.
    pub fn get_count(&self) -> usize {
        self.count(|req| matches!(req, AgentRequest::Get { .. }))
    }

    /// Number of set requests received.
    pub fn set_count(&self) -> usize {
        self.count(|req| matches!(req, AgentRequest::Set { .. }))
    }

    /// Highest number of requests that were being served at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    fn count(&self, predicate: impl Fn(&AgentRequest) -> bool) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|req| predicate(req))
            .count()
    }

    async fn serve<F, Fut>(
        &self,
        request: AgentRequest,
        handler: F,
    ) -> Result<TypedScalar, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<TypedScalar, TransportError>>,
    {
        self.state.requests.lock().push(request);
        let current = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = *self.state.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let fault = self.state.faults.lock().pop_front();
        let result = match fault {
            Some(err) => Err(err),
            None => handler().await,
        };
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl SnmpTransport for InMemoryAgent {
    async fn get(&self, target: &SnmpTarget, oid: &Oid) -> Result<TypedScalar, TransportError> {
        debug!(endpoint = %target.endpoint(), %oid, "agent get");
        self.serve(AgentRequest::Get { oid: oid.clone() }, move || async move {
            match self.state.objects.lock().await.get(oid) {
                Some(value) => Ok(value.clone()),
                None if target.version == SnmpVersion::V1 => Err(TransportError::ErrorStatus {
                    status: ErrorStatus::NoSuchName,
                    index: 1,
                }),
                None => Ok(TypedScalar::NoSuchObject),
            }
        })
        .await
    }

    async fn set(
        &self,
        target: &SnmpTarget,
        oid: &Oid,
        value: TypedScalar,
    ) -> Result<TypedScalar, TransportError> {
        debug!(endpoint = %target.endpoint(), %oid, %value, "agent set");
        let request = AgentRequest::Set {
            oid: oid.clone(),
            value: value.clone(),
        };
        self.serve(request, move || async move {
            let read_only = self.state.read_only.lock().contains(oid);
            if read_only {
                let status = match target.version {
                    SnmpVersion::V1 => ErrorStatus::ReadOnly,
                    SnmpVersion::V2c | SnmpVersion::V3 => ErrorStatus::NotWritable,
                };
                return Err(TransportError::ErrorStatus { status, index: 1 });
            }
            self.state
                .objects
                .lock()
                .await
                .insert(oid.clone(), value.clone());
            Ok(value)
        })
        .await
    }
}
