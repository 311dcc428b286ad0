//! Registration orchestrator.
//!
//! Every remote action runs in two phases. First the intent status
//! (`ToBeRegistered`, `UpdateReserved`, ...) is committed to the store; that
//! commit is the durable promise of what should become true remotely. Then
//! the connector is called, and only on success is the confirmed status
//! committed. A crash or timeout anywhere after the first commit leaves the
//! record at its intent status, and running the same action again (or the
//! retry sweep) resumes from there.
//!
//! Outcomes are three-way:
//! - `Succeeded`: the confirmed status is stored
//! - `PendingRetry`: the registry was unreachable, the intent is kept
//! - `NeedsAttention`: the registry refused, or the record cannot proceed
//!   without an operator

use std::sync::Arc;

use pidreg_id::{IdentifierValue, RecordId, ResourceId, Scheme};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::connector::{ConnectorError, Connectors, RegistrationConnector};
use crate::context::RequestContext;
use crate::error::{RegistrarError, RegistrarResult};
use crate::payload::{build_payload, PayloadConfig};
use crate::record::IdentifierRecord;
use crate::resource::{ResourceDirectory, ResourceType};
use crate::status::{IllegalTransition, Status, INTENT_STATES};
use crate::store::{RecordStore, StoreError};

/// A remote action a caller can request for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Reserve,
    Register,
    UpdateMetadata,
    Delete,
}

impl Action {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reserve => "reserve",
            Self::Register => "register",
            Self::UpdateMetadata => "update_metadata",
            Self::Delete => "delete",
        }
    }

    /// Works out what `action` means for a record currently at `status`.
    fn plan(self, status: Status) -> Result<Plan, IllegalTransition> {
        use Status::*;

        let illegal = |to: Status| -> Result<Plan, IllegalTransition> {
            Err(IllegalTransition { from: status, to })
        };

        match self {
            Self::Reserve => match status {
                IsReserved => Ok(Plan::AlreadyDone),
                ToBeReserved => Ok(Plan::Drive(&[])),
                Minted | Pending => Ok(Plan::Drive(&[ToBeReserved])),
                _ => illegal(ToBeReserved),
            },
            Self::Register => match status {
                IsRegistered => Ok(Plan::AlreadyDone),
                ToBeRegistered => Ok(Plan::Drive(&[])),
                Minted | Pending | IsReserved | UpdateBeforeRegistration => {
                    Ok(Plan::Drive(&[ToBeRegistered]))
                }
                _ => illegal(ToBeRegistered),
            },
            Self::UpdateMetadata => match status {
                IsReserved => Ok(Plan::Drive(&[UpdateReserved])),
                IsRegistered => Ok(Plan::Drive(&[UpdateRegistered])),
                ToBeReserved | ToBeRegistered | UpdateReserved | UpdateRegistered
                | UpdateBeforeRegistration => Ok(Plan::Drive(&[])),
                Minted | Pending => Ok(Plan::AlreadyDone),
                ToBeDeleted | Deleted => illegal(UpdateRegistered),
            },
            Self::Delete => match status {
                Deleted => Ok(Plan::AlreadyDone),
                ToBeDeleted => Ok(Plan::Drive(&[])),
                // A freshly minted record must be parked before it can go.
                Minted => Ok(Plan::Drive(&[Pending, ToBeDeleted])),
                Pending | ToBeReserved | IsReserved | UpdateReserved | ToBeRegistered
                | IsRegistered | UpdateRegistered => Ok(Plan::Drive(&[ToBeDeleted])),
                UpdateBeforeRegistration => illegal(ToBeDeleted),
            },
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Plan {
    /// Nothing to send: the record is already where the action leads.
    AlreadyDone,
    /// Commit these statuses in order, then resume the intent.
    Drive(&'static [Status]),
}

/// Result of one orchestrated action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded { status: Status },
    PendingRetry { status: Status, reason: String },
    NeedsAttention { status: Status, message: String },
}

impl Outcome {
    /// Record status after the action.
    pub fn status(&self) -> Status {
        match self {
            Self::Succeeded { status }
            | Self::PendingRetry { status, .. }
            | Self::NeedsAttention { status, .. } => *status,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn is_pending_retry(&self) -> bool {
        matches!(self, Self::PendingRetry { .. })
    }

    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::NeedsAttention { .. })
    }
}

/// Counters from one retry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub examined: usize,
    pub confirmed: usize,
    pub pending: usize,
    pub needs_attention: usize,
    pub failed: usize,
}

/// Local status next to what the registry reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteState {
    pub record_id: RecordId,
    pub value: IdentifierValue,
    pub local: Status,
    pub remote_reserved: bool,
    pub remote_registered: bool,
}

impl RemoteState {
    /// False when a confirmed local status is not backed remotely.
    /// Intent statuses are in flight and always count as consistent.
    pub fn is_consistent(&self) -> bool {
        match self.local {
            Status::IsReserved | Status::UpdateReserved => self.remote_reserved,
            Status::IsRegistered | Status::UpdateRegistered => self.remote_registered,
            _ => true,
        }
    }
}

/// One identifier as shown to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierSummary {
    pub record_id: RecordId,
    pub scheme: Scheme,
    pub scheme_label: &'static str,
    pub value: IdentifierValue,
    /// `None` while the value is not meant to be shown (minted or deleted).
    pub display_value: Option<IdentifierValue>,
    pub status: Status,
    pub label: &'static str,
    /// Set while the record waits for an operator.
    pub attention: Option<String>,
}

/// What an identifier value points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "binding", rename_all = "snake_case")]
pub enum Binding {
    Bound { resource: ResourceId },
    Orphaned { resource_type: ResourceType },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub record_id: RecordId,
    pub value: IdentifierValue,
    pub scheme: Scheme,
    pub status: Status,
    pub binding: Binding,
}

/// Coordinates store, resources and connectors.
pub struct Registrar {
    store: Arc<RecordStore>,
    resources: Arc<dyn ResourceDirectory>,
    connectors: Connectors,
    payload: PayloadConfig,
}

impl Registrar {
    pub fn new(
        store: Arc<RecordStore>,
        resources: Arc<dyn ResourceDirectory>,
        connectors: Connectors,
        payload: PayloadConfig,
    ) -> Self {
        Self {
            store,
            resources,
            connectors,
            payload,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn connector(&self, scheme: Scheme) -> RegistrarResult<Arc<dyn RegistrationConnector>> {
        self.connectors
            .get(scheme)
            .ok_or(RegistrarError::NoConnector(scheme))
    }

    fn load(&self, id: RecordId) -> RegistrarResult<IdentifierRecord> {
        self.store.get(id)?.ok_or(RegistrarError::NotFound(id))
    }

    /// Applies one transition and persists it.
    fn commit(&self, record: &mut IdentifierRecord, target: Status) -> RegistrarResult<()> {
        let from = record.status();
        record.transition(target)?;
        self.store.update(record)?;
        debug!(record_id = %record.id(), from = %from, to = %target, "Committed status");
        Ok(())
    }

    /// Returns the live identifier of `scheme` for `resource`, minting one
    /// if there is none.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn mint(
        &self,
        ctx: &RequestContext,
        resource: ResourceId,
        scheme: Scheme,
    ) -> RegistrarResult<IdentifierRecord> {
        if let Some(existing) = self.store.find_live_by_resource(resource, scheme)? {
            debug!(
                record_id = %existing.id(),
                value = %existing.value(),
                "Reusing live identifier"
            );
            return Ok(existing);
        }

        let metadata = self
            .resources
            .lookup(resource)
            .await
            .map_err(RegistrarError::Directory)?
            .ok_or(RegistrarError::ResourceMissing(resource))?;

        let connector = self.connector(scheme)?;
        let id = RecordId::new();
        let value = connector.mint_value(id).await?;

        let record = IdentifierRecord::mint(id, value, &metadata);
        match self.store.insert(&record) {
            Ok(()) => {}
            Err(StoreError::LiveRecordExists { .. }) => {
                // A concurrent mint for the same resource won the insert.
                let winner = self
                    .store
                    .find_live_by_resource(resource, scheme)?
                    .ok_or(RegistrarError::ResourceMissing(resource))?;
                warn!(
                    record_id = %winner.id(),
                    discarded = %record.value(),
                    "Lost mint race, returning the live identifier"
                );
                return Ok(winner);
            }
            Err(e) => return Err(e.into()),
        }

        info!(record_id = %record.id(), value = %record.value(), "Minted identifier");
        Ok(record)
    }

    /// Parks a minted record until it is approved.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn hold(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> RegistrarResult<IdentifierRecord> {
        let mut record = self.load(id)?;
        self.commit(&mut record, Status::Pending)?;
        Ok(record)
    }

    pub async fn request_reservation(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> RegistrarResult<Outcome> {
        self.execute(ctx, id, Action::Reserve).await
    }

    pub async fn request_registration(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> RegistrarResult<Outcome> {
        self.execute(ctx, id, Action::Register).await
    }

    pub async fn request_metadata_update(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> RegistrarResult<Outcome> {
        self.execute(ctx, id, Action::UpdateMetadata).await
    }

    pub async fn request_deletion(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> RegistrarResult<Outcome> {
        self.execute(ctx, id, Action::Delete).await
    }

    /// Runs `action` against a record: commit intent, call out, confirm.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        id: RecordId,
        action: Action,
    ) -> RegistrarResult<Outcome> {
        let mut record = self.load(id)?;

        match action.plan(record.status())? {
            Plan::AlreadyDone => {
                debug!(status = %record.status(), "Nothing to send");
                Ok(Outcome::Succeeded {
                    status: record.status(),
                })
            }
            Plan::Drive(steps) => {
                // An explicit request is the operator's go-ahead.
                if record.clear_attention() && steps.is_empty() {
                    self.store.update(&mut record)?;
                }
                for step in steps {
                    self.commit(&mut record, *step)?;
                }
                self.drive(&mut record).await
            }
        }
    }

    /// Sends whatever the record's intent status asks for and confirms it.
    async fn drive(&self, record: &mut IdentifierRecord) -> RegistrarResult<Outcome> {
        let needs_payload = record.status().is_intent() && !record.status().is_to_be_deleted();
        if needs_payload && record.is_orphaned() {
            warn!(record_id = %record.id(), "Record is orphaned, cannot build payload");
            return self.park(record, "record has no bound resource".to_string());
        }

        if record.status().is_update_before_registration() {
            self.commit(record, Status::ToBeRegistered)?;
        }

        let status = record.status();
        let Some(confirmed) = status.confirmed() else {
            return Ok(Outcome::Succeeded { status });
        };

        let connector = self.connector(record.scheme())?;

        let result = if status.is_to_be_deleted() {
            connector.delete(record.value()).await
        } else {
            let Some(resource) = record.resource() else {
                return self.park(record, "record has no bound resource".to_string());
            };
            let metadata = match self.resources.lookup(resource).await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => {
                    warn!(record_id = %record.id(), resource = %resource, "Bound resource is gone");
                    return self.park(record, format!("resource {resource} not found"));
                }
                Err(e) => {
                    warn!(record_id = %record.id(), error = %e, "Resource lookup failed");
                    return Ok(Outcome::PendingRetry {
                        status,
                        reason: format!("resource lookup failed: {e}"),
                    });
                }
            };

            let payload = build_payload(record.value(), &metadata, &self.payload);
            match status {
                Status::ToBeReserved => connector.reserve(&payload).await,
                Status::ToBeRegistered => connector.register(&payload).await,
                _ => connector.update_metadata(&payload).await,
            }
        };

        match result {
            Ok(()) => {
                self.commit(record, confirmed)?;
                info!(
                    record_id = %record.id(),
                    value = %record.value(),
                    status = %confirmed,
                    "Remote change confirmed"
                );
                Ok(Outcome::Succeeded { status: confirmed })
            }
            Err(ConnectorError::Unreachable(reason)) => {
                warn!(
                    record_id = %record.id(),
                    status = %status,
                    reason = %reason,
                    "Registry unreachable, will retry"
                );
                Ok(Outcome::PendingRetry { status, reason })
            }
            Err(ConnectorError::Rejected {
                status: code,
                message,
            }) => {
                error!(
                    record_id = %record.id(),
                    status = %status,
                    code,
                    message = %message,
                    "Registry rejected request"
                );
                self.park(record, format!("rejected ({code}): {message}"))
            }
            Err(ConnectorError::MalformedValue(e)) => Err(e.into()),
        }
    }

    /// Marks the record as waiting for an operator and keeps its status.
    fn park(&self, record: &mut IdentifierRecord, message: String) -> RegistrarResult<Outcome> {
        record.flag_attention(message.clone());
        self.store.update(record)?;
        Ok(Outcome::NeedsAttention {
            status: record.status(),
            message,
        })
    }

    /// The resource is gone: drive every live identifier bound to it to
    /// deletion and clear the binding. The type hint stays on the record.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn release_resource(
        &self,
        ctx: &RequestContext,
        resource: ResourceId,
    ) -> RegistrarResult<Vec<(RecordId, Outcome)>> {
        let mut outcomes = Vec::new();

        for mut record in self.store.list_by_resource(resource)? {
            record.clear_resource();

            let plan = Action::Delete.plan(record.status());
            let steps = match plan {
                Ok(Plan::AlreadyDone) => {
                    self.store.update(&mut record)?;
                    outcomes.push((
                        record.id(),
                        Outcome::Succeeded {
                            status: record.status(),
                        },
                    ));
                    continue;
                }
                Ok(Plan::Drive(steps)) => steps,
                Err(e) => {
                    record.flag_attention(e.to_string());
                    self.store.update(&mut record)?;
                    warn!(
                        record_id = %record.id(),
                        error = %e,
                        "Cannot delete identifier of released resource"
                    );
                    outcomes.push((
                        record.id(),
                        Outcome::NeedsAttention {
                            status: record.status(),
                            message: e.to_string(),
                        },
                    ));
                    continue;
                }
            };

            match steps.split_last() {
                Some((last, before)) => {
                    for step in before {
                        self.commit(&mut record, *step)?;
                    }
                    // Intent and cleared binding land in the same write.
                    self.commit(&mut record, *last)?;
                }
                None => self.store.update(&mut record)?,
            }

            let outcome = self.drive(&mut record).await?;
            outcomes.push((record.id(), outcome));
        }

        info!(resource = %resource, released = outcomes.len(), "Released resource identifiers");
        Ok(outcomes)
    }

    /// Resumes every record sitting at an intent status, except those
    /// waiting for an operator.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn retry_pending(&self, ctx: &RequestContext) -> RegistrarResult<SweepStats> {
        let mut stats = SweepStats::default();

        for mut record in self.store.list_retryable(&INTENT_STATES)? {
            stats.examined += 1;
            match self.drive(&mut record).await {
                Ok(Outcome::Succeeded { .. }) => stats.confirmed += 1,
                Ok(Outcome::PendingRetry { .. }) => stats.pending += 1,
                Ok(Outcome::NeedsAttention { .. }) => stats.needs_attention += 1,
                Err(e) => {
                    error!(record_id = %record.id(), error = %e, "Retry failed");
                    stats.failed += 1;
                }
            }
        }

        if stats.examined > 0 {
            info!(
                examined = stats.examined,
                confirmed = stats.confirmed,
                pending = stats.pending,
                needs_attention = stats.needs_attention,
                failed = stats.failed,
                "Retry sweep complete"
            );
        }

        Ok(stats)
    }

    /// Compares local status with the registry's view. Never mutates.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn reconcile(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> RegistrarResult<RemoteState> {
        let record = self.load(id)?;
        let connector = self.connector(record.scheme())?;

        let remote_reserved = connector.is_reserved(record.value()).await?;
        let remote_registered = connector.is_registered(record.value()).await?;

        let state = RemoteState {
            record_id: record.id(),
            value: record.value().clone(),
            local: record.status(),
            remote_reserved,
            remote_registered,
        };
        if !state.is_consistent() {
            warn!(record_id = %id, local = %state.local, "Local status not reflected remotely");
        }
        Ok(state)
    }

    /// Identifiers bound to `resource`, with display labels.
    pub fn identifiers_for(&self, resource: ResourceId) -> RegistrarResult<Vec<IdentifierSummary>> {
        let summaries = self
            .store
            .list_by_resource(resource)?
            .into_iter()
            .map(|record| {
                let status = record.status();
                let display_value = (!status.is_minted() && !status.is_deleted())
                    .then(|| record.value().clone());
                IdentifierSummary {
                    record_id: record.id(),
                    scheme: record.scheme(),
                    scheme_label: record.scheme().label(),
                    value: record.value().clone(),
                    display_value,
                    status,
                    label: status.label(),
                    attention: record.attention().map(str::to_string),
                }
            })
            .collect();
        Ok(summaries)
    }

    /// What `value` is bound to.
    pub fn resolve(&self, value: &str) -> RegistrarResult<Resolution> {
        let value = IdentifierValue::parse(value)?;
        let record = self
            .store
            .find_by_value(&value)?
            .ok_or_else(|| RegistrarError::UnknownValue(value.to_string()))?;

        let binding = match record.resource() {
            Some(resource) => Binding::Bound { resource },
            None => Binding::Orphaned {
                resource_type: record.resource_type(),
            },
        };

        Ok(Resolution {
            record_id: record.id(),
            value,
            scheme: record.scheme(),
            status: record.status(),
            binding,
        })
    }

    /// Loads a record by ID.
    pub fn record(&self, id: RecordId) -> RegistrarResult<IdentifierRecord> {
        self.load(id)
    }
}
