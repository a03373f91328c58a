// Copyright 2025 Cowboy AI, LLC.

//! Contract aggregate
//!
//! The canonical instance of the domain-aggregate shape every CRM entity
//! repeats: a closed command enum, typed `V1_*` event payloads, an
//! exhaustive `when` fold, field-mask-driven partial updates and a
//! derived status recomputed on every change.

use crate::aggregate::{Aggregate, AggregateBase};
use crate::command_handlers::CommandHandlerAggregate;
use crate::commands::RequestContext;
use crate::errors::{DomainError, DomainResult};
use crate::events::Event;
use crate::value_objects::{ExternalSystem, FieldMask, Source};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Aggregate type tag for contract streams
pub const AGGREGATE_TYPE: &str = "contract";

/// Contract created
pub const CONTRACT_CREATE_V1: &str = "V1_CONTRACT_CREATE";
/// Contract fields updated (possibly masked)
pub const CONTRACT_UPDATE_V1: &str = "V1_CONTRACT_UPDATE";
/// Contract soft-deleted
pub const CONTRACT_DELETE_V1: &str = "V1_CONTRACT_DELETE";

/// Field-mask name for the contract name
pub const FIELD_NAME: &str = "name";
/// Field-mask name for the service start date
pub const FIELD_SERVICE_STARTS_AT: &str = "service_starts_at";
/// Field-mask name for the signature date
pub const FIELD_SIGNED_AT: &str = "signed_at";
/// Field-mask name for the end date
pub const FIELD_ENDS_AT: &str = "ends_at";

/// Lifecycle status, derived from the service and end dates rather than
/// set directly by callers
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum ContractStatus {
    /// No dates known yet
    #[default]
    Undefined,
    /// Service has not started
    Draft,
    /// Service is running
    Live,
    /// End date has passed
    Ended,
}

fn derive_status(
    service_starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ContractStatus {
    if let Some(ends_at) = ends_at {
        if ends_at <= now {
            return ContractStatus::Ended;
        }
    }
    match service_starts_at {
        Some(starts_at) if starts_at <= now => ContractStatus::Live,
        Some(_) => ContractStatus::Draft,
        None => ContractStatus::Undefined,
    }
}

fn validate_dates(
    service_starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> DomainResult<()> {
    if let (Some(starts_at), Some(ends_at)) = (service_starts_at, ends_at) {
        if ends_at <= starts_at {
            return Err(DomainError::validation(
                "contract end date must be after the service start date",
            ));
        }
    }
    Ok(())
}

/// Payload of [`CONTRACT_CREATE_V1`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractCreateEvent {
    /// Tenant the contract belongs to
    pub tenant: String,
    /// Organization the contract is signed with
    pub organization_id: String,
    /// Contract display name
    pub name: String,
    /// When service delivery starts
    pub service_starts_at: Option<DateTime<Utc>>,
    /// When the contract was signed
    pub signed_at: Option<DateTime<Utc>>,
    /// Status derived at creation time
    pub status: ContractStatus,
    /// Provenance of the create
    pub source: Source,
    /// Link to the third-party record the contract was imported from
    pub external_system: Option<ExternalSystem>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Payload of [`CONTRACT_UPDATE_V1`]; carries the final merged values
/// plus the mask the caller supplied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractUpdateEvent {
    /// Final contract name
    pub name: String,
    /// Final service start date
    pub service_starts_at: Option<DateTime<Utc>>,
    /// Final signature date
    pub signed_at: Option<DateTime<Utc>>,
    /// Final end date
    pub ends_at: Option<DateTime<Utc>>,
    /// Status derived from the final dates
    pub status: ContractStatus,
    /// Provenance of the update
    pub source: Source,
    /// Update timestamp
    pub updated_at: DateTime<Utc>,
    /// Which fields the caller intended to change; empty means all
    pub fields_mask: FieldMask,
}

/// Payload of [`CONTRACT_DELETE_V1`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractDeleteEvent {
    /// Deletion timestamp
    pub updated_at: DateTime<Utc>,
}

/// Create a new contract
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateContract {
    /// Organization the contract is signed with
    pub organization_id: String,
    /// Contract display name; must not be blank
    pub name: String,
    /// When service delivery starts
    pub service_starts_at: Option<DateTime<Utc>>,
    /// When the contract was signed
    pub signed_at: Option<DateTime<Utc>>,
    /// Provenance; blanks are filled with platform defaults
    pub source: Source,
    /// Optional third-party link; recorded only when
    /// [available](ExternalSystem::available)
    pub external_system: Option<ExternalSystem>,
    /// Explicit creation timestamp; defaults to now
    pub created_at: Option<DateTime<Utc>>,
}

/// Partially update a contract
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateContract {
    /// New name, applied when masked
    pub name: String,
    /// New service start date, applied when masked
    pub service_starts_at: Option<DateTime<Utc>>,
    /// New signature date, applied when masked
    pub signed_at: Option<DateTime<Utc>>,
    /// New end date, applied when masked
    pub ends_at: Option<DateTime<Utc>>,
    /// Provenance; blanks are filled with platform defaults
    pub source: Source,
    /// Fields this update intends to change; empty means all
    pub field_mask: FieldMask,
    /// Emit a create instead when the stream does not exist yet
    pub create_if_missing: bool,
    /// Explicit update timestamp; defaults to now
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateContract {
    fn into_create(self) -> CreateContract {
        CreateContract {
            organization_id: String::new(),
            name: self.name,
            service_starts_at: self.service_starts_at,
            signed_at: self.signed_at,
            source: self.source,
            external_system: None,
            created_at: self.updated_at,
        }
    }
}

/// The closed set of contract commands
#[derive(Debug, Clone, PartialEq)]
pub enum ContractCommand {
    /// Create a new contract
    Create(CreateContract),
    /// Partially update an existing contract (or create it when the
    /// command allows)
    Update(UpdateContract),
    /// Soft-delete the contract
    Delete,
}

/// Replayed contract state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contract {
    /// Organization the contract is signed with
    pub organization_id: String,
    /// Contract display name
    pub name: String,
    /// When service delivery starts
    pub service_starts_at: Option<DateTime<Utc>>,
    /// When the contract was signed
    pub signed_at: Option<DateTime<Utc>>,
    /// When the contract ends
    pub ends_at: Option<DateTime<Utc>>,
    /// Derived lifecycle status
    pub status: ContractStatus,
    /// Provenance of the latest change
    pub source: Source,
    /// Third-party record link, when imported
    pub external_system: Option<ExternalSystem>,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Latest update timestamp
    pub updated_at: Option<DateTime<Utc>>,
    /// Soft-delete marker
    pub removed: bool,
}

/// Event-sourced contract aggregate, keyed by `(contract, tenant, id)`
#[derive(Debug, Clone)]
pub struct ContractAggregate {
    base: AggregateBase,
    /// Replayed state
    pub contract: Contract,
}

impl ContractAggregate {
    /// Fresh, unhydrated aggregate for the given tenant and business id
    pub fn new(tenant: &str, id: &str) -> DomainResult<Self> {
        Ok(Self {
            base: AggregateBase::with_tenant_and_id(AGGREGATE_TYPE, tenant, id)?,
            contract: Contract::default(),
        })
    }

    fn create(&mut self, ctx: &RequestContext, mut cmd: CreateContract) -> DomainResult<()> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("contract name must not be empty"));
        }
        validate_dates(cmd.service_starts_at, None)?;
        cmd.source.set_default_values();

        let created_at = cmd.created_at.unwrap_or_else(Utc::now);
        let payload = ContractCreateEvent {
            tenant: ctx.tenant.clone(),
            organization_id: cmd.organization_id,
            name: cmd.name,
            service_starts_at: cmd.service_starts_at,
            signed_at: cmd.signed_at,
            status: derive_status(cmd.service_starts_at, None, Utc::now()),
            source: cmd.source,
            external_system: cmd.external_system.filter(ExternalSystem::available),
            created_at,
        };

        let mut event = Event::new(&self.base, CONTRACT_CREATE_V1, &payload)?;
        event.enrich_metadata(ctx);
        self.apply(event)
    }

    fn update(&mut self, ctx: &RequestContext, mut cmd: UpdateContract) -> DomainResult<()> {
        cmd.source.set_default_values();
        let mask = cmd.field_mask.clone();

        // Merge command values over current state per the mask, so the
        // event carries final values and projections stay selective.
        let name = if mask.updated(FIELD_NAME) {
            cmd.name
        } else {
            self.contract.name.clone()
        };
        let service_starts_at = if mask.updated(FIELD_SERVICE_STARTS_AT) {
            cmd.service_starts_at
        } else {
            self.contract.service_starts_at
        };
        let signed_at = if mask.updated(FIELD_SIGNED_AT) {
            cmd.signed_at
        } else {
            self.contract.signed_at
        };
        let ends_at = if mask.updated(FIELD_ENDS_AT) {
            cmd.ends_at
        } else {
            self.contract.ends_at
        };

        if name.trim().is_empty() {
            return Err(DomainError::validation("contract name must not be empty"));
        }
        validate_dates(service_starts_at, ends_at)?;

        let payload = ContractUpdateEvent {
            name,
            service_starts_at,
            signed_at,
            ends_at,
            status: derive_status(service_starts_at, ends_at, Utc::now()),
            source: cmd.source,
            updated_at: cmd.updated_at.unwrap_or_else(Utc::now),
            fields_mask: mask,
        };

        let mut event = Event::new(&self.base, CONTRACT_UPDATE_V1, &payload)?;
        event.enrich_metadata(ctx);
        self.apply(event)
    }

    fn delete(&mut self, ctx: &RequestContext) -> DomainResult<()> {
        let payload = ContractDeleteEvent {
            updated_at: Utc::now(),
        };
        let mut event = Event::new(&self.base, CONTRACT_DELETE_V1, &payload)?;
        event.enrich_metadata(ctx);
        self.apply(event)
    }
}

impl Aggregate for ContractAggregate {
    fn base(&self) -> &AggregateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AggregateBase {
        &mut self.base
    }

    fn when(&mut self, event: &Event) -> DomainResult<()> {
        if event.is_system_event() {
            return Ok(());
        }
        match event.event_type.as_str() {
            CONTRACT_CREATE_V1 => {
                let e: ContractCreateEvent = event.get_json_data()?;
                self.contract.organization_id = e.organization_id;
                self.contract.name = e.name;
                self.contract.service_starts_at = e.service_starts_at;
                self.contract.signed_at = e.signed_at;
                self.contract.status = e.status;
                self.contract.source = e.source;
                self.contract.external_system = e.external_system;
                self.contract.created_at = Some(e.created_at);
                self.contract.updated_at = Some(e.created_at);
                Ok(())
            }
            CONTRACT_UPDATE_V1 => {
                let e: ContractUpdateEvent = event.get_json_data()?;
                if e.fields_mask.updated(FIELD_NAME) {
                    self.contract.name = e.name;
                }
                if e.fields_mask.updated(FIELD_SERVICE_STARTS_AT) {
                    self.contract.service_starts_at = e.service_starts_at;
                }
                if e.fields_mask.updated(FIELD_SIGNED_AT) {
                    self.contract.signed_at = e.signed_at;
                }
                if e.fields_mask.updated(FIELD_ENDS_AT) {
                    self.contract.ends_at = e.ends_at;
                }
                // Status is derived; it always follows the event.
                self.contract.status = e.status;
                self.contract.source = e.source;
                self.contract.updated_at = Some(e.updated_at);
                Ok(())
            }
            CONTRACT_DELETE_V1 => {
                let e: ContractDeleteEvent = event.get_json_data()?;
                self.contract.removed = true;
                self.contract.updated_at = Some(e.updated_at);
                Ok(())
            }
            other => Err(DomainError::InvalidEventType {
                event_type: other.to_string(),
            }),
        }
    }
}

impl CommandHandlerAggregate for ContractAggregate {
    type Command = ContractCommand;
    type Outcome = String;

    fn handle(&mut self, ctx: &RequestContext, command: ContractCommand) -> DomainResult<String> {
        match command {
            ContractCommand::Create(cmd) => {
                if !self.not_found() {
                    return Err(DomainError::validation("contract already exists"));
                }
                self.create(ctx, cmd)?;
            }
            ContractCommand::Update(cmd) => {
                if self.not_found() {
                    if !cmd.create_if_missing {
                        return Err(DomainError::AggregateNotFound(self.base.id.clone()));
                    }
                    self.create(ctx, cmd.into_create())?;
                } else if self.contract.removed {
                    return Err(DomainError::validation("contract has been deleted"));
                } else {
                    self.update(ctx, cmd)?;
                }
            }
            ContractCommand::Delete => {
                if self.not_found() {
                    return Err(DomainError::AggregateNotFound(self.base.id.clone()));
                }
                if !self.contract.removed {
                    self.delete(ctx)?;
                }
            }
        }
        Ok(self.base.object_id())
    }
}
