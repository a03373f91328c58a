// Copyright 2025 Cowboy AI, LLC.

//! Invoice aggregate and the temp invoicing-cycle aggregate
//!
//! The invoice walks a fixed lifecycle (new, filled, paid) driven by the
//! billing scheduler. The invoicing cycle is a temp aggregate: a
//! high-churn per-tenant trigger stream with short retention that is
//! never replayed on load.

use crate::aggregate::{Aggregate, AggregateBase};
use crate::command_handlers::CommandHandlerAggregate;
use crate::commands::RequestContext;
use crate::errors::{DomainError, DomainResult};
use crate::events::Event;
use crate::infrastructure::event_store::StreamMetadata;
use crate::value_objects::Source;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregate type tag for invoice streams
pub const AGGREGATE_TYPE: &str = "invoice";
/// Aggregate type tag for invoicing-cycle trigger streams
pub const INVOICING_CYCLE_AGGREGATE_TYPE: &str = "invoicing_cycle";

/// Invoice initialized for a billing period
pub const INVOICE_NEW_V1: &str = "V1_INVOICE_NEW";
/// Line amounts computed and filled in
pub const INVOICE_FILL_V1: &str = "V1_INVOICE_FILL";
/// Payment received
pub const INVOICE_PAID_V1: &str = "V1_INVOICE_PAID";
/// Billing cycle triggered for a tenant
pub const INVOICING_CYCLE_TRIGGER_V1: &str = "V1_INVOICING_CYCLE_TRIGGER";

/// Invoice lifecycle status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum InvoiceStatus {
    /// Stream not created yet
    #[default]
    Undefined,
    /// Created for a billing period, amounts not yet computed
    Initialized,
    /// Amounts filled in, awaiting payment
    Due,
    /// Payment received
    Paid,
}

/// Payload of [`INVOICE_NEW_V1`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvoiceNewEvent {
    /// Tenant the invoice belongs to
    pub tenant: String,
    /// Contract being billed
    pub contract_id: String,
    /// Billing currency code
    pub currency: String,
    /// Dry-run invoices are simulated, never sent
    pub dry_run: bool,
    /// Billing period start
    pub period_start: DateTime<Utc>,
    /// Billing period end
    pub period_end: DateTime<Utc>,
    /// Provenance of the create
    pub source: Source,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Payload of [`INVOICE_FILL_V1`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvoiceFillEvent {
    /// Net amount
    pub amount: f64,
    /// Value-added tax
    pub vat: f64,
    /// Gross total
    pub total_amount: f64,
    /// Human-facing invoice number assigned at fill time
    pub invoice_number: String,
    /// Fill timestamp
    pub updated_at: DateTime<Utc>,
}

/// Payload of [`INVOICE_PAID_V1`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvoicePaidEvent {
    /// Payment timestamp
    pub updated_at: DateTime<Utc>,
}

/// Initialize an invoice for a billing period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewInvoice {
    /// Contract being billed
    pub contract_id: String,
    /// Billing currency code
    pub currency: String,
    /// Simulate without sending
    pub dry_run: bool,
    /// Billing period start
    pub period_start: Option<DateTime<Utc>>,
    /// Billing period end
    pub period_end: Option<DateTime<Utc>>,
    /// Provenance; blanks are filled with platform defaults
    pub source: Source,
}

/// Fill in computed amounts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillInvoice {
    /// Net amount
    pub amount: f64,
    /// Value-added tax
    pub vat: f64,
    /// Gross total
    pub total_amount: f64,
    /// Assigned invoice number
    pub invoice_number: String,
}

/// The closed set of invoice commands
#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceCommand {
    /// Initialize for a billing period
    New(NewInvoice),
    /// Fill in computed amounts
    Fill(FillInvoice),
    /// Record payment
    MarkPaid,
}

/// Replayed invoice state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invoice {
    /// Contract being billed
    pub contract_id: String,
    /// Billing currency code
    pub currency: String,
    /// Dry-run marker
    pub dry_run: bool,
    /// Billing period start
    pub period_start: Option<DateTime<Utc>>,
    /// Billing period end
    pub period_end: Option<DateTime<Utc>>,
    /// Net amount
    pub amount: f64,
    /// Value-added tax
    pub vat: f64,
    /// Gross total
    pub total_amount: f64,
    /// Assigned invoice number
    pub invoice_number: String,
    /// Lifecycle status
    pub status: InvoiceStatus,
    /// Provenance of the create
    pub source: Source,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Latest update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

/// Event-sourced invoice aggregate, keyed by `(invoice, tenant, id)`
#[derive(Debug, Clone)]
pub struct InvoiceAggregate {
    base: AggregateBase,
    /// Replayed state
    pub invoice: Invoice,
}

impl InvoiceAggregate {
    /// Fresh, unhydrated aggregate for the given tenant and business id
    pub fn new(tenant: &str, id: &str) -> DomainResult<Self> {
        Ok(Self {
            base: AggregateBase::with_tenant_and_id(AGGREGATE_TYPE, tenant, id)?,
            invoice: Invoice::default(),
        })
    }

    fn init(&mut self, ctx: &RequestContext, mut cmd: NewInvoice) -> DomainResult<()> {
        if cmd.contract_id.trim().is_empty() {
            return Err(DomainError::validation("invoice requires a contract id"));
        }
        let (Some(period_start), Some(period_end)) = (cmd.period_start, cmd.period_end) else {
            return Err(DomainError::validation("invoice requires a billing period"));
        };
        if period_end <= period_start {
            return Err(DomainError::validation(
                "billing period end must be after its start",
            ));
        }
        cmd.source.set_default_values();

        let payload = InvoiceNewEvent {
            tenant: ctx.tenant.clone(),
            contract_id: cmd.contract_id,
            currency: cmd.currency,
            dry_run: cmd.dry_run,
            period_start,
            period_end,
            source: cmd.source,
            created_at: Utc::now(),
        };
        let mut event = Event::new(&self.base, INVOICE_NEW_V1, &payload)?;
        event.enrich_metadata(ctx);
        self.apply(event)
    }

    fn fill(&mut self, ctx: &RequestContext, cmd: FillInvoice) -> DomainResult<()> {
        if self.invoice.status != InvoiceStatus::Initialized {
            return Err(DomainError::validation(
                "only an initialized invoice can be filled",
            ));
        }
        let payload = InvoiceFillEvent {
            amount: cmd.amount,
            vat: cmd.vat,
            total_amount: cmd.total_amount,
            invoice_number: cmd.invoice_number,
            updated_at: Utc::now(),
        };
        let mut event = Event::new(&self.base, INVOICE_FILL_V1, &payload)?;
        event.enrich_metadata(ctx);
        self.apply(event)
    }

    fn mark_paid(&mut self, ctx: &RequestContext) -> DomainResult<()> {
        if self.invoice.status != InvoiceStatus::Due {
            return Err(DomainError::validation("only a due invoice can be paid"));
        }
        let payload = InvoicePaidEvent {
            updated_at: Utc::now(),
        };
        let mut event = Event::new(&self.base, INVOICE_PAID_V1, &payload)?;
        event.enrich_metadata(ctx);
        self.apply(event)
    }
}

impl Aggregate for InvoiceAggregate {
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
            INVOICE_NEW_V1 => {
                let e: InvoiceNewEvent = event.get_json_data()?;
                self.invoice.contract_id = e.contract_id;
                self.invoice.currency = e.currency;
                self.invoice.dry_run = e.dry_run;
                self.invoice.period_start = Some(e.period_start);
                self.invoice.period_end = Some(e.period_end);
                self.invoice.source = e.source;
                self.invoice.status = InvoiceStatus::Initialized;
                self.invoice.created_at = Some(e.created_at);
                self.invoice.updated_at = Some(e.created_at);
                Ok(())
            }
            INVOICE_FILL_V1 => {
                let e: InvoiceFillEvent = event.get_json_data()?;
                self.invoice.amount = e.amount;
                self.invoice.vat = e.vat;
                self.invoice.total_amount = e.total_amount;
                self.invoice.invoice_number = e.invoice_number;
                self.invoice.status = InvoiceStatus::Due;
                self.invoice.updated_at = Some(e.updated_at);
                Ok(())
            }
            INVOICE_PAID_V1 => {
                let e: InvoicePaidEvent = event.get_json_data()?;
                self.invoice.status = InvoiceStatus::Paid;
                self.invoice.updated_at = Some(e.updated_at);
                Ok(())
            }
            other => Err(DomainError::InvalidEventType {
                event_type: other.to_string(),
            }),
        }
    }
}

impl CommandHandlerAggregate for InvoiceAggregate {
    type Command = InvoiceCommand;
    type Outcome = String;

    fn handle(&mut self, ctx: &RequestContext, command: InvoiceCommand) -> DomainResult<String> {
        match command {
            InvoiceCommand::New(cmd) => {
                if !self.not_found() {
                    return Err(DomainError::validation("invoice already exists"));
                }
                self.init(ctx, cmd)?;
            }
            InvoiceCommand::Fill(cmd) => self.fill(ctx, cmd)?,
            InvoiceCommand::MarkPaid => self.mark_paid(ctx)?,
        }
        Ok(self.base.object_id())
    }
}

/// Payload of [`INVOICING_CYCLE_TRIGGER_V1`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvoicingCycleTriggerEvent {
    /// When the cycle fired
    pub triggered_at: DateTime<Utc>,
}

/// The closed set of invoicing-cycle commands
#[derive(Debug, Clone, PartialEq)]
pub enum InvoicingCycleCommand {
    /// Fire the billing cycle for this tenant
    Trigger {
        /// When the cycle fired
        at: DateTime<Utc>,
    },
}

/// Temp aggregate backing the per-tenant billing trigger stream.
///
/// Never replayed on load; correctness does not depend on history, only
/// on the expected-version check, so the stream carries a short
/// retention policy.
#[derive(Debug, Clone)]
pub struct InvoicingCycleAggregate {
    base: AggregateBase,
    /// Last trigger folded in this process, if any
    pub last_triggered_at: Option<DateTime<Utc>>,
}

impl InvoicingCycleAggregate {
    /// Fresh temp aggregate for the given tenant and business id
    pub fn new(tenant: &str, id: &str) -> DomainResult<Self> {
        Ok(Self {
            base: AggregateBase::temp_with_tenant_and_id(
                INVOICING_CYCLE_AGGREGATE_TYPE,
                tenant,
                id,
            )?,
            last_triggered_at: None,
        })
    }

    /// Retention applied to cycle streams via
    /// [`AggregateStore::update_stream_metadata`](crate::infrastructure::AggregateStore::update_stream_metadata)
    pub fn default_retention() -> StreamMetadata {
        StreamMetadata {
            max_age: Some(Duration::from_secs(7 * 24 * 3600)),
            max_count: Some(200),
        }
    }
}

impl Aggregate for InvoicingCycleAggregate {
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
            INVOICING_CYCLE_TRIGGER_V1 => {
                let e: InvoicingCycleTriggerEvent = event.get_json_data()?;
                self.last_triggered_at = Some(e.triggered_at);
                Ok(())
            }
            other => Err(DomainError::InvalidEventType {
                event_type: other.to_string(),
            }),
        }
    }
}

impl CommandHandlerAggregate for InvoicingCycleAggregate {
    type Command = InvoicingCycleCommand;
    type Outcome = ();

    fn handle(&mut self, ctx: &RequestContext, command: InvoicingCycleCommand) -> DomainResult<()> {
        match command {
            InvoicingCycleCommand::Trigger { at } => {
                let payload = InvoicingCycleTriggerEvent { triggered_at: at };
                let mut event = Event::new(&self.base, INVOICING_CYCLE_TRIGGER_V1, &payload)?;
                event.enrich_metadata(ctx);
                self.apply(event)
            }
        }
    }
}
