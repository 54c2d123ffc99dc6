//! Audit trail vocabulary and entry shapes.
//!
//! Entries are append-only. Corrections are made by appending a compensating
//! entry; nothing in this crate or in `backoffice-infra` updates or deletes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use backoffice_core::{DomainError, EmployeeId, TenantId};

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(DomainError::validation(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum!(
    /// What was done.
    AuditAction {
        Create => "create",
        Update => "update",
        Delete => "delete",
        Approve => "approve",
        Reject => "reject",
        Export => "export",
        BatchCreate => "batch_create",
        BatchDelete => "batch_delete",
        Login => "login",
        Logout => "logout",
        Sync => "sync",
        Paid => "paid",
        Return => "return",
        ResendActivation => "resend_activation",
        ResetTotp => "reset_totp",
    }
);

wire_enum!(
    /// Record type acted upon.
    AuditEntity {
        Account => "account",
        FixedAsset => "fixed_asset",
        Borrowing => "borrowing",
        Employee => "employee",
        Department => "department",
        Site => "site",
        Currency => "currency",
        Vendor => "vendor",
        Customer => "customer",
        CashFlow => "cash_flow",
        ArApDoc => "ar_ap_doc",
        Settlement => "settlement",
        Position => "position",
        Project => "project",
        LeaveRequest => "leave_request",
        AssetAllocation => "asset_allocation",
        PermissionCache => "permission_cache",
        Session => "session",
    }
);

wire_enum!(
    /// Whether the audited attempt went through.
    AuditOutcome {
        Success => "success",
        Denied => "denied",
    }
);

/// Who acted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditActor {
    pub tenant_id: TenantId,
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
}

/// Where the request came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub ip_location: Option<String>,
}

/// Entry as handed to an audit log (id and timestamp not yet assigned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub actor: AuditActor,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub detail: String,
    pub outcome: AuditOutcome,
    pub meta: RequestMeta,
}

/// Persisted, immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub at: DateTime<Utc>,
    pub actor_id: EmployeeId,
    pub actor_name: String,
    pub actor_email: String,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub detail: String,
    pub outcome: AuditOutcome,
    pub ip: Option<String>,
    pub ip_location: Option<String>,
}

impl AuditEntry {
    /// Seal a new entry with its storage-assigned id and timestamp.
    pub fn seal(entry: NewAuditEntry, id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            id,
            tenant_id: entry.actor.tenant_id,
            at,
            actor_id: entry.actor.id,
            actor_name: entry.actor.name,
            actor_email: entry.actor.email,
            action: entry.action,
            entity: entry.entity,
            entity_id: entry.entity_id,
            detail: entry.detail,
            outcome: entry.outcome,
            ip: entry.meta.ip,
            ip_location: entry.meta.ip_location,
        }
    }
}
