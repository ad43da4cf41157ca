//! Shared data types for the intent firewall: dispatch kinds, intents,
//! components, caller identity, and audit records.
//!
//! This crate carries no logic of its own — it's the wire format the
//! dispatch façade, the rule engine, and any embedding host agree on, the
//! same role `watchexec-events` plays for `watchexec`.

mod audit;
mod caller;
mod component;
mod dispatch;
mod ids;
mod intent;

pub use audit::AuditEvent;
pub use caller::CallerInfo;
pub use component::Component;
pub use dispatch::{DispatchKind, DispatchRequest, EffectPath, PackageQueryRequest};
pub use ids::{Pid, Uid, UserId, FIRST_APPLICATION_UID, ROOT_UID};
pub use intent::{Intent, IntentData};
