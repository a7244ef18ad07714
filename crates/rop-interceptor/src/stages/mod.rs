//! Built-in interceptors.
//!
//! | Interceptor | Order | Purpose |
//! |---|---|---|
//! | [`access`] | 100 | App key → method grants |
//! | [`quota`] | 200 | Per-app call quota |
//! | [`audit`] | default | Structured audit log and request metrics |
//!
//! None of them is mandatory; the gateway registers each one that its
//! configuration enables.

pub mod access;
pub mod audit;
pub mod quota;

pub use access::{AccessControlBuilder, AccessControlInterceptor, AccessDecision, ACCESS_CONTROL_ORDER};
pub use audit::{AuditInterceptor, AuditRecord, AuditTimer, AUDIT_RECORD_KEY, AUDIT_TIMER_KEY};
pub use quota::{QuotaBuilder, QuotaInterceptor, QuotaStatus, QUOTA_ORDER, QUOTA_STATUS_KEY};
