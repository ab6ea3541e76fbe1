//! Per-domain state records. Each module here is pure data; the mutation
//! rules (invariants from section 3) live in the matching
//! `vei_providers::<domain>` module, which is the only code allowed to
//! construct new instances of a mutated record.

pub mod browser;
pub mod calendar;
pub mod chat;
pub mod crm;
pub mod docs;
pub mod erp;
pub mod identity;
pub mod mail;
pub mod servicedesk;
pub mod tickets;
