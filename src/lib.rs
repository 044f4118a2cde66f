//! Conference sponsorship application service.
//!
//! An organization applies to sponsor a conference under a plan, optionally
//! requesting an exhibition booth; staff review, amend, and approve the
//! application. Staff-attributed changes leave an auditable editing history.

pub mod config;
pub mod error;
pub mod sponsorship;
pub mod telemetry;
