//! Reconciliation between prior-period and current-period structures.
//!
//! Data always flows from the current period (source) into the prior period
//! (destination).
pub mod header;
pub mod worksheet;
