//! Tollgate
//!
//! Tollgate is the fee engine for a parking-lot and restroom-access service: tiered
//! rate tables, flat subscription policies, the open/close lifecycle of access
//! records, and daily/monthly income aggregation.

pub mod assessment;
pub mod fixtures;
pub mod ledger;
pub mod plates;
pub mod policies;
pub mod prelude;
pub mod rates;
pub mod reporting;
pub mod restroom;
