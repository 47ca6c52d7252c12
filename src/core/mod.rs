pub mod error;
pub mod ledger;
pub mod space;
