// tagwarden-domain library entry point
pub mod error;
pub mod instance;
pub mod ledger_record;
pub mod required_tags;
pub mod violation;

pub use error::DomainError;
pub use instance::Instance;
pub use ledger_record::LedgerRecord;
pub use required_tags::RequiredTagSet;
pub use violation::{ClassifiedViolation, Violation, ViolationStatus};
