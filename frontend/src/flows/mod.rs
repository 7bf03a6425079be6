//! Multi-step treasury flows built on the bespoke endpoints.

pub mod bank_reconciliation;
pub mod payment_order;

pub use bank_reconciliation::{BankReconciliation, BatchFailure, BatchReport};
pub use payment_order::{AllocationPrompt, PaymentOrderFlow, PaymentOutcome, PaymentTotals};
