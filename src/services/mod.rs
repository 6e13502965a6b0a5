pub mod auditor;
pub mod classifier;
pub mod loan_book;
pub mod netting_service;
pub mod projector;
pub mod settlement_service;
pub mod validator;

pub use auditor::{issued_total, ConservationAuditor};
pub use classifier::{classify, effects_of, Effect, EffectSet};
pub use loan_book::{find_loan, loan_ledger, outstanding_loans, OutstandingLoan};
pub use netting_service::NettingPlanner;
pub use projector::{BalanceProjector, Projection};
pub use settlement_service::SettlementService;
pub use validator::EntryValidator;
