pub mod budget_service;
pub mod cashflow_service;
pub mod challenge_service;
pub mod jar_service;
pub mod transaction_service;

pub use budget_service::{BudgetError, BudgetService, BudgetServiceImpl};
pub use cashflow_service::{CashflowError, CashflowService, CashflowServiceImpl};
pub use challenge_service::{
    ChallengeError, ChallengeService, ChallengeServiceImpl, ChallengeSettlement,
};
pub use jar_service::{DepositOutcome, JarError, JarService, JarServiceImpl};
pub use transaction_service::{
    DerivedRefresh, RecordedTransaction, RefreshOutcome, TransactionError, TransactionService,
    TransactionServiceImpl,
};
