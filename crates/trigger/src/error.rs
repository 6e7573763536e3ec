use herald_ledger::LedgerError;
use herald_notify::NotifyError;

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("ledger persistence failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] NotifyError),
}

pub type Result<T> = std::result::Result<T, TriggerError>;
