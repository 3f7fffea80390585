//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations, hiding
//! the `SeaORM` implementation details from the rest of the application.
//! `VoucherRepository` is the ledger engine: it composes the other
//! repositories and owns the transaction boundary for voucher commits.

pub mod account;
pub mod open_item;
pub mod period;
pub mod refresh;
pub mod sequence;
pub mod voucher;
pub mod warning;

pub use account::{AccountError, AccountRepository, SaveAccountInput};
pub use open_item::{OpenItemFilter, OpenItemRepository};
pub use period::{PeriodError, PeriodRepository};
pub use refresh::{AggregateRefresher, PgAggregateRefresher};
pub use sequence::VoucherNumberSequencer;
pub use voucher::{
    CreateVoucherInput, UpdateVoucherInput, VoucherError, VoucherFilter, VoucherRepository,
    VoucherSaveResult, VoucherWithLines,
};
pub use warning::{TracingWarningTaskSink, WarningSinkError, WarningTask, WarningTaskSink};
