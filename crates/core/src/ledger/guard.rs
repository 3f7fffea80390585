//! Voucher delete guard.
//!
//! Deletion is refused for vouchers that take part in a reversal pair and
//! for vouchers whose open items another voucher has already settled; the
//! clearing has to be undone through the normal voucher path first. The
//! period gate is checked separately by the engine.

use super::error::LedgerError;
use super::types::VoucherHeader;

/// Decides whether a voucher may be deleted, period gate aside.
///
/// # Errors
///
/// Returns `AlreadyReversed` when a reversal voucher points at this one,
/// `CannotDeleteReversal` when the voucher is itself a reversal, and
/// `OpenItemsCleared` when another voucher cleared any of its open items.
pub fn ensure_deletable(
    header: &VoucherHeader,
    has_items_cleared_by_other: bool,
) -> Result<(), LedgerError> {
    if header.reversal_voucher_id.is_some() {
        return Err(LedgerError::AlreadyReversed);
    }
    if header.is_reversal {
        return Err(LedgerError::CannotDeleteReversal);
    }
    if has_items_cleared_by_other {
        return Err(LedgerError::OpenItemsCleared);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_plain_voucher_is_deletable() {
        let header = VoucherHeader::default();
        assert!(ensure_deletable(&header, false).is_ok());
    }

    #[test]
    fn test_reversed_voucher_is_not_deletable() {
        let header = VoucherHeader {
            reversal_voucher_id: Some(Uuid::now_v7()),
            ..VoucherHeader::default()
        };
        assert!(matches!(
            ensure_deletable(&header, false),
            Err(LedgerError::AlreadyReversed)
        ));
    }

    #[test]
    fn test_removing_the_reversal_marker_restores_deletability() {
        let mut header = VoucherHeader {
            reversal_voucher_id: Some(Uuid::now_v7()),
            ..VoucherHeader::default()
        };
        assert!(ensure_deletable(&header, false).is_err());

        header.reversal_voucher_id = None;
        assert!(ensure_deletable(&header, false).is_ok());
    }

    #[test]
    fn test_reversal_voucher_is_not_deletable() {
        let header = VoucherHeader {
            is_reversal: true,
            ..VoucherHeader::default()
        };
        assert!(matches!(
            ensure_deletable(&header, false),
            Err(LedgerError::CannotDeleteReversal)
        ));
    }

    #[test]
    fn test_cleared_items_block_deletion() {
        let header = VoucherHeader::default();
        assert!(matches!(
            ensure_deletable(&header, true),
            Err(LedgerError::OpenItemsCleared)
        ));
    }
}
