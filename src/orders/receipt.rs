//! Receipt capture — validates and packages proof of delivery.

use chrono::NaiveDate;

use crate::error::ReceiptError;
use crate::orders::model::ReceiptData;

/// Raw receipt input from the delivery-confirmation workflow.
#[derive(Debug, Clone)]
pub struct ReceiptForm {
    pub full_name: String,
    pub document: String,
    /// Encoded signature image exported from the signature pad.
    pub signature: String,
    pub received_at: NaiveDate,
}

/// Validate a receipt form and package it as immutable [`ReceiptData`].
///
/// Only presence is checked on the signature: a blank pad still exports a
/// non-empty image blob, and confirming with a blank signature is permitted
/// by the delivery workflow.
pub fn capture(form: ReceiptForm) -> Result<ReceiptData, ReceiptError> {
    if form.full_name.trim().is_empty() {
        return Err(ReceiptError::MissingReceiverName);
    }
    if form.signature.is_empty() {
        return Err(ReceiptError::MissingSignature);
    }

    Ok(ReceiptData {
        full_name: form.full_name.trim().to_string(),
        document: form.document,
        received_at: form.received_at,
        signature: form.signature,
    })
}
