//! Financial report: income, expense and balance over the window

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use super::{ensure_active, ReportAggregationService, ReportWindow};
use crate::error::Result;
use crate::types::{
    CategoryTotal, FarmId, FinancialEntry, FinancialReport, FinancialTransaction, RecordScope,
    TransactionKind,
};

/// Totals and ledger for the transactions inside `window`.
///
/// Entries are ordered by timestamp; transactions sharing an instant keep
/// their input order.
pub fn build_financial_report(
    farm_id: FarmId,
    window: &ReportWindow,
    transactions: &[FinancialTransaction],
) -> FinancialReport {
    let mut in_window: Vec<&FinancialTransaction> = transactions
        .iter()
        .filter(|tx| tx.farm_id == farm_id && window.contains(tx.timestamp))
        .collect();
    in_window.sort_by_key(|tx| tx.timestamp);

    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    let mut categories: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();

    for tx in &in_window {
        let slot = categories.entry(tx.category.as_str()).or_default();
        match tx.kind {
            TransactionKind::Income => {
                total_income += tx.amount;
                slot.0 += tx.amount;
            }
            TransactionKind::Expense => {
                total_expense += tx.amount;
                slot.1 += tx.amount;
            }
        }
    }

    FinancialReport {
        farm_id,
        start: window.start,
        end: window.end,
        total_income,
        total_expense,
        balance: total_income - total_expense,
        by_category: categories
            .into_iter()
            .map(|(category, (income, expense))| CategoryTotal {
                category: category.to_string(),
                income,
                expense,
            })
            .collect(),
        entries: in_window
            .into_iter()
            .map(|tx| FinancialEntry {
                id: tx.id,
                timestamp: tx.timestamp,
                kind: tx.kind,
                category: tx.category.clone(),
                description: tx.description.clone(),
                amount: tx.amount,
                batch_id: tx.batch_id,
            })
            .collect(),
    }
}

impl ReportAggregationService {
    /// Income, expense and balance for a farm between `start` and `end`
    pub async fn financial_report(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<FinancialReport> {
        let (_, window) = self.open(farm_id, start, end, cancel).await?;
        let transactions: Vec<FinancialTransaction> = self
            .aggregator
            .fetch(RecordScope::Farm(farm_id), Some(window.dates), cancel)
            .await?;
        ensure_active(cancel)?;
        Ok(build_financial_report(farm_id, &window, &transactions))
    }
}
