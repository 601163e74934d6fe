//! The canonical list of bill records.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Datelike;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::BillRecord;
use crate::quarters::quarter_number_from_label;
use crate::query::{self, BillFilter, SortOrder};
use crate::storage::BillStorage;

/// Owns every bill record and keeps serial numbers dense.
///
/// Serial numbers always form exactly `1..=N`. Deleting a record renumbers
/// the survivors in their previous serial order, so a serial number seen
/// before an unrelated delete may now point at a different record. Callers
/// needing a durable reference must not use it as one.
///
/// Each mutation works on a copy under the lock and replaces the live list
/// only after the full snapshot has been saved; on a storage error nothing
/// changes.
pub struct BillStore {
    records: Mutex<Vec<BillRecord>>,
    storage: Box<dyn BillStorage>,
}

pub struct BillSummary {
    pub total_bills: usize,
    pub total_amount: Decimal,
    pub by_network: BTreeMap<String, usize>,
    pub by_quarter: BTreeMap<String, usize>,
}

impl BillStore {
    /// Load the saved state, running the legacy repair pass once.
    pub fn open(storage: impl BillStorage + 'static) -> Result<Self> {
        let mut records = storage.load_all()?.unwrap_or_default();
        let repaired = repair_legacy_records(&mut records);
        if repaired > 0 {
            storage.save_all(&records)?;
            info!("Repaired {repaired} legacy bill records");
        }
        info!("Loaded {} bill records", records.len());
        Ok(Self {
            records: Mutex::new(records),
            storage: Box::new(storage),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BillRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn commit<T, F>(&self, change: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Vec<BillRecord>) -> Option<T>,
    {
        let mut live = self.lock();
        let mut next = live.clone();
        let Some(outcome) = change(&mut next) else {
            return Ok(None);
        };
        self.storage.save_all(&next)?;
        *live = next;
        Ok(Some(outcome))
    }

    /// Append `draft` as serial `N + 1` and return that serial. Any serial
    /// number already on the draft is ignored.
    pub fn add_record(&self, mut draft: BillRecord) -> Result<u32> {
        let serial = self.commit(|records| {
            let serial = records.len() as u32 + 1;
            draft.serial_no = serial;
            records.push(draft);
            Some(serial)
        })?;
        // The closure always yields a serial.
        let serial = serial.unwrap_or_default();
        debug!("Added bill #{serial}");
        Ok(serial)
    }

    /// Replace every field of record `serial_no`; `false` if there is none.
    pub fn update_record(&self, serial_no: u32, mut values: BillRecord) -> Result<bool> {
        let updated = self.commit(|records| {
            let slot = records.iter_mut().find(|r| r.serial_no == serial_no)?;
            values.serial_no = serial_no;
            *slot = values;
            Some(())
        })?;
        Ok(updated.is_some())
    }

    /// Remove record `serial_no` and renumber the rest; `false` if absent.
    pub fn delete_record(&self, serial_no: u32) -> Result<bool> {
        let deleted = self.commit(|records| {
            let index = records.iter().position(|r| r.serial_no == serial_no)?;
            records.remove(index);
            reindex(records);
            Some(())
        })?;
        if deleted.is_some() {
            debug!("Deleted bill #{serial_no}, {} remain", self.len());
        }
        Ok(deleted.is_some())
    }

    /// Copy of all records in storage order.
    pub fn get_all(&self) -> Vec<BillRecord> {
        self.lock().clone()
    }

    pub fn get_by_serial(&self, serial_no: u32) -> Option<BillRecord> {
        self.lock().iter().find(|r| r.serial_no == serial_no).cloned()
    }

    pub fn query(&self, filter: &BillFilter, sort: SortOrder) -> Vec<BillRecord> {
        query::apply(&self.lock(), filter, sort)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn available_years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.lock().iter().filter_map(|r| r.year).collect();
        years.into_iter().collect()
    }

    pub fn available_networks(&self) -> Vec<String> {
        self.distinct(|r| &r.network)
    }

    pub fn available_vendors(&self) -> Vec<String> {
        self.distinct(|r| &r.vendor)
    }

    pub fn available_commit_items(&self) -> Vec<String> {
        self.distinct(|r| &r.commit_item)
    }

    fn distinct(&self, field: impl Fn(&BillRecord) -> &String) -> Vec<String> {
        let values: BTreeSet<String> = self
            .lock()
            .iter()
            .map(|r| field(r).trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        values.into_iter().collect()
    }

    pub fn summary(&self) -> BillSummary {
        let records = self.lock();
        let mut by_network = BTreeMap::new();
        let mut by_quarter = BTreeMap::new();
        for r in records.iter() {
            *by_network.entry(or_unknown(&r.network)).or_insert(0) += 1;
            *by_quarter.entry(or_unknown(&r.quarter_label)).or_insert(0) += 1;
        }
        BillSummary {
            total_bills: records.len(),
            total_amount: records.iter().map(|r| r.amount_with_tax).sum(),
            by_network,
            by_quarter,
        }
    }
}

fn or_unknown(value: &str) -> String {
    if value.trim().is_empty() {
        "Unknown".to_string()
    } else {
        value.to_string()
    }
}

/// Renumber `1..=N` keeping the relative order of the old serial numbers.
/// Storage order is rewritten to match.
fn reindex(records: &mut [BillRecord]) {
    records.sort_by_key(|r| r.serial_no);
    for (i, record) in records.iter_mut().enumerate() {
        record.serial_no = i as u32 + 1;
    }
}

fn serials_are_dense(records: &[BillRecord]) -> bool {
    let serials: BTreeSet<u32> = records.iter().map(|r| r.serial_no).collect();
    serials.len() == records.len() && serials.iter().copied().eq(1..=records.len() as u32)
}

/// One-time migration for records written by older versions: fill in a
/// missing year (from `from_date`), quarter number (from the billing period
/// label), quarter label, and restore dense serial numbers. Returns how many
/// records changed; every change is logged.
fn repair_legacy_records(records: &mut Vec<BillRecord>) -> usize {
    let mut changed = BTreeSet::new();

    if !serials_are_dense(records) {
        warn!("Bill serial numbers are not 1..={}; renumbering", records.len());
        let before: Vec<u32> = records.iter().map(|r| r.serial_no).collect();
        // Stable sort keeps storage order among duplicate serials.
        let mut indexed: Vec<(usize, BillRecord)> = records.drain(..).enumerate().collect();
        indexed.sort_by_key(|(_, r)| r.serial_no);
        for (new_pos, (old_pos, mut record)) in indexed.into_iter().enumerate() {
            let serial = new_pos as u32 + 1;
            if before[old_pos] != serial {
                info!("Renumbered bill #{} to #{serial}", before[old_pos]);
                record.serial_no = serial;
                changed.insert(serial);
            }
            records.push(record);
        }
    }

    for record in records.iter_mut() {
        let serial = record.serial_no;
        if record.year.is_none() {
            if let Some(from) = record.from_date {
                record.year = Some(from.year());
                info!("Bill #{serial}: year set to {} from {from}", from.year());
                changed.insert(serial);
            }
        }
        if record.quarter_number.is_none() && !record.billing_period_label.trim().is_empty() {
            let label = &record.billing_period_label;
            let quarter = quarter_number_from_label(label).unwrap_or_else(|| {
                warn!("Bill #{serial}: no quarter in '{label}', assuming 1");
                1
            });
            info!("Bill #{serial}: quarter set to {quarter} from '{label}'");
            record.quarter_number = Some(quarter);
            changed.insert(serial);
        }
        if record.quarter_label.trim().is_empty() {
            if let (Some(year), Some(quarter)) = (record.year, record.quarter_number) {
                record.quarter_label = format!("Q{quarter}-{year}");
                info!("Bill #{serial}: quarter label set to {}", record.quarter_label);
                changed.insert(serial);
            }
        }
    }

    changed.len()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{with_tax, BillStatus};
    use crate::storage::memory::MemoryStorage;

    fn store() -> (MemoryStorage, BillStore) {
        let storage = MemoryStorage::default();
        let store = BillStore::open(storage.clone()).unwrap();
        (storage, store)
    }

    fn draft(invoice: &str) -> BillRecord {
        let mut r = BillRecord::new("P2P", "TATA COMMUNICATIONS LTD", Decimal::new(1000, 0));
        r.invoice_number = invoice.to_string();
        r.location = "Chennai DO".to_string();
        r.year = Some(2025);
        r.quarter_number = Some(1);
        r.quarter_label = "Q1-2025".to_string();
        r
    }

    fn invoices(records: &[BillRecord]) -> Vec<(u32, String)> {
        records
            .iter()
            .map(|r| (r.serial_no, r.invoice_number.clone()))
            .collect()
    }

    fn assert_dense(store: &BillStore) {
        let mut serials: Vec<u32> = store.get_all().iter().map(|r| r.serial_no).collect();
        serials.sort();
        let expected: Vec<u32> = (1..=store.len() as u32).collect();
        assert_eq!(serials, expected);
    }

    #[test]
    fn test_add_delete_add_scenario() {
        let (_storage, store) = store();
        assert_eq!(store.add_record(draft("A")).unwrap(), 1);
        assert_eq!(store.add_record(draft("B")).unwrap(), 2);
        assert_eq!(store.add_record(draft("C")).unwrap(), 3);
        assert!(store.delete_record(2).unwrap());
        assert_eq!(
            invoices(&store.get_all()),
            vec![(1, "A".to_string()), (2, "C".to_string())]
        );
        assert_eq!(store.add_record(draft("D")).unwrap(), 3);
        assert_eq!(store.get_by_serial(3).unwrap().invoice_number, "D");
    }

    #[test]
    fn test_reindex_preserves_relative_order() {
        let (_storage, store) = store();
        for i in 0..8 {
            store.add_record(draft(&format!("INV-{i}"))).unwrap();
        }
        // Delete from the middle, the end and the front.
        for serial in [4, 7, 1, 3] {
            let before = store.query(&BillFilter::default(), SortOrder::Serial);
            assert!(store.delete_record(serial).unwrap());
            assert_dense(&store);
            let after = store.query(&BillFilter::default(), SortOrder::Serial);
            let expected: Vec<String> = before
                .iter()
                .filter(|r| r.serial_no != serial)
                .map(|r| r.invoice_number.clone())
                .collect();
            let actual: Vec<String> = after.iter().map(|r| r.invoice_number.clone()).collect();
            assert_eq!(actual, expected);
            for r in &after {
                let old = before.iter().find(|b| b.invoice_number == r.invoice_number).unwrap();
                let shift = if old.serial_no > serial { 1 } else { 0 };
                assert_eq!(r.serial_no, old.serial_no - shift);
            }
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_interleaved_adds_and_deletes_stay_dense() {
        let (_storage, store) = store();
        for round in 0..20u32 {
            store.add_record(draft(&format!("R{round}"))).unwrap();
            store.add_record(draft(&format!("S{round}"))).unwrap();
            let target = round % store.len() as u32 + 1;
            assert!(store.delete_record(target).unwrap());
            assert_dense(&store);
        }
        assert_eq!(store.len(), 20);
    }

    #[test]
    fn test_missing_serial_is_not_an_error() {
        let (storage, store) = store();
        store.add_record(draft("A")).unwrap();
        let saves = storage.save_count();
        assert!(!store.update_record(9, draft("X")).unwrap());
        assert!(!store.delete_record(9).unwrap());
        assert!(!store.delete_record(0).unwrap());
        assert!(store.get_by_serial(9).is_none());
        assert_eq!(storage.save_count(), saves);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let (storage, store) = store();
        store.add_record(draft("A")).unwrap();
        store.add_record(draft("B")).unwrap();
        let mut values = draft("A-revised");
        values.serial_no = 42;
        values.status = BillStatus::Completed;
        assert!(store.update_record(1, values).unwrap());
        let all = store.get_all();
        assert_eq!(invoices(&all), vec![(1, "A-revised".to_string()), (2, "B".to_string())]);
        assert_eq!(all[0].status, BillStatus::Completed);
        assert_eq!(storage.stored_bills().unwrap(), all);
    }

    #[test]
    fn test_get_all_is_a_copy() {
        let (_storage, store) = store();
        store.add_record(draft("A")).unwrap();
        let mut copy = store.get_all();
        copy[0].invoice_number = "changed".to_string();
        copy.clear();
        assert_eq!(store.get_by_serial(1).unwrap().invoice_number, "A");
    }

    #[test]
    fn test_tax_identity_after_creation() {
        let (_storage, store) = store();
        for paise in [1, 99, 1025, 123456, 9999999] {
            let r = BillRecord::new("ILL", "JIO", Decimal::new(paise, 2));
            store.add_record(r).unwrap();
        }
        for r in store.get_all() {
            assert_eq!(r.amount_with_tax, with_tax(r.amount_without_tax));
            assert_eq!(r.amount_with_tax.scale(), 2);
        }
    }

    #[test]
    fn test_failed_save_leaves_state_unchanged() {
        let (storage, store) = store();
        store.add_record(draft("A")).unwrap();
        store.add_record(draft("B")).unwrap();
        storage.fail_saves(true);
        assert!(store.add_record(draft("C")).is_err());
        assert!(store.update_record(1, draft("Z")).is_err());
        assert!(store.delete_record(1).is_err());
        assert_eq!(
            invoices(&store.get_all()),
            vec![(1, "A".to_string()), (2, "B".to_string())]
        );
        storage.fail_saves(false);
        assert_eq!(store.add_record(draft("C")).unwrap(), 3);
    }

    #[test]
    fn test_reopen_reads_saved_state() {
        let (storage, store) = store();
        store.add_record(draft("A")).unwrap();
        store.add_record(draft("B")).unwrap();
        drop(store);
        let saves = storage.save_count();
        let reopened = BillStore::open(storage.clone()).unwrap();
        assert_eq!(invoices(&reopened.get_all()).len(), 2);
        assert_eq!(storage.save_count(), saves);
    }

    #[test]
    fn test_repair_fills_year_and_quarter() {
        let mut legacy = draft("OLD-1");
        legacy.serial_no = 1;
        legacy.year = None;
        legacy.quarter_number = None;
        legacy.quarter_label = String::new();
        legacy.from_date = NaiveDate::from_ymd_opt(2023, 10, 1);
        legacy.billing_period_label = "Quarter 2 (Apr-Sep)".to_string();
        let mut unlabeled = draft("OLD-2");
        unlabeled.serial_no = 2;
        unlabeled.quarter_number = None;
        unlabeled.billing_period_label = "Annual".to_string();

        let storage = MemoryStorage::with_bills(vec![legacy, unlabeled]);
        let store = BillStore::open(storage.clone()).unwrap();
        let first = store.get_by_serial(1).unwrap();
        assert_eq!(first.year, Some(2023));
        assert_eq!(first.quarter_number, Some(2));
        assert_eq!(first.quarter_label, "Q2-2023");
        assert_eq!(store.get_by_serial(2).unwrap().quarter_number, Some(1));
        assert_eq!(storage.save_count(), 1);
        assert_eq!(storage.stored_bills().unwrap(), store.get_all());
    }

    #[test]
    fn test_repair_restores_dense_serials() {
        let mut a = draft("A");
        a.serial_no = 5;
        let mut b = draft("B");
        b.serial_no = 2;
        let mut c = draft("C");
        c.serial_no = 9;
        let storage = MemoryStorage::with_bills(vec![a, b, c]);
        let store = BillStore::open(storage).unwrap();
        assert_eq!(
            invoices(&store.get_all()),
            vec![(1, "B".to_string()), (2, "A".to_string()), (3, "C".to_string())]
        );
        assert_eq!(store.add_record(draft("D")).unwrap(), 4);
    }

    #[test]
    fn test_clean_state_is_not_rewritten() {
        let mut a = draft("A");
        a.serial_no = 1;
        let storage = MemoryStorage::with_bills(vec![a]);
        BillStore::open(storage.clone()).unwrap();
        assert_eq!(storage.save_count(), 0);
    }

    #[test]
    fn test_query_through_store() {
        let (_storage, store) = store();
        let mut bsnl = draft("B-1");
        bsnl.network = "BSNL".to_string();
        bsnl.year = Some(2024);
        store.add_record(bsnl).unwrap();
        store.add_record(draft("P-1")).unwrap();
        let filter = BillFilter {
            year: Some(2024),
            network: Some("BSNL".to_string()),
            ..Default::default()
        };
        assert_eq!(invoices(&store.query(&filter, SortOrder::Serial)), vec![(1, "B-1".to_string())]);
    }

    #[test]
    fn test_available_values_and_summary() {
        let (_storage, store) = store();
        let mut a = draft("A");
        a.commit_item = "C_COMMEXP".to_string();
        store.add_record(a).unwrap();
        let mut b = draft("B");
        b.network = "BSNL".to_string();
        b.year = Some(2024);
        b.quarter_label = String::new();
        store.add_record(b).unwrap();

        assert_eq!(store.available_years(), vec![2024, 2025]);
        assert_eq!(store.available_networks(), vec!["BSNL", "P2P"]);
        assert_eq!(store.available_vendors(), vec!["TATA COMMUNICATIONS LTD"]);
        assert_eq!(store.available_commit_items(), vec!["C_COMMEXP"]);

        let summary = store.summary();
        assert_eq!(summary.total_bills, 2);
        assert_eq!(summary.total_amount, Decimal::new(236000, 2));
        assert_eq!(summary.by_network.get("BSNL"), Some(&1));
        assert_eq!(summary.by_quarter.get("Unknown"), Some(&1));
        assert_eq!(summary.by_quarter.get("Q1-2025"), Some(&1));
    }
}
