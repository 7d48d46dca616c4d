use anyhow::Context;
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::domain::{Category, Cents, DisplayMode, Expense, ExpenseId, NewExpense, MAX_AMOUNT};
use crate::storage::{SlotStore, StorageError};

use super::{reporting, AppError, Summary};

/// Slot key holding the serialized expense collection.
pub const EXPENSES_KEY: &str = "expenses";

/// Owner of the expense collection.
///
/// Every mutation is mirrored to the `expenses` slot by overwriting it with
/// the whole collection. The in-memory state only changes once that write
/// has succeeded, so a rejected write leaves memory and storage in agreement.
pub struct ExpenseStore<S: SlotStore> {
    slots: S,
    expenses: Vec<Expense>,
    display_mode: DisplayMode,
}

impl<S: SlotStore> ExpenseStore<S> {
    /// Load the persisted collection once.
    ///
    /// A missing slot starts an empty collection, and so does one that cannot
    /// be decoded. Failing to reach the storage at all is an error.
    pub async fn open(slots: S) -> Result<Self, AppError> {
        let expenses = match slots.read(EXPENSES_KEY).await? {
            None => {
                debug!("no persisted expenses, starting empty");
                Vec::new()
            }
            Some(raw) => match decode(&raw) {
                Ok(expenses) => {
                    info!(count = expenses.len(), "loaded persisted expenses");
                    expenses
                }
                Err(e) => {
                    warn!(error = %e, "persisted expenses are unreadable, starting empty");
                    Vec::new()
                }
            },
        };

        Ok(Self {
            slots,
            expenses,
            display_mode: DisplayMode::default(),
        })
    }

    /// Append a new expense under a freshly assigned id.
    pub async fn add(&mut self, expense: NewExpense) -> Result<Expense, AppError> {
        let id = self.next_id(Utc::now().timestamp_millis());
        let record = Expense::from_new(id, expense);

        let mut next = self.expenses.clone();
        next.push(record.clone());
        self.commit(next).await?;

        debug!(%id, amount = record.amount, category = record.category_label(), "expense added");
        Ok(record)
    }

    /// Replace the record with the same id, keeping its position.
    /// Returns `false` without touching anything when no record matches.
    pub async fn update(&mut self, expense: Expense) -> Result<bool, AppError> {
        let Some(index) = self.position(expense.id) else {
            debug!(id = %expense.id, "update skipped, no such expense");
            return Ok(false);
        };

        let id = expense.id;
        let mut next = self.expenses.clone();
        next[index] = expense;
        self.commit(next).await?;

        debug!(%id, "expense updated");
        Ok(true)
    }

    /// Drop the record with the given id.
    /// Returns `false` without touching anything when no record matches.
    pub async fn remove(&mut self, id: ExpenseId) -> Result<bool, AppError> {
        if self.position(id).is_none() {
            debug!(%id, "remove skipped, no such expense");
            return Ok(false);
        }

        let next: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| e.id != id)
            .cloned()
            .collect();
        self.commit(next).await?;

        debug!(%id, "expense removed");
        Ok(true)
    }

    // ========================
    // Read-only views
    // ========================

    /// All expenses in insertion order.
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn get(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    /// The fixed category enumeration offered to input forms.
    pub fn categories(&self) -> &'static [Category] {
        &Category::ALL
    }

    pub fn total(&self) -> Cents {
        reporting::total(&self.expenses)
    }

    pub fn totals_by_category(&self) -> Vec<(&'static str, Cents)> {
        reporting::totals_by_category(&self.expenses)
    }

    pub fn summary(&self) -> Summary {
        reporting::summarize(&self.expenses)
    }

    /// The last `n` expenses added, oldest first.
    pub fn recent(&self, n: usize) -> &[Expense] {
        let start = self.expenses.len().saturating_sub(n);
        &self.expenses[start..]
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn toggle_display_mode(&mut self) -> DisplayMode {
        self.display_mode = self.display_mode.toggled();
        self.display_mode
    }

    /// The storage this store writes through.
    pub fn slots(&self) -> &S {
        &self.slots
    }

    // ========================
    // Internals
    // ========================

    fn position(&self, id: ExpenseId) -> Option<usize> {
        self.expenses.iter().position(|e| e.id == id)
    }

    /// Timestamp-derived id, strictly above every id in the collection.
    fn next_id(&self, now_millis: i64) -> ExpenseId {
        let floor = self
            .expenses
            .iter()
            .map(|e| e.id.0)
            .max()
            .map_or(i64::MIN, |max| max.saturating_add(1));
        ExpenseId(now_millis.max(floor))
    }

    async fn commit(&mut self, next: Vec<Expense>) -> Result<(), AppError> {
        let raw = serde_json::to_string(&next).map_err(StorageError::from)?;
        if let Err(e) = self.slots.write(EXPENSES_KEY, &raw).await {
            warn!(error = %e, "failed to persist expenses, change discarded");
            return Err(e.into());
        }
        self.expenses = next;
        Ok(())
    }
}

/// Decode a persisted collection.
///
/// Only a slot that is not a JSON array is an error. Records that fail to
/// decode or break an invariant (duplicate id, amount outside
/// `1..=MAX_AMOUNT`) are skipped with a warning; the rest are kept.
fn decode(raw: &str) -> anyhow::Result<Vec<Expense>> {
    let records: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("Invalid expense collection")?;

    let mut seen = HashSet::with_capacity(records.len());
    let mut expenses = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let expense: Expense = match serde_json::from_value(record) {
            Ok(expense) => expense,
            Err(e) => {
                warn!(index, error = %e, "skipping unreadable stored expense");
                continue;
            }
        };
        if expense.amount <= 0 || expense.amount > MAX_AMOUNT {
            warn!(index, id = %expense.id, amount = expense.amount, "skipping stored expense with out-of-range amount");
            continue;
        }
        if !seen.insert(expense.id) {
            warn!(index, id = %expense.id, "skipping stored expense with duplicate id");
            continue;
        }
        expenses.push(expense);
    }
    Ok(expenses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySlots;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn food(amount: Cents) -> NewExpense {
        NewExpense::new(amount, Category::Food, date("2024-01-01"))
    }

    #[tokio::test]
    async fn test_open_empty() {
        let store = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.total(), 0);
        assert_eq!(store.display_mode(), DisplayMode::Light);
    }

    #[tokio::test]
    async fn test_open_corrupt_slot_starts_empty() {
        for raw in ["not json", r#"{"id":1}"#, r#"[{"id":1"#] {
            let slots = MemorySlots::new().with_slot(EXPENSES_KEY, raw);
            let store = ExpenseStore::open(slots).await.unwrap();
            assert!(store.is_empty(), "expected empty store for {raw}");
        }
    }

    #[tokio::test]
    async fn test_open_skips_bad_records_and_keeps_good_ones() {
        let raw = r#"[
            {"id":1,"amount":"50","category":"Food","date":"2024-01-01"},
            {"id":2,"amount":"30","category":"Rent","date":"2024-01-02"},
            {"id":3,"amount":"0","category":"Other","date":"2024-01-03"},
            {"id":4,"amount":"-5","category":"Food","date":"2024-01-04"},
            {"id":5,"amount":0.001,"category":"Food","date":"2024-01-05"},
            {"id":1,"amount":"6","category":"Food","date":"2024-01-06"},
            {"id":6,"amount":"7","category":"Food","date":""},
            {"id":7,"amount":"8","category":"Food","date":"01/02/2024"},
            {"id":8,"amount":"99999999999","category":"Food","date":"2024-01-08"},
            "garbage",
            {"id":9,"amount":"12","category":"Groceries","date":"2024-01-09"}
        ]"#;
        let slots = MemorySlots::new().with_slot(EXPENSES_KEY, raw);
        let mut store = ExpenseStore::open(slots).await.unwrap();

        let ids: Vec<i64> = store.expenses().iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 2, 9]);
        assert_eq!(store.expenses()[0].amount, 5000);
        assert_eq!(store.total(), 9200);

        // The next write keeps the surviving records
        store.add(food(100)).await.unwrap();
        let persisted: Vec<Expense> =
            serde_json::from_str(&store.slots().get(EXPENSES_KEY).unwrap()).unwrap();
        let ids: Vec<i64> = persisted.iter().map(|e| e.id.0).collect();
        assert_eq!(&ids[..3], &[1, 2, 9]);
        assert_eq!(persisted.len(), 4);
    }

    #[tokio::test]
    async fn test_add_persists_whole_collection() {
        let mut store = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        let first = store.add(food(5000)).await.unwrap();
        let second = store.add(food(3000)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_ne!(first.id, second.id);
        assert_eq!(store.get(second.id), Some(&second));

        let raw = store.slots().get(EXPENSES_KEY).unwrap();
        let persisted: Vec<Expense> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, store.expenses());
    }

    #[tokio::test]
    async fn test_next_id_is_monotonic() {
        let slots = MemorySlots::new().with_slot(
            EXPENSES_KEY,
            r#"[{"id":5000,"amount":"1","category":"Food","date":"2024-01-01"}]"#,
        );
        let store = ExpenseStore::open(slots).await.unwrap();
        // Clock behind the newest id
        assert_eq!(store.next_id(10), ExpenseId(5001));
        // Clock ahead
        assert_eq!(store.next_id(9000), ExpenseId(9000));

        let empty = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        assert_eq!(empty.next_id(42), ExpenseId(42));
    }

    #[tokio::test]
    async fn test_update_and_remove_missing_are_noops() {
        let mut store = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        let kept = store.add(food(100)).await.unwrap();
        let before = store.slots().get(EXPENSES_KEY);

        let mut ghost = kept.clone();
        ghost.id = ExpenseId(kept.id.0 + 1);
        assert!(!store.update(ghost).await.unwrap());
        assert!(!store.remove(ExpenseId(-1)).await.unwrap());

        assert_eq!(store.expenses(), &[kept]);
        assert_eq!(store.slots().get(EXPENSES_KEY), before);
    }

    #[tokio::test]
    async fn test_update_keeps_position() {
        let mut store = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        let a = store.add(food(100)).await.unwrap();
        let b = store.add(food(200)).await.unwrap();
        let c = store.add(food(300)).await.unwrap();

        let mut changed = b.clone();
        changed.amount = 250;
        changed.category = Some(Category::Entertainment);
        assert!(store.update(changed.clone()).await.unwrap());

        assert_eq!(store.expenses(), &[a, changed, c]);
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_recoverable() {
        let slots = MemorySlots::new().with_quota(120);
        let mut store = ExpenseStore::open(slots).await.unwrap();
        let first = store.add(food(100)).await.unwrap();

        let err = store.add(food(200)).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(matches!(
            err,
            AppError::Storage(StorageError::QuotaExceeded { .. })
        ));

        // Nothing half-applied: memory and storage still hold one record
        assert_eq!(store.expenses(), &[first.clone()]);
        let persisted: Vec<Expense> =
            serde_json::from_str(&store.slots().get(EXPENSES_KEY).unwrap()).unwrap();
        assert_eq!(persisted, vec![first.clone()]);

        // Removing still works and frees space
        assert!(store.remove(first.id).await.unwrap());
        assert!(store.add(food(200)).await.is_ok());
    }

    #[tokio::test]
    async fn test_recent_returns_tail_in_order() {
        let mut store = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        let mut ids = Vec::new();
        for amount in 1..=7 {
            ids.push(store.add(food(amount * 100)).await.unwrap().id);
        }

        let recent: Vec<ExpenseId> = store.recent(5).iter().map(|e| e.id).collect();
        assert_eq!(recent, ids[2..].to_vec());
        assert_eq!(store.recent(0).len(), 0);
        assert_eq!(store.recent(100).len(), 7);
    }

    #[tokio::test]
    async fn test_toggle_display_mode_does_not_touch_data() {
        let mut store = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        assert_eq!(store.toggle_display_mode(), DisplayMode::Dark);
        assert_eq!(store.toggle_display_mode(), DisplayMode::Light);
        assert!(store.slots().get(EXPENSES_KEY).is_none());
    }

    #[tokio::test]
    async fn test_categories_are_fixed() {
        let store = ExpenseStore::open(MemorySlots::new()).await.unwrap();
        let names: Vec<&str> = store.categories().iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            ["Food", "Transportation", "Entertainment", "Rent", "Other"]
        );
    }
}
