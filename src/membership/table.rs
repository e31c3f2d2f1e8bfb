//! The coordinator's membership table
//!
//! Every read-modify-write runs under the owning shard's write lock, so all
//! operations on one key are linearized while different keys proceed in
//! parallel. Nothing here performs I/O while a lock is held.
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::types::{MembershipRecord, MembershipRow, MembershipSnapshot, ProcessKey};
use crate::error::Result;

/// What an upsert did to the table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Verdict of a sweep visitor for one record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    Keep,
    Evict,
}

/// The only operations mutators get on the table
pub trait MembershipStore: Send + Sync {
    /// Atomically update the record for `key`, or insert the one built by `create`
    fn upsert<C, U>(&self, key: ProcessKey, create: C, update: U) -> Upsert
    where
        C: FnOnce() -> MembershipRecord,
        U: FnOnce(&mut MembershipRecord);

    /// Visit every record present when the call starts. Keys removed by
    /// someone else in the meantime are skipped. Records the visitor marks
    /// `Evict` are removed in the same atomic step and returned.
    ///
    /// The first visitor error stops the walk and is returned as is.
    fn for_each_snapshot<F>(&self, visit: F) -> Result<Vec<(ProcessKey, MembershipRecord)>>
    where
        F: FnMut(&ProcessKey, &mut MembershipRecord) -> Result<Visit>;

    fn remove(&self, key: &ProcessKey) -> Option<MembershipRecord>;

    /// ActiveProcessCount
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> MembershipSnapshot;
}

#[derive(Debug)]
struct Slot {
    inserted: u64,
    record: MembershipRecord,
}

/// Concurrent table keyed by [`ProcessKey`]
#[derive(Debug, Default)]
pub struct MembershipTable {
    records: DashMap<ProcessKey, Slot>,
    insertions: AtomicU64,
}

impl MembershipTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipStore for MembershipTable {
    fn upsert<C, U>(&self, key: ProcessKey, create: C, update: U) -> Upsert
    where
        C: FnOnce() -> MembershipRecord,
        U: FnOnce(&mut MembershipRecord),
    {
        match self.records.entry(key) {
            Entry::Occupied(mut occupied) => {
                update(&mut occupied.get_mut().record);
                Upsert::Updated
            }
            Entry::Vacant(vacant) => {
                let inserted = self.insertions.fetch_add(1, Ordering::Relaxed);
                vacant.insert(Slot {
                    inserted,
                    record: create(),
                });
                Upsert::Inserted
            }
        }
    }

    fn for_each_snapshot<F>(&self, mut visit: F) -> Result<Vec<(ProcessKey, MembershipRecord)>>
    where
        F: FnMut(&ProcessKey, &mut MembershipRecord) -> Result<Visit>,
    {
        // Collect first: iterating while removing would deadlock on the shard lock.
        let keys: Vec<ProcessKey> = self
            .records
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = Vec::new();
        for key in keys {
            let mut failure = None;
            let removed = self.records.remove_if_mut(&key, |key, slot| {
                match visit(key, &mut slot.record) {
                    Ok(Visit::Keep) => false,
                    Ok(Visit::Evict) => true,
                    Err(err) => {
                        failure = Some(err);
                        false
                    }
                }
            });
            if let Some(err) = failure {
                return Err(err);
            }
            if let Some((key, slot)) = removed {
                evicted.push((key, slot.record));
            }
        }
        Ok(evicted)
    }

    fn remove(&self, key: &ProcessKey) -> Option<MembershipRecord> {
        self.records.remove(key).map(|(_, slot)| slot.record)
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn snapshot(&self) -> MembershipSnapshot {
        let mut rows: Vec<(u64, MembershipRow)> = self
            .records
            .iter()
            .map(|entry| {
                let slot = entry.value();
                (
                    slot.inserted,
                    MembershipRow {
                        address: entry.key().address().to_string(),
                        process_id: entry.key().process_id(),
                        confidence: slot.record.confidence(),
                        last_heartbeat_at: slot.record.last_heartbeat_at(),
                    },
                )
            })
            .collect();
        rows.sort_by_key(|(inserted, _)| *inserted);

        let rows: Vec<MembershipRow> = rows.into_iter().map(|(_, row)| row).collect();
        MembershipSnapshot {
            active_process_count: rows.len(),
            rows,
        }
    }
}
