//! In-process [`KvStore`] for tests, enabled by the `test-utils` feature.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{KvError, KvOp};
use crate::kv::{BulkEntry, KvStore};

/// A call received by [`MemoryKv`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvCall {
    List(Option<String>),
    Get(String),
    Put(String),
    PutBulk(Vec<String>),
    DeleteBulk(Vec<String>),
}

impl KvCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            KvCall::Put(_) | KvCall::PutBulk(_) | KvCall::DeleteBulk(_)
        )
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    values: BTreeMap<String, Vec<u8>>,
    calls: Vec<KvCall>,
    fail_on: Option<(KvOp, usize)>,
}

impl MemoryState {
    /// Record `call` and decide whether it should fail.
    fn record(&mut self, op: KvOp, call: KvCall) -> Result<(), KvError> {
        self.calls.push(call);
        let Some((fail_op, nth)) = self.fail_on else {
            return Ok(());
        };
        if fail_op != op {
            return Ok(());
        }
        let seen = self.calls.iter().filter(|c| op_of(c) == op).count();
        if seen == nth {
            return Err(KvError::Status {
                op,
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn op_of(call: &KvCall) -> KvOp {
    match call {
        KvCall::List(_) => KvOp::List,
        KvCall::Get(_) => KvOp::Get,
        KvCall::Put(_) => KvOp::Put,
        KvCall::PutBulk(_) => KvOp::PutBulk,
        KvCall::DeleteBulk(_) => KvOp::DeleteBulk,
    }
}

/// In-process namespace that records every call it receives.
///
/// Can be told to fail the n-th call of an operation, which makes partial
/// runs reproducible.
#[derive(Debug, Default)]
pub struct MemoryKv {
    state: Mutex<MemoryState>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.lock().values.insert(key.into(), value.into());
        self
    }

    /// Fail the `nth` (1-based) call of `op` with an HTTP 500.
    pub fn fail_on(self, op: KvOp, nth: usize) -> Self {
        self.lock().fail_on = Some((op, nth));
        self
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().values.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().values.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<KvCall> {
        self.lock().calls.clone()
    }

    pub fn write_calls(&self) -> Vec<KvCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KvStore for MemoryKv {
    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, KvError> {
        let mut state = self.lock();
        state.record(KvOp::List, KvCall::List(prefix.map(str::to_owned)))?;
        Ok(state
            .values
            .keys()
            .filter(|k| prefix.map_or(true, |p| k.starts_with(p)))
            .cloned()
            .collect())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut state = self.lock();
        state.record(KvOp::Get, KvCall::Get(key.to_owned()))?;
        Ok(state.values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let mut state = self.lock();
        state.record(KvOp::Put, KvCall::Put(key.to_owned()))?;
        state.values.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn put_bulk(&self, entries: &[BulkEntry]) -> Result<(), KvError> {
        let mut state = self.lock();
        let keys = entries.iter().map(|e| e.key.clone()).collect();
        state.record(KvOp::PutBulk, KvCall::PutBulk(keys))?;

        // Decode everything first so a bad entry leaves the namespace untouched.
        let mut decoded = Vec::with_capacity(entries.len());
        for entry in entries {
            let bytes = if entry.base64 {
                STANDARD
                    .decode(&entry.value)
                    .map_err(|e| KvError::Rejected {
                        op: KvOp::PutBulk,
                        message: format!("{}: invalid base64: {e}", entry.key),
                    })?
            } else {
                entry.value.clone().into_bytes()
            };
            decoded.push((entry.key.clone(), bytes));
        }
        state.values.extend(decoded);
        Ok(())
    }

    fn delete_bulk(&self, keys: &[String]) -> Result<(), KvError> {
        let mut state = self.lock();
        state.record(KvOp::DeleteBulk, KvCall::DeleteBulk(keys.to_vec()))?;
        for key in keys {
            state.values.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_key_is_none() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("hashes").unwrap(), None);
        assert_eq!(kv.calls(), vec![KvCall::Get("hashes".into())]);
    }

    #[test]
    fn put_bulk_decodes_base64_values() {
        let kv = MemoryKv::new();
        kv.put_bulk(&[BulkEntry {
            key: "a.txt".into(),
            value: STANDARD.encode("hello"),
            base64: true,
        }])
        .unwrap();
        assert_eq!(kv.value("a.txt"), Some(b"hello".to_vec()));
    }

    #[test]
    fn put_bulk_with_bad_base64_writes_nothing() {
        let kv = MemoryKv::new();
        let err = kv
            .put_bulk(&[
                BulkEntry {
                    key: "ok".into(),
                    value: STANDARD.encode("x"),
                    base64: true,
                },
                BulkEntry {
                    key: "bad".into(),
                    value: "!!!".into(),
                    base64: true,
                },
            ])
            .unwrap_err();
        assert!(matches!(err, KvError::Rejected { .. }));
        assert!(kv.keys().is_empty());
    }

    #[test]
    fn injected_failure_hits_only_the_nth_call() {
        let kv = MemoryKv::new().fail_on(KvOp::Put, 2);
        kv.put("a", b"1").unwrap();
        let err = kv.put("b", b"2").unwrap_err();
        assert_eq!(err.op(), KvOp::Put);
        kv.put("c", b"3").unwrap();
        assert_eq!(kv.keys(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn list_filters_by_prefix_and_delete_removes() {
        let kv = MemoryKv::new()
            .with_value("site:a", "1")
            .with_value("site:b", "2")
            .with_value("other", "3");
        assert_eq!(kv.list(Some("site:")).unwrap(), vec!["site:a", "site:b"]);
        kv.delete_bulk(&["site:a".to_string()]).unwrap();
        assert_eq!(kv.list(None).unwrap(), vec!["other", "site:b"]);
        assert_eq!(kv.write_calls().len(), 1);
    }
}
