//! MemoryEvaluator (spec §3, §5): per-paused-state cache of linear-memory
//! reads, coalescing concurrent requests for the same address so at most
//! one CDP read is ever in flight per address.

use crate::debugger::error::Result;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The single CDP operation this evaluator needs: read `byte_size` bytes
/// of the debuggee's linear memory starting at `address`.
#[async_trait(?Send)]
pub trait MemoryReader {
    async fn read_memory(&self, address: u64, byte_size: u64) -> Result<Vec<u8>>;
}

enum Slot {
    Ready(Rc<Vec<u8>>),
    /// Another caller's read for this address is in flight; waiters poll
    /// the cache again once it resolves via `notify`.
    Pending,
}

/// Lives exactly as long as one Paused state; dropped on resume (spec
/// §3, "discarded on resume").
#[derive(Default)]
pub struct MemoryEvaluator {
    cache: RefCell<HashMap<u64, Slot>>,
    notify: RefCell<HashMap<u64, Vec<tokio::sync::oneshot::Sender<()>>>>,
}

impl MemoryEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `byte_size` bytes at `address`, served from cache if
    /// already read, coalesced with an in-flight read for the same
    /// address if one exists, or issued fresh otherwise.
    pub async fn read(
        &self,
        reader: &impl MemoryReader,
        address: u64,
        byte_size: u64,
    ) -> Result<Rc<Vec<u8>>> {
        loop {
            let wait = {
                let mut cache = self.cache.borrow_mut();
                match cache.get(&address) {
                    Some(Slot::Ready(bytes)) => return Ok(bytes.clone()),
                    Some(Slot::Pending) => {
                        let (tx, rx) = tokio::sync::oneshot::channel();
                        self.notify.borrow_mut().entry(address).or_default().push(tx);
                        Some(rx)
                    }
                    None => {
                        cache.insert(address, Slot::Pending);
                        None
                    }
                }
            };

            let Some(rx) = wait else {
                // We are the one responsible for the read.
                let bytes = reader.read_memory(address, byte_size).await?;
                let bytes = Rc::new(bytes);
                self.cache.borrow_mut().insert(address, Slot::Ready(bytes.clone()));
                for tx in self.notify.borrow_mut().remove(&address).unwrap_or_default() {
                    let _ = tx.send(());
                }
                return Ok(bytes);
            };

            let _ = rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingReader {
        calls: Cell<u32>,
    }

    #[async_trait(?Send)]
    impl MemoryReader for CountingReader {
        async fn read_memory(&self, _address: u64, byte_size: u64) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![0u8; byte_size as usize])
        }
    }

    #[tokio::test]
    async fn repeated_reads_of_same_address_hit_cache() {
        let reader = CountingReader { calls: Cell::new(0) };
        let eval = MemoryEvaluator::new();

        eval.read(&reader, 0x100, 4).await.unwrap();
        eval.read(&reader, 0x100, 4).await.unwrap();
        eval.read(&reader, 0x200, 4).await.unwrap();

        assert_eq!(reader.calls.get(), 2);
    }
}
