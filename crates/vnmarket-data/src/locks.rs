//! (종목, 해상도) 키별 쓰기 직렬화.
//!
//! 같은 키에 대한 쓰기는 순서대로, 다른 키는 병렬로 진행됩니다.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use vnmarket_core::Resolution;

type LockMap = Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>;

/// 키별 Lock 맵.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: LockMap,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock 키 (`SYMBOL:1D`).
    pub fn key(symbol: &str, resolution: Resolution) -> String {
        format!("{}:{}", symbol, resolution.as_str())
    }

    /// 키에 대한 Lock을 획득합니다. guard가 drop될 때 해제됩니다.
    pub async fn acquire(&self, symbol: &str, resolution: Resolution) -> OwnedMutexGuard<()> {
        let lock = self.get_or_create_lock(&Self::key(symbol, resolution)).await;
        lock.lock_owned().await
    }

    async fn get_or_create_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let locks = self.locks.read().await;
        if let Some(lock) = locks.get(key) {
            return lock.clone();
        }
        drop(locks);

        let mut locks = self.locks.write().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = KeyedLocks::new();
        let guard = locks.acquire("VNM", Resolution::Daily).await;

        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.acquire("VNM", Resolution::Daily).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("VNM", Resolution::Daily).await;
        let _b = locks.acquire("HPG", Resolution::Daily).await;
        let _c = locks.acquire("VNM", Resolution::Weekly).await;
        assert_ne!(
            KeyedLocks::key("VNM", Resolution::Daily),
            KeyedLocks::key("VNM", Resolution::Weekly)
        );
    }
}
