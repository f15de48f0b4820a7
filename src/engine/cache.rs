// ==========================================
// 物流器具 KPI 引擎 - KPI 快照缓存
// ==========================================
// 职责: 按规范化过滤键缓存完整快照，固定 TTL 过期
// 约束:
// - 只缓存成功结果（不做负缓存）
// - 过期在读取时判定，未命中时统一清理过期条目
// - 覆写以最后写入者为准
// - 锁不跨 .await 持有
// ==========================================

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};

// ==========================================
// 时钟
// ==========================================

/// 时间来源（便于测试注入）
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟（测试用）
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ==========================================
// KpiCache
// ==========================================

struct CacheEntry<V> {
    value: Arc<V>,
    stored_at: DateTime<Utc>,
}

/// 快照缓存
///
/// 命中返回同一个 `Arc`，调用方之间共享同一份快照。
pub struct KpiCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> KpiCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(stored_at) < self.ttl
    }

    /// 读取未过期条目
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let now = self.clock.now();
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(key)
            .filter(|entry| self.is_fresh(entry.stored_at, now))
            .map(|entry| Arc::clone(&entry.value))
    }

    /// 写入（覆盖旧值）
    pub fn insert(&self, key: impl Into<String>, value: Arc<V>) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(key.into(), entry);
    }

    /// 命中直接返回；未命中/已过期时执行 `compute`，成功结果写入缓存
    ///
    /// 未命中时先清理全部过期条目。同一键的并发未命中可能各自计算，以最后写入者为准。
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(key, "kpi cache hit");
            return Ok(hit);
        }

        let purged = self.purge_expired();
        tracing::debug!(key, purged, "kpi cache miss");
        let value = Arc::new(compute().await?);
        self.insert(key, Arc::clone(&value));
        Ok(value)
    }

    pub fn invalidate_all(&self) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
    }

    /// 条目数（含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清理过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        entries.retain(|_, entry| now.signed_duration_since(entry.stored_at) < self.ttl);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 17, 8, 0, 0).unwrap()
    }

    fn cache_with_clock() -> (KpiCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = KpiCache::new(Duration::seconds(300), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_命中返回同一引用() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_try_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("v".to_string())
            })
            .await
            .unwrap();
        let second = cache
            .get_or_try_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("other".to_string())
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_过期后重新计算() {
        let (cache, clock) = cache_with_clock();
        cache.insert("k", Arc::new("old".to_string()));

        clock.advance(Duration::seconds(299));
        assert_eq!(cache.get("k").as_deref(), Some(&"old".to_string()));

        clock.advance(Duration::seconds(1));
        assert!(cache.get("k").is_none());

        let fresh = cache
            .get_or_try_compute("k", || async { Ok::<_, String>("new".to_string()) })
            .await
            .unwrap();
        assert_eq!(fresh.as_str(), "new");
    }

    #[tokio::test]
    async fn test_失败结果不缓存() {
        let (cache, _clock) = cache_with_clock();

        let err = cache
            .get_or_try_compute("k", || async { Err::<String, _>("boom".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_with_clock();
        cache.insert("a", Arc::new("1".to_string()));
        clock.advance(Duration::seconds(200));
        cache.insert("b", Arc::new("2".to_string()));
        clock.advance(Duration::seconds(150));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_未命中时清理过期条目() {
        let (cache, clock) = cache_with_clock();
        for i in 0..100 {
            cache.insert(format!("plant-{}", i), Arc::new(i.to_string()));
        }
        assert_eq!(cache.len(), 100);

        clock.advance(Duration::seconds(301));
        cache
            .get_or_try_compute("plant-new", || async { Ok::<_, String>("v".to_string()) })
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.get("plant-new").is_some());

        // 计算失败时同样清理
        cache.insert("stale", Arc::new("x".to_string()));
        clock.advance(Duration::seconds(301));
        let _ = cache
            .get_or_try_compute("broken", || async { Err::<String, _>("boom".to_string()) })
            .await;
        assert!(cache.is_empty());
    }
}
