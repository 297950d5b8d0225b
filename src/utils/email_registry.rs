use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::TryStreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{info, warn};

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

const TAKEN_CAPACITY: u64 = 500_000;
const TAKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Answers "is this email free to register?" without a query in the common
/// cases. The cuckoo filter rules out emails nobody has; the cache remembers
/// emails recently confirmed taken. Everything else goes to `users`.
pub struct EmailRegistry {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, ()>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct WarmupStats {
    pub registered: usize,
    pub recent: usize,
}

impl Default for EmailRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailRegistry {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(TAKEN_CAPACITY)
                .time_to_live(TAKEN_TTL)
                .build(),
        }
    }

    /// Emails are compared trimmed and lowercased everywhere.
    #[inline]
    pub fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }

    // a poisoned lock answers "maybe" so the caller asks the database
    fn might_exist(&self, email: &str) -> bool {
        self.filter
            .read()
            .map(|filter| filter.contains(email))
            .unwrap_or(true)
    }

    fn add_all<'a>(&self, emails: impl IntoIterator<Item = &'a String>) {
        match self.filter.write() {
            Ok(mut filter) => emails.into_iter().for_each(|e| filter.add(e)),
            Err(_) => warn!("Email filter lock poisoned, skipping insert"),
        }
    }

    async fn mark_taken(&self, emails: &[String]) {
        futures::future::join_all(emails.iter().map(|e| self.taken.insert(e.clone(), ()))).await;
    }

    /// `true` when no user holds `email`. A failed lookup counts as taken.
    pub async fn is_available(&self, email: &str, pool: &MySqlPool) -> bool {
        let email = Self::normalize(email);

        if !self.might_exist(&email) {
            return true;
        }

        if self.taken.contains_key(&email) {
            return false;
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
        )
        .bind(&email)
        .fetch_one(pool)
        .await
        .unwrap_or(true);

        if exists {
            self.taken.insert(email, ()).await;
        }

        !exists
    }

    /// Records a freshly registered email.
    pub async fn record(&self, email: &str) {
        let email = Self::normalize(email);
        self.add_all([&email]);
        self.taken.insert(email, ()).await;
    }

    /// Loads every registered email into the filter, and the ones that logged
    /// in within `recent_days` into the taken cache, in one pass over `users`.
    pub async fn warmup(
        &self,
        pool: &MySqlPool,
        recent_days: u32,
        batch_size: usize,
    ) -> Result<WarmupStats> {
        let batch_size = batch_size.max(1);
        let mut rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT email,
                   CAST(COALESCE(last_login_at >= NOW() - INTERVAL ? DAY, 0) AS SIGNED)
            FROM users
            "#,
        )
        .bind(recent_days)
        .fetch(pool);

        let mut stats = WarmupStats::default();
        let mut all = Vec::with_capacity(batch_size);
        let mut recent = Vec::with_capacity(batch_size);

        while let Some((email, is_recent)) = rows
            .try_next()
            .await
            .context("email warmup row fetch failed")?
        {
            let email = Self::normalize(&email);
            if is_recent == 1 {
                recent.push(email.clone());
            }
            all.push(email);

            if all.len() == batch_size {
                self.flush(&mut all, &mut recent, &mut stats).await;
            }
        }
        self.flush(&mut all, &mut recent, &mut stats).await;

        info!(
            registered = stats.registered,
            recent = stats.recent,
            recent_days,
            "Email registry warmed up"
        );

        Ok(stats)
    }

    async fn flush(&self, all: &mut Vec<String>, recent: &mut Vec<String>, stats: &mut WarmupStats) {
        self.add_all(all.iter());
        self.mark_taken(recent).await;

        stats.registered += all.len();
        stats.recent += recent.len();
        all.clear();
        recent.clear();
    }
}
