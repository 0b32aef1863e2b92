//! Shared test utilities for the accounts workspace
//!
//! - `TestDatabase`: PostgreSQL container with the account schema applied (feature: "postgres")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let email = builder.email("owner");
//!     let name = builder.full_name("owner");
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

/// Password that satisfies the default strength policy
pub const STRONG_PASSWORD: &str = "Abcdef12";

/// Builder for test data with deterministic randomization
///
/// Values derived from the same seed are identical across runs, and values
/// from different seeds do not collide, so tests sharing one database can
/// run in parallel.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_signup");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic account ID
    pub fn account_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Unique, already-normalized email for a role in the test
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let email = TestDataBuilder::new(7).email("admin");
    /// assert_eq!(email, "admin-7@example.com");
    /// ```
    pub fn email(&self, label: &str) -> String {
        format!("{}-{}@example.com", label.to_lowercase(), self.seed)
    }

    pub fn full_name(&self, label: &str) -> String {
        format!("Test {} {}", label, self.seed)
    }
}

/// Test assertion helpers
pub mod assertions {
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that a timestamp lies within the last minute
    pub fn assert_recent(timestamp: DateTime<Utc>, context: &str) {
        let age = Utc::now() - timestamp;
        assert!(
            age >= Duration::seconds(-1) && age < Duration::minutes(1),
            "{}: timestamp {} is not recent",
            context,
            timestamp
        );
    }
}
