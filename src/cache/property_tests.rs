//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store and facade against a plain HashMap model.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::testing::FlakyBackend;
use crate::cache::{Cache, EntityTtls, MemoryStore};

// == Test Configuration ==
const TEST_TTL: u64 = 300;

// == Strategies ==
/// Generates namespaced keys from a small pool so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("product:"), Just("cart:"), Just("session:"), Just("query:")],
        0u8..8,
    )
        .prop_map(|(prefix, id)| format!("{}{}", prefix, id))
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
    DeletePattern { prefix: &'static str },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => prop_oneof![Just("product:"), Just("cart:"), Just("session:")]
            .prop_map(|prefix| CacheOp::DeletePattern { prefix }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Applies `ops` to both the cache and a HashMap model, checking every read.
async fn run_against_model(cache: &Cache, ops: Vec<CacheOp>) -> Result<(u64, u64, u64), TestCaseError> {
    let mut model: HashMap<String, Vec<u8>> = HashMap::new();
    let (mut hits, mut misses, mut sets) = (0u64, 0u64, 0u64);

    for op in ops {
        match op {
            CacheOp::Set { key, value } => {
                cache.set(&key, value.clone(), TEST_TTL).await;
                model.insert(key, value);
                sets += 1;
            }
            CacheOp::Get { key } => {
                let got = cache.get(&key).await;
                prop_assert_eq!(got.as_ref(), model.get(&key), "Read mismatch for {}", key);
                if got.is_some() {
                    hits += 1;
                } else {
                    misses += 1;
                }
            }
            CacheOp::Delete { key } => {
                let removed = cache.delete(&key).await;
                prop_assert_eq!(removed, model.remove(&key).is_some());
            }
            CacheOp::DeletePattern { prefix } => {
                let expected = model.keys().filter(|k| k.starts_with(prefix)).count() as u64;
                model.retain(|k, _| !k.starts_with(prefix));
                let removed = cache.delete_pattern(&format!("{}*", prefix)).await;
                prop_assert_eq!(removed, expected);
            }
        }
    }

    Ok((hits, misses, sets))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // **Property: Statistics Accuracy**
    // For any sequence of operations, the reported hits, misses and sets equal
    // the counts observed by the caller.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        runtime().block_on(async {
            let cache = Cache::memory_only(EntityTtls::default());
            let (hits, misses, sets) = run_against_model(&cache, ops).await?;

            let stats = cache.get_cache_stats().await;
            prop_assert_eq!(stats.hits, hits, "Hits mismatch");
            prop_assert_eq!(stats.misses, misses, "Misses mismatch");
            prop_assert_eq!(stats.sets, sets, "Sets mismatch");
            Ok(())
        })?;
    }

    // **Property: Failover Transparency**
    // With the distributed tier always failing, the facade behaves exactly
    // like a map and never returns an error.
    #[test]
    fn prop_failover_transparency(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        runtime().block_on(async {
            let backend = Arc::new(FlakyBackend::new(false));
            let cache = Cache::with_backend(backend, EntityTtls::default());

            run_against_model(&cache, ops).await?;
            prop_assert!(!cache.controller().is_connected());
            Ok(())
        })?;
    }

    // **Property: Healthy Backend Equivalence**
    // A healthy distributed tier serves the same answers as the memory store.
    #[test]
    fn prop_connected_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        runtime().block_on(async {
            let backend = Arc::new(FlakyBackend::new(true));
            let cache = Cache::with_backend(backend, EntityTtls::default());
            cache.initialize().await;

            run_against_model(&cache, ops).await?;
            prop_assert!(cache.controller().is_connected());
            prop_assert!(cache.memory().is_empty().await);
            Ok(())
        })?;
    }

    // **Property: Pattern Invalidation Precision**
    // Deleting `prefix*` removes exactly the keys with that prefix.
    #[test]
    fn prop_pattern_invalidation_precision(
        keys in prop::collection::hash_set(key_strategy(), 1..20),
    ) {
        runtime().block_on(async {
            let store = MemoryStore::new();
            for key in &keys {
                store.set(key, key.as_bytes().to_vec(), TEST_TTL).await;
            }

            let expected = keys.iter().filter(|k| k.starts_with("product:")).count();
            prop_assert_eq!(store.delete_pattern("product:*").await, expected);

            for key in &keys {
                let present = store.get(key).await.is_some();
                prop_assert_eq!(present, !key.starts_with("product:"), "Wrong fate for {}", key);
            }
            Ok(())
        })?;
    }

    // **Property: Overwrite Semantics**
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy(),
    ) {
        runtime().block_on(async {
            let store = MemoryStore::new();
            store.set(&key, value1, TEST_TTL).await;
            store.set(&key, value2.clone(), TEST_TTL).await;

            prop_assert_eq!(store.get(&key).await, Some(value2));
            prop_assert_eq!(store.len().await, 1);
            Ok(())
        })?;
    }
}

// == Property Test for Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // **Property: Error Response Format**
    // Every error renders as JSON with a string "error" field.
    #[test]
    fn prop_error_response_format(error_msg in "[a-zA-Z0-9 _-]{1,100}") {
        use crate::error::CacheError;
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        let error_variants = vec![
            CacheError::Serialization(error_msg.clone()),
            CacheError::NotFound(error_msg.clone()),
            CacheError::InvalidRequest(error_msg.clone()),
        ];

        let rt = runtime();
        for error in error_variants {
            let response = error.into_response();

            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(
                content_type.map(|ct| ct.contains("application/json")).unwrap_or(false),
                "Response should have JSON content-type"
            );

            let bytes = rt.block_on(async { to_bytes(response.into_body(), usize::MAX).await.unwrap() });
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .expect("Response body should be valid JSON");

            prop_assert_eq!(json["error"].as_str(), Some(error_msg.as_str()));
        }
    }
}
