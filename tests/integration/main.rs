//! Integration tests for regioncache

mod backend_tests {
    use chrono::Duration;
    use regioncache::cache::{CacheBackend, Lookup, ManualClock, TtlBackend};
    use regioncache::BackendConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn ttl_scenario_with_simulated_time() {
        let clock = Arc::new(ManualClock::starting_now());
        let config = BackendConfig::new(100, Duration::seconds(5)).unwrap();
        let backend: TtlBackend<String> = TtlBackend::with_clock(config, clock.clone());

        backend.set("k", "v".to_string()).unwrap();
        assert_eq!(backend.get("k"), Lookup::Found("v".to_string()));

        clock.advance(Duration::seconds(6));
        assert_eq!(backend.get("k"), Lookup::NotFound);
    }

    #[test]
    fn restart_yields_identical_lookups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("cache.json");
        let clock = Arc::new(ManualClock::starting_now());
        let config = BackendConfig::new(100, Duration::seconds(60))
            .unwrap()
            .with_persistence(&path);

        let before: TtlBackend<serde_json::Value> =
            TtlBackend::with_clock(config.clone(), clock.clone());
        for i in 0..10 {
            before
                .set(&format!("key-{}", i), serde_json::json!({ "n": i }))
                .unwrap();
        }
        before.delete("key-3").unwrap();

        let after: TtlBackend<serde_json::Value> = TtlBackend::with_clock(config, clock);
        for i in 0..10 {
            let key = format!("key-{}", i);
            assert_eq!(before.get(&key), after.get(&key), "mismatch for {}", key);
        }
    }

    #[test]
    fn shared_across_threads_keeps_capacity() {
        let config = BackendConfig::new(50, Duration::seconds(60)).unwrap();
        let backend: Arc<TtlBackend<u64>> = Arc::new(TtlBackend::new(config));

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let backend = Arc::clone(&backend);
                std::thread::spawn(move || {
                    for i in 0..100u64 {
                        backend.set(&format!("{}-{}", t, i), i).unwrap();
                        backend.get(&format!("{}-{}", t, i / 2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(backend.len(), 50);
    }
}

mod memo_tests {
    use chrono::Duration;
    use regioncache::cache::{CacheBackend, CacheRegion, TtlBackend};
    use regioncache::{cache_async, fn_identity, BackendConfig, CallArgs, Memoized};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn concurrent_calls_execute_once() {
        let config = BackendConfig::new(100, Duration::seconds(60)).unwrap();
        let region: CacheRegion<Memoized<String, Infallible>> =
            CacheRegion::new("integration", TtlBackend::new(config));
        let keys = region.function_keys(fn_identity!(f));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let f = cache_async(move |x: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                Ok::<_, Infallible>(x)
            }
        });

        let args = CallArgs::positional(["a"]);
        let first = region.cached(&keys, &args, || f("a".to_string())).unwrap();
        let second = region.cached(&keys, &args, || f("a".to_string())).unwrap();

        let (a, b) = tokio::join!(first.get(), second.get());
        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolved_results_persist_as_plain_values() {
        let dir = TempDir::new().unwrap();
        let config = BackendConfig::new(100, Duration::seconds(60))
            .unwrap()
            .with_persistence(dir.path().join("cache.json"));

        let region: CacheRegion<Memoized<u64, String>> =
            CacheRegion::new("persisted", TtlBackend::new(config.clone()));
        let keys = region.function_keys(fn_identity!(double));

        let holder = region
            .memoized(&keys, &CallArgs::positional([21u64]), || async { Ok(42) })
            .unwrap();
        assert_eq!(holder.get().await, Ok(42));
        region.backend().flush().unwrap();

        let raw = std::fs::read_to_string(dir.path().join("cache.json")).unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot["entries"][0]["value"], 42);

        let reloaded: CacheRegion<Memoized<u64, String>> =
            CacheRegion::new("persisted", TtlBackend::new(config));
        let calls = AtomicUsize::new(0);
        let again = reloaded
            .memoized(&keys, &CallArgs::positional([21u64]), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(0) }
            })
            .unwrap();
        assert_eq!(again.get().await, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use chrono::Duration;
    use predicates::prelude::*;
    use regioncache::cache::{CacheBackend, TtlBackend};
    use regioncache::BackendConfig;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn regioncache(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("regioncache");
        cmd.arg("--config")
            .arg(dir.join("config.toml"))
            .env_remove("REGIONCACHE_CAPACITY")
            .env_remove("REGIONCACHE_TTL")
            .env_remove("REGIONCACHE_PERSISTENCE_PATH")
            .env_remove("REGIONCACHE_NAMESPACE");
        cmd
    }

    fn seeded_snapshot(dir: &Path) -> PathBuf {
        let path = dir.join("cache.json");
        let config = BackendConfig::new(100, Duration::seconds(300))
            .unwrap()
            .with_persistence(&path);
        let backend: TtlBackend<serde_json::Value> = TtlBackend::new(config);
        backend.set("users:get|1", serde_json::json!({"name": "ada"})).unwrap();
        backend.set("users:get|2", serde_json::json!({"name": "bob"})).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        regioncache(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("persisted cache snapshots"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        regioncache(dir.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("regioncache"));
    }

    #[test]
    fn inspect_plain_lists_keys() {
        let dir = TempDir::new().unwrap();
        let snapshot = seeded_snapshot(dir.path());

        regioncache(dir.path())
            .args(["inspect", "--format", "plain", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("users:get|1").and(predicate::str::contains("users:get|2")));
    }

    #[test]
    fn get_prints_value() {
        let dir = TempDir::new().unwrap();
        let snapshot = seeded_snapshot(dir.path());

        regioncache(dir.path())
            .args(["get", "users:get|2", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("bob"));
    }

    #[test]
    fn get_missing_key_fails() {
        let dir = TempDir::new().unwrap();
        let snapshot = seeded_snapshot(dir.path());

        regioncache(dir.path())
            .args(["get", "nope", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Key not found"));
    }

    #[test]
    fn delete_rewrites_snapshot() {
        let dir = TempDir::new().unwrap();
        let snapshot = seeded_snapshot(dir.path());

        regioncache(dir.path())
            .args(["delete", "users:get|1", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success();

        let content = std::fs::read_to_string(&snapshot).unwrap();
        assert!(!content.contains("users:get|1"));
        assert!(content.contains("users:get|2"));
    }

    #[test]
    fn delete_keeps_entries_beyond_configured_capacity() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[cache]\ncapacity = 2\n").unwrap();

        let snapshot = dir.path().join("large.json");
        let config = BackendConfig::new(100, Duration::seconds(300))
            .unwrap()
            .with_persistence(&snapshot);
        let backend: TtlBackend<serde_json::Value> = TtlBackend::new(config);
        for i in 0..5 {
            backend.set(&format!("app:item|{}", i), serde_json::json!(i)).unwrap();
        }

        regioncache(dir.path())
            .args(["delete", "app:item|0", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success();

        let content = std::fs::read_to_string(&snapshot).unwrap();
        assert!(!content.contains("app:item|0"));
        for i in 1..5 {
            assert!(content.contains(&format!("app:item|{}", i)));
        }
    }

    #[test]
    fn clear_requires_confirmation_without_terminal() {
        let dir = TempDir::new().unwrap();
        let snapshot = seeded_snapshot(dir.path());

        regioncache(dir.path())
            .args(["clear", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success()
            .stdout(predicate::str::contains("Aborted"));
        assert!(std::fs::read_to_string(&snapshot).unwrap().contains("users:get|1"));

        regioncache(dir.path())
            .args(["clear", "--yes", "--snapshot"])
            .arg(&snapshot)
            .assert()
            .success();
        assert!(!std::fs::read_to_string(&snapshot).unwrap().contains("users:get|1"));
    }

    #[test]
    fn missing_snapshot_reports_hint() {
        let dir = TempDir::new().unwrap();

        regioncache(dir.path())
            .args(["inspect", "--snapshot"])
            .arg(dir.path().join("absent.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache snapshot not found"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        regioncache(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        regioncache(dir.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }
}
