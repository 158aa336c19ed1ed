//! Integration tests for precache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use precache::cache::{Cache, CacheStorage, DiskCacheStorage};
    use precache::http::Response;
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn precache() -> Command {
        cargo_bin_cmd!("precache")
    }

    /// Write a config whose storage lives in `dir` and whose origin refuses connections
    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        let content = format!(
            r#"
[cache]
name = "v2"
assets = ["/a.js"]

[network]
origin = "http://127.0.0.1:9"

[storage]
dir = {:?}
"#,
            dir.join("caches")
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        precache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline caching agent"));
    }

    #[test]
    fn version_displays() {
        precache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        precache()
            .args(["config", "path"])
            .arg("--config")
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        precache()
            .args(["config", "show"])
            .env("PRECACHE_CONFIG", &config)
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]").and(predicate::str::contains("\"v2\"")));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nname = \"\"\n").unwrap();
        precache()
            .args(["config", "show"])
            .env("PRECACHE_CONFIG", &path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn caches_empty() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        precache()
            .arg("caches")
            .env("PRECACHE_CONFIG", &config)
            .assert()
            .success()
            .stdout(predicate::str::contains("No caches found"));
    }

    #[test]
    fn install_fails_when_origin_unreachable() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        precache()
            .arg("install")
            .env("PRECACHE_CONFIG", &config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to precache /a.js"));
    }

    #[test]
    fn activate_refused_before_install() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        precache()
            .arg("activate")
            .env("PRECACHE_CONFIG", &config)
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("Cannot activate while worker is parsed")
                    .and(predicate::str::contains("precache install")),
            );
    }

    #[tokio::test]
    async fn activate_keeps_previous_cache_until_install() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let storage = DiskCacheStorage::new(temp.path().join("caches"));
        let old = storage.open("v1").await.unwrap();
        old.put("/a.js", Response::ok("/a.js", "a")).await.unwrap();

        precache()
            .arg("activate")
            .env("PRECACHE_CONFIG", &config)
            .assert()
            .failure();
        assert_eq!(storage.keys().await.unwrap(), vec!["v1".to_string()]);

        storage.open("v2").await.unwrap();
        precache()
            .arg("activate")
            .env("PRECACHE_CONFIG", &config)
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted stale cache"));
        assert_eq!(storage.keys().await.unwrap(), vec!["v2".to_string()]);
    }

    #[test]
    fn fetch_uncached_fails_when_origin_unreachable() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        precache()
            .args(["fetch", "/b.js"])
            .env("PRECACHE_CONFIG", &config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request for /b.js failed"));
    }
}

mod worker_tests {
    use precache::cache::{Cache, CacheStorage, DiskCacheStorage, MemoryCacheStorage};
    use precache::config::schema::{CacheConfig, WorkerConfig};
    use precache::http::{Request, Response};
    use precache::network::{Network, StaticNetwork};
    use precache::{OfflineWorker, WorkerHost, WorkerState};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn cache_config(name: &str, assets: &[&str]) -> CacheConfig {
        CacheConfig {
            name: name.to_string(),
            assets: assets.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn host(
        config: &CacheConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        skip_waiting: bool,
    ) -> WorkerHost<OfflineWorker> {
        let worker = OfflineWorker::new(config, storage, network.clone());
        let options = WorkerConfig {
            skip_waiting,
            claim_clients: true,
        };
        WorkerHost::new(worker, options, network)
    }

    #[tokio::test]
    async fn install_activate_fetch_scenario() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(
            StaticNetwork::new()
                .route("/a.js", "export const a = 1;")
                .route("/b.js", "export const b = 2;"),
        );

        // A previous deployment left "v1" behind
        let old = storage.open("v1").await.unwrap();
        old.put("/a.js", Response::ok("/a.js", "old")).await.unwrap();

        let config = cache_config("v2", &["/a.js"]);
        let host = host(&config, storage.clone(), network.clone(), false);

        assert_eq!(host.install().await.unwrap(), WorkerState::Installed);
        let current = storage.open("v2").await.unwrap();
        assert_eq!(current.keys().await.unwrap(), vec!["/a.js".to_string()]);

        assert_eq!(host.activate().await.unwrap(), WorkerState::Activated);
        assert!(!storage.has("v1").await.unwrap());
        assert!(storage.has("v2").await.unwrap());

        let calls_before = network.calls();
        let cached = host.fetch(Request::get("/a.js")).await.unwrap();
        assert_eq!(cached.body, b"export const a = 1;");
        assert_eq!(network.calls(), calls_before);

        let fresh = host.fetch(Request::get("/b.js")).await.unwrap();
        assert_eq!(fresh.body, b"export const b = 2;");
        assert_eq!(network.calls(), calls_before + 1);
        assert!(current.match_url("/b.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn every_asset_is_cached_after_install() {
        let assets = ["/index.html", "/app.js", "/app.css", "/images/rotate.gif"];
        let network = assets
            .iter()
            .fold(StaticNetwork::new(), |net, a| net.route(*a, format!("body of {a}")));
        let network = Arc::new(network);
        let storage = Arc::new(MemoryCacheStorage::new());

        let config = cache_config("pico8-game-cache-v2", &assets);
        let host = host(&config, storage.clone(), network, true);
        host.install().await.unwrap();

        let cache = storage.open("pico8-game-cache-v2").await.unwrap();
        for asset in assets {
            let hit = cache.match_url(asset).await.unwrap().unwrap();
            assert!(!hit.body.is_empty());
        }
    }

    #[tokio::test]
    async fn failed_install_keeps_previous_cache() {
        let storage = Arc::new(MemoryCacheStorage::new());
        storage.open("v1").await.unwrap();
        let network = Arc::new(StaticNetwork::new().route("/a.js", "a"));

        let config = cache_config("v2", &["/a.js", "/missing.js"]);
        let host = host(&config, storage.clone(), network, true);

        assert!(host.install().await.is_err());
        assert_eq!(host.state().await, WorkerState::Redundant);
        assert!(storage.has("v1").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fetches_during_install_do_not_break_it() {
        for _ in 0..20 {
            let temp = TempDir::new().unwrap();
            let storage = Arc::new(DiskCacheStorage::new(temp.path().join("caches")));
            let network = Arc::new(StaticNetwork::new().route("/a.js", "a").route("/b.js", "b"));
            let config = cache_config("v2", &["/a.js"]);
            let host = Arc::new(host(&config, storage.clone(), network, true));

            let install = tokio::spawn({
                let host = host.clone();
                async move { host.install().await }
            });
            let fetches: Vec<_> = (0..6)
                .map(|_| {
                    let host = host.clone();
                    tokio::spawn(async move { host.fetch(Request::get("/b.js")).await })
                })
                .collect();

            for fetch in fetches {
                assert_eq!(fetch.await.unwrap().unwrap().body, b"b");
            }
            assert_eq!(install.await.unwrap().unwrap(), WorkerState::Activated);

            let cache = storage.open("v2").await.unwrap();
            assert_eq!(cache.keys().await.unwrap(), vec!["/a.js".to_string()]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fetches_during_activate_are_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(DiskCacheStorage::new(temp.path().join("caches")));
        let old = storage.open("v1").await.unwrap();
        old.put("/a.js", Response::ok("/a.js", "old")).await.unwrap();

        let network = Arc::new(StaticNetwork::new().route("/a.js", "a"));
        let config = cache_config("v2", &["/a.js"]);
        let host = Arc::new(host(&config, storage.clone(), network.clone(), false));
        host.install().await.unwrap();

        let activate = tokio::spawn({
            let host = host.clone();
            async move { host.activate().await }
        });
        let fetches: Vec<_> = (0..6)
            .map(|_| {
                let host = host.clone();
                tokio::spawn(async move { host.fetch(Request::get("/a.js")).await })
            })
            .collect();

        for fetch in fetches {
            assert_eq!(fetch.await.unwrap().unwrap().body, b"a");
        }
        assert_eq!(activate.await.unwrap().unwrap(), WorkerState::Activated);

        // Only the install touched the network
        assert_eq!(network.requests().await, vec!["/a.js".to_string()]);
        assert_eq!(storage.keys().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn failed_install_writes_nothing_to_disk() {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(DiskCacheStorage::new(temp.path().join("caches")));
        let old = storage.open("v1").await.unwrap();
        old.put("/a.js", Response::ok("/a.js", "old")).await.unwrap();

        let network = Arc::new(StaticNetwork::new().route("/a.js", "a"));
        let config = cache_config("v2", &["/a.js", "/missing.js"]);
        let host = host(&config, storage.clone(), network, true);

        assert!(host.install().await.is_err());
        assert_eq!(host.state().await, WorkerState::Redundant);

        let current = storage.open("v2").await.unwrap();
        assert!(current.keys().await.unwrap().is_empty());
        assert!(current.match_url("/a.js").await.unwrap().is_none());
        let hit = old.match_url("/a.js").await.unwrap().unwrap();
        assert_eq!(hit.body, b"old");
    }

    #[tokio::test]
    async fn disk_storage_survives_restart() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("caches");
        let network = Arc::new(StaticNetwork::new().route("/a.js", "a"));
        let config = cache_config("v2", &["/a.js"]);

        let first = host(
            &config,
            Arc::new(DiskCacheStorage::new(&root)),
            network.clone(),
            true,
        );
        first.install().await.unwrap();

        // A new host over the same directory serves from disk without installing
        let offline = Arc::new(StaticNetwork::new().offline("/a.js"));
        let second = host(&config, Arc::new(DiskCacheStorage::new(&root)), offline.clone(), true);
        let res = second.fetch(Request::get("/a.js")).await.unwrap();

        assert_eq!(res.body, b"a");
        assert_eq!(offline.calls(), 0);
    }
}
