//! Shared fixtures for integration tests and benchmarks.

use parking_lot::Mutex;
use rm_03_middleware::{middleware, Middleware};
use rm_04_workspace::{InstallContext, RepositoryDescriptor, Workspace, WorkspaceConfig};
use serde_json::json;
use shared_bus::{PublishRequest, ScopedEventBus, SubscribeOptions, Subscription};
use shared_types::{MethodError, MethodTable, Repository};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Dependency bag used by the test workspaces.
#[derive(Debug, Clone)]
pub struct AppDeps {
    pub base_url: String,
}

/// Workspace with the default test dependency bag.
pub fn app_workspace(logging: bool) -> Workspace<AppDeps> {
    Workspace::new(
        WorkspaceConfig::new("test-app").with_logging(logging),
        AppDeps {
            base_url: "https://api.example".to_string(),
        },
    )
    .expect("workspace setup")
}

/// A counter repository: `increment`, `get`, `add(a, b)`.
pub fn counter_repository() -> Arc<dyn Repository> {
    let value = Arc::new(AtomicI64::new(0));
    let (inc, get) = (value.clone(), value);
    Arc::new(
        MethodTable::new()
            .method("increment", move |_| Ok(json!(inc.fetch_add(1, Ordering::SeqCst) + 1)))
            .method("get", move |_| Ok(json!(get.load(Ordering::SeqCst))))
            .method("add", |args| {
                let [a, b] = args.as_slice() else {
                    return Err(MethodError::invalid_arguments("add", "expected two numbers"));
                };
                Ok(json!(a.as_i64().unwrap_or_default() + b.as_i64().unwrap_or_default()))
            })
            .property("kind", json!("counter")),
    )
}

/// `user-repo`: exposes `endpoint` built from the dependency bag and counts
/// its installs in `installs`.
pub fn user_repo(installs: Arc<AtomicUsize>) -> RepositoryDescriptor<AppDeps> {
    RepositoryDescriptor::new("user-repo", move |ctx: InstallContext<AppDeps>| {
        installs.fetch_add(1, Ordering::SeqCst);
        let endpoint = format!("{}/users", ctx.dependencies().base_url);
        let repo: Arc<dyn Repository> = Arc::new(
            MethodTable::new()
                .method("endpoint", move |_| Ok(json!(endpoint.clone())))
                .property("kind", json!("user")),
        );
        Ok(repo)
    })
}

/// Middleware that records `"<name>:<method>"` before proceeding.
pub fn recording_middleware(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Middleware {
    middleware(move |method, _, next| {
        log.lock().push(format!("{name}:{method}"));
        next.proceed()
    })
}

/// Subscribe a collector to `(scope, event_name)`.
pub fn collect(
    bus: &ScopedEventBus,
    options: SubscribeOptions,
) -> (Subscription, Arc<Mutex<Vec<serde_json::Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = bus
        .subscribe(options, move |record| {
            sink.lock().push(record.payload.clone());
            Ok(())
        })
        .expect("subscribe");
    (subscription, seen)
}

/// Bus with `subscribers` no-op subscribers on `("bench", "tick")`.
pub fn fanout_bus(subscribers: usize) -> ScopedEventBus {
    let bus = ScopedEventBus::new();
    for _ in 0..subscribers {
        bus.subscribe(SubscribeOptions::new("bench", "tick"), |_| Ok(()))
            .expect("subscribe");
    }
    bus
}

/// Publish one `tick` on the benchmark stream.
pub fn tick(bus: &ScopedEventBus, n: u64) -> usize {
    bus.publish(PublishRequest::new("bench", "tick", json!(n)))
        .map(|outcome| outcome.receivers())
        .unwrap_or(0)
}

/// `depth` pass-through middleware.
pub fn passthrough_chain(depth: usize) -> Vec<Middleware> {
    (0..depth)
        .map(|_| middleware(|_, _, next| next.proceed()))
        .collect()
}
