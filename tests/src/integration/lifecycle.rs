//! # Repository Lifecycle Flows
//!
//! Define → query → disconnect through a `Workspace`, with middleware and
//! lifecycle hooks, plus installs that query other repositories.

#[cfg(test)]
mod tests {
    use crate::fixtures::{app_workspace, counter_repository, recording_middleware, user_repo, AppDeps};
    use parking_lot::Mutex;
    use rm_02_resource::ReferenceCountedResource;
    use rm_04_workspace::{InstallContext, RepositoryDescriptor, Transition, WorkspaceError};
    use serde_json::json;
    use shared_types::{MethodTable, Repository};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // =============================================================================
    // RESOURCE LIFECYCLE
    // =============================================================================

    #[test]
    fn test_user_repo_connect_twice_disconnect_twice() {
        let ws = app_workspace(false);
        let installs = Arc::new(AtomicUsize::new(0));
        ws.define_repository(user_repo(installs.clone()));

        let first = ws.query_repository("user-repo").unwrap();
        let second = ws.query_repository("user-repo").unwrap();
        assert_eq!(ws.connections("user-repo"), Some(2));
        assert_eq!(installs.load(Ordering::SeqCst), 1);

        first.disconnect();
        assert_eq!(ws.connections("user-repo"), Some(1));
        assert_eq!(
            second.repository().call("endpoint", vec![]).unwrap(),
            json!("https://api.example/users")
        );

        second.disconnect();
        assert_eq!(ws.connections("user-repo"), Some(0));

        // A fresh connection installs a fresh value.
        let third = ws.query_repository("user-repo").unwrap();
        assert_eq!(installs.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(first.repository(), third.repository()));
    }

    #[test]
    fn test_standalone_resource_scenario() {
        let resource = ReferenceCountedResource::new(
            |_: &()| Ok::<_, std::convert::Infallible>(counter_repository()),
            (),
        );

        resource.connect().unwrap();
        resource.connect().unwrap();
        resource.disconnect();
        assert_eq!(resource.connections(), 1);
        assert!(resource.reference().is_some());

        resource.disconnect();
        assert_eq!(resource.connections(), 0);
        assert!(resource.reference().is_none());

        assert_eq!(resource.disconnect(), Transition::Ignored);
        assert_eq!(resource.connections(), 0);
    }

    #[test]
    fn test_missing_repository_names_id() {
        let ws = app_workspace(true);
        let err = ws.query_repository("missing-id").unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { ref id } if id == "missing-id"));
        assert_eq!(err.to_string(), "Repository \"missing-id\" not found");
    }

    #[test]
    fn test_first_definition_wins() {
        let ws = app_workspace(true);
        ws.define_repository(user_repo(Arc::default()));
        let replaced = ws.define_repository(RepositoryDescriptor::new("user-repo", |_| {
            Ok(counter_repository())
        }));

        assert!(!replaced);
        let conn = ws.query_repository("user-repo").unwrap();
        assert_eq!(conn.repository().property("kind"), Some(json!("user")));
    }

    // =============================================================================
    // MIDDLEWARE + HOOKS
    // =============================================================================

    #[test]
    fn test_middleware_order_through_workspace() {
        let ws = app_workspace(false);
        let log = Arc::new(Mutex::new(Vec::new()));
        ws.define_repository(
            RepositoryDescriptor::new("counter-repo", |_| Ok(counter_repository()))
                .middleware(recording_middleware("A", log.clone()))
                .middleware(recording_middleware("B", log.clone())),
        );

        let conn = ws.query_repository("counter-repo").unwrap();
        let repo = conn.repository();
        assert_eq!(repo.call("add", vec![json!(2), json!(3)]).unwrap(), json!(5));
        assert_eq!(repo.call("increment", vec![]).unwrap(), json!(1));
        assert_eq!(repo.property("kind"), Some(json!("counter")));

        assert_eq!(*log.lock(), vec!["A:add", "B:add", "A:increment", "B:increment"]);
    }

    #[test]
    fn test_hooks_fire_once_per_edge() {
        let ws = app_workspace(true);
        let connects = Arc::new(AtomicUsize::new(0));
        let disconnects = Arc::new(AtomicUsize::new(0));
        let (c, d) = (connects.clone(), disconnects.clone());
        ws.define_repository(
            user_repo(Arc::default())
                .on_connect(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .on_disconnect(move || {
                    d.fetch_add(1, Ordering::SeqCst);
                }),
        );

        for _ in 0..3 {
            let a = ws.query_repository("user-repo").unwrap();
            let b = ws.query_repository("user-repo").unwrap();
            b.disconnect();
            a.disconnect();
        }

        assert_eq!(connects.load(Ordering::SeqCst), 3);
        assert_eq!(disconnects.load(Ordering::SeqCst), 3);
        assert_eq!(ws.metrics().instances_created(), 3);
        assert_eq!(ws.metrics().repositories_active(), 0);
    }

    // =============================================================================
    // RE-ENTRANT INSTALLS
    // =============================================================================

    #[test]
    fn test_install_can_query_another_repository() {
        let ws = app_workspace(false);
        ws.define_repository(user_repo(Arc::default()));

        let inner_ws = ws.clone();
        ws.define_repository(RepositoryDescriptor::new(
            "profile-repo",
            move |_: InstallContext<AppDeps>| {
                let user = inner_ws.query_repository("user-repo")?;
                let endpoint = user.repository().call("endpoint", vec![])?;
                let repo: Arc<dyn Repository> =
                    Arc::new(MethodTable::new().property("source", endpoint));
                Ok(repo)
            },
        ));

        let profile = ws.query_repository("profile-repo").unwrap();
        assert_eq!(
            profile.repository().property("source"),
            Some(json!("https://api.example/users"))
        );
        assert_eq!(ws.connections("user-repo"), Some(1));
    }

    #[test]
    fn test_failed_install_can_be_retried() {
        let ws = app_workspace(false);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        ws.define_repository(RepositoryDescriptor::new("flaky-repo", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("backend warming up");
            }
            Ok(counter_repository())
        }));

        assert!(matches!(
            ws.query_repository("flaky-repo"),
            Err(WorkspaceError::Install { .. })
        ));
        assert_eq!(ws.connections("flaky-repo"), Some(0));

        let conn = ws.query_repository("flaky-repo").unwrap();
        assert_eq!(conn.repository().call("get", vec![]).unwrap(), json!(0));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_status_and_metrics_render() {
        let ws = app_workspace(true);
        ws.define_repository(user_repo(Arc::default()));
        let _conn = ws.query_repository("user-repo").unwrap();

        let statuses = ws.all_repositories();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].connections, 1);

        let text = ws.metrics().render().unwrap();
        assert!(text.contains("rm_repositories_defined_total 1"));
        assert!(text.contains("rm_repository_instances_created_total 1"));
    }
}
