//! # Messaging Flows
//!
//! Publish/subscribe on the scoped bus and repository-to-repository
//! messages through workspace messengers.
//!
//! ## Flows Tested:
//!
//! 1. **Round trip**: subscribe then publish on one `(scope, event_name)`
//! 2. **Interceptors**: rewrite and veto before delivery
//! 3. **Messenger**: `dispatch` from one repository reaches another's hook
//! 4. **Replay**: late subscribers catch up on undelivered records

#[cfg(test)]
mod tests {
    use crate::fixtures::{app_workspace, collect, user_repo, AppDeps};
    use parking_lot::Mutex;
    use rm_04_workspace::{InstallContext, RepositoryDescriptor};
    use serde_json::{json, Value};
    use shared_bus::{PublishOutcome, PublishRequest, ScopedEventBus, SubscribeOptions};
    use shared_types::{Message, MessageRequest, MethodTable, Repository, DISPATCH_EVENT};
    use std::sync::Arc;

    // =============================================================================
    // BUS ROUND TRIPS
    // =============================================================================

    #[test]
    fn test_three_logins_reach_subscriber() {
        let bus = ScopedEventBus::new();
        let (_sub, seen) = collect(&bus, SubscribeOptions::new("user-repo", "userLoggedIn"));

        for _ in 0..3 {
            bus.publish(PublishRequest::new("user-repo", "userLoggedIn", json!({ "userId": 1 })))
                .unwrap();
        }

        assert_eq!(*seen.lock(), vec![json!({ "userId": 1 }); 3]);
        let history = bus.history("user-repo", "userLoggedIn");
        assert_eq!(history.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(history.iter().all(|r| r.acknowledged));
    }

    #[test]
    fn test_always_false_interceptor_reaches_nobody() {
        let bus = ScopedEventBus::new();
        let subs: Vec<_> = (0..4)
            .map(|_| collect(&bus, SubscribeOptions::new("s", "e")))
            .collect();
        let _veto = bus.intercept("e", |_| None);

        let outcome = bus.publish(PublishRequest::new("s", "e", json!("p"))).unwrap();

        assert_eq!(outcome, PublishOutcome::Vetoed { sequence: 1 });
        assert!(subs.iter().all(|(_, seen)| seen.lock().is_empty()));
        assert!(!bus.history("s", "e")[0].acknowledged);
    }

    #[test]
    fn test_interceptor_removal_restores_delivery() {
        let bus = ScopedEventBus::new();
        let (_sub, seen) = collect(&bus, SubscribeOptions::new("s", "e"));
        let veto = bus.intercept("e", |_| None);
        let tag = bus.intercept("e", |mut record| {
            record.payload = json!({ "tagged": record.payload });
            Some(record)
        });

        bus.publish(PublishRequest::new("s", "e", json!(1))).unwrap();
        veto.remove();
        bus.publish(PublishRequest::new("s", "e", json!(2))).unwrap();

        assert_eq!(*seen.lock(), vec![json!({ "tagged": 2 })]);
        assert_eq!(bus.interceptor_count("e"), 1);
        tag.remove();
        assert_eq!(bus.interceptor_count("e"), 0);
    }

    #[test]
    fn test_late_subscriber_replays_only_undelivered() {
        let bus = ScopedEventBus::new();
        bus.publish(PublishRequest::new("s", "e", json!(1))).unwrap();
        let (early, _) = collect(&bus, SubscribeOptions::new("s", "e"));
        bus.publish(PublishRequest::new("s", "e", json!(2))).unwrap();
        early.unsubscribe();
        bus.publish(PublishRequest::new("s", "e", json!(3))).unwrap();

        let (_late, seen) = collect(&bus, SubscribeOptions::new("s", "e").from_beginning());

        assert_eq!(*seen.lock(), vec![json!(1), json!(3)]);
        assert!(bus.history("s", "e").iter().all(|r| r.acknowledged));
    }

    #[test]
    fn test_reentrant_publish_from_subscriber() {
        let bus = ScopedEventBus::new();
        let (_audit, audit) = collect(&bus, SubscribeOptions::new("audit", "logged"));

        let forward = bus.clone();
        let _relay = bus
            .subscribe(SubscribeOptions::new("user-repo", "userLoggedIn"), move |record| {
                forward.publish(PublishRequest::new("audit", "logged", record.payload.clone()))?;
                Ok(())
            })
            .unwrap();

        bus.publish(PublishRequest::new("user-repo", "userLoggedIn", json!(7))).unwrap();
        bus.publish(PublishRequest::new("user-repo", "userLoggedIn", json!(8))).unwrap();

        assert_eq!(*audit.lock(), vec![json!(7), json!(8)]);
        assert_eq!(bus.events_published(), 4);
    }

    // =============================================================================
    // MESSENGER BETWEEN REPOSITORIES
    // =============================================================================

    /// `auth-repo` exposes `login(userId)`, which notifies `user-repo`.
    fn auth_repo() -> RepositoryDescriptor<AppDeps> {
        RepositoryDescriptor::new("auth-repo", |ctx: InstallContext<AppDeps>| {
            let messenger = ctx.messenger().clone();
            let repo: Arc<dyn Repository> = Arc::new(MethodTable::new().method("login", move |args| {
                let user_id = args.first().cloned().unwrap_or(Value::Null);
                messenger
                    .dispatch(
                        MessageRequest::new("userLoggedIn", "user-repo")
                            .with_message(json!({ "userId": user_id })),
                    )
                    .map_err(|e| shared_types::MethodError::failed("login", e))?;
                Ok(Value::Bool(true))
            }));
            Ok(repo)
        })
    }

    #[test]
    fn test_dispatch_reaches_connected_repository() {
        let ws = app_workspace(false);
        let inbox = Arc::new(Mutex::new(Vec::<Message>::new()));
        let sink = inbox.clone();
        ws.define_repository(user_repo(Arc::default()).on_message(move |message, _| {
            sink.lock().push(message.clone());
            Ok(())
        }));
        ws.define_repository(auth_repo());

        let _user = ws.query_repository("user-repo").unwrap();
        let auth = ws.query_repository("auth-repo").unwrap();
        auth.repository().call("login", vec![json!(1)]).unwrap();

        let inbox = inbox.lock();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, "userLoggedIn");
        assert_eq!(inbox[0].source, "auth-repo");
        assert_eq!(inbox[0].message, Some(json!({ "userId": 1 })));
    }

    #[test]
    fn test_messages_wait_for_recipient() {
        let ws = app_workspace(false);
        let inbox = Arc::new(Mutex::new(Vec::<Message>::new()));
        let sink = inbox.clone();
        ws.define_repository(user_repo(Arc::default()).on_message(move |message, _| {
            sink.lock().push(message.clone());
            Ok(())
        }));
        ws.define_repository(auth_repo());

        let auth = ws.query_repository("auth-repo").unwrap();
        auth.repository().call("login", vec![json!(1)]).unwrap();
        auth.repository().call("login", vec![json!(2)]).unwrap();
        assert!(inbox.lock().is_empty());

        let _user = ws.query_repository("user-repo").unwrap();
        let ids: Vec<_> = inbox
            .lock()
            .iter()
            .map(|m| m.message.clone().unwrap_or(Value::Null)["userId"].clone())
            .collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_workspace_interceptor_vetoes_messages() {
        let ws = app_workspace(false);
        let inbox = Arc::new(Mutex::new(Vec::<Message>::new()));
        let sink = inbox.clone();
        ws.define_repository(user_repo(Arc::default()).on_message(move |message, _| {
            sink.lock().push(message.clone());
            Ok(())
        }));
        let _user = ws.query_repository("user-repo").unwrap();

        let _guard = ws.intercept(DISPATCH_EVENT, |record| {
            let blocked = record.payload["source"] == json!("spam-bot");
            (!blocked).then_some(record)
        });

        let outcome = ws
            .messenger("spam-bot")
            .dispatch(MessageRequest::new("buyNow", "user-repo"))
            .unwrap();
        assert!(outcome.is_vetoed());

        ws.messenger("app")
            .dispatch(MessageRequest::new("refresh", "user-repo"))
            .unwrap();

        let inbox = inbox.lock();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].source, "app");
    }

    #[test]
    fn test_self_dispatch_is_skipped() {
        let ws = app_workspace(false);
        let inbox = Arc::new(Mutex::new(Vec::<Message>::new()));
        let sink = inbox.clone();
        ws.define_repository(
            RepositoryDescriptor::new("echo-repo", |ctx: InstallContext<AppDeps>| {
                let messenger = ctx.messenger().clone();
                let repo: Arc<dyn Repository> = Arc::new(MethodTable::new().method("ping", move |_| {
                    let outcome = messenger
                        .dispatch(MessageRequest::new("ping", "echo-repo"))
                        .map_err(|e| shared_types::MethodError::failed("ping", e))?;
                    Ok(json!(outcome == PublishOutcome::SelfTargeted))
                }));
                Ok(repo)
            })
            .on_message(move |message, _| {
                sink.lock().push(message.clone());
                Ok(())
            }),
        );

        let echo = ws.query_repository("echo-repo").unwrap();
        assert_eq!(echo.repository().call("ping", vec![]).unwrap(), json!(true));
        assert!(inbox.lock().is_empty());
        assert!(ws.bus().history("echo-repo", DISPATCH_EVENT).is_empty());
    }

    #[test]
    fn test_failing_hook_surfaces_at_sender() {
        let ws = app_workspace(false);
        ws.define_repository(
            user_repo(Arc::default()).on_message(|_, _| Err(anyhow::anyhow!("inbox full"))),
        );
        let _user = ws.query_repository("user-repo").unwrap();

        let err = ws
            .messenger("app")
            .dispatch(MessageRequest::new("refresh", "user-repo"))
            .unwrap_err();
        assert!(err.to_string().contains("inbox full"));
    }
}
