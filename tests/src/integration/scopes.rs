//! # Scope Flows
//!
//! Typed scope stacks on their own, and workspace contexts read by install
//! functions through the injected scope reader.

#[cfg(test)]
mod tests {
    use crate::fixtures::{app_workspace, AppDeps};
    use proptest::prelude::*;
    use rm_01_scope::create_scope;
    use rm_04_workspace::{InstallContext, RepositoryDescriptor};
    use serde_json::json;
    use shared_types::{MethodTable, Repository};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Locale(&'static str);

    #[test]
    fn test_nested_providers_restore_outer_value() {
        let theme = create_scope("light");
        theme.provider(Some("dark"), || {
            assert_eq!(theme.current_value(), "dark");
            theme.provider(Some("high-contrast"), || {
                assert_eq!(theme.current_value(), "high-contrast");
            });
            assert_eq!(theme.current_value(), "dark");
            theme.provider(None, || assert_eq!(theme.current_value(), "light"));
        });
        assert_eq!(theme.current_value(), "light");
    }

    #[test]
    fn test_frame_released_when_body_panics() {
        let theme = create_scope("light");
        theme.provider(Some("dark"), || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                theme.provider(Some("broken"), || panic!("render failed"));
            }));
            assert!(result.is_err());
            assert_eq!(theme.current_value(), "dark");
        });
        assert_eq!(theme.depth(), 0);
    }

    fn locale_repo() -> RepositoryDescriptor<AppDeps> {
        RepositoryDescriptor::new("i18n-repo", |ctx: InstallContext<AppDeps>| {
            let locale = ctx
                .scopes()
                .current::<Locale>("locale")
                .map_or("unset", |l| l.0);
            let repo: Arc<dyn Repository> =
                Arc::new(MethodTable::new().property("locale", json!(locale)));
            Ok(repo)
        })
    }

    #[test]
    fn test_install_reads_enclosing_context() {
        let ws = app_workspace(false);
        let locale = ws.create_context("locale", Locale("en"));
        ws.define_repository(locale_repo());

        let conn = locale.provider(Some(Locale("fr")), || ws.query_repository("i18n-repo").unwrap());
        assert_eq!(conn.repository().property("locale"), Some(json!("fr")));
        assert_eq!(locale.current_value(), Locale("en"));
        assert!(ws.scopes().current::<Locale>("locale").is_none());
    }

    #[test]
    fn test_shared_value_keeps_first_context() {
        let ws = app_workspace(false);
        let locale = ws.create_context("locale", Locale("en"));
        ws.define_repository(locale_repo());

        let first = locale.provider(Some(Locale("fr")), || ws.query_repository("i18n-repo").unwrap());
        let second = locale.provider(Some(Locale("de")), || ws.query_repository("i18n-repo").unwrap());

        // The value is shared, so the second caller sees the first install.
        assert_eq!(second.repository().property("locale"), Some(json!("fr")));
        first.disconnect();
        second.disconnect();

        let third = locale.provider(Some(Locale("de")), || ws.query_repository("i18n-repo").unwrap());
        assert_eq!(third.repository().property("locale"), Some(json!("de")));
    }

    #[test]
    fn test_install_outside_provider_sees_nothing() {
        let ws = app_workspace(false);
        let _locale = ws.create_context("locale", Locale("en"));
        ws.define_repository(locale_repo());

        let conn = ws.query_repository("i18n-repo").unwrap();
        assert_eq!(conn.repository().property("locale"), Some(json!("unset")));
    }

    proptest! {
        #[test]
        fn prop_nesting_tracks_innermost(values in proptest::collection::vec(0u32..100, 0..12)) {
            let scope = create_scope(u32::MAX);
            fn nest(scope: &rm_01_scope::Scope<u32>, rest: &[u32]) -> Result<(), TestCaseError> {
                let Some((head, tail)) = rest.split_first() else {
                    return Ok(());
                };
                let before = scope.current_value();
                scope.provider(Some(*head), || {
                    prop_assert_eq!(scope.current_value(), *head);
                    nest(scope, tail)
                })?;
                prop_assert_eq!(scope.current_value(), before);
                Ok(())
            }
            nest(&scope, &values)?;
            prop_assert_eq!(scope.current_value(), u32::MAX);
        }
    }
}
