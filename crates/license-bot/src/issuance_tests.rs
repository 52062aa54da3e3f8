//! Unit tests for the key issuance workflow

#[cfg(test)]
mod tests {
    use crate::access::MemoryAccessStore;
    use crate::errors::{CommandError, Rejection};
    use crate::issuance::{issue_key, IssuanceOutcome};
    use crate::reply::{Reply, COLOUR_SUCCESS, COLOUR_WARNING};
    use crate::testing::{member, RecordingSink, SinkEvent};
    use license_admin::endpoints::{ADD, LINK, LIST};
    use license_admin::MockAdminApi;
    use license_types::{AccessSettings, ApiCallResult, ApiError, KeyRecord};
    use serde_json::json;

    fn linked(key: &str, user_id: u64) -> KeyRecord {
        KeyRecord {
            cle_unique: key.to_string(),
            discord_user_id: Some(user_id.to_string()),
            discord_username: Some(format!("user{}", user_id)),
            appareils_actifs: Some(json!("[]")),
        }
    }

    fn unlinked(key: &str) -> KeyRecord {
        KeyRecord {
            cle_unique: key.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_existing_key_is_returned_without_create_or_link() {
        let api = MockAdminApi::new()
            .with_keys(vec![unlinked("PROPULSE-FREE"), linked("PROPULSE-MINE", 42)])
            .with_new_key("PROPULSE-NEW")
            .with_link_ok();
        let store = MemoryAccessStore::unrestricted();
        let sink = RecordingSink::new();

        let outcome = issue_key(&api, &store, &member(42, &[]), &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::AlreadyIssued(ref k) if k == "PROPULSE-MINE"));
        assert_eq!(api.endpoints(), vec![LIST]);
        match sink.finalized() {
            Some(Reply::Embed(embed)) => {
                assert_eq!(embed.colour, COLOUR_WARNING);
                assert!(embed.title.contains("already have a key"));
                assert_eq!(embed.fields[0].1, "```PROPULSE-MINE```");
            }
            other => panic!("expected warning embed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_new_key_is_created_then_linked_to_invoker() {
        let api = MockAdminApi::new()
            .with_keys(vec![linked("PROPULSE-OTHER", 7)])
            .with_new_key("PROPULSE-NEW")
            .with_link_ok();
        let store = MemoryAccessStore::unrestricted();
        let sink = RecordingSink::new();
        let invoker = member(42, &[]);

        let outcome = issue_key(&api, &store, &invoker, &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::Issued(ref k) if k == "PROPULSE-NEW"));
        assert_eq!(api.endpoints(), vec![LIST, ADD, LINK]);

        let link_body = api.calls()[2].body.clone().unwrap();
        assert_eq!(
            link_body,
            json!({
                "key": "PROPULSE-NEW",
                "discordUserId": "42",
                "discordUsername": "user42"
            })
        );

        assert_eq!(sink.events()[0], SinkEvent::Deferred);
        match sink.finalized() {
            Some(Reply::Embed(embed)) => {
                assert_eq!(embed.colour, COLOUR_SUCCESS);
                assert_eq!(embed.fields[0].0, "Your key");
                assert_eq!(embed.fields[0].1, "```PROPULSE-NEW```");
            }
            other => panic!("expected success embed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_failure_never_reaches_create() {
        let api = MockAdminApi::new()
            .with_error(LIST, 500, "database unavailable")
            .with_new_key("PROPULSE-NEW")
            .with_link_ok();
        let sink = RecordingSink::new();

        let outcome =
            issue_key(&api, &MemoryAccessStore::unrestricted(), &member(1, &[]), &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::Failed(CommandError::Remote(_))));
        assert_eq!(api.endpoints(), vec![LIST]);
        assert_eq!(
            sink.finalized_text(),
            "❌ An error occurred: database unavailable"
        );
    }

    #[tokio::test]
    async fn test_list_failure_without_message_uses_fallback() {
        let api = MockAdminApi::new().with_response(
            LIST,
            ApiCallResult {
                ok: false,
                status: 502,
                payload: json!({}),
            },
        );
        let sink = RecordingSink::new();

        issue_key(&api, &MemoryAccessStore::unrestricted(), &member(1, &[]), &sink).await;

        assert_eq!(
            sink.finalized_text(),
            "❌ An error occurred: Could not check the list of keys."
        );
    }

    #[tokio::test]
    async fn test_html_error_on_create_shows_generic_server_error() {
        let html = "<!DOCTYPE html><html><body><h1>500</h1></body></html>";
        let api = MockAdminApi::new()
            .with_keys(vec![])
            .with_response(
                ADD,
                ApiCallResult::failure(
                    500,
                    ApiError::new("server error: Internal Server Error", html),
                ),
            )
            .with_link_ok();
        let sink = RecordingSink::new();

        issue_key(&api, &MemoryAccessStore::unrestricted(), &member(1, &[]), &sink).await;

        let text = sink.finalized_text();
        assert_eq!(text, "❌ An error occurred: server error: Internal Server Error");
        assert!(!text.contains("<html>"));
        assert_eq!(api.endpoints(), vec![LIST, ADD]);
    }

    #[tokio::test]
    async fn test_create_without_key_is_a_failure() {
        let api = MockAdminApi::new()
            .with_keys(vec![])
            .with_response(
                ADD,
                ApiCallResult {
                    ok: true,
                    status: 200,
                    payload: json!({ "key": "" }),
                },
            )
            .with_link_ok();
        let sink = RecordingSink::new();

        let outcome =
            issue_key(&api, &MemoryAccessStore::unrestricted(), &member(1, &[]), &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::Failed(_)));
        assert_eq!(api.endpoints(), vec![LIST, ADD]);
        assert_eq!(
            sink.finalized_text(),
            "❌ An error occurred: Error while creating the key."
        );
    }

    #[tokio::test]
    async fn test_link_failure_surfaces_remote_error() {
        let api = MockAdminApi::new()
            .with_keys(vec![])
            .with_new_key("PROPULSE-ORPHAN")
            .with_error(LINK, 409, "key already linked");
        let sink = RecordingSink::new();

        let outcome =
            issue_key(&api, &MemoryAccessStore::unrestricted(), &member(1, &[]), &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::Failed(_)));
        assert_eq!(api.endpoints(), vec![LIST, ADD, LINK]);
        assert_eq!(
            sink.finalized_text(),
            "❌ An error occurred: key already linked"
        );
    }

    #[tokio::test]
    async fn test_role_restriction_permits_members_with_role() {
        let api = MockAdminApi::new()
            .with_keys(vec![])
            .with_new_key("PROPULSE-NEW")
            .with_link_ok();
        let store = MemoryAccessStore::new(AccessSettings::restricted_to(555));
        let sink = RecordingSink::new();

        let outcome = issue_key(&api, &store, &member(1, &[10, 555]), &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::Issued(_)));
    }

    #[tokio::test]
    async fn test_role_restriction_rejects_others_without_remote_call() {
        let api = MockAdminApi::new().with_keys(vec![]);
        let store = MemoryAccessStore::new(AccessSettings::restricted_to(555));
        let sink = RecordingSink::new();

        let outcome = issue_key(&api, &store, &member(1, &[10]), &sink).await;

        assert!(matches!(
            outcome,
            IssuanceOutcome::Rejected(Rejection::MissingAllowedRole(555))
        ));
        assert!(api.is_untouched());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SinkEvent::Rejected(text) => assert!(text.contains("<@&555>")),
            other => panic!("expected immediate rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreadable_access_config_refuses_without_defer() {
        let api = MockAdminApi::new().with_keys(vec![]);
        let store = MemoryAccessStore::unrestricted().failing_reads();
        let sink = RecordingSink::new();

        let outcome = issue_key(&api, &store, &member(1, &[]), &sink).await;

        assert!(matches!(
            outcome,
            IssuanceOutcome::Rejected(Rejection::ConfigUnavailable)
        ));
        assert!(api.is_untouched());
        assert_eq!(
            sink.events(),
            vec![SinkEvent::Rejected(
                "Internal configuration error. Contact an administrator.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_missing_access_file_refuses_issuance() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = crate::access::FileAccessStore::new(dir.path().join("config.json"));
        let api = MockAdminApi::new().with_keys(vec![]);
        let sink = RecordingSink::new();

        let outcome = issue_key(&api, &store, &member(1, &[]), &sink).await;

        assert!(matches!(
            outcome,
            IssuanceOutcome::Rejected(Rejection::ConfigUnavailable)
        ));
        assert!(api.is_untouched());
    }

    #[tokio::test]
    async fn test_failed_defer_stops_before_remote_calls() {
        let api = MockAdminApi::new().with_keys(vec![]);
        let sink = RecordingSink::failing_defer();

        let outcome =
            issue_key(&api, &MemoryAccessStore::unrestricted(), &member(1, &[]), &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::Undelivered));
        assert!(api.is_untouched());
    }

    #[tokio::test]
    async fn test_unreachable_server_message_reaches_user() {
        let api = MockAdminApi::new().with_response(
            LIST,
            ApiCallResult::failure(503, ApiError::new("could not reach server", "connection refused")),
        );
        let sink = RecordingSink::new();

        issue_key(&api, &MemoryAccessStore::unrestricted(), &member(1, &[]), &sink).await;

        let text = sink.finalized_text();
        assert_eq!(text, "❌ An error occurred: could not reach server");
        assert!(!text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_malformed_list_rows_do_not_hide_existing_key() {
        let api = MockAdminApi::new()
            .with_response(
                LIST,
                ApiCallResult {
                    ok: true,
                    status: 200,
                    payload: json!([
                        { "cle_unique": null, "discord_user_id": null },
                        { "cle_unique": "PROPULSE-MINE", "discord_user_id": "42" }
                    ]),
                },
            )
            .with_new_key("PROPULSE-NEW")
            .with_link_ok();
        let sink = RecordingSink::new();

        let outcome = issue_key(&api, &MemoryAccessStore::unrestricted(), &member(42, &[]), &sink).await;

        assert!(matches!(outcome, IssuanceOutcome::AlreadyIssued(ref k) if k == "PROPULSE-MINE"));
        assert_eq!(api.endpoints(), vec![LIST]);
    }
}
