mod common;

use common::*;
use serde_json::json;
use skillup_client::{
    error::NETWORK_MESSAGE, users::UpdateUserProfileRequest, MemoryStore, Navigation, Session,
    SessionContext, User,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use wiremock::{
    matchers::{body_string_contains, header, header_regex, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn mount_refresh(server: &MockServer, fresh: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/Auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body(fresh)))
        .expect(calls)
        .mount(server)
        .await;
}

/// A 401 for `stale` that arrives only after `delay`.
async fn mount_slow_rejection(server: &MockServer, stale: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("Authorization", format!("Bearer {}", stale).as_str()))
        .respond_with(ResponseTemplate::new(401).set_delay(delay))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_expired_then_fresh(server: &MockServer, stale: &str, fresh: &str) {
    for endpoint in ["/api/users/profile", "/api/users/statistics"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(header("Authorization", format!("Bearer {}", stale).as_str()))
            .respond_with(ResponseTemplate::new(401))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("Authorization", format!("Bearer {}", fresh).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/statistics"))
        .and(header("Authorization", format!("Bearer {}", fresh).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "completedCourses": 3,
            "assessmentsPassed": 2,
            "totalSkillPoints": 140,
            "learningPathsStarted": 1,
            "averageAssessmentScore": 87.5,
            "timeSpentLearning": 12.0,
            "achievementsUnlocked": 4
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[test_log::test(tokio::test)]
async fn test_bearer_token_is_attached() {
    let token = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&token, Some(REFRESH_TOKEN)).await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
        .expect(1)
        .mount(&server)
        .await;

    let profile = context.users.get_profile().await.unwrap();
    assert_eq!(profile.skills, vec!["Analysis".to_string()]);
    assert_eq!(context.users.current_profile(), Some(profile));
}

#[test_log::test(tokio::test)]
async fn test_concurrent_unauthorized_share_one_refresh() {
    let stale = token_expiring_in(3600);
    let fresh = token_expiring_in(7200);
    let (server, context) = setup_signed_in(&stale, Some(REFRESH_TOKEN)).await;

    mount_expired_then_fresh(&server, &stale, &fresh).await;
    Mock::given(method("POST"))
        .and(path("/api/Auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body(&fresh)))
        .expect(1)
        .mount(&server)
        .await;

    let (profile, statistics) = tokio::join!(context.users.get_profile(), context.users.statistics());

    assert_eq!(profile.unwrap().id, 7);
    assert_eq!(statistics.unwrap().total_skill_points, 140);
    assert_eq!(context.auth.access_token().as_deref(), Some(fresh.as_str()));
    assert!(!context.auth.refresh_coordinator().is_refreshing());
}

#[test_log::test(tokio::test)]
async fn test_concurrent_unauthorized_with_failed_refresh() {
    let stale = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&stale, Some(REFRESH_TOKEN)).await;
    let mut navigation = context.navigator.subscribe();

    mount_expired_then_fresh(&server, &stale, "never-issued").await;
    Mock::given(method("POST"))
        .and(path("/api/Auth/refresh"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "Refresh token expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let (profile, statistics) = tokio::join!(context.users.get_profile(), context.users.statistics());

    let profile_err = profile.unwrap_err();
    assert!(profile_err.is_unauthorized());
    assert_eq!(profile_err.user_message(), "Unauthorized - Please login");
    assert!(statistics.unwrap_err().is_unauthorized());

    assert!(context.session.current().is_empty());
    assert!(context.auth.access_token().is_none());
    assert_eq!(navigation.recv().await.unwrap(), Navigation::login());
    assert!(matches!(navigation.try_recv(), Err(TryRecvError::Empty)));
}

#[test_log::test(tokio::test)]
async fn test_validation_errors_are_joined() {
    let token = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&token, Some(REFRESH_TOKEN)).await;

    Mock::given(method("PUT"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "errors": ["A", "B"] })))
        .mount(&server)
        .await;

    let request = UpdateUserProfileRequest {
        bio: Some("x".repeat(5000)),
        ..Default::default()
    };
    let err = context.users.update_profile(&request).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.user_message(), "A, B");
}

#[test_log::test(tokio::test)]
async fn test_update_profile_refetches_on_success() {
    let token = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&token, Some(REFRESH_TOKEN)).await;

    Mock::given(method("PUT"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
        .expect(1)
        .mount(&server)
        .await;

    let result = context
        .users
        .update_profile(&UpdateUserProfileRequest {
            bio: Some("Poet of science".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(context.users.current_profile().map(|p| p.id), Some(7));
}

#[test_log::test(tokio::test)]
async fn test_fixed_messages_for_known_statuses() {
    let token = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&token, Some(REFRESH_TOKEN)).await;

    Mock::given(method("GET"))
        .and(path("/api/users/achievements"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "No such route" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/statistics"))
        .respond_with(ResponseTemplate::new(500).set_body_string("stack trace"))
        .mount(&server)
        .await;

    let err = context.users.achievements().await.unwrap_err();
    assert_eq!(err.user_message(), "Resource not found");

    let err = context.users.statistics().await.unwrap_err();
    assert_eq!(err.user_message(), "Internal Server Error");
    // Server errors leave the session alone.
    assert!(context.auth.is_authenticated());
}

#[test_log::test(tokio::test)]
async fn test_delete_account_sends_body() {
    let token = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&token, Some(REFRESH_TOKEN)).await;

    Mock::given(method("DELETE"))
        .and(path("/api/users/account"))
        .and(wiremock::matchers::body_json(json!({ "reason": "Moving on", "password": "secret-password" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = context.users.delete_account("Moving on", "secret-password").await.unwrap();
    assert_eq!(result.data, Some(true));
}

#[test_log::test(tokio::test)]
async fn test_unreachable_server_reports_network_error() {
    let server = MockServer::start().await;
    let settings = settings_for(&server);
    drop(server);

    let context = SessionContext::with_store(settings, Arc::new(MemoryStore::new())).unwrap();
    let err = context.users.get_profile().await.unwrap_err();
    assert_eq!(err.user_message(), NETWORK_MESSAGE);
    assert_eq!(err.status(), None);
}

#[test_log::test(tokio::test)]
async fn test_replayed_request_is_not_recovered_twice() {
    let stale = token_expiring_in(3600);
    let fresh = token_expiring_in(7200);
    let (server, context) = setup_signed_in(&stale, Some(REFRESH_TOKEN)).await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, &fresh, 1).await;

    let err = context.users.get_profile().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(context.auth.access_token().as_deref(), Some(fresh.as_str()));
}

#[test_log::test(tokio::test)]
async fn test_stale_request_replays_with_newer_stored_token() {
    let stale = token_expiring_in(3600);
    let fresh = token_expiring_in(7200);
    let (server, context) = setup_signed_in(&stale, Some(REFRESH_TOKEN)).await;

    mount_slow_rejection(&server, &stale, Duration::from_millis(300)).await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("Authorization", format!("Bearer {}", fresh).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "unused", 0).await;

    let user: User = serde_json::from_value(user_json("Student")).unwrap();
    let (profile, _) = tokio::join!(context.users.get_profile(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        context
            .auth
            .token_store()
            .save(&Session::authenticated(user, fresh.clone(), Some("refresh-2".to_string()), None))
            .unwrap();
    });

    assert_eq!(profile.unwrap().id, 7);
}

#[test_log::test(tokio::test)]
async fn test_unauthorized_after_session_cleared_does_not_refresh() {
    let stale = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&stale, Some(REFRESH_TOKEN)).await;

    mount_slow_rejection(&server, &stale, Duration::from_millis(300)).await;
    mount_refresh(&server, "unused", 0).await;

    let (profile, _) = tokio::join!(context.users.get_profile(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        context.auth.token_store().clear().unwrap();
    });

    assert!(profile.unwrap_err().is_unauthorized());
    assert!(!context.auth.refresh_coordinator().is_refreshing());
}

#[test_log::test(tokio::test)]
async fn test_upload_profile_picture_sends_multipart_and_refetches() {
    let token = token_expiring_in(3600);
    let (server, context) = setup_signed_in(&token, Some(REFRESH_TOKEN)).await;

    Mock::given(method("POST"))
        .and(path("/api/users/profile-picture"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains(r#"name="file"; filename="avatar.png""#))
        .and(body_string_contains("avatar-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": "https://cdn.example.com/avatars/7.png"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
        .expect(1)
        .mount(&server)
        .await;

    let result = context
        .users
        .upload_profile_picture("avatar.png", b"avatar-bytes".to_vec(), Some("image/png"))
        .await
        .unwrap();
    assert_eq!(result.data.as_deref(), Some("https://cdn.example.com/avatars/7.png"));
    assert_eq!(context.users.current_profile().map(|p| p.id), Some(7));
}

#[test_log::test(tokio::test)]
async fn test_upload_profile_picture_is_replayed_after_refresh() {
    let stale = token_expiring_in(3600);
    let fresh = token_expiring_in(7200);
    let (server, context) = setup_signed_in(&stale, Some(REFRESH_TOKEN)).await;

    Mock::given(method("POST"))
        .and(path("/api/users/profile-picture"))
        .and(header("Authorization", format!("Bearer {}", stale).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/profile-picture"))
        .and(header("Authorization", format!("Bearer {}", fresh).as_str()))
        .and(body_string_contains("avatar-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Unsupported image format"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, &fresh, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
        .expect(0)
        .mount(&server)
        .await;

    let result = context
        .users
        .upload_profile_picture("avatar.bmp", b"avatar-bytes".to_vec(), None)
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("Unsupported image format"));
    assert!(context.users.current_profile().is_none());
}
