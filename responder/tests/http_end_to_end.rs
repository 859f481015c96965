//! Full stack: HTTP model client against a mock provider, credential probe,
//! and the subject document persisted to disk.

use std::time::Duration;

use cake_core::{Provenance, ResponseContext, Subject};
use config::{
    Config, ProviderCredential, ProviderCredentials, ServiceConfig, load_subject_document,
};
use responder::{EndpointUpdate, Responder, ResponderBuilder, SubjectConfigUpdate};
use tempfile::TempDir;
use testing::{MockModelServer, unique_id};

fn config(server: &MockModelServer, dir: &TempDir) -> Config {
    let path = dir.path().join(format!("{}.json", unique_id("subjects")));
    Config {
        service: ServiceConfig {
            subject_config_path: path.to_string_lossy().into_owned(),
            rng_seed: Some(1),
            ..ServiceConfig::default()
        },
        providers: ProviderCredentials {
            openai: ProviderCredential {
                api_key: Some("sk-test".to_string()),
                api_base: Some(server.uri()),
            },
            ..ProviderCredentials::default()
        },
        ..Config::default()
    }
}

async fn fast_retries(responder: &Responder, subject: &str, attempts: u32, timeout_secs: u64) {
    responder
        .admin
        .update_subject_config(
            subject,
            SubjectConfigUpdate {
                primary: Some(EndpointUpdate {
                    retry_attempts: Some(attempts),
                    retry_delay_ms: Some(0),
                    timeout_secs: Some(timeout_secs),
                    ..EndpointUpdate::default()
                }),
                ..SubjectConfigUpdate::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_live_call_then_cache_hit() {
    let server = MockModelServer::start().await;
    server.reply("What a fantastic finish!").await;
    let dir = TempDir::new().unwrap();
    let responder = ResponderBuilder::new(config(&server, &dir))
        .build()
        .await
        .unwrap();

    let ctx = ResponseContext::new()
        .with("task_title", "Frost the cake")
        .with("api_key", "should-not-leak");
    let first = responder
        .orchestrator
        .generate(Subject::TaskCompletion, &ctx, false)
        .await;
    let second = responder
        .orchestrator
        .generate(Subject::TaskCompletion, &ctx, false)
        .await;

    assert_eq!(first.provenance, Provenance::LiveModel);
    assert_eq!(first.text, "What a fantastic finish!");
    assert_eq!(first.mood, "excited");
    assert_eq!(first.metadata["tokens_used"], 32);
    assert_eq!(second.provenance, Provenance::Cache);
    assert_eq!(server.request_count().await, 1);

    let bodies = server.request_bodies().await;
    let sent = bodies[0].to_string();
    assert!(sent.contains("Frost the cake"));
    assert!(!sent.contains("should-not-leak"));
    assert_eq!(bodies[0]["model"], "gpt-3.5-turbo");
}

#[tokio::test]
async fn test_provider_errors_fall_back_after_retries() {
    let server = MockModelServer::start().await;
    server.fail_with(503).await;
    let dir = TempDir::new().unwrap();
    let responder = ResponderBuilder::new(config(&server, &dir))
        .build()
        .await
        .unwrap();
    fast_retries(&responder, "motivation", 3, 5).await;

    let resp = responder
        .orchestrator
        .generate(Subject::Motivation, &ResponseContext::new(), false)
        .await;

    assert_eq!(resp.provenance, Provenance::StaticFallback);
    assert_eq!(resp.metadata["primary_error"], "transport");
    assert_eq!(resp.metadata["primary_attempts"], 3);
    assert_eq!(server.request_count().await, 3);
    assert_eq!(responder.orchestrator.store().cache_len(), 0);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockModelServer::start().await;
    server
        .reply_after("finally", Duration::from_secs(3))
        .await;
    let dir = TempDir::new().unwrap();
    let responder = ResponderBuilder::new(config(&server, &dir))
        .build()
        .await
        .unwrap();
    fast_retries(&responder, "celebration", 1, 1).await;

    let resp = responder
        .orchestrator
        .generate(Subject::Celebration, &ResponseContext::new(), false)
        .await;

    assert_eq!(resp.provenance, Provenance::StaticFallback);
    assert_eq!(resp.metadata["primary_error"], "timeout");
}

#[tokio::test]
async fn test_subject_document_round_trips_through_disk() {
    let server = MockModelServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    let path = std::path::PathBuf::from(&config.service.subject_config_path);

    let responder = ResponderBuilder::new(config.clone())
        .build()
        .await
        .unwrap();
    assert!(path.exists());

    responder
        .admin
        .update_subject_config(
            "goal_setting",
            SubjectConfigUpdate {
                prompt_template: Some("Set a goal for {goal}".to_string()),
                cache_ttl_secs: Some(120),
                ..SubjectConfigUpdate::default()
            },
        )
        .await
        .unwrap();

    let on_disk = load_subject_document(&path).unwrap();
    assert!(on_disk.rejected.is_empty());
    assert_eq!(
        on_disk.document.subjects[&Subject::GoalSetting].prompt_template,
        "Set a goal for {goal}"
    );
    assert!(!std::fs::read_to_string(&path).unwrap().contains("sk-test"));

    let reloaded = ResponderBuilder::new(config).build().await.unwrap();
    assert_eq!(
        reloaded.orchestrator.store().document(),
        responder.orchestrator.store().document()
    );
}

#[tokio::test]
async fn test_missing_credentials_mean_unreachable() {
    let server = MockModelServer::start().await;
    server.reply("never called").await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&server, &dir);
    config.providers.openai.api_key = None;
    let responder = ResponderBuilder::new(config).build().await.unwrap();

    let resp = responder
        .orchestrator
        .generate(Subject::TaskCreation, &ResponseContext::new(), false)
        .await;

    assert_eq!(resp.provenance, Provenance::StaticFallback);
    assert_eq!(resp.metadata["primary_error"], "unreachable");
    assert_eq!(server.request_count().await, 0);
}
