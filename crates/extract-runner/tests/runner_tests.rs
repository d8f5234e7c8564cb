// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end runs of the batch runner against a mock completions endpoint

use std::{collections::HashMap, path::Path};

use extract_runner::{RunnerConfig, loader::read_json, run};
use serde_json::{Value, json};
use shipment_extractor::{ExtractorConfig, InferenceConfig};
use shipment_types::{ExtractionFailure, FailureReason, ShipmentRecord};
use tempfile::TempDir;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

const MODELS_YAML: &str = r#"
model_registry:
  shipment_extraction:
    primary: llama-3.1-70b-versatile
    fallback: llama-3.3-70b-versatile
"#;

const PROMPTS_JSON: &str = r#"{
    "versions": [
        {
            "version": "3.0.0",
            "date": "2025-01-14",
            "description": "Business rules with port reference",
            "system_message": "You extract structured shipment data from freight forwarding emails.",
            "user_template": "PORT CODE REFERENCE:\n{port_reference}\n\nEmail Subject: {subject}\nEmail Body: {body}"
        }
    ],
    "current_version": "3.0.0"
}"#;

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "llama-3.1-70b-versatile",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(root.join("models.yaml"), MODELS_YAML).unwrap();
    std::fs::write(root.join("prompts.json"), PROMPTS_JSON).unwrap();
    std::fs::write(
        root.join("ports.json"),
        json!([
            { "code": "HKHKG", "name": "Hong Kong" },
            { "code": "INMAA", "name": "Chennai" }
        ])
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        root.join("emails.json"),
        json!([
            {
                "id": "EMAIL_001",
                "subject": "LCL HK to Chennai",
                "body": "CASE_VALID 1200.456 kg, 3.2 cbm, FOB"
            },
            {
                "id": "EMAIL_002",
                "subject": "Re: rates",
                "body": "CASE_PROSE thanks for the update"
            }
        ])
        .to_string(),
    )
    .unwrap();

    dir
}

fn config_for(root: &Path, server: &MockServer, extra: &[(&str, &str)]) -> RunnerConfig {
    let mut vars: HashMap<String, String> = [
        ("EXTRACT_API_KEY", "test-key".to_string()),
        ("EXTRACT_BASE_URL", server.uri()),
        ("EXTRACT_INTER_ITEM_DELAY_MS", "0".to_string()),
        ("EXTRACT_PATHS__EMAILS", path_str(&root.join("emails.json"))),
        ("EXTRACT_PATHS__PORTS", path_str(&root.join("ports.json"))),
        ("EXTRACT_PATHS__MODELS", path_str(&root.join("models.yaml"))),
        ("EXTRACT_PATHS__PROMPTS", path_str(&root.join("prompts.json"))),
        ("EXTRACT_PATHS__OUTPUT", path_str(&root.join("out").join("output.json"))),
        ("EXTRACT_PATHS__FAILURES", path_str(&root.join("out").join("failures.json"))),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    for (key, value) in extra {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    RunnerConfig::load_from(&[], RunnerConfig::environment_source().source(Some(vars))).unwrap()
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn mount_responses(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("CASE_VALID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            &json!({
                "product_line": "pl_sea_import_lcl",
                "origin_port_code": "HKHKG",
                "origin_port_name": "Hong Kong",
                "destination_port_code": "INMAA",
                "destination_port_name": "Chennai",
                "incoterm": "fob",
                "cargo_weight_kg": 1200.456,
                "cargo_cbm": 3.2,
                "is_dangerous": false
            })
            .to_string(),
        )))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("CASE_PROSE"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("No shipment details found.")),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn writes_records_and_failures() {
    let dir = workspace();
    let server = MockServer::start().await;
    mount_responses(&server).await;

    let config = config_for(dir.path(), &server, &[]);
    let summary = assert_ok!(run(&config, &CancellationToken::new()).await);

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let records: Vec<ShipmentRecord> = read_json(&config.paths.output).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "EMAIL_001");
    assert_eq!(records[0].cargo_weight_kg, Some(1200.46));

    let failures: Vec<ExtractionFailure> = read_json(&config.paths.failures).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, "EMAIL_002");
    assert_eq!(failures[0].reason, FailureReason::InvalidJson);

    let raw: Value = read_json(&config.paths.output).await.unwrap();
    assert_eq!(raw[0]["incoterm"], "FOB");
}

#[tokio::test]
async fn placeholders_keep_output_aligned_with_input() {
    let dir = workspace();
    let server = MockServer::start().await;
    mount_responses(&server).await;

    let config = config_for(dir.path(), &server, &[("EXTRACT_WRITE_PLACEHOLDERS", "true")]);
    run(&config, &CancellationToken::new()).await.unwrap();

    let records: Vec<ShipmentRecord> = read_json(&config.paths.output).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1], ShipmentRecord::placeholder("EMAIL_002"));
}

#[tokio::test]
async fn cancelled_run_writes_empty_outputs() {
    let dir = workspace();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(dir.path(), &server, &[]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run(&config, &cancel).await.unwrap();
    assert_eq!(summary.total, 0);

    let records: Vec<ShipmentRecord> = read_json(&config.paths.output).await.unwrap();
    let failures: Vec<ExtractionFailure> = read_json(&config.paths.failures).await.unwrap();
    assert!(records.is_empty());
    assert!(failures.is_empty());
}

#[tokio::test]
async fn missing_registry_fails_before_any_call() {
    let dir = workspace();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let absent = path_str(&dir.path().join("absent.yaml"));
    let config = config_for(dir.path(), &server, &[("EXTRACT_PATHS__MODELS", absent.as_str())]);

    let err = run(&config, &CancellationToken::new()).await.unwrap_err();
    assert!(format!("{err:#}").contains("failed to load extractor registries"));
    assert!(!config.paths.output.exists());
}

#[tokio::test]
async fn bundled_registries_load() {
    let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");

    let config = ExtractorConfig::from_files(
        assets.join("configs/models.yaml"),
        assets.join("prompts/extraction_prompts.json"),
        InferenceConfig::new("test-key"),
    )
    .await
    .unwrap();

    let summary = config.get_summary();
    assert_eq!(summary.primary_model.as_deref(), Some("llama-3.1-70b-versatile"));
    assert_eq!(summary.fallback_model.as_deref(), Some("llama-3.3-70b-versatile"));
    assert_eq!(summary.active_prompt_version.as_deref(), Some("3.0.0"));
    assert_eq!(summary.prompt_versions.len(), 3);

    let prompt = config.prompt().unwrap();
    assert!(prompt.user_template.contains("{port_reference}"));
}
