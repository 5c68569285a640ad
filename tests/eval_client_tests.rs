use faithcheck::client::real::RealEvalClient;
use faithcheck::client::EvalClientTrait;
use faithcheck::eval::models::{
    EvaluationRequest, EvaluationSubmission, RunId,
};
use faithcheck::fixtures::{load_fixtures, parse_fixtures};
use faithcheck::orchestrator::EvaluationOrchestrator;
use faithcheck::report::VerificationReport;
use faithcheck::test_utils::init_test_logging;
use faithcheck::{AppState, EvalError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURES: &str = r#"
- query: "Who wrote Hamlet?"
  reference: "Hamlet is a tragedy written by William Shakespeare."
  output: "Hamlet was written by William Shakespeare."
  score: "0.95"
- query: "Who wrote Hamlet?"
  reference: "Hamlet is a tragedy written by William Shakespeare."
  output: "Hamlet was written by Christopher Marlowe in 1620."
  score: "0.05"
- query: "Who wrote Hamlet?"
  reference: "Hamlet is a tragedy written by William Shakespeare."
  output: "Shakespeare wrote Hamlet while living in Paris."
  score: "0.5"
"#;

fn client(server: &MockServer) -> RealEvalClient {
    RealEvalClient::new(&server.uri(), "test-key", Duration::from_secs(5))
        .expect("client")
}

fn run_body(scores: [&str; 3]) -> serde_json::Value {
    json!({
        "label": "unit_test_faithfulness",
        "tags": ["faithfulness"],
        "results": [
            {"score": scores[0], "trace_id": 1},
            {"score": scores[1], "trace_id": 2},
            {"score": scores[2], "trace_id": 3}
        ],
        "aggregate_score": "0.493",
        "p20": "0.07",
        "p90": "0.93"
    })
}

fn tags() -> BTreeSet<String> {
    BTreeSet::from(["faithfulness".to_string()])
}

#[tokio::test]
async fn test_evaluate_posts_submission_with_bearer_token() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/evals/"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "label": "unit_test_faithfulness",
            "evaluator": "faithfulness",
            "tags": ["faithfulness"],
            "traces": [{"query": "q", "reference": "r", "output": "o"}]
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"uuid": "run-42"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut submission =
        EvaluationSubmission::faithfulness("unit_test_faithfulness", tags());
    submission.add_trace(EvaluationRequest {
        query: "q".to_string(),
        reference: "r".to_string(),
        output: "o".to_string(),
    });

    let run_id = client(&server).evaluate(&submission).await.unwrap();
    assert_eq!(run_id, RunId::from("run-42"));
}

#[tokio::test]
async fn test_description_is_posted_with_submission() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/evals/"))
        .and(body_partial_json(json!({
            "label": "unit_test_faithfulness",
            "description": "nightly regression",
            "traces": [
                {"output": "Hamlet was written by William Shakespeare."},
                {
                    "output":
                        "Hamlet was written by Christopher Marlowe in 1620."
                },
                {"output": "Shakespeare wrote Hamlet while living in Paris."}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"uuid": "run-9"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = EvaluationOrchestrator::new(Arc::new(client(&server)))
        .with_description(Some("nightly regression".to_string()));
    let run_id = orchestrator
        .submit(
            &parse_fixtures(FIXTURES).unwrap(),
            "unit_test_faithfulness",
            &tags(),
        )
        .await
        .unwrap();
    assert_eq!(run_id, RunId::from("run-9"));
}

#[tokio::test]
async fn test_evaluate_surfaces_api_errors() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/evals/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let submission =
        EvaluationSubmission::faithfulness("unit_test_faithfulness", tags());
    let err = client(&server).evaluate(&submission).await.unwrap_err();

    match err.downcast_ref::<EvalError>() {
        Some(EvalError::Api { status, body }) => {
            assert_eq!(*status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_eval_run_parses_string_scores() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evals/run-42/"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(run_body(["0.93", "0.07", "0.48"])),
        )
        .mount(&server)
        .await;

    let run = client(&server)
        .get_eval_run(&RunId::from("run-42"))
        .await
        .unwrap()
        .expect("run");
    assert_eq!(run.scores(), vec![0.93, 0.07, 0.48]);
    assert_eq!(run.aggregate_score, 0.493);
    assert_eq!(run.results[2].extra["trace_id"], json!(3));
}

#[tokio::test]
async fn test_get_eval_run_not_found_is_absent() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evals/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let run = client(&server)
        .get_eval_run(&RunId::from("missing"))
        .await
        .unwrap();
    assert!(run.is_none());
}

#[tokio::test]
async fn test_get_eval_run_server_error() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evals/run-42/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .get_eval_run(&RunId::from("run-42"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_faithfulness_run_end_to_end() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/evals/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "run-7"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/evals/run-7/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(run_body(["0.93", "0.07", "0.48"])),
        )
        .mount(&server)
        .await;

    let state =
        AppState::new_for_testing_with_client(Arc::new(client(&server)));
    let orchestrator = EvaluationOrchestrator::new(state.eval_client.clone());
    let fixtures = load_fixtures(
        &Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/data/faithfulness_data.yaml"),
    )
    .unwrap();

    let scenario = orchestrator
        .run(fixtures, "unit_test_faithfulness", &tags())
        .await
        .unwrap();

    let report = VerificationReport::from_scenario(
        &scenario,
        "unit_test_faithfulness",
        "faithfulness",
        0.1,
    );
    assert!(report.passed(), "{:?}", report.outcomes);

    let strict = VerificationReport::from_scenario(
        &scenario,
        "unit_test_faithfulness",
        "faithfulness",
        0.01,
    );
    let failed: Vec<&str> =
        strict.failures().map(|o| o.name.as_str()).collect();
    assert_eq!(failed, vec!["high_score", "low_score", "medium_score"]);
}

#[tokio::test]
async fn test_run_with_reordered_results_fails_item_checks() {
    init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/evals/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "run-8"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/evals/run-8/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(run_body(["0.07", "0.93", "0.48"])),
        )
        .mount(&server)
        .await;

    let orchestrator = EvaluationOrchestrator::new(Arc::new(client(&server)));
    let scenario = orchestrator
        .run(
            parse_fixtures(FIXTURES).unwrap(),
            "unit_test_faithfulness",
            &tags(),
        )
        .await
        .unwrap();

    // Aggregates ignore order, positional scores do not.
    assert!(scenario.check_statistics(0.1).passed);
    assert!(!scenario.check_item(0, 0.1).unwrap().passed);
    assert!(!scenario.check_item(1, 0.1).unwrap().passed);
    assert!(scenario.check_item(2, 0.1).unwrap().passed);
}
