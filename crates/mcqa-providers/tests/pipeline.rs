//! End-to-end pipeline tests: CSV rows through the orchestrator to mock
//! backends configured the way `mcqa.toml` configures them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mcqa_core::batch::{BatchDriver, BatchReport, NoopReporter};
use mcqa_core::context::FsContextLoader;
use mcqa_core::loader::load_csv_str;
use mcqa_core::model::{Outcome, QuestionFormat};
use mcqa_core::orchestrator::Orchestrator;
use mcqa_core::output::{JsonDirSink, NoopSink, OutputSink};
use mcqa_core::templates;
use mcqa_core::traits::{Route, StaticBackends};
use mcqa_providers::mock::MockProvider;
use mcqa_providers::{ConfiguredSelector, McqaConfig, ProviderConfig};

fn reply(answer: &str) -> String {
    format!(
        "<MCQResponse><Answer>{answer}</Answer>\
         <RelevantExcerpts>- quoted</RelevantExcerpts>\
         <Thinking>- reasoned</Thinking>\
         <FoundationalKnowledge>No</FoundationalKnowledge></MCQResponse>"
    )
}

const SYNTHETIC_REPLY: &str = "<MCQSynthetic>\
    <SyntheticQuestions><Question>Which class does penicillin belong to?</Question>\
    <Options>A. Beta-lactams B. Macrolides</Options><Answer>A. Beta-lactams</Answer></SyntheticQuestions>\
    <SyntheticQuestions><Question>Which enzyme inactivates penicillin?</Question>\
    <Options>A. Lipase B. Beta-lactamase</Options><Answer>B</Answer></SyntheticQuestions>\
    <SyntheticQuestions><Question>What does penicillin inhibit?</Question>\
    <Options>A. Cell wall synthesis B. DNA gyrase</Options><Answer>A</Answer></SyntheticQuestions>\
    </MCQSynthetic>";

fn csv(context_path: &Path) -> String {
    format!(
        "source_path,Question,options,Correct Answer,Short_Context?,source_type\n\
         {ctx},Which drug is a beta-lactam antibiotic?,\"['A. Ibuprofen', 'B. Penicillin', 'C. Aspirin']\",Penicillin,,txt\n\
         {ctx},Which drug is an NSAID?,\"['A. Ibuprofen', 'B. Penicillin']\",Ibuprofen,Adult patient,txt\n",
        ctx = context_path.display()
    )
}

fn mock_config(responses: HashMap<String, String>) -> McqaConfig {
    let mut providers = HashMap::new();
    providers.insert(
        "mock".to_string(),
        ProviderConfig::Mock {
            responses,
            default_response: reply("Z"),
            fail_on: None,
        },
    );
    McqaConfig {
        providers,
        text_model: "mock/mcq-model".into(),
        multimodal_model: "mock/mcq-vision".into(),
        randomize_options: false,
        retry_delay_ms: 1,
        ..Default::default()
    }
}

fn orchestrator(config: &McqaConfig, sink: Arc<dyn OutputSink>) -> Orchestrator {
    let selector = ConfiguredSelector::new(config).unwrap();
    Orchestrator::new(
        Arc::new(selector),
        Arc::new(FsContextLoader),
        sink,
        config.orchestrator_config(),
    )
}

#[tokio::test]
async fn configured_batch_writes_records_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let context = dir.path().join("antibiotics.txt");
    std::fs::write(&context, "Penicillin is a beta-lactam. Ibuprofen is an NSAID.").unwrap();

    let mut responses = HashMap::new();
    responses.insert("beta-lactam antibiotic".to_string(), reply("B. Penicillin"));
    responses.insert("NSAID?".to_string(), reply("B. Penicillin"));
    let config = mock_config(responses);

    let out = dir.path().join("results");
    let sink = Arc::new(JsonDirSink::new(&out));
    let driver = BatchDriver::new(
        Arc::new(orchestrator(&config, sink.clone())),
        config.request_delay(),
    );

    let rows = load_csv_str(&csv(&context), Path::new("questions.csv")).unwrap();
    let report = driver
        .run(rows, QuestionFormat::Raw, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(report.rows_total, 2);
    assert_eq!(report.rows_failed, 0);
    assert_eq!(report.responses.len(), 2);
    assert!((report.evaluation - 0.5).abs() < 1e-9);
    assert_eq!(report.responses[0].model_identifier, "mcq-model");
    assert_eq!(report.responses[1].actual_answer, "A. Ibuprofen");

    let written = std::fs::read_dir(sink.requests_dir()).unwrap().count();
    assert_eq!(written, 2);

    let report_path = out.join("report.json");
    report.save_json(&report_path).unwrap();
    let loaded = BatchReport::load_json(&report_path).unwrap();
    assert_eq!(loaded.id, report.id);
    assert_eq!(loaded.summary().correct, 1);
}

#[tokio::test]
async fn synthetic_request_aggregates_derived_answers() {
    let backend = Arc::new(MockProvider::from_fn(|request| {
        if request.system_prompt == templates::SYNTHETIC_SYSTEM_PROMPT {
            return SYNTHETIC_REPLY.to_string();
        }
        // Answers the first two derived questions, misses the third
        let p = &request.user_prompt;
        if p.contains("belong to") {
            reply("A. Beta-lactams")
        } else if p.contains("inactivates") {
            reply("B")
        } else {
            reply("B. DNA gyrase")
        }
    }));
    let selector = StaticBackends::single(Route {
        backend: backend.clone(),
        model: "mock-model".into(),
    });
    let orch = Orchestrator::new(
        Arc::new(selector),
        Arc::new(FsContextLoader),
        Arc::new(NoopSink),
        mock_config(HashMap::new()).orchestrator_config(),
    );

    let dir = tempfile::tempdir().unwrap();
    let context = dir.path().join("penicillin.txt");
    std::fs::write(&context, "Penicillin inhibits cell wall synthesis.").unwrap();
    let question = load_csv_str(&csv(&context), Path::new("questions.csv"))
        .unwrap()
        .remove(0)
        .into_question(QuestionFormat::Synthetic);

    let outcome = orch.run(&question).await.unwrap();
    let Outcome::Aggregate(aggregate) = outcome else {
        panic!("synthetic questions aggregate");
    };
    assert_eq!(aggregate.list_of_responses.len(), 3);
    assert!((aggregate.evaluation - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(aggregate.list_of_responses[1].actual_answer, "B. Beta-lactamase");
    // One expansion call plus one per derived question
    assert_eq!(backend.call_count(), 4);
}

#[tokio::test]
async fn failing_derived_question_is_dropped_from_aggregate() {
    let backend = Arc::new(
        MockProvider::from_fn(|request| {
            if request.system_prompt == templates::SYNTHETIC_SYSTEM_PROMPT {
                SYNTHETIC_REPLY.to_string()
            } else {
                reply("A")
            }
        })
        .failing_on("inactivates"),
    );
    let selector = StaticBackends::single(Route {
        backend: backend.clone(),
        model: "mock-model".into(),
    });
    let mut config = mock_config(HashMap::new()).orchestrator_config();
    config.max_retries = 0;
    let orch = Orchestrator::new(
        Arc::new(selector),
        Arc::new(FsContextLoader),
        Arc::new(NoopSink),
        config,
    );

    let dir = tempfile::tempdir().unwrap();
    let context = dir.path().join("penicillin.txt");
    std::fs::write(&context, "Penicillin inhibits cell wall synthesis.").unwrap();
    let question = load_csv_str(&csv(&context), Path::new("questions.csv"))
        .unwrap()
        .remove(0)
        .into_question(QuestionFormat::Synthetic);

    let outcome = orch.evaluate(&question).await.unwrap();
    assert_eq!(outcome.responses().len(), 2);
    assert_eq!(outcome.evaluation(), 1.0);
}

#[tokio::test]
async fn batch_fails_when_every_row_fails() {
    let dir = tempfile::tempdir().unwrap();
    let context = dir.path().join("ctx.txt");
    std::fs::write(&context, "irrelevant").unwrap();

    let mut config = mock_config(HashMap::new());
    config.max_retries = 0;
    if let Some(ProviderConfig::Mock { fail_on, .. }) = config.providers.get_mut("mock") {
        *fail_on = Some("Which drug".into());
    }

    let out = dir.path().join("results");
    let sink = Arc::new(JsonDirSink::new(&out));
    let driver = BatchDriver::new(
        Arc::new(orchestrator(&config, sink.clone())),
        Duration::ZERO,
    );
    let rows = load_csv_str(&csv(&context), Path::new("questions.csv")).unwrap();
    let err = driver
        .run(rows, QuestionFormat::Raw, &NoopReporter)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no rows produced a response"));
    assert_eq!(std::fs::read_dir(sink.failures_dir()).unwrap().count(), 2);
}
