//! End-to-end pipeline scenarios over in-memory collaborators.

use erp_gateway::{ErpClient, ScriptedTransport};
use pipeline::{
    DispatchConfig, EventProcessor, InMemoryEmailProvider, InMemoryWarehouse,
    NotificationDispatcher, PipelineError, PipelineOutcome, WarehouseTables, WebhookEvent,
};
use serde_json::json;

struct Fixture {
    transport: ScriptedTransport,
    warehouse: InMemoryWarehouse,
    provider: InMemoryEmailProvider,
    processor: EventProcessor<ScriptedTransport, InMemoryWarehouse, InMemoryEmailProvider>,
}

fn setup() -> Fixture {
    let transport = ScriptedTransport::new();
    let warehouse = InMemoryWarehouse::new();
    let provider = InMemoryEmailProvider::new();

    let erp = ErpClient::with_transport(transport.clone(), "https://erp.example/api2", "t0ken");
    let dispatcher = NotificationDispatcher::new(provider.clone(), DispatchConfig::default());
    let processor = EventProcessor::new(
        erp,
        warehouse.clone(),
        WarehouseTables::default(),
        dispatcher,
    );

    Fixture {
        transport,
        warehouse,
        provider,
        processor,
    }
}

fn event(payload: serde_json::Value) -> WebhookEvent {
    serde_json::from_value(payload).unwrap()
}

fn full_payload() -> WebhookEvent {
    event(json!({"dados": {"id": "123", "cliente": {"nome": "Ana", "cpfCnpj": "111"}}}))
}

fn script_generation_success(fixture: &Fixture) {
    fixture.transport.push_body(json!({
        "retorno": {
            "status_processamento": "3",
            "registros": {"registro": {"idNotaFiscal": "55"}}
        }
    }));
    fixture.transport.push_body(json!({
        "retorno": {"status_processamento": "3", "link_nfe": "http://x/55"}
    }));
}

fn script_item_rows(fixture: &Fixture) {
    fixture.warehouse.on_query_containing(
        "CROSS JOIN UNNEST",
        vec![json!({
            "item_name": "Cafe",
            "item_quantity": 2.0,
            "item_price": 10.0,
            "total_item_price": 20.0,
            "total_discount": "0,00",
            "total_paid": 20.0,
            "payment_method": "pix",
            "sub_total": 20.0
        })],
    );
}

fn script_loyalty(fixture: &Fixture) {
    fixture
        .warehouse
        .on_query_containing("daily_checkins", vec![json!({"daily_checkins": 3})]);
    fixture
        .warehouse
        .on_query_containing("quarter_spend", vec![json!({"quarter_spend": 100.0})]);
    fixture
        .warehouse
        .on_query_containing("total_spend", vec![json!({"total_spend": 500.0})]);
}

fn script_contact_email(fixture: &Fixture, email: &str) {
    fixture
        .warehouse
        .on_query_containing("cpf_cnpj", vec![json!({"email": email})]);
}

#[tokio::test]
async fn missing_transaction_id_makes_no_calls() {
    let fixture = setup();

    let outcome = fixture
        .processor
        .process(&event(json!({"dados": {"cliente": {"nome": "Ana"}}})))
        .await
        .unwrap();

    assert_eq!(outcome, PipelineOutcome::SkippedMalformedPayload);
    assert_eq!(fixture.transport.call_count(), 0);
    assert_eq!(fixture.warehouse.query_count(), 0);
    assert_eq!(fixture.provider.attempt_count(), 0);
}

#[tokio::test]
async fn missing_dados_block_makes_no_calls() {
    let fixture = setup();

    let outcome = fixture.processor.process(&event(json!({}))).await.unwrap();

    assert_eq!(outcome, PipelineOutcome::SkippedMalformedPayload);
    assert_eq!(fixture.transport.call_count(), 0);
    assert_eq!(fixture.provider.attempt_count(), 0);
}

#[tokio::test]
async fn missing_tax_id_skips_after_fiscal_processing() {
    let fixture = setup();
    script_generation_success(&fixture);

    let outcome = fixture
        .processor
        .process(&event(json!({"dados": {"id": "123", "cliente": {"nome": "Ana"}}})))
        .await
        .unwrap();

    assert_eq!(outcome, PipelineOutcome::SkippedMissingTaxId);
    // The fiscal document was still driven through the ERP.
    assert_eq!(fixture.transport.call_count(), 2);
    assert_eq!(fixture.warehouse.query_count(), 0);
    assert_eq!(fixture.provider.attempt_count(), 0);
}

#[tokio::test]
async fn unresolvable_email_skips_without_error() {
    let fixture = setup();
    script_generation_success(&fixture);
    // Warehouse has no contact row; the ERP contact search also misses.
    fixture.transport.push_body(json!({
        "retorno": {"status_processamento": "3", "contatos": []}
    }));

    let outcome = fixture.processor.process(&full_payload()).await.unwrap();

    assert_eq!(outcome, PipelineOutcome::SkippedNoEmail);
    assert_eq!(fixture.provider.attempt_count(), 0);
}

#[tokio::test]
async fn happy_path_sends_the_complete_payload() {
    let fixture = setup();
    script_generation_success(&fixture);
    script_contact_email(&fixture, "ana@x.com");
    script_item_rows(&fixture);
    script_loyalty(&fixture);

    let outcome = fixture.processor.process(&full_payload()).await.unwrap();
    assert_eq!(outcome, PipelineOutcome::Sent);

    let message = fixture.provider.last_message().unwrap();
    assert_eq!(message.to_email, "ana@x.com");
    assert_eq!(message.template_id, "d-f5543523eceb42bc9eec353aebc19aef");

    let data = &message.dynamic_data;
    assert_eq!(data["client_name"], "Ana");
    assert_eq!(data["dados_id"], "123");
    assert_eq!(data["nota_fiscal_url"], "http://x/55");
    assert_eq!(data["sub_total"], 20.0);
    assert_eq!(data["total_paid"], 20.0);
    assert_eq!(data["payment_method"], "pix");
    assert_eq!(data["daily_checkins"], 3);
    assert_eq!(data["quarter_spend"], 100.0);
    assert_eq!(data["lifetime_spend"], 500.0);
    assert_eq!(data["items"][0]["item_name"], "Cafe");
    assert_eq!(data["items"][0]["total_item_price"], 20.0);
}

#[tokio::test]
async fn failed_generation_still_sends_without_receipt_link() {
    let fixture = setup();
    // Generation is rejected as a validation error; no link lookup runs.
    fixture
        .transport
        .push_body(json!({"retorno": {"status_processamento": "2"}}));
    script_contact_email(&fixture, "ana@x.com");
    script_item_rows(&fixture);
    script_loyalty(&fixture);

    let outcome = fixture.processor.process(&full_payload()).await.unwrap();
    assert_eq!(outcome, PipelineOutcome::Sent);

    let data = fixture.provider.last_message().unwrap().dynamic_data;
    assert!(data.get("nota_fiscal_url").is_none());
    assert_eq!(data["sub_total"], 20.0);
}

#[tokio::test]
async fn loyalty_failures_default_to_zero_but_email_still_goes_out() {
    let fixture = setup();
    script_generation_success(&fixture);
    script_contact_email(&fixture, "ana@x.com");
    script_item_rows(&fixture);
    fixture.warehouse.fail_query_containing("daily_checkins", "boom");
    fixture.warehouse.fail_query_containing("quarter_spend", "boom");
    fixture.warehouse.fail_query_containing("total_spend", "boom");

    let outcome = fixture.processor.process(&full_payload()).await.unwrap();
    assert_eq!(outcome, PipelineOutcome::Sent);

    let data = fixture.provider.last_message().unwrap().dynamic_data;
    assert_eq!(data["daily_checkins"], 0);
    assert_eq!(data["quarter_spend"], 0.0);
    assert_eq!(data["lifetime_spend"], 0.0);
    assert_eq!(data["items"][0]["item_name"], "Cafe");
}

#[tokio::test(start_paused = true)]
async fn missing_purchase_items_abort_without_sending() {
    let fixture = setup();
    script_generation_success(&fixture);
    script_contact_email(&fixture, "ana@x.com");
    // No item rows registered: every items query returns empty.

    let err = fixture.processor.process(&full_payload()).await.unwrap_err();
    assert!(matches!(err, PipelineError::IncompleteData(_)));
    assert_eq!(fixture.provider.attempt_count(), 0);

    // The items query ran its full retry budget.
    let item_queries = fixture
        .warehouse
        .queries()
        .iter()
        .filter(|q| q.contains("CROSS JOIN UNNEST"))
        .count();
    assert_eq!(item_queries, 4);
}

#[tokio::test]
async fn warehouse_outage_during_lookup_aborts() {
    let fixture = setup();
    script_generation_success(&fixture);
    fixture
        .warehouse
        .fail_query_containing("cpf_cnpj", "connection lost");

    let err = fixture.processor.process(&full_payload()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Warehouse(_)));
    assert_eq!(fixture.provider.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn provider_exhaustion_is_terminal_but_not_an_error() {
    let fixture = setup();
    script_generation_success(&fixture);
    script_contact_email(&fixture, "ana@x.com");
    script_item_rows(&fixture);
    script_loyalty(&fixture);
    fixture.provider.set_fail_transport(true);

    let outcome = fixture.processor.process(&full_payload()).await.unwrap();
    assert_eq!(outcome, PipelineOutcome::EmailExhausted);
    assert_eq!(fixture.provider.attempt_count(), 3);
    assert_eq!(fixture.provider.sent_count(), 0);
}
