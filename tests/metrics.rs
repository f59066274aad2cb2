use actix_web::{test, App};
use carehub::{config, telemetry};

#[actix_web::test]
async fn metrics_endpoint_renders_domain_counters() {
    let first = telemetry::install().expect("recorder");
    let second = telemetry::install().expect("same recorder");
    assert!(std::ptr::eq(first, second));

    telemetry::request_created();
    telemetry::redemption("RM5 Voucher");
    telemetry::message_sent(telemetry::Channel::Support);

    let app = test::init_service(App::new().configure(config)).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
    assert!(resp.status().is_success());
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("carehub_requests_created_total 1"));
    assert!(body.contains(r#"carehub_redemptions_total{item="RM5 Voucher"} 1"#));
    assert!(body.contains(r#"carehub_messages_sent_total{channel="support"} 1"#));
}
