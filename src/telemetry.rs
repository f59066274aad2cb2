//! Prometheus counters for domain events.

use actix_web::{HttpResponse, Responder};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the global recorder once; later calls return the same handle.
pub fn install() -> anyhow::Result<&'static PrometheusHandle> {
    PROMETHEUS.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        tracing::info!("prometheus recorder installed");
        Ok(handle)
    })
}

pub fn request_created() {
    counter!("carehub_requests_created_total").increment(1);
}

pub fn request_completed() {
    counter!("carehub_requests_completed_total").increment(1);
}

pub fn redemption(item: &str) {
    counter!("carehub_redemptions_total", "item" => item.to_string()).increment(1);
}

#[derive(Debug, Clone, Copy)]
pub enum Channel {
    Chat,
    Support,
}

impl Channel {
    fn label(self) -> &'static str {
        match self {
            Channel::Chat => "chat",
            Channel::Support => "support",
        }
    }
}

pub fn message_sent(channel: Channel) {
    counter!("carehub_messages_sent_total", "channel" => channel.label()).increment(1);
}

/// GET /metrics
pub async fn metrics_endpoint() -> impl Responder {
    match PROMETHEUS.get() {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::ServiceUnavailable().body("metrics recorder not installed"),
    }
}
