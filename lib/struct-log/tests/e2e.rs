use std::io;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, info_span, warn};
use tracing_bunyan_formatter::JsonStorageLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use struct_log::JsonLogLayer;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Run a closure and collect the output emitted by the tracing instrumentation
// as new-line-delimited JSON.
fn run_and_get_output<F: Fn()>(action: F) -> Vec<Value> {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let formatting_layer = JsonLogLayer::with_hostname(
        "vault-token-renewer".into(),
        "e2e".into(),
        "pod-0".into(),
        move || writer.clone(),
    );
    let subscriber = Registry::default()
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::with_default(subscriber, action);

    let output = buffer.0.lock().unwrap().clone();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .collect()
}

fn renewal_events() {
    info!("vault token updated");
    let span = info_span!("lease", accessor = "acc-1");
    let _guard = span.enter();
    warn!(ttl_secs = 60u64, "vault token renewed");
    error!(error = "permission denied", "could not renew vault token");
}

#[test]
fn each_line_has_the_base_fields() {
    let output = run_and_get_output(renewal_events);
    assert_eq!(output.len(), 3);

    for record in output {
        for field in [
            "timestamp",
            "level",
            "target",
            "message",
            "application",
            "version",
            "hostname",
            "file",
            "line",
        ] {
            assert!(record.get(field).is_some(), "missing {} in {}", field, record);
        }
        assert_eq!(record["application"], "vault-token-renewer");
        assert_eq!(record["hostname"], "pod-0");
    }
}

#[test]
fn event_and_span_fields_are_flattened() {
    let output = run_and_get_output(renewal_events);

    assert_eq!(output[0]["message"], "vault token updated");
    assert_eq!(output[0]["level"], "info");
    assert!(output[0].get("span").is_none());

    assert_eq!(output[1]["level"], "warn");
    assert_eq!(output[1]["ttl_secs"], 60);
    assert_eq!(output[1]["span"], "lease");
    assert_eq!(output[1]["accessor"], "acc-1");

    assert_eq!(output[2]["level"], "error");
    assert_eq!(output[2]["error"], "permission denied");
}

#[test]
fn reserved_fields_are_not_overridden() {
    let output = run_and_get_output(|| {
        info!(application = "spoofed", "hello");
    });

    assert_eq!(output[0]["application"], "vault-token-renewer");
    assert_eq!(output[0]["message"], "hello");
}

#[test]
fn timestamp_is_formatted_according_to_rfc_3339() {
    let output = run_and_get_output(renewal_events);

    for record in output {
        let timestamp = record["timestamp"].as_str().unwrap();
        let parsed = time::OffsetDateTime::parse(timestamp, &Rfc3339).unwrap();
        assert!(parsed.offset().is_utc());
    }
}
