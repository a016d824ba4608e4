use serde_json::{Map, Value};
use std::io::Write;
use time::format_description::well_known::Rfc3339;
use tracing::{Event, Subscriber};
use tracing_bunyan_formatter::JsonStorage;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const TIMESTAMP: &str = "timestamp";
const LEVEL: &str = "level";
const TARGET: &str = "target";
const MESSAGE: &str = "message";
const APPLICATION: &str = "application";
const VERSION: &str = "version";
const HOSTNAME: &str = "hostname";
const FILE: &str = "file";
const LINE: &str = "line";
const SPAN: &str = "span";

const RESERVED_FIELDS: [&str; 10] = [
    TIMESTAMP,
    LEVEL,
    TARGET,
    MESSAGE,
    APPLICATION,
    VERSION,
    HOSTNAME,
    FILE,
    LINE,
    SPAN,
];

/// Writes every event as one JSON object per line.
///
/// Event fields and the fields of the current span are flattened next to the
/// base fields; a user field never overrides a base one.
pub struct JsonLogLayer<W: for<'a> MakeWriter<'a> + 'static> {
    make_writer: W,
    application: String,
    version: String,
    hostname: String,
}

impl<W: for<'a> MakeWriter<'a> + 'static> JsonLogLayer<W> {
    pub fn new(application: String, version: String, make_writer: W) -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::with_hostname(application, version, hostname, make_writer)
    }

    pub fn with_hostname(
        application: String,
        version: String,
        hostname: String,
        make_writer: W,
    ) -> Self {
        Self {
            make_writer,
            application,
            version,
            hostname,
        }
    }

    fn base_record(&self, event: &Event<'_>, message: String) -> Map<String, Value> {
        let metadata = event.metadata();
        let mut record = Map::new();

        if let Ok(now) = time::OffsetDateTime::now_utc().format(&Rfc3339) {
            record.insert(TIMESTAMP.into(), now.into());
        }
        record.insert(LEVEL.into(), metadata.level().as_str().to_lowercase().into());
        record.insert(TARGET.into(), metadata.target().into());
        record.insert(MESSAGE.into(), message.into());
        record.insert(APPLICATION.into(), self.application.clone().into());
        record.insert(VERSION.into(), self.version.clone().into());
        record.insert(HOSTNAME.into(), self.hostname.clone().into());
        if let Some(file) = metadata.file() {
            record.insert(FILE.into(), file.into());
        }
        if let Some(line) = metadata.line() {
            record.insert(LINE.into(), line.into());
        }
        record
    }

    fn emit(&self, record: Map<String, Value>) -> std::io::Result<()> {
        let mut buffer = serde_json::to_vec(&record)?;
        buffer.push(b'\n');
        self.make_writer.make_writer().write_all(&buffer)
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = JsonStorage::default();
        event.record(&mut fields);

        let message = match fields.values().get(MESSAGE) {
            Some(Value::String(s)) => s.clone(),
            _ => event.metadata().target().to_owned(),
        };
        let mut record = self.base_record(event, message);

        for (key, value) in fields.values() {
            if !RESERVED_FIELDS.contains(key) {
                record.insert((*key).to_owned(), value.clone());
            }
        }

        if let Some(span) = ctx.lookup_current() {
            record.insert(SPAN.into(), span.name().into());
            let extensions = span.extensions();
            if let Some(span_fields) = extensions.get::<JsonStorage>() {
                for (key, value) in span_fields.values() {
                    if !RESERVED_FIELDS.contains(key) {
                        record.entry((*key).to_owned()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        let _ = self.emit(record);
    }
}
