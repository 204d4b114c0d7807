use std::{cell::RefCell, sync::Once};

use actix_web_middleware_reqlog::DEFAULT_LOG_TARGET;

/// A record seen by the capturing logger.
#[derive(Debug, Clone)]
pub struct Captured {
    pub level: log::Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Captured {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

thread_local! {
    // actix test runtimes are single threaded, so records stay with the test that made them
    static RECORDS: RefCell<Vec<Captured>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

static LOGGER: CaptureLogger = CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut visitor = FieldVisitor(Vec::new());
        let _ = record.key_values().visit(&mut visitor);

        let captured = Captured {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            fields: visitor.0,
        };
        RECORDS.with(|records| records.borrow_mut().push(captured));
    }

    fn flush(&self) {}
}

struct FieldVisitor(Vec<(String, String)>);

impl<'kvs> log::kv::VisitSource<'kvs> for FieldVisitor {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.0.push((key.to_string(), value.to_string()));
        Ok(())
    }
}

pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Drains the access log records emitted on this thread under `target`.
pub fn take(target: &str) -> Vec<Captured> {
    RECORDS.with(|records| {
        let (taken, rest) = records
            .take()
            .into_iter()
            .partition(|record| record.target == target);
        records.replace(rest);
        taken
    })
}

pub fn take_access_logs() -> Vec<Captured> {
    take(DEFAULT_LOG_TARGET)
}
