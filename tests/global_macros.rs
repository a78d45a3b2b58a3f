//! The global logger is process-wide, so everything touching it lives in a
//! single test.

use throttle_log::infrastructure::mocks::{MockSink, MockStructuredSink};
use throttle_log::{Context, Fields, Severity};

#[test]
fn test_global_logger_macros() {
    let logger = throttle_log::global();
    assert_eq!(logger.level(), Severity::Error);

    let sink = MockSink::new();
    assert!(logger.set_sink(sink.clone(), "debug"));
    logger.set_error_level(Severity::None);

    throttle_log::debug!("d {}", 1);
    throttle_log::info!("i {}", 2);
    throttle_log::warn!("w");
    throttle_log::error!("e {:>3}", 4);
    throttle_log::log!(Severity::Fatal, "f");

    let ctx = Context::background().with_prefix("req");
    throttle_log::info_ctx!(ctx, "with {}", "ctx");
    throttle_log::error_ctx!(ctx, "failed");

    for i in 0..5 {
        throttle_log::log_throttle!(Severity::Warn, 2, "retry {}", i);
        throttle_log::log_throttle_key!(Severity::Info, 1, "fixed", "keyed {}", i);
    }

    let err = throttle_log::log_error!("bad input: {}", "x");
    assert_eq!(err.to_string(), "bad input: x");

    assert_eq!(
        sink.lines(),
        vec![
            "[DEBUG] d 1",
            "[INFO] i 2",
            "[WARN] w",
            "[ERROR] e   4",
            "[FATAL] f",
            "[INFO] req with ctx",
            "[ERROR] req failed",
            "[WARN] retry 0",
            "[INFO] keyed 0",
            "[WARN] retry 1",
            "[ERROR] bad input: x",
        ]
    );
    assert!(sink.sites().iter().all(|site| site.location.file() == file!()));

    let custom = MockStructuredSink::new();
    logger.set_custom_sink(custom.clone());
    let mut fields = Fields::new();
    fields.insert("k".into(), "v".into());
    throttle_log::log_fields!(Severity::Info, fields, "structured");
    assert_eq!(custom.records()[0].fields, Some(fields));

    logger.set_level(Severity::Warn);
    throttle_log::info!("filtered");
    assert_eq!(custom.len(), 1);
}
