use std::sync::Arc;
use throttle_log::infrastructure::mocks::MockSink;
use throttle_log::{ContinuationClassifier, FrameClassifier, Logger, Severity, StackFormatter};

const GO_STYLE_TRACE: &str = "\
goroutine 1 [running]:
runtime/debug.Stack(0x0, 0x0)
/usr/local/go/src/runtime/debug/stack.go:24 +0x9d
main.handler(0xc000010000)
/home/app/server.go:42 +0x55
main.main
/home/app/main.go:10 +0x20";

#[test]
fn test_continuation_classifier_filters_noise() {
    let classifier = ContinuationClassifier::default();
    assert!(!classifier.is_signal("main.handler(0xc000010000)"));
    assert!(!classifier.is_signal("/usr/local/go/src/runtime/debug/stack.go:24 +0x9d"));
    assert!(classifier.is_signal("/home/app/server.go:42 +0x55"));

    let formatter = StackFormatter::new(Arc::new(classifier), 1);
    assert_eq!(
        formatter.format(GO_STYLE_TRACE, 10),
        "/home/app/server.go:42 +0x55\nmain.main\n/home/app/main.go:10 +0x20"
    );
    assert_eq!(formatter.format(GO_STYLE_TRACE, 1), "/home/app/server.go:42 +0x55");
}

#[test]
fn test_compact_takes_every_other_line() {
    let formatter = StackFormatter::new(Arc::new(ContinuationClassifier::default()), 1);
    assert_eq!(
        formatter.compact(GO_STYLE_TRACE, 4),
        "/usr/local/go/src/runtime/debug/stack.go:24 +0x9d\n/home/app/server.go:42 +0x55"
    );
    // Shallow traces come back whole.
    assert_eq!(formatter.compact("one\ntwo", 10), "two");
}

#[test]
fn test_logger_trace_calls() {
    let sink = MockSink::new();
    let logger = Logger::builder()
        .with_level(Severity::Debug)
        .with_sink(sink.clone())
        .build()
        .unwrap();

    logger.info_trace(3);
    logger.warn_trace(3);
    logger.log_trace(Severity::Error, "with stack");

    let lines = sink.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("[INFO] \n"));
    assert!(lines[0].lines().count() <= 4);
    assert!(lines[1].starts_with("[WARN] \n"));
    assert!(lines[2].starts_with("[ERROR] with stack\n"));
    assert!(lines[2].lines().count() > 1);
}

#[test]
fn test_trace_below_threshold_is_not_captured() {
    let sink = MockSink::new();
    let logger = Logger::builder()
        .with_level(Severity::Error)
        .with_sink(sink.clone())
        .build()
        .unwrap();

    logger.debug_trace(10);
    logger.log_trace_d(Severity::Info, 10, "x");
    assert!(sink.is_empty());

    assert_eq!(logger.stack_trace(0), "");
}
