//! End-to-end behaviour of `thread`:
//! - implicitly passed as first argument
//! - explicitly passed as nth argument
//! - spread using `X.spread()`
//! - the first thing must be callable (closure, method, expression)
//! - `x` / `*x` cannot be the first thing
//! - method call, attribute access, key lookup and chained key lookup
//! - usage with higher order functions like map
//! - stop and return early

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;
use threadx::{builtins, func, step, thread, Func, Object, Pipeline, Step, ThreadError, Value, STOP, X};

fn return_args() -> Func {
    func("return_args", |args| Ok(Value::List(args)))
}

fn list<T: Into<Value>>(items: Vec<T>) -> Value {
    Value::list(items)
}

#[derive(Debug)]
struct Foo {
    instance_attribute: String,
}

fn foo(a: &str) -> Value {
    Value::object(Foo {
        instance_attribute: a.to_string(),
    })
}

impl Object for Foo {
    fn type_name(&self) -> &str {
        "Foo"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "class_attribute" => Some("class_attribute".into()),
            "instance_attribute" => Some(self.instance_attribute.clone().into()),
            "return_args" => Some(return_args().into()),
            _ => None,
        }
    }
}

#[test]
fn implicit_first_argument() {
    assert_eq!(thread!(1, (return_args(),)).unwrap(), list(vec![1]));
    assert_eq!(thread!(1, return_args()).unwrap(), list(vec![1]));
}

#[test]
fn explicit_first_argument() {
    assert_eq!(thread!(1, (return_args(), X)).unwrap(), list(vec![1]));
}

#[test]
fn x_as_nth_argument() {
    let here = || Value::from("here");
    assert_eq!(
        thread!("here", (return_args(), X, 1, 2, 4)).unwrap(),
        list(vec![here(), 1.into(), 2.into(), 4.into()])
    );
    assert_eq!(
        thread!("here", (return_args(), 1, X, 2, 4)).unwrap(),
        list(vec![1.into(), here(), 2.into(), 4.into()])
    );
    assert_eq!(
        thread!("here", (return_args(), 1, 2, X, 4)).unwrap(),
        list(vec![1.into(), 2.into(), here(), 4.into()])
    );
    assert_eq!(
        thread!("here", (return_args(), 1, 2, 4, X)).unwrap(),
        list(vec![1.into(), 2.into(), 4.into(), here()])
    );
}

#[test]
fn unpack() {
    assert_eq!(
        thread!(list(vec![2, 3]), (return_args(), 1, X.spread(), 4, 5)).unwrap(),
        list(vec![1, 2, 3, 4, 5])
    );
    assert_eq!(
        thread!(list(vec![0, 10]), (builtins::range(), X.spread())).unwrap(),
        Value::list((0..10).collect::<Vec<i64>>())
    );
    assert_eq!(
        thread!(list(vec![1, 2]), (return_args(), 9, X.spread(), 8)).unwrap(),
        list(vec![9, 1, 2, 8])
    );
}

#[test]
fn unpack_of_a_scalar_fails() {
    let err = thread!(3, (return_args(), X.spread())).unwrap_err();
    assert!(matches!(err, ThreadError::NotIterable { type_name } if type_name == "int"));
}

#[test]
fn first_thing_should_be_callable() {
    let expected = "First thing in a step needs to be a callable. Got <str>:i_am_not_callable";

    let err = thread!(1, "i_am_not_callable").unwrap_err();
    assert!(err.is_usage());
    assert_eq!(err.to_string(), expected);

    let err = thread!(1, ("i_am_not_callable",)).unwrap_err();
    assert_eq!(err.to_string(), expected);

    let err = thread!(1, (5, X)).unwrap_err();
    assert!(matches!(err, ThreadError::NotCallable { type_name, value } if type_name == "int" && value == "5"));
}

#[test]
fn first_thing_cannot_be_x() {
    let err = thread!(1, X).unwrap_err();
    assert!(matches!(err, ThreadError::PlaceholderHead));
    assert_eq!(err.to_string(), "x cannot be the first thing.");

    let err = thread!(1, (X,)).unwrap_err();
    assert!(matches!(err, ThreadError::PlaceholderHead));

    let err = thread!(1, (X, 1, 2)).unwrap_err();
    assert!(matches!(err, ThreadError::PlaceholderHead));
}

#[test]
fn first_thing_cannot_be_unpack() {
    let err = thread!(list(vec![1]), X.spread()).unwrap_err();
    assert!(matches!(err, ThreadError::UnpackHead));
    assert_eq!(err.to_string(), "*x cannot be the first thing.");
}

#[test]
fn usage_errors_surface_after_earlier_steps_ran() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = {
        let calls = Arc::clone(&calls);
        func("counter", move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(args.into_iter().next().unwrap_or_default())
        })
    };
    let err = thread!(1, counter.clone(), counter, "oops").unwrap_err();
    assert!(err.is_usage());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn second_marker_is_rejected() {
    let err = thread!(1, (return_args(), X, 2, X)).unwrap_err();
    assert!(matches!(err, ThreadError::ExtraMarker { position: 2 }));

    let err = thread!(list(vec![1]), (return_args(), X.spread(), X)).unwrap_err();
    assert!(matches!(err, ThreadError::ExtraMarker { position: 1 }));
}

#[test]
fn method_call() {
    assert_eq!(
        thread!(foo("o"), (X.attr("return_args"), 1, 2, 3, 4)).unwrap(),
        list(vec![1, 2, 3, 4])
    );
    assert_eq!(thread!(list(vec![1, 2, 3, 4]), X.attr("__len__")).unwrap(), Value::Int(4));
    assert_eq!(thread!(list(vec![1, 2, 3, 4]), (X.attr("index"), 4)).unwrap(), Value::Int(3));
    assert_eq!(thread!(list(vec![1, 2, 3, 2]), (X.attr("count"), 2)).unwrap(), Value::Int(2));
}

#[test]
fn attribute_access() {
    assert_eq!(
        thread!(foo("o"), X.attr("instance_attribute")).unwrap(),
        Value::from("o")
    );
    assert_eq!(
        thread!(foo("o"), X.attr("class_attribute")).unwrap(),
        Value::from("class_attribute")
    );
}

#[test]
fn attribute_with_surplus_arguments() {
    let err = thread!(foo("o"), (X.attr("instance_attribute"), 1)).unwrap_err();
    assert!(matches!(err, ThreadError::AttributeNotCallable { extra: 1, .. }));

    let out = thread!(
        foo("o"),
        (X.attr("instance_attribute").ignore_extra_args(), 1)
    );
    assert_eq!(out.unwrap(), Value::from("o"));
}

#[test]
fn missing_attribute() {
    let err = thread!(foo("o"), X.attr("nope")).unwrap_err();
    assert_eq!(err.to_string(), "'Foo' object has no attribute 'nope'");
}

#[test]
fn key_lookup() {
    let data = Value::from(json!({"a": {"b": [10, 12]}}));
    assert_eq!(
        thread!(data.clone(), X.item("a")).unwrap(),
        Value::from(json!({"b": [10, 12]}))
    );
    assert_eq!(thread!(data.clone(), X.item("a").item("b")).unwrap(), list(vec![10, 12]));
    assert_eq!(thread!(data, X.item("a").item("b").item(0)).unwrap(), Value::Int(10));
}

#[test]
fn higher_order_functions() {
    let data = Value::from(json!({"a": {"b": [10, 12]}}));
    let pair = || list(vec![data.clone(), data.clone()]);

    assert_eq!(
        thread!(pair(), (builtins::map(), X.item("a"), X), builtins::to_list()).unwrap(),
        Value::from(json!([{"b": [10, 12]}, {"b": [10, 12]}]))
    );
    assert_eq!(
        thread!(pair(), (builtins::map(), X.item("a").item("b"), X), builtins::to_list()).unwrap(),
        Value::from(json!([[10, 12], [10, 12]]))
    );
    assert_eq!(
        thread!(pair(), (builtins::map(), X.item("a").item("b").item(1), X), builtins::to_list())
            .unwrap(),
        list(vec![12, 12])
    );
}

#[test]
fn stop_and_return() {
    assert_eq!(
        thread!(list(vec![1, 2, 3, 4]), builtins::sum(), STOP, builtins::to_str()).unwrap(),
        Value::Int(10)
    );
    assert_eq!(
        thread!(list(vec![1, 2, 3, 4]), STOP, builtins::to_str()).unwrap(),
        list(vec![1, 2, 3, 4])
    );
}

#[test]
fn stop_never_invokes_later_steps() {
    let called = Arc::new(AtomicUsize::new(0));
    let later = {
        let called = Arc::clone(&called);
        func("later", move |_| {
            called.fetch_add(1, Ordering::SeqCst);
            Ok(Value::None)
        })
    };
    assert_eq!(thread!(5, X + 1, STOP, later).unwrap(), Value::Int(6));
    assert_eq!(called.load(Ordering::SeqCst), 0);
}

#[test]
fn stop_as_an_argument_is_a_plain_callable() {
    let out = thread!(1, (return_args(), STOP)).unwrap();
    match out {
        Value::List(items) => {
            assert_eq!(items.len(), 2);
            assert!(items[1].as_func().is_some_and(Func::is_stop));
        }
        other => panic!("expected a list, got {other}"),
    }
}

#[test]
fn callable_errors_propagate_unchanged() {
    #[derive(Debug, thiserror::Error)]
    #[error("custom failure {0}")]
    struct Custom(u8);

    let failing = func("failing", |_| Err(Custom(7).into()));
    let err = thread!(1, X + 1, failing, X + 1).unwrap_err();
    match err {
        ThreadError::Callable(inner) => {
            assert_eq!(inner.downcast_ref::<Custom>().map(|c| c.0), Some(7));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn nested_thread_errors_are_not_rewrapped() {
    let nested = func("nested", |args| Ok(thread(args.into_iter().next().unwrap_or_default(), [X])?));
    let err = thread!(1, nested).unwrap_err();
    assert!(matches!(err, ThreadError::PlaceholderHead));
}

#[test]
fn evaluation_errors_propagate() {
    let err = thread!(Value::from(json!({"a": 1})), X.item("b")).unwrap_err();
    assert!(matches!(err, ThreadError::KeyNotFound { .. }));
    let err = thread!(1, X / 0).unwrap_err();
    assert!(matches!(err, ThreadError::DivisionByZero));
}

#[test]
fn step_macro_and_pipeline_builder() {
    let pipeline = Pipeline::new()
        .then(step!(return_args(), 1, X, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12))
        .then(builtins::len());
    assert_eq!(pipeline.run("v").unwrap(), Value::Int(13));

    let steps: Vec<Step> = vec![(return_args(), 0, X).into(), X.item(1).into()];
    assert_eq!(thread("v", steps).unwrap(), Value::from("v"));
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn warning_is_logged_when_arguments_are_ignored() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();

    let out = tracing::subscriber::with_default(subscriber, || {
        thread!(
            foo("o"),
            (X.attr("class_attribute").ignore_extra_args(), 1, 2)
        )
    });
    assert_eq!(out.unwrap(), Value::from("class_attribute"));

    let logs = logs.contents();
    assert!(logs.contains("WARN"), "{logs}");
    assert!(
        logs.contains("arguments supplied to a non-callable attribute were ignored"),
        "{logs}"
    );
    assert!(logs.contains("dropped=2"), "{logs}");
    assert!(logs.contains("attribute=class_attribute"), "{logs}");
}

#[test]
fn rejected_arguments_log_nothing() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();

    let out = tracing::subscriber::with_default(subscriber, || {
        thread!(foo("o"), (X.attr("class_attribute"), 1, 2))
    });
    assert!(matches!(out, Err(ThreadError::AttributeNotCallable { extra: 2, .. })));
    assert_eq!(logs.contents(), "");
}

#[test]
fn json_maps_keep_their_key_order() {
    let data = Value::from(json!({"z": 1, "a": 2, "m": 3}));
    assert_eq!(
        thread!(data.clone(), X.attr("keys")).unwrap(),
        list(vec!["z", "a", "m"])
    );
    assert_eq!(
        thread!(data.clone(), (return_args(), X.spread())).unwrap(),
        list(vec!["z", "a", "m"])
    );
    assert_eq!(data.to_string(), r#"{"z": 1, "a": 2, "m": 3}"#);
}
