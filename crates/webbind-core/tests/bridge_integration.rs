//! End-to-end tests: a headless engine loop on the test thread, with
//! script calls and dispatches arriving from other threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::json;
use webbind_core::{HeadlessEngine, Status, Variadic, Webview};

fn echo(s: String, _n: i64) -> Result<String, String> {
    Ok(s)
}

#[test]
fn test_binding_round_trip_from_worker() {
    let webview = Webview::new(HeadlessEngine::new(false));
    webview.bind("echo", echo).unwrap();
    webview
        .bind("sum", |_s: String, nums: Variadic<i64>| -> Result<i64, String> {
            Ok(nums.iter().sum())
        })
        .unwrap();

    let proxy = webview.proxy();
    let worker = thread::spawn(move || {
        let echoed = proxy.engine().call("echo", r#"["a", 3]"#).recv().unwrap();
        let short = proxy.engine().call("echo", r#"["a"]"#).recv().unwrap();
        let summed = proxy.engine().call("sum", r#"["x", 1, 2, 3]"#).recv().unwrap();
        proxy.terminate();
        (echoed, short, summed)
    });

    webview.run();
    let (echoed, short, summed) = worker.join().unwrap();

    assert_eq!(echoed.status, Status::Ok);
    assert_eq!(echoed.payload, r#""a""#);
    assert_eq!(short.status, Status::Error);
    assert!(short.payload.contains("mismatch"));
    assert_eq!(summed.status, Status::Ok);
    assert_eq!(summed.payload, "6");
}

#[test]
fn test_dispatch_runs_on_ui_thread() {
    let webview = Webview::new(HeadlessEngine::new(false));
    let ui = thread::current().id();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let proxy = webview.proxy();
    let record = Arc::clone(&seen);
    let poster = thread::spawn(move || {
        for i in 0..10 {
            let record = Arc::clone(&record);
            proxy.dispatch(move || record.lock().push((i, thread::current().id())));
        }
        let stopper = proxy.clone();
        proxy.dispatch(move || stopper.terminate());
    });

    poster.join().unwrap();
    webview.run();

    let seen = seen.lock();
    assert_eq!(seen.len(), 10);
    for (expected, (i, tid)) in seen.iter().enumerate() {
        assert_eq!(*i, expected);
        assert_eq!(*tid, ui);
    }
    assert!(webview.bridge().table().is_empty());
}

#[test]
fn test_binding_can_dispatch_reentrantly() {
    let webview = Webview::new(HeadlessEngine::new(false));
    let proxy = webview.proxy();
    let hits = Arc::new(AtomicUsize::new(0));

    let inner = proxy.clone();
    let counter = Arc::clone(&hits);
    webview
        .bind("ping", move |n: u32| {
            let counter = Arc::clone(&counter);
            inner.dispatch(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            n + 1
        })
        .unwrap();

    let rx = webview.engine().call("ping", "[41]");
    proxy.dispatch({
        let proxy = proxy.clone();
        move || proxy.terminate()
    });
    webview.run();

    let c = rx.recv().unwrap();
    assert_eq!(c.payload, "42");
    // The dispatch posted from inside the binding is queued ahead of the
    // terminate request raised by the later dispatch.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(webview.bridge().table().len(), 1);
}

#[test]
fn test_application_error_and_panic_reach_script() {
    let webview = Webview::new(HeadlessEngine::new(false));
    webview
        .bind("fail", || -> Result<(), String> { Err("someError".into()) })
        .unwrap();
    webview.bind("explode", || -> u8 { panic!("bad state") }).unwrap();

    let fail = webview.engine().call("fail", "[]");
    let explode = webview.engine().call("explode", "[]");
    webview.terminate();
    webview.run();

    let fail = fail.recv().unwrap();
    assert_eq!(fail.status, Status::Error);
    assert_eq!(fail.payload, json!("someError").to_string());

    let explode = explode.recv().unwrap();
    assert_eq!(explode.status, Status::Error);
    assert_eq!(explode.payload, json!("function panicked: bad state").to_string());
}

#[test]
fn test_unbound_name_after_unbind() {
    let webview = Webview::new(HeadlessEngine::new(false));
    webview.bind("gone", || true).unwrap();
    webview.unbind("gone").unwrap();

    let rx = webview.engine().call("gone", "[]");
    webview.terminate();
    webview.run();

    assert_eq!(rx.recv().unwrap().status, Status::Error);
    assert!(webview.engine().bindings().is_empty());
}
