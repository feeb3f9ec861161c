//! Black-box coverage of spec.md §8's concrete scenarios, driven
//! entirely through the public API rather than any crate-internal
//! type.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use pleb::{
    dispatch, ClientEndpoint, Filtering, Message, Method, Request, Response, Service, Status,
    Subscription, Topic, Value,
};

#[test]
fn root_event_reaches_nested_subscriber() {
    let root = Topic::eager("/bus-test/scenario-1");
    let count = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&count);
    let _handle = Subscription::builder()
        .install(&root, move |message| {
            if let Some(v) = message.value().and_then(|v| v.downcast_ref::<i32>()) {
                if *v == 42 {
                    sink.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
        .unwrap();

    let nested = root.child("sensors").unwrap().child("temp").unwrap().child("0").unwrap();
    dispatch::publish(Message::new(nested, 200).with_value(Value::new(42i32)));

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_event_reaches_root_subscriber_only_when_recursive() {
    let root = Topic::eager("/bus-test/scenario-2");
    let count = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&count);
    let _handle = Subscription::builder()
        .install(&root, move |_message| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let nested = root.child("a").unwrap().child("b").unwrap().child("c").unwrap();
    dispatch::publish(Message::new(nested.clone(), 200));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    dispatch::publish(Message::new(nested, 200).with_filtering(Filtering::REGULAR));
    assert_eq!(count.load(Ordering::SeqCst), 1, "non-recursive publish must not reach the ancestor");
}

#[test]
fn single_acceptor_request_walk_delivers_response() {
    let api = Topic::eager("/bus-test/scenario-3/api");
    let _handle = Service::builder()
        .ignoring(Filtering::default_receiver_ignore())
        .install(&api, |req| req.respond(Response::new(Status::OK)))
        .unwrap();

    let resource = Topic::lazy("/bus-test/scenario-3/api/v1/resource");
    let (tx, rx) = std::sync::mpsc::channel();
    let req = Request::new(resource, Method::Get).with_endpoint(ClientEndpoint::Channel(tx));
    dispatch::request(req).unwrap();

    assert_eq!(rx.recv().unwrap().status(), Status::OK);
}

#[test]
fn request_with_no_service_anywhere_reports_service_not_found() {
    let topic = Topic::eager("/bus-test/scenario-4/unknown");
    let (tx, rx) = std::sync::mpsc::channel();
    let req = Request::new(topic, Method::Get).with_endpoint(ClientEndpoint::Channel(tx));
    dispatch::request(req).unwrap();
    assert_eq!(rx.recv().unwrap().status(), Status::SERVICE_UNAVAILABLE);
}

#[test]
fn duplicate_service_install_is_rejected_until_first_drops() {
    let topic = Topic::eager("/bus-test/scenario-5");
    let first = Service::builder().install(&topic, |req| req.respond(Response::new(Status::OK))).unwrap();
    assert!(first.is_some());

    let second = Service::builder().install(&topic, |req| req.respond(Response::new(Status::OK)));
    assert!(second.unwrap().is_none());

    drop(first);
    let third = Service::builder().install(&topic, |req| req.respond(Response::new(Status::OK)));
    assert!(third.unwrap().is_some());
}

#[test]
fn subscriber_panic_is_isolated_and_reported_once() {
    let logs = Topic::eager("/bus-test/scenario-6/logs");
    let seen = Arc::new(Mutex::new(0u32));
    let sink = Arc::clone(&seen);
    let _observer = Subscription::builder()
        .ignoring(Filtering::default_subscriber_ignore().difference(Filtering::SUBSCRIBER_EXCEPTION))
        .install(&logs, move |message| {
            if message.filtering().contains(Filtering::SUBSCRIBER_EXCEPTION) {
                *sink.lock().unwrap() += 1;
            }
        })
        .unwrap();
    let _panicker = Subscription::builder().install(&logs, |_message| panic!("boom")).unwrap();

    dispatch::publish(Message::new(Topic::eager("/bus-test/scenario-6/logs"), 0));

    assert_eq!(*seen.lock().unwrap(), 1);
}

#[test]
fn echoing_service_preserves_the_request_value() {
    let topic = Topic::eager("/bus-test/echo");
    let _handle = Service::builder()
        .install(&topic, |req| {
            let value = req.take_value();
            let mut response = Response::new(Status::OK);
            if let Some(value) = value {
                response = response.with_value(value);
            }
            req.respond(response);
        })
        .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let req = Request::new(topic, Method::Post)
        .with_value(Value::new(String::from("hello")))
        .with_endpoint(ClientEndpoint::Channel(tx));
    dispatch::request(req).unwrap();

    let response = rx.recv().unwrap();
    assert_eq!(response.status(), Status::OK);
    assert_eq!(response.into_value().unwrap().downcast::<String>().unwrap(), "hello");
}

#[test]
fn eager_and_lazy_handles_to_the_same_path_are_equal() {
    let eager = Topic::eager("/bus-test/equality/a/b");
    let lazy = Topic::lazy("/bus-test/equality/a/b");
    assert_eq!(eager, lazy);
}
