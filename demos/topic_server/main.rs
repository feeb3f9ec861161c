//! A tiny CLI driving the PLEB bus end to end: installs a service and
//! a couple of subscribers under `/sensors`, fires a handful of
//! requests and events at them, and prints what each one observed.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use clap::Parser;
use pleb::{
    dispatch, ClientEndpoint, Filtering, Message, Method, Request, Response, Service,
    Status, Subscription, Topic, Value,
};

/// Drives a small publish/subscribe and request/response scenario
/// against an in-process PLEB bus.
#[derive(Parser, Debug)]
#[command(name = "topic_server")]
#[command(about = "Exercises a PLEB topic tree from the command line")]
struct Args {
    /// Topic under which the demo service and subscribers are installed.
    #[arg(short, long, default_value = "/sensors")]
    root: String,

    /// Number of temperature readings to publish.
    #[arg(short, long, default_value_t = 3)]
    readings: u32,

    /// Verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(args.verbose);

    let root = Topic::eager(&args.root);
    let _service = install_echo_service(&root);
    let _logger = install_logger(&root);
    let count = install_counter(&root);

    tracing::info!(root = %args.root, readings = args.readings, "starting demo");

    for reading in 0..args.readings {
        request_echo(&root, reading);
        publish_reading(&root, reading);
    }

    tracing::info!(observed = count.load(Ordering::SeqCst), "demo complete");
    println!("subscriber observed {} reading(s)", count.load(Ordering::SeqCst));
}

/// Installs a service at `root` that echoes the request's value back
/// as the response, demonstrating the request/response half of the bus.
fn install_echo_service(root: &Topic) -> pleb::ServiceHandle {
    Service::builder()
        .install(root, |req| {
            let value = req.take_value();
            let mut response = Response::new(Status::OK);
            if let Some(value) = value {
                response = response.with_value(value);
            }
            req.respond(response);
        })
        .expect("root topic is never null")
        .expect("no prior service installed at this topic")
}

/// Installs a subscriber at `root` that just traces every event it
/// sees, including the `subscriber-exception` meta-events other
/// subscribers' panics would raise.
fn install_logger(root: &Topic) -> pleb::SubscriptionHandle {
    Subscription::builder()
        .ignoring(Filtering::default_subscriber_ignore().difference(Filtering::SUBSCRIBER_EXCEPTION))
        .install(root, |message| {
            tracing::debug!(code = message.code(), "event observed at root");
        })
        .expect("root topic is never null")
}

/// Installs a subscriber at `root/temp` counting readings that
/// propagate up to it via the recursive default.
fn install_counter(root: &Topic) -> Arc<AtomicU32> {
    let count = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&count);
    let temp = root.child("temp").expect("eager topic never fails to create a child");
    let _handle = Subscription::builder()
        .install(&temp, move |message| {
            if let Some(value) = message.value() {
                if let Some(reading) = value.downcast_ref::<u32>() {
                    tracing::info!(reading, "temperature reading received");
                }
            }
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .expect("root topic is never null");
    // Leak the handle for the process lifetime of this demo; a real
    // service would hold onto it for as long as it wants the
    // subscription live.
    std::mem::forget(_handle);
    count
}

fn request_echo(root: &Topic, reading: u32) {
    let (tx, rx) = std::sync::mpsc::channel();
    let req = Request::new(root.clone(), Method::Get)
        .with_value(Value::new(reading))
        .with_endpoint(ClientEndpoint::Channel(tx));
    if let Err(err) = dispatch::request(req) {
        tracing::warn!(%err, "request failed with no endpoint to notify");
        return;
    }
    match rx.recv() {
        Ok(response) => tracing::info!(status = %response.status(), "echo response received"),
        Err(_) => tracing::warn!("service dropped the request without responding"),
    }
}

fn publish_reading(root: &Topic, reading: u32) {
    let temp = root.child("temp").expect("eager topic never fails to create a child");
    dispatch::publish(Message::new(temp, Status::OK.0).with_value(Value::new(reading)));
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
