//! Defines [`Request`], the mutable view a service handler receives;
//! [`Response`], the status+value pair it produces; and
//! [`ClientEndpoint`], the drop target for an eventual response.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::message::{Filtering, Handling};
use crate::method::Method;
use crate::status::Status;
use crate::topic::Topic;
use crate::value::Value;

/// A response: a status code plus an optional value.
pub struct Response {
    status: Status,
    value: Option<Value>,
}

impl Response {
    /// Creates a response carrying `status` and no value.
    pub fn new(status: Status) -> Self {
        Response { status, value: None }
    }

    /// Attaches a value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// The response's status code.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Borrows the attached value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Moves the attached value out, if any.
    pub fn into_value(self) -> Option<Value> {
        self.value
    }
}

/// The drop target for a request's eventual response: a callback
/// invoked at most once, or the sending half of a one-shot channel
/// (the lightweight stand-in for a future-setter, since the core has
/// no internal async runtime to await one).
pub enum ClientEndpoint {
    /// A callback, invoked at most once with the eventual response.
    Callback(Box<dyn FnOnce(Response) + Send>),
    /// The sending half of a one-shot channel; the other half is
    /// whatever waits on the response (a blocking `recv`, or polled
    /// from elsewhere).
    Channel(std::sync::mpsc::Sender<Response>),
}

impl ClientEndpoint {
    /// Wraps a plain closure as a callback endpoint.
    pub fn callback(f: impl FnOnce(Response) + Send + 'static) -> Self {
        ClientEndpoint::Callback(Box::new(f))
    }

    fn deliver(self, response: Response) {
        match self {
            ClientEndpoint::Callback(f) => f(response),
            ClientEndpoint::Channel(sender) => {
                let _ = sender.send(response);
            }
        }
    }
}

/// A request in flight: the topic/method/value a client addressed,
/// and (if present) the endpoint awaiting the response.
///
/// Invariant I4: a request is responded to at most once; a second
/// [`Request::respond`] call is a silent no-op.
pub struct Request {
    topic: Topic,
    method: Method,
    filtering: Filtering,
    handling: Handling,
    value: Option<Value>,
    endpoint: Option<ClientEndpoint>,
    responded: AtomicBool,
}

impl Request {
    /// Creates a request addressed at `topic` with the given `method`.
    pub fn new(topic: Topic, method: Method) -> Self {
        Request {
            topic,
            method,
            filtering: Filtering::default_message(),
            handling: Handling::empty(),
            value: None,
            endpoint: None,
            responded: AtomicBool::new(false),
        }
    }

    /// Attaches a value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the filtering word, replacing the default.
    pub fn with_filtering(mut self, filtering: Filtering) -> Self {
        self.filtering = filtering;
        self
    }

    /// Sets the handling requirements.
    pub fn with_handling(mut self, handling: Handling) -> Self {
        self.handling = handling;
        self
    }

    /// Attaches the endpoint that should receive the eventual
    /// response.
    pub fn with_endpoint(mut self, endpoint: ClientEndpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// The destination topic.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Retargets the request at `topic`, for a service relay re-entering
    /// dispatch at a preconfigured destination.
    pub(crate) fn retarget(&mut self, topic: Topic) {
        self.topic = topic;
    }

    /// The request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The filtering word.
    pub fn filtering(&self) -> Filtering {
        self.filtering
    }

    /// The handling requirements.
    pub fn handling(&self) -> Handling {
        self.handling
    }

    /// Borrows the attached value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Moves the attached value out, if any, leaving the request
    /// holding none. A handler that needs the value for more than
    /// inspection takes it this way rather than cloning.
    pub fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    /// `true` once a response has been sent.
    pub fn did_respond(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }

    /// `true` if a client endpoint is attached to receive a response.
    pub fn has_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Delivers `response` to the attached endpoint, if any, unless a
    /// response was already sent. The second and subsequent calls are
    /// silent no-ops, never panics.
    pub fn respond(&mut self, response: Response) {
        if self.responded.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(endpoint) = self.endpoint.take() {
            endpoint.deliver(response);
        }
    }

    /// Called by the dispatch engine after a handler returns without
    /// responding: synthesizes an `InternalServerError` response if a
    /// client is still attached, so a future-backed client never hangs.
    pub(crate) fn respond_with_default_if_silent(&mut self) {
        if !self.did_respond() && self.endpoint.is_some() {
            self.respond(Response::new(Status::INTERNAL_SERVER_ERROR));
        }
    }
}
