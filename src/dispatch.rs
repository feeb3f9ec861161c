//! The dispatch engine: request routing with ancestor fallback, event
//! broadcast with ancestor fan-out, and the response-delivery contract
//! (§4.H).
//!
//! Request and event dispatch run synchronously on the caller's
//! thread — the core has no internal worker pool (§5). A handler may
//! itself defer or hand off work; that is outside the engine's
//! concern.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::Error;
use crate::message::{Filtering, Message};
use crate::request::{Request, Response};
use crate::service::ServiceInner;
use crate::status::Status;
use crate::subscription::SubscriptionInner;
use crate::topic::{Topic, TrieNode};
use crate::value::Value;

/// Routes `request` to the nearest accepting service, starting at its
/// topic and falling back toward the root if the message is recursive
/// (the default).
///
/// Returns `Ok(())` once a response has been delivered or synthesized
/// to the request's client endpoint. Returns `Err` only when no
/// client endpoint was attached to receive that synthesized response
/// ([`Error::NullTopic`] for a null topic, [`Error::ServiceNotFound`]
/// or [`Error::HandlingUnavailable`] when routing fails with no one to
/// tell).
pub fn request(mut req: Request) -> crate::Result<()> {
    route(&mut req)
}

/// Re-enters routing for a request already in flight, its topic having
/// been retargeted — the mechanism behind a service relay's re-dispatch.
pub(crate) fn redispatch(req: &mut Request) -> crate::Result<()> {
    route(req)
}

fn route(req: &mut Request) -> crate::Result<()> {
    let node = req.topic().existing_node()?;
    tracing::trace!(topic = %node.segment(), method = ?req.method(), "dispatching request");

    let local_filtering = req.filtering().difference(Filtering::RECURSIVE);
    if let Some(outcome) = try_service(&node, local_filtering, req) {
        return outcome;
    }

    if req.filtering().contains(Filtering::RECURSIVE) {
        for ancestor in node.ancestors().skip(1) {
            tracing::debug!(topic = %ancestor.segment(), "request falling back to ancestor");
            if let Some(service) = ancestor.payload().current_service() {
                if !service.accepts_recursive() {
                    continue;
                }
                if !service.accepts_filtering(local_filtering) {
                    continue;
                }
                if let Some(outcome) = dispatch_to(&service, req) {
                    return outcome;
                }
            }
        }
    }

    tracing::warn!("service-not-found");
    fail_request(req, Error::ServiceNotFound, Status::SERVICE_UNAVAILABLE)
}

/// Attempts the service installed exactly at `node`. Returns `None` if
/// there is none, or one exists but its filtering-ignore mask rejects
/// `filtering` (the caller should keep walking). Returns `Some` once a
/// decision — success or a terminal failure — has been made.
fn try_service(node: &Arc<TrieNode>, filtering: Filtering, req: &mut Request) -> Option<crate::Result<()>> {
    let service = node.payload().current_service()?;
    if !service.accepts_filtering(filtering) {
        return None;
    }
    dispatch_to(&service, req)
}

fn dispatch_to(service: &Arc<ServiceInner>, req: &mut Request) -> Option<crate::Result<()>> {
    if !service.satisfies_handling(req.handling()) {
        tracing::warn!("handling-unavailable");
        return Some(fail_request(req, Error::HandlingUnavailable, Status::NOT_IMPLEMENTED));
    }
    service.invoke(req);
    req.respond_with_default_if_silent();
    Some(Ok(()))
}

/// Synthesizes `status` as the request's response. Returns `Err(error)`
/// when no client endpoint was attached to receive it — there is
/// nothing to tell, so the call site learns of the failure directly.
fn fail_request(req: &mut Request, error: Error, status: Status) -> crate::Result<()> {
    let had_endpoint = req.has_endpoint();
    req.respond(Response::new(status));
    if had_endpoint {
        Ok(())
    } else {
        Err(error)
    }
}

/// Broadcasts `message` to every live subscription at its topic,
/// continuing toward the root if the message is recursive (the
/// default). Subscriber panics are caught and reported as a
/// `subscriber-exception`-flagged event on the topic where they
/// occurred; the original broadcast continues.
pub fn publish(message: Message) {
    let node = match message.topic().existing_node() {
        Ok(node) => node,
        Err(_) => {
            tracing::warn!("publish attempted on a null topic");
            return;
        }
    };
    tracing::trace!(topic = %node.segment(), "dispatching event");

    deliver_at(&node, &message);
    if message.is_recursive() {
        for ancestor in node.ancestors().skip(1) {
            deliver_at(&ancestor, &message);
        }
    }
}

fn deliver_at(node: &Arc<TrieNode>, message: &Message) {
    for subscription in node.payload().iterate_subscriptions() {
        if !subscription.accepts(message.filtering()) {
            continue;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            subscription.invoke(message);
        }));
        if outcome.is_err() {
            tracing::error!("subscriber panicked during event dispatch");
            publish_subscriber_exception(node, &subscription);
        }
    }
}

fn publish_subscriber_exception(node: &Arc<TrieNode>, raising: &Arc<SubscriptionInner>) {
    let meta = Message::new(Topic::from_node(Arc::clone(node)), 0)
        .with_filtering(Filtering::REGULAR | Filtering::SUBSCRIBER_EXCEPTION)
        .with_value(Value::new(Arc::clone(raising)));
    deliver_at(node, &meta);
}
