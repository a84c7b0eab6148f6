//! Session context provider
//!
//! Wraps a subtree and makes session state available to it. Mounting
//! subscribes to the source, unmounting (or dropping) unsubscribes and
//! stops every stream and context handed out by that mount.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::element::Element;
use super::source::{SessionSource, SubscriptionId};
use crate::auth::{Session, SessionState};

/// Read-only view of session state handed to descendants
#[derive(Clone)]
pub struct SessionContext {
    receiver: watch::Receiver<SessionState>,
    unmounted: watch::Receiver<bool>,
}

impl SessionContext {
    fn new(receiver: watch::Receiver<SessionState>, unmounted: watch::Receiver<bool>) -> Self {
        Self {
            receiver,
            unmounted,
        }
    }

    /// Context fixed to a single state, not connected to any source
    pub fn detached(state: SessionState) -> Self {
        let (_, receiver) = watch::channel(state);
        let (_, unmounted) = watch::channel(true);
        Self {
            receiver,
            unmounted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.receiver.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.receiver.borrow().session().cloned()
    }

    /// Wait for the next change
    ///
    /// Returns `false` once the provider is unmounted or the source has
    /// gone away.
    pub async fn changed(&mut self) -> bool {
        if *self.unmounted.borrow() {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.unmounted.wait_for(|done| *done) => false,
            result = self.receiver.changed() => result.is_ok(),
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("status", &self.receiver.borrow().status())
            .finish()
    }
}

/// Provider that has not been mounted yet
pub struct SessionContextProvider {
    source: Arc<dyn SessionSource>,
    children: Option<Element>,
}

impl SessionContextProvider {
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        Self {
            source,
            children: None,
        }
    }

    pub fn children(mut self, children: Element) -> Self {
        self.children = Some(children);
        self
    }

    /// Subscribe to the source and start providing its state
    pub fn mount(self) -> MountedProvider {
        let (id, receiver) = self.source.subscribe();
        let (unmounted, unmounted_rx) = watch::channel(false);
        tracing::trace!(subscription = id.0, "Session provider mounted");

        MountedProvider {
            source: self.source,
            subscription: Some(id),
            unmounted,
            context: SessionContext::new(receiver, unmounted_rx),
            children: self.children,
        }
    }
}

/// Provider holding a live subscription
pub struct MountedProvider {
    source: Arc<dyn SessionSource>,
    subscription: Option<SubscriptionId>,
    unmounted: watch::Sender<bool>,
    context: SessionContext,
    children: Option<Element>,
}

impl MountedProvider {
    pub fn context(&self) -> SessionContext {
        self.context.clone()
    }

    /// The wrapper with the children nested inside, unchanged
    pub fn render(&self) -> Element {
        wrap(&self.context, &self.children)
    }

    /// One render for the current state, then one per session change
    ///
    /// The stream ends on unmount, or when the source drops its sender.
    pub fn renders(&self) -> BoxStream<'static, Element> {
        let context = self.context.clone();
        let children = self.children.clone();
        let mut unmounted = self.unmounted.subscribe();

        WatchStream::new(self.context.receiver.clone())
            .take_until(async move {
                let _ = unmounted.wait_for(|done| *done).await;
            })
            .map(move |_| wrap(&context, &children))
            .boxed()
    }

    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.unmounted.send_replace(true);
            self.source.unsubscribe(id);
            tracing::trace!(subscription = id.0, "Session provider unmounted");
        }
    }
}

impl Drop for MountedProvider {
    fn drop(&mut self) {
        self.release();
    }
}

fn wrap(context: &SessionContext, children: &Option<Element>) -> Element {
    Element::Provider {
        context: context.clone(),
        children: children.clone().map(Box::new),
    }
}
