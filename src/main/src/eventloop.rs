use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Sender};
use log::*;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread;

type Payload = Box<dyn Any + Send>;
type Handler = Box<dyn FnMut(&dyn Any) + Send>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<TypeId, Vec<(u64, Handler)>>,
}

impl Registry {
    fn dispatch(&mut self, event: &dyn Any) {
        if let Some(handlers) = self.handlers.get_mut(&(*event).type_id()) {
            for (_, handler) in handlers.iter_mut() {
                handler(event);
            }
        }
    }
}

/// Typed publish/subscribe loop.
///
/// Events are queued by `post` and delivered in order on a single dispatch
/// thread, so handlers never run concurrently with each other. Handlers may
/// post further events but must not subscribe or drop a `Subscription` from
/// inside a handler.
#[derive(Clone)]
pub struct EventLoop {
    sender: Sender<Payload>,
    registry: Arc<Mutex<Registry>>,
}

impl EventLoop {
    pub fn take() -> Result<EventLoop> {
        let (sender, receiver) = unbounded::<Payload>();
        let registry = Arc::new(Mutex::new(Registry::default()));

        let dispatch_registry = Arc::downgrade(&registry);
        thread::Builder::new()
            .name("event-loop".into())
            .spawn(move || {
                for event in receiver {
                    let Some(registry) = dispatch_registry.upgrade() else {
                        break;
                    };
                    registry.lock().dispatch(&*event);
                }
                debug!("Event loop stopped");
            })
            .context("Failed to spawn event loop thread")?;

        Ok(EventLoop { sender, registry })
    }

    pub fn post<E>(&self, event: &E) -> Result<()>
    where
        E: Any + Clone + Send,
    {
        // The undelivered payload is not `Sync`, so it cannot travel inside the error
        self.sender
            .send(Box::new(event.clone()))
            .map_err(|_| anyhow!("Event loop is no longer running"))
    }

    pub fn subscribe<E, F>(&self, mut handler: F) -> Result<Subscription>
    where
        E: Any,
        F: FnMut(&E) + Send + 'static,
    {
        let type_id = TypeId::of::<E>();
        let wrapped: Handler = Box::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });

        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.entry(type_id).or_default().push((id, wrapped));

        Ok(Subscription {
            registry: Arc::downgrade(&self.registry),
            type_id,
            id,
        })
    }
}

/// Handle for a registered handler; dropping it unsubscribes.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    type_id: TypeId,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Some(handlers) = registry.lock().handlers.get_mut(&self.type_id) {
                handlers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
