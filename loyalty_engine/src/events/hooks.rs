use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderUpdatedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_updated_producer: Vec<EventProducer<OrderUpdatedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_updated(&self, event: OrderUpdatedEvent) {
        for producer in &self.order_updated_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_updated: Option<EventHandler<OrderUpdatedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_updated = hooks.on_order_updated.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_updated }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_updated {
            result.order_updated_producer.push(handler.subscribe());
        }
        result
    }

    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_updated {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_updated: Option<Handler<OrderUpdatedEvent>>,
}

impl EventHooks {
    pub fn on_order_updated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_updated = Some(Arc::new(f));
        self
    }
}
