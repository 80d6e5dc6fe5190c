use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::{ControlBus, ListenerId, Message, OscValue};
use crate::{
    broadcast::{Arg, Value},
    objects::Proxy,
    Error, Result,
};

type Handler = Box<dyn FnMut(&[OscValue]) -> Result<()> + Send>;

/// Maps addresses to parameter setters.
///
/// This is the UI-agnostic replacement for slider windows: anything that can
/// produce a [`Message`] (a terminal panel, a network listener, a test) can
/// drive any bound proxy attribute.
pub struct Router {
    port: u16,
    routes: BTreeMap<String, Handler>,
}

impl Router {
    /// A router answering on `port` (used in errors and by [`Router::listen`]).
    pub fn new(port: u16) -> Self {
        Self {
            port,
            routes: BTreeMap::new(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn route<F>(&mut self, address: impl Into<String>, handler: F)
    where
        F: FnMut(&[OscValue]) -> Result<()> + Send + 'static,
    {
        self.routes.insert(address.into(), Box::new(handler));
    }

    /// Expose every attribute of `proxy` as `/<prefix>/<attr>`.
    ///
    /// One argument sets a scalar, several set a per-channel sequence.
    pub fn bind<P>(&mut self, prefix: &str, proxy: Arc<Mutex<P>>)
    where
        P: Proxy + 'static,
    {
        let attributes = proxy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .attributes();

        for attr in attributes {
            let address = format!("/{}/{}", prefix.trim_matches('/'), attr);
            let proxy = Arc::clone(&proxy);
            debug!(%address, "route bound");
            self.route(address, move |args| {
                let arg = args_to_arg(args);
                proxy
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .set_attr(attr, arg)
            });
        }
    }

    pub fn dispatch(&mut self, message: &Message) -> Result<()> {
        match self.routes.get_mut(&message.address) {
            Some(handler) => handler(&message.args),
            None => Err(Error::AddressNotFound {
                port: self.port,
                address: message.address.clone(),
            }),
        }
    }

    /// Bound addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }

    /// Move the router onto `bus`, answering messages sent to its port.
    pub fn listen(mut self, bus: &ControlBus) -> ListenerId {
        let port = self.port;
        let addresses = self.addresses();
        bus.listen_data(port, &addresses, move |message| {
            if let Err(err) = self.dispatch(message) {
                warn!(port, address = %message.address, %err, "command rejected");
            }
        })
    }
}

fn args_to_arg(args: &[OscValue]) -> Arg {
    match args {
        [single] => Arg::Scalar(Value::from(single)),
        many => Arg::Seq(many.iter().map(Value::from).collect()),
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("port", &self.port)
            .field("addresses", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn dispatch_calls_handler() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);

        let mut router = Router::new(0);
        router.route("/freq", move |args| {
            assert_eq!(args, &[OscValue::Float(440.0)]);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        router.dispatch(&Message::float("/freq", 440.0)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_address_is_reported() {
        let mut router = Router::new(8000);
        let err = router.dispatch(&Message::float("/nope", 1.0)).unwrap_err();
        assert!(matches!(err, Error::AddressNotFound { port: 8000, ref address } if address == "/nope"));
    }

    #[test]
    fn multiple_args_become_a_sequence() {
        let arg = args_to_arg(&[OscValue::Float(1.0), OscValue::Int(2)]);
        assert_eq!(arg, Arg::Seq(vec![Value::Float(1.0), Value::Int(2)]));
        assert_eq!(args_to_arg(&[OscValue::Int(3)]), Arg::Scalar(Value::Int(3)));
    }

    #[test]
    fn listening_router_answers_bus_messages() {
        let bus = ControlBus::new();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);

        let mut router = Router::new(9000);
        router.route("/go", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        router.listen(&bus);

        bus.deliver(9000, &Message::float("/go", 1.0)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
