use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

use super::{address_matches, Message};
use crate::{Error, Result};

/*
Control Bus
===========

An in-process stand-in for a UDP control network. Listeners bind to a port
and a set of addresses; senders push messages to a port.

  value listener   keeps the last float seen per address
                   (read once per block by receiving units)
  data listener    gets a callback with the full message

Lock order is engine → bus. Audio-rate senders publish plain values while
the engine is locked, so they only touch value listeners. Data callbacks run
on the sending thread after the bus lock is released, which lets them
change proxies freely.
*/

/// Identifies one listener on one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type DataCallback = Arc<Mutex<dyn FnMut(&Message) + Send>>;

struct ValueListener {
    id: ListenerId,
    values: HashMap<String, f32>,
}

struct DataListener {
    id: ListenerId,
    addresses: Vec<String>,
    callback: DataCallback,
}

#[derive(Default)]
struct Port {
    values: Vec<ValueListener>,
    data: Vec<DataListener>,
}

impl Port {
    fn is_empty(&self) -> bool {
        self.values.is_empty() && self.data.is_empty()
    }
}

#[derive(Default)]
struct BusState {
    ports: HashMap<u16, Port>,
    next_id: u64,
}

impl BusState {
    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    /// Store `value` in every value listener that knows `address`.
    fn publish(&mut self, port: u16, address: &str, value: f32) -> bool {
        let Some(port) = self.ports.get_mut(&port) else {
            return false;
        };
        let mut delivered = false;
        for listener in &mut port.values {
            if let Some(slot) = listener.values.get_mut(address) {
                *slot = value;
                delivered = true;
            }
        }
        delivered
    }
}

#[derive(Clone, Default)]
pub struct ControlBus {
    state: Arc<Mutex<BusState>>,
}

impl ControlBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Keep the last value received on each of `addresses`. Values start at 0.
    pub fn listen_values(&self, port: u16, addresses: &[String]) -> ListenerId {
        let mut state = self.lock();
        let id = state.next_id();
        let values = addresses.iter().map(|a| (a.clone(), 0.0)).collect();
        state
            .ports
            .entry(port)
            .or_default()
            .values
            .push(ValueListener { id, values });
        debug!(port, ?addresses, "value listener bound");
        id
    }

    pub fn last_value(&self, port: u16, id: ListenerId, address: &str) -> Option<f32> {
        let state = self.lock();
        state
            .ports
            .get(&port)?
            .values
            .iter()
            .find(|l| l.id == id)?
            .values
            .get(address)
            .copied()
    }

    /// Call `callback` for every message whose address matches one of
    /// `addresses` (`*` and `?` wildcards allowed).
    pub fn listen_data<F>(&self, port: u16, addresses: &[String], callback: F) -> ListenerId
    where
        F: FnMut(&Message) + Send + 'static,
    {
        let mut state = self.lock();
        let id = state.next_id();
        state.ports.entry(port).or_default().data.push(DataListener {
            id,
            addresses: addresses.to_vec(),
            callback: Arc::new(Mutex::new(callback)),
        });
        debug!(port, ?addresses, "data listener bound");
        id
    }

    /// Extend a listener's address set.
    pub fn add_address(&self, port: u16, id: ListenerId, address: &str) -> Result<()> {
        let mut state = self.lock();
        let not_found = || Error::AddressNotFound {
            port,
            address: address.to_string(),
        };
        let port_state = state.ports.get_mut(&port).ok_or_else(not_found)?;

        if let Some(listener) = port_state.data.iter_mut().find(|l| l.id == id) {
            if !listener.addresses.iter().any(|a| a == address) {
                listener.addresses.push(address.to_string());
            }
            return Ok(());
        }
        if let Some(listener) = port_state.values.iter_mut().find(|l| l.id == id) {
            listener.values.entry(address.to_string()).or_insert(0.0);
            return Ok(());
        }
        Err(not_found())
    }

    /// Addresses a listener reacts to.
    pub fn addresses(&self, port: u16, id: ListenerId) -> Vec<String> {
        let state = self.lock();
        let Some(port) = state.ports.get(&port) else {
            return Vec::new();
        };
        if let Some(listener) = port.data.iter().find(|l| l.id == id) {
            return listener.addresses.clone();
        }
        port.values
            .iter()
            .find(|l| l.id == id)
            .map(|l| {
                let mut addresses: Vec<_> = l.values.keys().cloned().collect();
                addresses.sort();
                addresses
            })
            .unwrap_or_default()
    }

    /// Remove a listener, freeing the port when it was the last one.
    pub fn unlisten(&self, port: u16, id: ListenerId) {
        let mut state = self.lock();
        if let Some(port_state) = state.ports.get_mut(&port) {
            port_state.values.retain(|l| l.id != id);
            port_state.data.retain(|l| l.id != id);
            if port_state.is_empty() {
                state.ports.remove(&port);
                debug!(port, "port freed");
            }
        }
    }

    pub fn is_bound(&self, port: u16) -> bool {
        self.lock().ports.contains_key(&port)
    }

    /// Publish a single float to value listeners only.
    ///
    /// Safe to call from the audio thread while the engine is locked.
    pub fn publish_value(&self, port: u16, address: &str, value: f32) -> Result<()> {
        if self.lock().publish(port, address, value) {
            Ok(())
        } else {
            Err(Error::AddressNotFound {
                port,
                address: address.to_string(),
            })
        }
    }

    /// Deliver a message to every matching listener on `port`.
    ///
    /// Value listeners take the first numeric argument. Data callbacks run on
    /// the calling thread.
    pub fn deliver(&self, port: u16, message: &Message) -> Result<()> {
        let (mut delivered, callbacks) = {
            let mut state = self.lock();
            let delivered = match message.args.first().and_then(|v| v.as_f32()) {
                Some(value) => state.publish(port, &message.address, value),
                None => false,
            };
            let callbacks: Vec<DataCallback> = state
                .ports
                .get(&port)
                .map(|p| {
                    p.data
                        .iter()
                        .filter(|l| l.addresses.iter().any(|a| address_matches(a, &message.address)))
                        .map(|l| Arc::clone(&l.callback))
                        .collect()
                })
                .unwrap_or_default();
            (delivered, callbacks)
        };

        for callback in &callbacks {
            let mut callback = callback.lock().unwrap_or_else(|e| e.into_inner());
            (*callback)(message);
            delivered = true;
        }

        if delivered {
            trace!(port, address = %message.address, "message delivered");
            Ok(())
        } else {
            Err(Error::AddressNotFound {
                port,
                address: message.address.clone(),
            })
        }
    }
}

impl fmt::Debug for ControlBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        let mut ports: Vec<_> = state.ports.keys().copied().collect();
        ports.sort_unstable();
        f.debug_struct("ControlBus").field("ports", &ports).finish()
    }
}
