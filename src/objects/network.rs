//! Senders and receivers on the engine's [`ControlBus`].
//!
//! `host` is kept for display only: the bus is in-process, ports alone pick
//! the receiver.

use tracing::{debug, warn};

use super::{impl_proxy, input_streams, setters, unit, OutputKind, ProxyCore, Source};
use crate::{
    broadcast::{Arg, Value},
    command::{ControlBus, ListenerId, Message, OscValue, TypeTags},
    engine::{Inputs, ProcessCtx, Processor},
    EngineContext, Error, Result,
};

pub const DEFAULT_HOST: &str = "127.0.0.1";

fn addresses(arg: &Arg) -> Result<Vec<String>> {
    let count = arg.seq_len().unwrap_or(1);
    (0..count)
        .map(|i| Ok(arg.wrap_named("address", i)?.expect_str("address")?.to_string()))
        .collect()
}

/// Publishes the first sample of every `bufrate`-th block.
struct SendUnit {
    bus: ControlBus,
    port: u16,
    address: String,
    bufrate: usize,
    count: usize,
}

impl Processor for SendUnit {
    fn process(&mut self, inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        let input = inputs.get(0);
        if self.count == 0 {
            if let Some(&value) = input.first() {
                // nobody listening is not an error for a sender
                let _ = self.bus.publish_value(self.port, &self.address, value);
            }
        }
        self.count = (self.count + 1) % self.bufrate.max(1);
        out.copy_from_slice(input);
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "bufrate" => self.bufrate = value.expect_int(name)?.max(1) as usize,
            _ => return Err(Error::UnknownParam(name.to_string())),
        }
        Ok(())
    }
}

/// Sends each input stream to its own address.
pub struct OscSend {
    core: ProxyCore,
    port: u16,
    host: String,
    addresses: Vec<String>,
}

impl OscSend {
    pub fn new(
        ctx: &EngineContext,
        input: &dyn Source,
        port: u16,
        address: impl Into<Arg>,
        host: &str,
    ) -> Result<Self> {
        let streams = input_streams(input)?;
        let address = address.into();
        let list = addresses(&address)?;
        let mut core = ProxyCore::new(ctx, OutputKind::ControlOnly, vec![("bufrate", Arg::from(1))]);

        let args = core.broadcast(Some(streams.len().max(list.len())))?;
        for ch in 0..args.len() {
            let processor = SendUnit {
                bus: ctx.bus().clone(),
                port,
                address: list[ch % list.len()].clone(),
                bufrate: args.int("bufrate", ch)?.max(1) as usize,
                count: 0,
            };
            let inputs = streams.wrap(ch).into_iter().collect();
            core.push_channel(vec![unit(processor, inputs)])?;
        }
        debug!(port, host, addresses = ?list, "osc send");

        Ok(Self {
            core,
            port,
            host: host.to_string(),
            addresses: list,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    setters! {
        set_bufrate => "bufrate",
    }
}

impl_proxy!(OscSend);

// ---------------------------------------------------------------------------

struct ReceiveUnit {
    bus: ControlBus,
    port: u16,
    listener: ListenerId,
    address: String,
}

impl Processor for ReceiveUnit {
    fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
        let value = self
            .bus
            .last_value(self.port, self.listener, &self.address)
            .unwrap_or(0.0);
        out.fill(value);
    }
}

/// One stream per address, holding the last value received there.
pub struct OscReceive {
    core: ProxyCore,
    bus: ControlBus,
    port: u16,
    listener: ListenerId,
    addresses: Vec<String>,
}

impl OscReceive {
    pub fn new(ctx: &EngineContext, port: u16, address: impl Into<Arg>) -> Result<Self> {
        let address = address.into();
        let list = addresses(&address)?;
        let bus = ctx.bus().clone();
        let listener = bus.listen_values(port, &list);

        let mut core = ProxyCore::new(
            ctx,
            OutputKind::Audio,
            vec![("mul", Arg::from(1.0)), ("add", Arg::from(0.0))],
        );
        for address in &list {
            let processor = ReceiveUnit {
                bus: bus.clone(),
                port,
                listener,
                address: address.clone(),
            };
            core.push_channel(vec![unit(processor, vec![])])?;
        }

        Ok(Self {
            core,
            bus,
            port,
            listener,
            addresses: list,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Last value received on `address`, before `mul`/`add`.
    pub fn get(&self, address: &str) -> Result<f32> {
        self.bus
            .last_value(self.port, self.listener, address)
            .ok_or_else(|| Error::AddressNotFound {
                port: self.port,
                address: address.to_string(),
            })
    }

    setters! {
        set_mul => "mul",
        set_add => "add",
    }
}

impl Drop for OscReceive {
    fn drop(&mut self) {
        self.bus.unlisten(self.port, self.listener);
    }
}

impl_proxy!(OscReceive);

// ---------------------------------------------------------------------------

/// Sends typed messages laid out by a type-tag string.
#[derive(Debug)]
pub struct OscDataSend {
    bus: ControlBus,
    tags: TypeTags,
    port: u16,
    host: String,
    addresses: Vec<String>,
}

impl OscDataSend {
    pub fn new(
        ctx: &EngineContext,
        types: &str,
        port: u16,
        address: impl Into<Arg>,
        host: &str,
    ) -> Result<Self> {
        Ok(Self {
            bus: ctx.bus().clone(),
            tags: TypeTags::parse(types)?,
            port,
            host: host.to_string(),
            addresses: addresses(&address.into())?,
        })
    }

    pub fn tags(&self) -> &TypeTags {
        &self.tags
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn add_address(&mut self, address: &str) {
        if !self.addresses.iter().any(|a| a == address) {
            self.addresses.push(address.to_string());
        }
    }

    pub fn del_address(&mut self, address: &str) {
        self.addresses.retain(|a| a != address);
    }

    /// Send `values` to `address`, or to every address when `None`.
    ///
    /// Values are coerced to the declared tags first, so a type mismatch
    /// fails with `InvalidFormat` before anything is sent.
    pub fn send(&self, values: &[Value], address: Option<&str>) -> Result<()> {
        let args = self.tags.coerce(values)?;
        let targets: Vec<&str> = match address {
            Some(address) => vec![address],
            None => self.addresses.iter().map(String::as_str).collect(),
        };
        for target in targets {
            self.bus.deliver(self.port, &Message::new(target, args.clone()))?;
        }
        Ok(())
    }

    /// Send already typed values, checked against the tags.
    pub fn send_raw(&self, args: Vec<OscValue>, address: &str) -> Result<()> {
        self.tags.check(&args)?;
        self.bus.deliver(self.port, &Message::new(address, args))
    }
}

/// Calls back with every message matching one of its addresses.
pub struct OscDataReceive {
    bus: ControlBus,
    port: u16,
    listener: ListenerId,
}

impl OscDataReceive {
    pub fn new<F>(ctx: &EngineContext, port: u16, address: impl Into<Arg>, callback: F) -> Result<Self>
    where
        F: FnMut(&Message) + Send + 'static,
    {
        let bus = ctx.bus().clone();
        let list = addresses(&address.into())?;
        if bus.is_bound(port) {
            warn!(port, "port already has listeners, sharing it");
        }
        let listener = bus.listen_data(port, &list, callback);
        Ok(Self { bus, port, listener })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn add_address(&self, address: &str) -> Result<()> {
        self.bus.add_address(self.port, self.listener, address)
    }

    pub fn addresses(&self) -> Vec<String> {
        self.bus.addresses(self.port, self.listener)
    }
}

impl Drop for OscDataReceive {
    fn drop(&mut self) {
        self.bus.unlisten(self.port, self.listener);
    }
}
