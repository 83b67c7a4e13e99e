//! Fakes for the packet stack, proxy engine and host callbacks

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tun_dialer::config::SniffingConfig;
use tun_dialer::outbound::ProxyConnection;
use tun_dialer::tunnel::{
    EngineConfig, EngineInstance, FlowHandler, OutputFn, PacketFlow, PacketStack,
    PacketStackFactory, ProxyEngine,
};
use tun_dialer::{Dialer, Error, NameResolver, Network, Result};

#[derive(Default)]
pub struct RecordingFlow {
    pub packets: Mutex<Vec<Vec<u8>>>,
}

impl RecordingFlow {
    pub fn count(&self) -> usize {
        self.packets.lock().len()
    }
}

impl PacketFlow for RecordingFlow {
    fn write_packet(&self, packet: &[u8]) {
        self.packets.lock().push(packet.to_vec());
    }
}

pub struct NoopHandler;

#[async_trait]
impl FlowHandler for NoopHandler {
    async fn handle_tcp(&self, _stream: Box<dyn ProxyConnection>, _target: SocketAddr) -> Result<()> {
        Ok(())
    }

    async fn handle_udp(&self, _payload: Bytes, _source: SocketAddr, _target: SocketAddr) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStack {
    pub written: Mutex<Vec<Vec<u8>>>,
    pub closed: AtomicBool,
    pub tcp_handlers: AtomicUsize,
    pub udp_handlers: AtomicUsize,
    pub fail_close: bool,
    output: Mutex<Option<OutputFn>>,
}

impl FakeStack {
    /// Emit a packet toward the device as the engine would
    pub fn emit(&self, packet: &[u8]) -> usize {
        let output = self.output.lock().clone();
        match output {
            Some(output) => output(packet),
            None => 0,
        }
    }

    pub fn has_output(&self) -> bool {
        self.output.lock().is_some()
    }
}

impl PacketStack for FakeStack {
    fn write(&self, packet: &[u8]) -> Result<()> {
        self.written.lock().push(packet.to_vec());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::Io(io::Error::new(io::ErrorKind::Other, "device busy")));
        }
        Ok(())
    }

    fn register_tcp_handler(&self, _handler: Arc<dyn FlowHandler>) {
        self.tcp_handlers.fetch_add(1, Ordering::SeqCst);
    }

    fn register_udp_handler(&self, _handler: Arc<dyn FlowHandler>) {
        self.udp_handlers.fetch_add(1, Ordering::SeqCst);
    }

    fn register_output(&self, output: OutputFn) {
        *self.output.lock() = Some(output);
    }
}

#[derive(Default)]
pub struct FakeStackFactory {
    pub fail_create: bool,
    pub fail_close: bool,
    pub stacks: Mutex<Vec<Arc<FakeStack>>>,
}

impl FakeStackFactory {
    pub fn failing() -> Self {
        FakeStackFactory {
            fail_create: true,
            ..Default::default()
        }
    }

    pub fn failing_close() -> Self {
        FakeStackFactory {
            fail_close: true,
            ..Default::default()
        }
    }

    pub fn created(&self) -> usize {
        self.stacks.lock().len()
    }

    pub fn last(&self) -> Arc<FakeStack> {
        self.stacks.lock().last().cloned().expect("no stack created")
    }
}

impl PacketStackFactory for FakeStackFactory {
    fn create(&self) -> Result<Arc<dyn PacketStack>> {
        if self.fail_create {
            return Err(Error::Io(io::Error::new(io::ErrorKind::Other, "tun device unavailable")));
        }
        let stack = Arc::new(FakeStack {
            fail_close: self.fail_close,
            ..Default::default()
        });
        self.stacks.lock().push(stack.clone());
        Ok(stack)
    }
}

#[derive(Default)]
pub struct FakeInstance {
    pub closed: AtomicBool,
    pub sniffing: Mutex<Option<SniffingConfig>>,
}

#[async_trait]
impl EngineInstance for FakeInstance {
    fn flow_handler(&self, sniffing: &SniffingConfig) -> Arc<dyn FlowHandler> {
        *self.sniffing.lock() = Some(sniffing.clone());
        Arc::new(NoopHandler)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEngine {
    pub fail_start: bool,
    pub dialer: Mutex<Option<Arc<dyn Dialer>>>,
    pub configs: Mutex<Vec<EngineConfig>>,
    pub instances: Mutex<Vec<Arc<FakeInstance>>>,
}

impl FakeEngine {
    pub fn failing() -> Self {
        FakeEngine {
            fail_start: true,
            ..Default::default()
        }
    }

    pub fn started(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn dialer(&self) -> Arc<dyn Dialer> {
        self.dialer.lock().clone().expect("no dialer installed")
    }

    pub fn last_instance(&self) -> Arc<FakeInstance> {
        self.instances.lock().last().cloned().expect("no instance started")
    }
}

#[async_trait]
impl ProxyEngine for FakeEngine {
    fn use_dialer(&self, dialer: Arc<dyn Dialer>) {
        *self.dialer.lock() = Some(dialer);
    }

    async fn start(&self, config: &EngineConfig) -> Result<Arc<dyn EngineInstance>> {
        self.configs.lock().push(config.clone());
        if self.fail_start {
            return Err(Error::parse("invalid engine configuration"));
        }
        let instance = Arc::new(FakeInstance::default());
        self.instances.lock().push(instance.clone());
        Ok(instance)
    }
}

/// Name resolver answering every lookup with loopback and counting calls
#[derive(Default)]
pub struct StubResolver {
    pub calls: AtomicUsize,
    pub hosts: Mutex<Vec<String>>,
}

impl StubResolver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for StubResolver {
    async fn lookup(&self, host: &str, _port: u16, _network: Network) -> io::Result<Vec<IpAddr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hosts.lock().push(host.to_string());
        Ok(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)])
    }
}

/// Resolver that must never be reached
pub struct PanickingResolver;

#[async_trait]
impl NameResolver for PanickingResolver {
    async fn lookup(&self, host: &str, _port: u16, _network: Network) -> io::Result<Vec<IpAddr>> {
        panic!("system resolver consulted for {}", host);
    }
}

/// A loopback port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
