//! Protected dialer (resolve, then open a protected socket)

use super::{Connection, Dialer, ProtectedSocketFactory, SocketProtector};
use crate::common::{Address, Destination};
use crate::dns::{DestinationResolver, ExceptionTable, NameResolver};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Dialer handed to the proxy engine as its alternative system dialer
pub struct ProtectedDialer {
    resolver: DestinationResolver,
    factory: ProtectedSocketFactory,
}

impl ProtectedDialer {
    /// Dialer using the platform resolver for names outside `exceptions`
    pub fn new(exceptions: Arc<ExceptionTable>, protector: Arc<dyn SocketProtector>) -> Self {
        ProtectedDialer {
            resolver: DestinationResolver::with_system(exceptions),
            factory: ProtectedSocketFactory::new(protector),
        }
    }

    /// Dialer with a custom name resolver
    pub fn with_resolver(
        exceptions: Arc<ExceptionTable>,
        resolver: Arc<dyn NameResolver>,
        protector: Arc<dyn SocketProtector>,
    ) -> Self {
        ProtectedDialer {
            resolver: DestinationResolver::new(exceptions, resolver),
            factory: ProtectedSocketFactory::new(protector),
        }
    }

    pub fn resolver(&self) -> &DestinationResolver {
        &self.resolver
    }

    async fn dial_resolved(&self, dest: &Destination) -> Result<Connection> {
        let resolved = self.resolver.resolve(dest).await?;
        let ip = resolved.address.to_ip().ok_or_else(|| {
            Error::resolution(
                dest.remote_address(),
                io::Error::new(io::ErrorKind::InvalidData, "resolver returned a domain"),
            )
        })?;

        self.factory
            .open_protected(ip, resolved.port, resolved.network)
            .await
    }
}

#[async_trait]
impl Dialer for ProtectedDialer {
    async fn dial(
        &self,
        cancel: &CancellationToken,
        source: Option<&Address>,
        dest: &Destination,
    ) -> Result<Connection> {
        match source {
            Some(src) => debug!("Dialing {} for {}", dest, src),
            None => debug!("Dialing {}", dest),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::cancelled(format!("dial {} cancelled", dest))),
            result = self.dial_resolved(dest) => {
                if let Err(ref e) = result {
                    debug!("Dial {} failed: {}", dest, e);
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Network;
    use crate::outbound::NoopProtector;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    struct LoopbackResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NameResolver for LoopbackResolver {
        async fn lookup(&self, _host: &str, _port: u16, _network: Network) -> io::Result<Vec<IpAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["127.0.0.1".parse().unwrap()])
        }
    }

    #[tokio::test]
    async fn test_dial_exception_domain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let table = Arc::new(ExceptionTable::from_lists("local.test", "127.0.0.1").unwrap());
        let system = Arc::new(LoopbackResolver {
            calls: AtomicUsize::new(0),
        });
        let dialer = ProtectedDialer::with_resolver(table, system.clone(), Arc::new(NoopProtector));

        let conn = dialer
            .dial(&CancellationToken::new(), None, &Destination::tcp("local.test", port))
            .await
            .unwrap();

        assert_eq!(conn.peer_addr().unwrap().port(), port);
        assert_eq!(system.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dial_unknown_domain_uses_resolver() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let system = Arc::new(LoopbackResolver {
            calls: AtomicUsize::new(0),
        });
        let dialer = ProtectedDialer::with_resolver(
            Arc::new(ExceptionTable::new()),
            system.clone(),
            Arc::new(NoopProtector),
        );

        let source = Address::parse("10.0.0.2");
        dialer
            .dial(&CancellationToken::new(), Some(&source), &Destination::tcp("c.com", port))
            .await
            .unwrap();
        assert_eq!(system.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_dial() {
        let dialer = ProtectedDialer::new(Arc::new(ExceptionTable::new()), Arc::new(NoopProtector));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = dialer
            .dial(&cancel, None, &Destination::tcp("127.0.0.1", 9))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }
}
