//! Resolving a question against a set of name servers.
//!
//! A [`LookupClient`] holds a list of name servers, a UDP and a TCP
//! transport, and a response cache. Each lookup walks the servers in order,
//! or in random order if so configured. Every server gets up to one plus
//! the configured number of retries attempts. An attempt sends the question
//! over UDP, or over TCP if that is required for the server or the client,
//! and waits for the response with a timeout. If a UDP response comes back
//! truncated, the question is asked again over TCP to the same server.
//!
//! Transport failures, timeouts, and responses with the wrong ID lead to
//! the next attempt. Responses that can’t be decoded end the lookup
//! right away. A response with an error code is a regular result unless
//! the client is configured to treat it as an error. If it is configured to
//! continue on DNS errors, a response code other than NOERROR or NXDOMAIN
//! moves on to the next server first.
//!
//! Every lookup can be canceled through a [`CancellationToken`]. This
//! interrupts any exchange in progress and ends the lookup with
//! [`Error::Canceled`].

use super::audit::{Audit, AuditEvent};
use super::cache::{Key, ResponseCache};
use super::clock::{Clock, SystemClock};
use super::error::Error;
use super::nameserver::NameServer;
use super::tcp::{self, TcpTransport};
use super::transport::{cancelable, Transport};
use super::udp::{self, UdpTransport};
use crate::base::iana::{Class, Rtype};
use crate::base::message::{is_final_rcode, Message, Request};
use crate::base::name::Name;
use crate::base::question::Question;
use crate::rdata::Registry;
use crate::utils::config::DefMinMax;
use bytes::Bytes;
use rand::seq::SliceRandom;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{error, fmt, io};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

//------------ Configuration Constants ---------------------------------------

/// Limits for the number of retries per server.
const RETRIES: DefMinMax<usize> = DefMinMax::new(5, 0, 100);

/// Limits for the timeout of a single attempt.
///
/// The maximum is the longest timeout expressible in signed 32 bit
/// milliseconds.
const TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(5),
    Duration::from_millis(1),
    Duration::from_millis(i32::MAX as u64),
);

/// Limits for the UDP payload size announced in requests.
const UDP_PAYLOAD_SIZE: DefMinMax<u16> = DefMinMax::new(4096, 512, 65535);

//------------ Config --------------------------------------------------------

/// Configuration of a lookup client.
#[derive(Clone, Debug)]
pub struct Config {
    retries: usize,
    timeout: Duration,
    recursion: bool,
    use_tcp_fallback: bool,
    use_tcp_only: bool,
    use_random_name_server: bool,
    throw_dns_errors: bool,
    continue_on_dns_error: bool,
    use_cache: bool,
    enable_audit_trail: bool,
    udp_payload_size: u16,
}

impl Config {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Sets the number of retries per server.
    ///
    /// Each server is tried once plus this many times. The default is 5.
    pub fn set_retries(&mut self, value: usize) {
        self.retries = RETRIES.limit(value)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the time to wait for a response to a single attempt.
    ///
    /// The value is limited to the range from one millisecond to a little
    /// less than 25 days. The default is five seconds.
    pub fn set_timeout(&mut self, value: Duration) {
        self.timeout = TIMEOUT.limit(value)
    }

    pub fn recursion(&self) -> bool {
        self.recursion
    }

    /// Sets whether requests ask for recursion.
    pub fn set_recursion(&mut self, value: bool) {
        self.recursion = value
    }

    pub fn use_tcp_fallback(&self) -> bool {
        self.use_tcp_fallback
    }

    /// Sets whether truncated UDP responses are retried over TCP.
    pub fn set_use_tcp_fallback(&mut self, value: bool) {
        self.use_tcp_fallback = value
    }

    pub fn use_tcp_only(&self) -> bool {
        self.use_tcp_only
    }

    /// Sets whether all requests are sent over TCP.
    pub fn set_use_tcp_only(&mut self, value: bool) {
        self.use_tcp_only = value
    }

    pub fn use_random_name_server(&self) -> bool {
        self.use_random_name_server
    }

    /// Sets whether the servers are tried in random order.
    pub fn set_use_random_name_server(&mut self, value: bool) {
        self.use_random_name_server = value
    }

    pub fn throw_dns_errors(&self) -> bool {
        self.throw_dns_errors
    }

    /// Sets whether a response with an error code ends in an error.
    ///
    /// The error is [`Error::DnsError`] and the response is available
    /// through [`LookupError::response`]. The default is false.
    pub fn set_throw_dns_errors(&mut self, value: bool) {
        self.throw_dns_errors = value
    }

    pub fn continue_on_dns_error(&self) -> bool {
        self.continue_on_dns_error
    }

    /// Sets whether error responses move on to the next server.
    ///
    /// This applies to all response codes other than NOERROR and NXDOMAIN.
    /// If no server gives a better answer, the last error response is the
    /// result. The default is true.
    pub fn set_continue_on_dns_error(&mut self, value: bool) {
        self.continue_on_dns_error = value
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Sets whether responses are looked up in and added to the cache.
    pub fn set_use_cache(&mut self, value: bool) {
        self.use_cache = value
    }

    pub fn enable_audit_trail(&self) -> bool {
        self.enable_audit_trail
    }

    /// Sets whether lookups record an audit trail.
    pub fn set_enable_audit_trail(&mut self, value: bool) {
        self.enable_audit_trail = value
    }

    pub fn udp_payload_size(&self) -> u16 {
        self.udp_payload_size
    }

    /// Sets the UDP payload size announced in the OPT record.
    pub fn set_udp_payload_size(&mut self, value: u16) {
        self.udp_payload_size = UDP_PAYLOAD_SIZE.limit(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retries: RETRIES.default(),
            timeout: TIMEOUT.default(),
            recursion: true,
            use_tcp_fallback: true,
            use_tcp_only: false,
            use_random_name_server: true,
            throw_dns_errors: false,
            continue_on_dns_error: true,
            use_cache: true,
            enable_audit_trail: false,
            udp_payload_size: UDP_PAYLOAD_SIZE.default(),
        }
    }
}

//------------ LookupClient --------------------------------------------------

/// A client resolving questions against a set of name servers.
///
/// Clones share transports, pools, and cache.
#[derive(Clone, Debug)]
pub struct LookupClient<C: Clock = SystemClock> {
    servers: Vec<NameServer>,
    config: Config,
    udp: Arc<dyn Transport>,
    tcp: Arc<dyn Transport>,
    cache: ResponseCache<C>,
    registry: Arc<Registry>,
}

impl LookupClient {
    /// Creates a client with default configuration.
    pub fn new(servers: Vec<NameServer>) -> Self {
        Self::with_config(servers, Default::default())
    }

    /// Creates a client with the given configuration.
    ///
    /// The client gets its own transports and cache.
    pub fn with_config(servers: Vec<NameServer>, config: Config) -> Self {
        Self::with_parts(
            servers,
            config,
            Arc::new(UdpTransport::new()),
            Arc::new(TcpTransport::new()),
            ResponseCache::new(),
        )
    }
}

impl<C: Clock> LookupClient<C> {
    /// Creates a client from explicit parts.
    ///
    /// This allows sharing pools and caches between clients.
    pub fn with_parts(
        servers: Vec<NameServer>,
        config: Config,
        udp: Arc<dyn Transport>,
        tcp: Arc<dyn Transport>,
        cache: ResponseCache<C>,
    ) -> Self {
        LookupClient {
            servers,
            config,
            udp,
            tcp,
            cache,
            registry: Arc::new(Registry::standard()),
        }
    }

    /// Replaces the registry used to decode record data.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn servers(&self) -> &[NameServer] {
        &self.servers
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache<C> {
        &self.cache
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Looks up a name.
    pub async fn query(
        &self,
        qname: Name,
        qtype: Rtype,
        qclass: Class,
    ) -> Result<LookupResponse, LookupError> {
        self.query_question(Question::new(qname, qtype, qclass))
            .await
    }

    /// Looks up a question.
    pub async fn query_question(
        &self,
        question: Question,
    ) -> Result<LookupResponse, LookupError> {
        self.query_with_cancel(question, &CancellationToken::new())
            .await
    }

    /// Looks up a question until `cancel` is triggered.
    pub async fn query_with_cancel(
        &self,
        question: Question,
        cancel: &CancellationToken,
    ) -> Result<LookupResponse, LookupError> {
        self.query_servers(&self.servers, question, cancel).await
    }

    /// Looks up a question using a specific list of servers.
    pub async fn query_servers(
        &self,
        servers: &[NameServer],
        question: Question,
        cancel: &CancellationToken,
    ) -> Result<LookupResponse, LookupError> {
        Lookup::new(self, question, cancel).run(servers).await
    }

    /// Looks up the PTR records for an address.
    pub async fn query_reverse(
        &self,
        addr: IpAddr,
    ) -> Result<LookupResponse, LookupError> {
        self.query(Name::reverse_address(addr), Rtype::PTR, Class::IN)
            .await
    }

    /// Looks up a question, blocking the current thread.
    ///
    /// The lookup runs on a private single-threaded runtime. Since sockets
    /// are bound to the runtime they were created on, the lookup uses its
    /// own unpooled UDP and TCP transports. The cache is shared.
    ///
    /// This fails with [`Error::Runtime`] if called from within an
    /// asynchronous runtime.
    pub fn query_blocking(
        &self,
        question: Question,
    ) -> Result<LookupResponse, LookupError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            let err = io::Error::new(
                io::ErrorKind::Other,
                "blocking query from within a runtime",
            );
            return Err(LookupError::new(
                Error::Runtime(Arc::new(err)),
                question,
            ));
        }
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                return Err(LookupError::new(
                    Error::Runtime(Arc::new(err)),
                    question,
                ))
            }
        };

        let mut udp_config = udp::Config::new();
        udp_config.set_enable_socket_pool(false);
        let mut tcp_config = tcp::Config::new();
        tcp_config.set_enable_pool(false);
        let client = LookupClient {
            servers: self.servers.clone(),
            config: self.config.clone(),
            udp: Arc::new(UdpTransport::with_config(udp_config)),
            tcp: Arc::new(TcpTransport::with_config(tcp_config)),
            cache: self.cache.clone(),
            registry: self.registry.clone(),
        };
        runtime.block_on(client.query_question(question))
    }
}

//------------ Lookup --------------------------------------------------------

/// The state of a single lookup.
struct Lookup<'a, C: Clock> {
    client: &'a LookupClient<C>,
    question: Question,
    cancel: &'a CancellationToken,

    /// The trail if it is enabled.
    audit: Option<Audit>,

    started: Instant,

    /// The server of the last attempt.
    server: Option<SocketAddr>,
}

/// What to do after an attempt.
enum Outcome {
    /// The lookup is finished, successfully or not.
    Done(Result<LookupResponse, LookupError>),

    /// Try the next server, remembering this error response.
    NextServer(Message),

    /// The attempt failed and the server may be tried again.
    NextAttempt(Error),
}

impl<'a, C: Clock> Lookup<'a, C> {
    fn new(
        client: &'a LookupClient<C>,
        question: Question,
        cancel: &'a CancellationToken,
    ) -> Self {
        Lookup {
            client,
            question,
            cancel,
            audit: client.config.enable_audit_trail.then(Audit::new),
            started: Instant::now(),
            server: None,
        }
    }

    fn config(&self) -> &'a Config {
        &self.client.config
    }

    fn record(&mut self, event: impl FnOnce() -> AuditEvent) {
        if let Some(audit) = self.audit.as_mut() {
            audit.push(event())
        }
    }

    async fn run(
        mut self,
        servers: &[NameServer],
    ) -> Result<LookupResponse, LookupError> {
        if servers.is_empty() {
            return Err(self.fail(Error::NoServers));
        }
        let mut servers = servers.to_vec();
        if self.config().use_random_name_server {
            servers.shuffle(&mut rand::thread_rng());
        }
        self.record(|| {
            AuditEvent::ResolvedServers(
                servers.iter().map(NameServer::addr).collect(),
            )
        });
        debug!(question = %self.question, servers = servers.len(), "lookup");

        let mut failures = 0usize;
        let mut timeouts = 0usize;
        let mut last_error_response = None;

        'servers: for server in servers {
            if self.cancel.is_cancelled() {
                return Err(self.fail(Error::Canceled));
            }
            self.server = Some(server.addr());
            let key = Key::new(server.addr(), &self.question);
            if self.config().use_cache {
                if let Some(message) = self.client.cache.get(&key).await {
                    self.record(|| AuditEvent::CacheHit {
                        server: server.addr(),
                    });
                    return Ok(self.succeed(message, server.addr(), true));
                }
            }

            for attempt in 0..=self.config().retries {
                if self.cancel.is_cancelled() {
                    return Err(self.fail(Error::Canceled));
                }
                let res = self.attempt(server, attempt).await;
                match self.evaluate(res, server.addr(), &key).await {
                    Outcome::Done(res) => return res,
                    Outcome::NextServer(response) => {
                        last_error_response = Some((server.addr(), response));
                        continue 'servers;
                    }
                    Outcome::NextAttempt(err) => {
                        failures += 1;
                        if matches!(err, Error::Timeout) {
                            timeouts += 1;
                        }
                    }
                }
            }
        }

        if let Some((server, response)) = last_error_response {
            self.server = Some(server);
            return self.dns_error(response, server);
        }
        if failures > 0 && failures == timeouts {
            Err(self.fail(Error::ConnectionTimeout))
        } else {
            Err(self.fail(Error::NoConnection))
        }
    }

    /// Decides what to do with the result of an attempt.
    async fn evaluate(
        &mut self,
        res: Result<Message, Error>,
        server: SocketAddr,
        key: &Key,
    ) -> Outcome {
        let message = match res {
            Ok(message) => message,
            Err(err) if err.is_transient() => {
                warn!(
                    %server, %err, question = %self.question,
                    "attempt failed"
                );
                self.record(|| AuditEvent::TransportError {
                    server,
                    error: err.clone(),
                });
                return Outcome::NextAttempt(err);
            }
            Err(err) => return Outcome::Done(Err(self.fail(err))),
        };

        self.record(|| AuditEvent::ResponseHeader {
            header: message.header(),
            size: message.size(),
        });
        let rcode = message.opt_rcode();
        if rcode.is_error() {
            self.record(|| AuditEvent::ResponseError(rcode));
            if self.config().continue_on_dns_error && !is_final_rcode(rcode) {
                debug!(%server, %rcode, "error response, trying next server");
                self.record(|| AuditEvent::RetryNextServer { server, rcode });
                return Outcome::NextServer(message);
            }
            return Outcome::Done(self.dns_error(message, server));
        }

        if self.config().use_cache {
            self.client.cache.put(key.clone(), &message).await;
        }
        Outcome::Done(Ok(self.succeed(message, server, false)))
    }

    /// Performs one attempt against a server.
    async fn attempt(
        &mut self,
        server: NameServer,
        attempt: usize,
    ) -> Result<Message, Error> {
        let client = self.client;
        let config = &client.config;
        let mut request = Request::new(
            self.question.clone(),
            config.recursion,
            config.udp_payload_size,
        );
        request.header_mut().set_id(rand::random());
        let wire = request.to_bytes()?;

        let use_tcp = config.use_tcp_only || server.prefer_tcp();
        let transport = if use_tcp { &client.tcp } else { &client.udp };
        self.record(|| AuditEvent::Attempt {
            server: server.addr(),
            protocol: transport.protocol(),
            attempt,
        });
        trace!(
            server = %server.addr(),
            protocol = %transport.protocol(),
            attempt,
            id = request.header().id(),
            "sending request"
        );

        let response =
            self.send(transport.as_ref(), server.addr(), &wire).await?;
        let message = Message::from_octets(response, &client.registry)?;
        if !message.is_truncated() || use_tcp || !config.use_tcp_fallback {
            return Ok(message);
        }

        debug!(
            server = %server.addr(),
            "truncated response, retrying over TCP"
        );
        self.record(|| AuditEvent::TruncatedRetryTcp {
            server: server.addr(),
        });
        let response = self
            .send(client.tcp.as_ref(), server.addr(), &wire)
            .await?;
        Ok(Message::from_octets(response, &client.registry)?)
    }

    /// Sends a request with timeout and cancellation.
    async fn send(
        &self,
        transport: &dyn Transport,
        server: SocketAddr,
        request: &[u8],
    ) -> Result<Bytes, Error> {
        let timeout = self.config().timeout;
        cancelable(self.cancel, async move {
            tokio::time::timeout(timeout, transport.query(server, request))
                .await
                .map_err(|_| Error::Timeout)?
        })
        .await
    }

    /// Ends the lookup with an error response.
    fn dns_error(
        &mut self,
        message: Message,
        server: SocketAddr,
    ) -> Result<LookupResponse, LookupError> {
        if self.config().throw_dns_errors {
            let rcode = message.opt_rcode();
            let mut err = self.fail(Error::DnsError(rcode));
            err.response = Some(message);
            Err(err)
        } else {
            Ok(self.succeed(message, server, false))
        }
    }

    fn succeed(
        &mut self,
        message: Message,
        server: SocketAddr,
        from_cache: bool,
    ) -> LookupResponse {
        let elapsed = self.started.elapsed();
        let size = message.size();
        self.record(|| AuditEvent::Ended {
            elapsed,
            size: Some(size),
        });
        debug!(%server, from_cache, ?elapsed, "lookup done");
        LookupResponse {
            message,
            server,
            audit: self.audit.take(),
            from_cache,
        }
    }

    fn fail(&mut self, error: Error) -> LookupError {
        let elapsed = self.started.elapsed();
        self.record(|| AuditEvent::Ended {
            elapsed,
            size: None,
        });
        debug!(question = %self.question, %error, "lookup failed");
        LookupError {
            error,
            question: self.question.clone(),
            server: self.server,
            audit: self.audit.take(),
            response: None,
        }
    }
}

//------------ LookupResponse ------------------------------------------------

/// The successful result of a lookup.
#[derive(Clone, Debug)]
pub struct LookupResponse {
    message: Message,
    server: SocketAddr,
    audit: Option<Audit>,
    from_cache: bool,
}

impl LookupResponse {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Returns the server that gave the response.
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Returns the audit trail if it was enabled.
    pub fn audit(&self) -> Option<&Audit> {
        self.audit.as_ref()
    }

    /// Returns whether the response was taken from the cache.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }
}

//------------ LookupError ---------------------------------------------------

/// A failed lookup.
#[derive(Clone, Debug)]
pub struct LookupError {
    error: Error,
    question: Question,
    server: Option<SocketAddr>,
    audit: Option<Audit>,
    response: Option<Message>,
}

impl LookupError {
    fn new(error: Error, question: Question) -> Self {
        LookupError {
            error,
            question,
            server: None,
            audit: None,
            response: None,
        }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn into_error(self) -> Error {
        self.error
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Returns the last server that was tried.
    pub fn server(&self) -> Option<SocketAddr> {
        self.server
    }

    pub fn audit(&self) -> Option<&Audit> {
        self.audit.as_ref()
    }

    /// Returns the error response for [`Error::DnsError`].
    pub fn response(&self) -> Option<&Message> {
        self.response.as_ref()
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.server {
            Some(server) => write!(
                f,
                "lookup of {} via {} failed: {}",
                self.question, server, self.error
            ),
            None => {
                write!(f, "lookup of {} failed: {}", self.question, self.error)
            }
        }
    }
}

impl error::Error for LookupError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_limits() {
        let mut config = Config::new();
        assert_eq!(config.retries(), 5);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        config.set_timeout(Duration::ZERO);
        assert_eq!(config.timeout(), Duration::from_millis(1));
        config.set_timeout(Duration::from_secs(100 * 24 * 3600));
        assert_eq!(config.timeout(), Duration::from_millis(i32::MAX as u64));
        config.set_udp_payload_size(100);
        assert_eq!(config.udp_payload_size(), 512);
    }

    #[tokio::test]
    async fn no_servers() {
        let client = LookupClient::new(Vec::new());
        let err = client
            .query("example.com".parse().unwrap(), Rtype::A, Class::IN)
            .await
            .unwrap_err();
        assert!(matches!(err.error(), Error::NoServers));
        assert_eq!(err.server(), None);
    }

    #[tokio::test]
    async fn blocking_in_runtime() {
        let client =
            LookupClient::new(vec!["127.0.0.1:53".parse().unwrap()]);
        let err = client
            .query_blocking(Question::new_in(Name::root(), Rtype::NS))
            .unwrap_err();
        assert!(matches!(err.error(), Error::Runtime(_)));
    }
}
