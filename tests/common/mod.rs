//! Shared test infrastructure for DNS handler and health-check integration tests.

#![allow(dead_code)]

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trust_dns_proto::op::{Message, MessageType, OpCode, Query};
use trust_dns_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use trust_dns_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use trust_dns_server::authority::{MessageRequest, MessageResponse};
use trust_dns_server::server::{Protocol, Request, RequestHandler, ResponseHandler, ResponseInfo};

use zonecrab::config::AnswerStyle;
use zonecrab::dns::zones::Zones;
use zonecrab::dns::{Handler, Refuse};
use zonecrab::registry::{Registry, Settings};
use zonecrab::{Peer, Role};

pub const ZONE: &str = "example.org.";

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// The response is serialized via `MessageResponse::destructive_emit()` and stored as raw
/// wire-format bytes, which can then be parsed with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().unwrap().is_empty()
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

/// Fails every write, as a client that went away would.
#[derive(Clone, Default)]
pub struct FailingResponseHandler {
    attempts: Arc<AtomicUsize>,
}

impl FailingResponseHandler {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseHandler for FailingResponseHandler {
    async fn send_response<'a>(
        &mut self,
        _response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
    }
}

// --- Next handler ---

/// Counts the queries handed to it and answers them with REFUSED.
#[derive(Clone, Default)]
pub struct CountingNext {
    calls: Arc<AtomicUsize>,
}

impl CountingNext {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestHandler for CountingNext {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Refuse.handle_request(request, response_handle).await
    }
}

// --- Registry builders ---

pub fn peer(host: &str, role: Role, ipv4: [u8; 4], healthy: bool) -> Peer {
    Peer::new(host)
        .with_role(role)
        .with_ipv4(Ipv4Addr::from(ipv4))
        .with_healthy(healthy)
}

pub fn registry(peers: Vec<Peer>) -> Arc<Registry> {
    Arc::new(Registry::with_peers(Settings::default(), peers))
}

pub fn handler(
    registry: Arc<Registry>,
    answer: AnswerStyle,
    fallthrough: &[&str],
) -> (Handler<CountingNext>, CountingNext) {
    let next = CountingNext::default();
    let fallthrough: Vec<String> = fallthrough.iter().map(ToString::to_string).collect();
    let zones = Zones::parse(&[ZONE.to_string()], &fallthrough).unwrap();
    let handler = Handler::new(registry, zones, answer, "dns://test", next.clone());
    (handler, next)
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    build_message_bytes(Name::from_ascii(name).unwrap(), OpCode::Query, record_type, id)
}

/// Build wire-format bytes for a message with any opcode.
pub fn build_message_bytes(
    name: Name,
    op_code: OpCode,
    record_type: RecordType,
    id: u16,
) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(op_code);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

pub fn build_request(name: &str, record_type: RecordType, id: u16) -> Request {
    request_from_bytes(&build_query_bytes(name, record_type, id))
}

pub fn request_from_bytes(bytes: &[u8]) -> Request {
    let msg = parse_message_request(bytes);
    let src: SocketAddr = "10.0.0.53:12345".parse().unwrap();
    Request::new(msg, src, Protocol::Udp)
}

/// Execute a prepared request through the handler and return the parsed response.
pub async fn execute_request<N: RequestHandler>(
    handler: &Handler<N>,
    request: &Request,
) -> Message {
    let response = TestResponseHandler::new();
    handler.handle_request(request, response.clone()).await;
    response.into_message()
}

/// Execute a query through the handler and return the parsed response.
pub async fn execute_query<N: RequestHandler>(
    handler: &Handler<N>,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    execute_request(handler, &build_request(name, record_type, id)).await
}

// --- Response helpers ---

/// `(owner, target)` of every NS record in the answer section.
pub fn ns_answers(msg: &Message) -> Vec<(String, String)> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::NS(target)) => Some((r.name().to_ascii(), target.to_ascii())),
            _ => None,
        })
        .collect()
}

/// `(owner, target)` of every CNAME record in the answer section.
pub fn cname_answers(msg: &Message) -> Vec<(String, String)> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::CNAME(target)) => Some((r.name().to_ascii(), target.to_ascii())),
            _ => None,
        })
        .collect()
}

/// `(owner, address)` of every A/AAAA record in the additional section.
pub fn glue(msg: &Message) -> Vec<(String, String)> {
    msg.additionals()
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::A(ip)) => Some((r.name().to_ascii(), ip.to_string())),
            Some(RData::AAAA(ip)) => Some((r.name().to_ascii(), ip.to_string())),
            _ => None,
        })
        .collect()
}

/// Targets of the NS records in the answer section, in answer order.
pub fn ns_targets(msg: &Message) -> Vec<String> {
    ns_answers(msg).into_iter().map(|(_, target)| target).collect()
}
