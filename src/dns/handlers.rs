use crate::config::{AnswerStyle, Config};
use crate::dns::next::Refuse;
use crate::dns::zones::{self, Zones};
use crate::error::Error;
use crate::metrics::{self, Timer};
use crate::peer::Peer;
use crate::registry::SharedRegistry;
use tracing::{debug, error};
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_server::client::rr::{Name, RData, Record};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

/// Answers queries for the configured zones with the peers picked by
/// [`Registry::select_healthy`][crate::registry::Registry::select_healthy]. Queries outside of
/// those zones go to the `next` handler.
pub struct Handler<N = Refuse> {
    registry: SharedRegistry,
    zones: Zones,
    answer: AnswerStyle,
    ttl: u32,
    server: String,
    next: N,
}

impl<N: RequestHandler> Handler<N> {
    /// `server` identifies this server in query metrics.
    pub fn new(
        registry: SharedRegistry,
        zones: Zones,
        answer: AnswerStyle,
        server: impl Into<String>,
        next: N,
    ) -> Self {
        let ttl = registry.settings().ttl;
        Handler {
            registry,
            zones,
            answer,
            ttl,
            server: server.into(),
            next,
        }
    }

    pub(crate) fn from_config(
        config: &Config,
        registry: SharedRegistry,
        next: N,
    ) -> Result<Self, Error> {
        Ok(Self::new(
            registry,
            config.zones()?,
            config.answer,
            format!("dns://{}", config.dns_udp_bind_addr),
            next,
        ))
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response: R,
    ) -> Result<ResponseInfo, Error> {
        // Keep the case of the original query for the synthesized names.
        let qname = request.query().original().name();
        let Some(zone) = self.zones.matches(qname) else {
            debug!(%qname, zones = ?self.zones.configured(), "query has not matched any zones");
            return Ok(self.next.handle_request(request, response).await);
        };

        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.handle_notimpl(request, response).await;
        }

        let timer = Timer::start();
        let subdomain = zones::subdomain(qname, zone)?;
        debug!(%qname, %zone, %subdomain, "matched zone");

        let peers = self.registry.select_healthy().await;
        if peers.is_empty() && self.zones.falls_through(qname) {
            debug!(%qname, "no peers registered, falling through");
            return Ok(self.next.handle_request(request, response).await);
        }

        let info = match self.answer {
            AnswerStyle::Delegation => {
                let (answers, glue) = self.delegation_records(&subdomain, &peers)?;
                self.send_auth_resp(request, response, &answers, &glue)
                    .await?
            }
            AnswerStyle::Cname => {
                let answers = self.cname_records(qname, &subdomain, &peers)?;
                self.send_auth_resp(request, response, &answers, &[])
                    .await?
            }
        };
        metrics::record_query(&self.server, &zone.to_ascii(), timer.elapsed());
        Ok(info)
    }

    async fn handle_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    /// One NS record per peer, plus A/AAAA glue for the peer hosts.
    fn delegation_records(
        &self,
        subdomain: &Name,
        peers: &[Peer],
    ) -> Result<(Vec<Record>, Vec<Record>), Error> {
        let mut answers = Vec::with_capacity(peers.len());
        let mut glue = Vec::with_capacity(peers.len());
        for peer in peers {
            let host = Name::from_ascii(&peer.host)?;
            answers.push(Record::from_rdata(
                peer_name(subdomain, &peer.host)?,
                self.ttl,
                RData::NS(host.clone()),
            ));
            if let Some(ipv4) = peer.ipv4 {
                glue.push(Record::from_rdata(host.clone(), self.ttl, RData::A(ipv4)));
            }
            if let Some(ipv6) = peer.ipv6 {
                glue.push(Record::from_rdata(host, self.ttl, RData::AAAA(ipv6)));
            }
        }
        Ok((answers, glue))
    }

    /// One CNAME per peer, from the query name to the subdomain under the peer.
    fn cname_records(
        &self,
        qname: &Name,
        subdomain: &Name,
        peers: &[Peer],
    ) -> Result<Vec<Record>, Error> {
        peers
            .iter()
            .map(|peer| {
                Ok(Record::from_rdata(
                    qname.clone(),
                    self.ttl,
                    RData::CNAME(peer_name(subdomain, &peer.host)?),
                ))
            })
            .collect()
    }

    async fn send_auth_resp<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        answers: &[Record],
        additionals: &[Record],
    ) -> Result<ResponseInfo, Error> {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(header, answers.iter(), &[], &[], additionals.iter());
        Ok(response_handle.send_response(response).await?)
    }
}

/// `subdomain.host`, or just `host` for a query at the zone apex.
fn peer_name(subdomain: &Name, host: &str) -> Result<Name, Error> {
    let host = Name::from_ascii(host)?;
    if subdomain.iter().next().is_none() {
        return Ok(host);
    }
    Ok(subdomain.clone().append_domain(&host)?)
}

#[async_trait::async_trait]
impl<N: RequestHandler> RequestHandler for Handler<N> {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::response_from_request(request.header());
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
