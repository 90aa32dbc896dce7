//! Handlers for queries outside of the configured zones.

use tracing::error;
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, ResponseCode};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

/// Answers every query with REFUSED. Used as the next handler by a standalone server, which is
/// only authoritative for its own zones.
#[derive(Debug, Clone, Copy, Default)]
pub struct Refuse;

#[async_trait::async_trait]
impl RequestHandler for Refuse {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let response = MessageResponseBuilder::from_message_request(request);
        match response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::Refused))
            .await
        {
            Ok(info) => info,
            Err(error) => {
                error!("error sending REFUSED response: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
