use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use crate::startup::AppState;

/// Metadata about the caller that ends up in notifications and the
/// subscriber list.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: IpAddr,
    pub user_agent: String,
    pub host: String,
}

#[async_trait]
impl FromRequestParts<AppState> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(Self {
            ip: client_ip(&parts.headers, peer, state.trust_forwarded_for),
            user_agent: header_or_unknown(&parts.headers, header::USER_AGENT),
            host: header_or_unknown(&parts.headers, header::HOST),
        })
    }
}

/// The first `X-Forwarded-For` hop wins when the proxy is trusted, then the
/// socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded_for: bool) -> IpAddr {
    let forwarded = trust_forwarded_for
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    forwarded.or(peer).unwrap_or_else(|| {
        tracing::warn!("Could not determine the client address");
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    })
}

fn header_or_unknown(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}
