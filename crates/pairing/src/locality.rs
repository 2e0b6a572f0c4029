//! Connection locality detection backing `checkAutoApprove`'s
//! `autoApproveLocal` and `autoApproveTailscale` branches (§4.2).

use std::net::{IpAddr, SocketAddr};

use ipnet::IpNet;

/// Returns `true` when common proxy/forwarding headers are present.
#[must_use]
pub fn has_proxy_headers(headers: &http::HeaderMap) -> bool {
    headers.contains_key("x-forwarded-for")
        || headers.contains_key("x-real-ip")
        || headers.contains_key("cf-connecting-ip")
        || headers.get("forwarded").is_some()
}

/// Returns `true` when `host` (without port) is a loopback name/address.
fn is_loopback_host(host: &str) -> bool {
    let name = if host.starts_with('[') {
        host.rsplit_once("]:")
            .map_or(host, |(addr, _)| addr)
            .trim_start_matches('[')
            .trim_end_matches(']')
    } else if host.matches(':').count() > 1 {
        host
    } else {
        host.rsplit_once(':').map_or(host, |(addr, _)| addr)
    };
    matches!(name, "localhost" | "127.0.0.1" | "::1") || name.ends_with(".localhost")
}

/// Determine whether a connection is a **direct local** connection (no
/// proxy in between). When `behind_proxy` is `true`, the caller is known to
/// sit behind a reverse proxy, so a loopback TCP source is never treated as
/// proof of a direct local connection.
#[must_use]
pub fn is_local_connection(headers: &http::HeaderMap, remote_addr: SocketAddr, behind_proxy: bool) -> bool {
    if behind_proxy {
        return false;
    }
    if has_proxy_headers(headers) {
        return false;
    }
    if let Some(host) = headers.get(http::header::HOST).and_then(|v| v.to_str().ok())
        && !is_loopback_host(host)
    {
        return false;
    }
    remote_addr.ip().is_loopback()
}

/// Tailscale's CGNAT range for the 4via6/IPv4 overlay. `100.100.0.0/10`
/// covers the service range too, but `100.64.0.0/10` is the one peers are
/// assigned from.
const TAILSCALE_CGNAT_V4: &str = "100.64.0.0/10";

/// Returns `true` when `addr` falls inside Tailscale's IPv4 CGNAT range,
/// i.e. it is plausibly a peer of the local tailnet. This is a cheap
/// pre-filter only, never the trust decision itself: `PairingService`
/// treats a `true` here as "worth asking `tailscale status` about", and
/// only approves once `TailscaleClient::lookup_peer` confirms the address
/// actually belongs to a tailnet peer.
#[must_use]
pub fn is_tailscale_peer_addr(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            let net: IpNet = TAILSCALE_CGNAT_V4.parse().unwrap_or_else(|_| {
                IpNet::new(IpAddr::V4(std::net::Ipv4Addr::new(100, 64, 0, 0)), 10)
                    .expect("static CIDR is valid")
            });
            net.contains(&IpAddr::V4(v4))
        },
        IpAddr::V6(_) => false,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_proxy_headers_detects_xff() {
        let mut h = http::HeaderMap::new();
        h.insert("x-forwarded-for", "203.0.113.50".parse().unwrap());
        assert!(has_proxy_headers(&h));
    }

    #[test]
    fn has_proxy_headers_empty() {
        assert!(!has_proxy_headers(&http::HeaderMap::new()));
    }

    #[test]
    fn is_loopback_host_variants() {
        assert!(is_loopback_host("localhost"));
        assert!(is_loopback_host("localhost:18789"));
        assert!(is_loopback_host("127.0.0.1"));
        assert!(is_loopback_host("127.0.0.1:18789"));
        assert!(is_loopback_host("::1"));
        assert!(is_loopback_host("[::1]:18789"));
        assert!(is_loopback_host("gateway.localhost"));

        assert!(!is_loopback_host("example.com"));
        assert!(!is_loopback_host("192.168.1.1:18789"));
        assert!(!is_loopback_host("gateway.example.com"));
    }

    #[test]
    fn local_connection_direct_loopback() {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "localhost:18789".parse().unwrap());
        assert!(is_local_connection(&headers, addr, false));
    }

    #[test]
    fn local_connection_with_proxy_headers() {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "localhost:18789".parse().unwrap());
        headers.insert("x-forwarded-for", "203.0.113.50".parse().unwrap());
        assert!(!is_local_connection(&headers, addr, false));
    }

    #[test]
    fn local_connection_behind_proxy_override() {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "localhost:18789".parse().unwrap());
        assert!(!is_local_connection(&headers, addr, true));
    }

    #[test]
    fn non_loopback_addr_not_local() {
        let addr: SocketAddr = "192.168.1.1:12345".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "localhost:18789".parse().unwrap());
        assert!(!is_local_connection(&headers, addr, false));
    }

    #[test]
    fn not_local_when_xff_spoofs_loopback_value() {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "localhost:18789".parse().unwrap());
        headers.insert("x-forwarded-for", "127.0.0.1".parse().unwrap());
        assert!(!is_local_connection(&headers, addr, false));
    }

    #[test]
    fn not_local_when_host_is_external() {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "gateway.example.com".parse().unwrap());
        assert!(!is_local_connection(&headers, addr, false));
    }

    #[test]
    fn tailscale_cgnat_range_matches() {
        assert!(is_tailscale_peer_addr("100.101.2.3".parse().unwrap()));
        assert!(!is_tailscale_peer_addr("192.168.1.1".parse().unwrap()));
        assert!(!is_tailscale_peer_addr("8.8.8.8".parse().unwrap()));
    }
}
