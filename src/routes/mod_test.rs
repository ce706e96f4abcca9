use super::*;
use axum::http::HeaderValue;
use std::net::Ipv4Addr;

fn peer() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::new(10, 0, 0, 7), 51234))
}

fn forwarded(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(FORWARDED_FOR, HeaderValue::from_static(value));
    headers
}

#[test]
fn peer_address_used_by_default() {
    let headers = forwarded("203.0.113.9");
    assert_eq!(client_ip(&headers, peer(), false), peer().ip());
}

#[test]
fn first_forwarded_hop_wins_when_trusted() {
    let headers = forwarded("203.0.113.9, 10.0.0.1");
    let ip = client_ip(&headers, peer(), true);
    assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)));
}

#[test]
fn garbage_forwarded_header_falls_back_to_peer() {
    let headers = forwarded("not-an-ip");
    assert_eq!(client_ip(&headers, peer(), true), peer().ip());
    assert_eq!(client_ip(&HeaderMap::new(), peer(), true), peer().ip());
}

#[tokio::test]
async fn healthz_is_ok() {
    assert_eq!(healthz().await, StatusCode::OK);
}
