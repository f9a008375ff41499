//! Validation of user-configured endpoint URLs
//!
//! Providers such as Edge TTS post to an endpoint the user types in. The URL
//! must be absolute, use HTTP(S), name a host and carry no credentials or
//! fragment. Plain HTTP is accepted (self-hosted proxies on a LAN are common)
//! but logged when the host is not local.
//!
//! Validation is purely syntactic; no DNS lookup happens here.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that can occur during URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL must not embed credentials")]
    CredentialsNotAllowed,

    #[error("URL must not contain a fragment")]
    FragmentNotAllowed,
}

/// Checks if an IPv4 address is private/internal
///
/// Covers loopback, RFC 1918, link-local, unspecified and CGNAT
/// (100.64.0.0/10).
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    if ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified() {
        return true;
    }
    // Shared address space (CGNAT) 100.64.0.0/10
    let octets = ip.octets();
    octets[0] == 100 && (octets[1] & 0xC0) == 64
}

/// Checks if an IPv6 address is private/internal
///
/// Covers loopback, unspecified, link-local (fe80::/10), unique local
/// (fc00::/7) and IPv4-mapped private addresses.
pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();

    // Link-local (fe80::/10)
    if segments[0] & 0xFFC0 == 0xFE80 {
        return true;
    }
    // Unique local (fc00::/7)
    if segments[0] & 0xFE00 == 0xFC00 {
        return true;
    }
    if let Some(ipv4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&ipv4);
    }
    false
}

pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_private_ipv6(ipv6),
    }
}

/// Whether the URL's host is this machine or a private network address
pub fn is_local_host(parsed: &Url) -> bool {
    match parsed.host() {
        Some(url::Host::Ipv4(ip)) => is_private_ipv4(&ip),
        Some(url::Host::Ipv6(ip)) => is_private_ipv6(&ip),
        Some(url::Host::Domain(domain)) => {
            domain.eq_ignore_ascii_case("localhost") || domain.ends_with(".local")
        }
        None => false,
    }
}

/// Validate an endpoint URL entered by the user
///
/// # Example
/// ```rust,ignore
/// use lingo_gateway::utils::url_validation::validate_endpoint_url;
///
/// assert!(validate_endpoint_url("https://tts.example.com/api/speak").is_ok());
/// assert!(validate_endpoint_url("http://192.168.1.20:5000/tts").is_ok());
/// assert!(validate_endpoint_url("ftp://example.com").is_err());
/// ```
pub fn validate_endpoint_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url.trim())?;

    let scheme = parsed.scheme();
    if scheme != "https" && scheme != "http" {
        return Err(UrlValidationError::UnsupportedScheme(scheme.to_string()));
    }

    let host = parsed.host_str().ok_or(UrlValidationError::MissingHost)?;
    if host.is_empty() {
        return Err(UrlValidationError::MissingHost);
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(UrlValidationError::CredentialsNotAllowed);
    }
    if parsed.fragment().is_some() {
        return Err(UrlValidationError::FragmentNotAllowed);
    }

    if scheme == "http" && !is_local_host(&parsed) {
        warn!(host = %host, "Endpoint uses plain HTTP to a non-local host");
    }

    Ok(parsed)
}
