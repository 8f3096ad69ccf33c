//! Client IP echo page with optional ASN lookup.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde::Deserialize;

use crate::adapters::{Adapter, HandlerFuture};
use crate::http::request::peer_addr;
use crate::http::response::{escape_html, html_page, status_page};
use crate::mapping::AsnLookup;

const RIPE_PREFIX_OVERVIEW: &str = "https://stat.ripe.net/data/prefix-overview/data.json";

#[derive(Debug, Clone)]
pub struct MyIpAdapter {
    fuzzy: bool,
    lookup: Option<AsnLookup>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PrefixOverview {
    data: PrefixData,
}

#[derive(Debug, Default, Deserialize)]
struct PrefixData {
    #[serde(default)]
    asns: Vec<AsnHolder>,
}

#[derive(Debug, Deserialize)]
struct AsnHolder {
    asn: u64,
    #[serde(default)]
    holder: String,
}

impl MyIpAdapter {
    pub fn new(fuzzy: bool, lookup: Option<AsnLookup>, client: reqwest::Client) -> Self {
        Self {
            fuzzy,
            lookup,
            client,
        }
    }

    async fn asn(&self, ip: IpAddr) -> Option<String> {
        match self.lookup? {
            AsnLookup::Ripe => ripe_asn(&self.client, ip).await,
        }
    }
}

impl Adapter for MyIpAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let this = self.clone();
        let peer = peer_addr(&request);
        Box::pin(async move {
            let Some(peer) = peer else {
                tracing::warn!("myip request without peer address");
                return status_page(StatusCode::INTERNAL_SERVER_ERROR);
            };
            let asn = this.asn(peer.ip()).await;
            let shown = if this.fuzzy {
                fuzzy_prefix(peer.ip())
            } else {
                peer.ip().to_string()
            };
            html_page(render(&shown, peer.port(), asn.as_deref()))
        })
    }
}

/// The network containing `ip`: /24 for IPv4, /56 for IPv6.
pub fn fuzzy_prefix(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let masked = Ipv4Addr::from(u32::from(v4) & !0xff);
            format!("{}/24", masked)
        }
        IpAddr::V6(v6) => {
            let masked = Ipv6Addr::from(u128::from(v6) & !((1u128 << 72) - 1));
            format!("{}/56", masked)
        }
    }
}

async fn ripe_asn(client: &reqwest::Client, ip: IpAddr) -> Option<String> {
    let resource = ip.to_string();
    let result = client
        .get(RIPE_PREFIX_OVERVIEW)
        .query(&[("resource", resource.as_str())])
        .send()
        .await
        .and_then(|r| r.error_for_status());

    let overview = match result {
        Ok(resp) => resp.json::<PrefixOverview>().await,
        Err(e) => {
            tracing::warn!(ip = %ip, error = %e, "ripe asn lookup failed");
            return None;
        }
    };
    match overview {
        Ok(o) => match o.data.asns.first() {
            Some(a) => Some(format!("ASN{} {}", a.asn, a.holder)),
            None => {
                tracing::warn!(ip = %ip, "ripe knows no asn");
                None
            }
        },
        Err(e) => {
            tracing::warn!(ip = %ip, error = %e, "ripe answer not understood");
            None
        }
    }
}

fn render(ip: &str, port: u16, asn: Option<&str>) -> String {
    let asn_line = match asn {
        Some(asn) if !asn.is_empty() => format!(
            "\t\t<p>Your ASN is: <span id=\"asn\">{}</span></p>\n",
            escape_html(asn)
        ),
        _ => String::new(),
    };
    format!(
        "<!doctype html>\n<html>\n\t<head>\n\t\t<title>mapserve - myip</title>\n\t</head>\n\t<body>\n\t\t<p>Your IP is: <span id=\"ip\">{}</span>:<span id=\"port\">{}</span></p>\n{}\t</body>\n</html>\n",
        escape_html(ip),
        port,
        asn_line
    )
}
