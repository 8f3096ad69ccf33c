//! Access log stage.

use std::fmt;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Local, SecondsFormat, TimeZone};

use crate::http::request::{host, peer_addr, request_uri};
use crate::observability::SharedSink;

#[derive(Clone, Debug)]
pub struct RequestLog {
    sink: SharedSink,
}

impl RequestLog {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink }
    }
}

/// `<rfc3339>\t<remote>\t<status>\t<method>\t<host><request-uri>\n`
pub fn format_access_line<Tz>(
    at: &DateTime<Tz>,
    remote: &str,
    status: u16,
    method: &str,
    host: &str,
    uri: &str,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{}\t{}\t{}\t{}\t{}{}\n",
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        remote,
        status,
        method,
        host,
        uri
    )
}

pub async fn request_log(
    State(log): State<RequestLog>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let remote = peer_addr(&request)
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().to_string();
    let host = host(&request);
    let uri = request_uri(&request);

    let response = next.run(request).await;

    let line = format_access_line(
        &Local::now(),
        &remote,
        response.status().as_u16(),
        &method,
        &host,
        &uri,
    );
    log.sink.write(line.as_bytes());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_format_access_line() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let line = format_access_line(&at, "192.0.2.1", 200, "GET", "example.org", "/a?b=c");
        assert_eq!(line, "2024-05-01T12:30:00Z\t192.0.2.1\t200\tGET\texample.org/a?b=c\n");

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();
        let line = format_access_line(&at, "::1", 404, "HEAD", "h", "/");
        assert!(line.starts_with("2024-05-01T14:30:00+02:00\t::1\t404\tHEAD\th/"));
    }
}
