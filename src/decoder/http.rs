use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use url::Url;

use crate::decoder::upstream::DecodeUpstream;
use crate::errors::{DecodeFailure, FeedgenResult};
use crate::normalizers::aggregator::{obfuscated_id, AGGREGATOR_ROOT};

const BATCH_EXECUTE_PATH: &str = "_/DotsSplashUi/data/batchexecute";

static ESCAPED_DESTINATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\\"garturlres\\",\\"(https?://[^"\\]+)\\""#).expect("valid destination pattern")
});

/// Decodes aggregator article links the way the aggregator's own web client does:
/// the article page carries a signature and timestamp, which are exchanged for the
/// destination URL through a batch-execute call.
pub struct HttpDecodeUpstream {
    client: Client,
    root: String,
    user_agent: String,
}

impl HttpDecodeUpstream {
    pub fn new(user_agent: &str) -> FeedgenResult<Self> {
        Self::with_root(user_agent, AGGREGATOR_ROOT)
    }

    /// Point at a different aggregator root, e.g. a local stand-in.
    pub fn with_root(user_agent: &str, root: &str) -> FeedgenResult<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            root: format!("{}/", root.trim_end_matches('/')),
            user_agent: user_agent.to_string(),
        })
    }

    fn fetch_params(&self, id: &str, timeout: Duration) -> Result<(String, String), DecodeFailure> {
        let article_url = format!("{}articles/{}", self.root, id);
        let response = self
            .client
            .get(&article_url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()
            .map_err(transport_failure)?;

        let response = check_response(response)?;
        let html = response.text().map_err(transport_failure)?;

        decoding_params(&html).ok_or_else(|| {
            DecodeFailure::BadRequest("article page carries no decoding parameters".to_string())
        })
    }

    fn exchange(
        &self,
        id: &str,
        params: &(String, String),
        timeout: Duration,
    ) -> Result<String, DecodeFailure> {
        let (signature, timestamp) = params;
        let payload = build_request_payload(id, timestamp, signature);

        let response = self
            .client
            .post(format!("{}{}", self.root, BATCH_EXECUTE_PATH))
            .header(USER_AGENT, &self.user_agent)
            .form(&[("f.req", payload)])
            .timeout(timeout)
            .send()
            .map_err(transport_failure)?;

        let response = check_response(response)?;
        let body = response.text().map_err(transport_failure)?;

        parse_batch_response(&body).ok_or_else(|| {
            DecodeFailure::BadRequest("unexpected batch-execute response".to_string())
        })
    }
}

impl DecodeUpstream for HttpDecodeUpstream {
    fn decode_once(&self, url: &str, timeout: Duration) -> Result<String, DecodeFailure> {
        let parsed = Url::parse(url).map_err(|e| DecodeFailure::BadRequest(e.to_string()))?;
        let id = obfuscated_id(&parsed)
            .ok_or_else(|| DecodeFailure::BadRequest("not an aggregator article link".to_string()))?;

        // Both requests share one budget
        let started = Instant::now();
        let params = self.fetch_params(id, timeout)?;
        let remaining = remaining_budget(timeout, started.elapsed()).ok_or(DecodeFailure::Timeout)?;
        self.exchange(id, &params, remaining)
    }
}

/// What is left of `timeout` after `elapsed`; `None` once it is spent.
fn remaining_budget(timeout: Duration, elapsed: Duration) -> Option<Duration> {
    timeout.checked_sub(elapsed).filter(|left| !left.is_zero())
}

fn transport_failure(err: reqwest::Error) -> DecodeFailure {
    if err.is_timeout() {
        DecodeFailure::Timeout
    } else {
        DecodeFailure::BadRequest(err.to_string())
    }
}

fn check_response(response: Response) -> Result<Response, DecodeFailure> {
    if is_bot_wall(response.url()) {
        return Err(DecodeFailure::BotBlocked);
    }

    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::TOO_MANY_REQUESTS => Err(DecodeFailure::RateLimited),
        StatusCode::FORBIDDEN => Err(DecodeFailure::BotBlocked),
        status => Err(DecodeFailure::BadRequest(format!("HTTP {}", status))),
    }
}

/// Redirect targets the aggregator uses to challenge automated clients.
fn is_bot_wall(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();
    host.starts_with("consent.") || url.path().starts_with("/sorry")
}

/// Signature and timestamp attributes from an article page.
fn decoding_params(html: &str) -> Option<(String, String)> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("[data-n-a-sig][data-n-a-ts]").ok()?;
    let element = document.select(&selector).next()?;

    let signature = element.value().attr("data-n-a-sig")?.to_string();
    let timestamp = element.value().attr("data-n-a-ts")?.to_string();

    if signature.is_empty() || !timestamp.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((signature, timestamp))
}

fn build_request_payload(id: &str, timestamp: &str, signature: &str) -> String {
    let inner = format!(
        r#"["garturlreq",[["X","X",["X","X"],null,null,1,1,"US:en",null,1,null,null,null,null,null,0,1],"X","X",1,[1,1,1],1,1,null,0,0,null,0],"{}",{},"{}"]"#,
        id, timestamp, signature
    );
    json!([[["Fbv4je", inner, Value::Null, "generic"]]]).to_string()
}

/// The response is an anti-XSSI prefix followed by blank-line separated chunks;
/// the second chunk is JSON whose `[0][2]` is itself JSON holding the URL at `[1]`.
/// When that shape changes, the escaped `garturlres` pair is searched for instead.
fn parse_batch_response(body: &str) -> Option<String> {
    let decoded = structured_destination(body).or_else(|| {
        ESCAPED_DESTINATION
            .captures(body)
            .map(|caps| caps[1].to_string())
    })?;

    let parsed = Url::parse(&decoded).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(decoded)
}

fn structured_destination(body: &str) -> Option<String> {
    let chunk = body.split("\n\n").nth(1)?;
    let outer: Value = serde_json::from_str(chunk.trim()).ok()?;
    let inner_raw = outer.get(0)?.get(2)?.as_str()?;
    let inner: Value = serde_json::from_str(inner_raw).ok()?;
    inner.get(1)?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoding_params_found() {
        let html = r#"<html><body><c-wiz><div jscontroller="x" data-n-a-sig="AU_sig123" data-n-a-ts="1700000000"></div></c-wiz></body></html>"#;
        assert_eq!(
            decoding_params(html),
            Some(("AU_sig123".to_string(), "1700000000".to_string()))
        );
    }

    #[test]
    fn test_decoding_params_missing() {
        assert_eq!(decoding_params("<html><body><p>nothing</p></body></html>"), None);

        let bad_ts = r#"<div data-n-a-sig="sig" data-n-a-ts="soon"></div>"#;
        assert_eq!(decoding_params(bad_ts), None);
    }

    #[test]
    fn test_request_payload_embeds_params() {
        let payload = build_request_payload("CBMiabc", "1700000000", "sig");
        let parsed: Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(parsed[0][0][0], "Fbv4je");
        let inner = parsed[0][0][1].as_str().unwrap();
        assert!(inner.contains(r#""CBMiabc",1700000000,"sig""#));
        assert!(parsed[0][0][2].is_null());
    }

    #[test]
    fn test_parse_batch_response() {
        let inner = r#"["garturlres","https://publisher.example.com/story",1]"#;
        let chunk = json!([["wrb.fr", "Fbv4je", inner, null, null, null, "generic"]]).to_string();
        let body = format!(")]}}'\n\n{}\n\n", chunk);

        assert_eq!(
            parse_batch_response(&body),
            Some("https://publisher.example.com/story".to_string())
        );
    }

    #[test]
    fn test_parse_batch_response_rejects_garbage() {
        assert_eq!(parse_batch_response(""), None);
        assert_eq!(parse_batch_response(")]}'\n\nnot json"), None);

        let inner = r#"["garturlres","javascript:alert(1)",1]"#;
        let chunk = json!([["wrb.fr", "Fbv4je", inner]]).to_string();
        assert_eq!(parse_batch_response(&format!(")]}}'\n\n{}", chunk)), None);
    }

    #[test]
    fn test_parse_batch_response_escaped_fallback() {
        let body = r#")]}'
[["wrb.fr","Fbv4je","[\"garturlres\",\"https://publisher.example.com/other\",1]"]]"#;
        assert_eq!(
            parse_batch_response(body),
            Some("https://publisher.example.com/other".to_string())
        );
    }

    #[test]
    fn test_remaining_budget() {
        let timeout = Duration::from_secs(10);
        assert_eq!(
            remaining_budget(timeout, Duration::from_secs(7)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(remaining_budget(timeout, timeout), None);
        assert_eq!(remaining_budget(timeout, Duration::from_secs(12)), None);
    }

    #[test]
    fn test_both_requests_fit_in_one_timeout() {
        use std::io::{Read, Write};
        use std::net::TcpListener;
        use std::thread;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let root = format!("http://{}", listener.local_addr().unwrap());

        thread::spawn(move || {
            let page = r#"<div data-n-a-sig="sig" data-n-a-ts="1700000000"></div>"#;
            let mut buf = [0u8; 4096];

            // Article page, served slowly
            let (mut conn, _) = listener.accept().unwrap();
            let _ = conn.read(&mut buf);
            thread::sleep(Duration::from_millis(300));
            let _ = write!(
                conn,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                page.len(),
                page
            );
            drop(conn);

            // Batch-execute call, never answered
            if let Ok((mut conn, _)) = listener.accept() {
                let _ = conn.read(&mut buf);
                thread::sleep(Duration::from_secs(2));
            }
        });

        let upstream = HttpDecodeUpstream::with_root("feedgen-test", &root).unwrap();
        let start = Instant::now();
        let result = upstream.decode_once(
            "https://news.example-aggregator/articles/CBMiabc",
            Duration::from_millis(400),
        );

        assert_eq!(result, Err(DecodeFailure::Timeout));
        assert!(start.elapsed() < Duration::from_millis(650));
    }

    #[test]
    fn test_bot_wall_detection() {
        assert!(is_bot_wall(&Url::parse("https://consent.example-aggregator/ml?continue=x").unwrap()));
        assert!(is_bot_wall(&Url::parse("https://news.example-aggregator/sorry/index").unwrap()));
        assert!(!is_bot_wall(&Url::parse("https://news.example-aggregator/articles/abc").unwrap()));
    }

    #[test]
    fn test_non_article_link_is_bad_request() {
        let upstream = HttpDecodeUpstream::new("feedgen-test").unwrap();
        let result = upstream.decode_once("https://example.com/page", Duration::from_millis(10));
        assert!(matches!(result, Err(DecodeFailure::BadRequest(_))));
    }
}
