use landed_cost_core::config::OracleConfig;
use landed_cost_core::oracle::http::HttpDutyOracle;
use landed_cost_core::oracle::interface::{DutyOracle, FailureCategory, OracleRequest};
use landed_cost_core::policy::egress::EgressPolicy;
use secrecy::SecretString;
use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct CapturedRequest {
    request_line: String,
    headers: Vec<String>,
    body: Vec<u8>,
}

impl CapturedRequest {
    fn header_values(&self, name: &str) -> Vec<String> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.headers
            .iter()
            .filter(|h| h.to_ascii_lowercase().starts_with(&prefix))
            .map(|h| h[prefix.len()..].trim().to_string())
            .collect()
    }
}

/// Local stand-in for the quote endpoint: answers exactly one request, optionally after a delay.
fn serve_once(
    status: &'static str,
    body: &'static str,
    delay: Duration,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            headers.push(line);
        }
        let content_length = headers
            .iter()
            .find_map(|h| {
                let lower = h.to_ascii_lowercase();
                lower
                    .strip_prefix("content-length:")
                    .map(|v| v.trim().parse::<usize>().unwrap())
            })
            .unwrap_or(0);
        let mut body_in = vec![0u8; content_length];
        reader.read_exact(&mut body_in).unwrap();

        thread::sleep(delay);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        // The client may already have given up on a delayed reply.
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: body_in,
        }
    });
    (format!("http://127.0.0.1:{}/api/v2", port), handle)
}

fn oracle_for(base: &str, timeout_ms: u64) -> HttpDutyOracle {
    let mut cfg = OracleConfig::new(7, SecretString::from("dG9rZW4=".to_string())).unwrap();
    cfg.api_base_url = base.to_string();
    cfg.timeout_ms = timeout_ms;
    let policy = EgressPolicy::allow_endpoints(&[base]).unwrap();
    HttpDutyOracle::new(cfg, policy).unwrap()
}

fn quote_request() -> OracleRequest {
    OracleRequest {
        vendor_id: 1,
        ship_from_country: "CN".to_string(),
        country_of_origin: "CN".to_string(),
        destination_country: None,
        unit_cost: 10.0,
        quantity: 1000,
        description: "Cotton t-shirts".to_string(),
        hs_code: "6109.10.00".to_string(),
        spi_applicable: false,
    }
}

#[test]
fn successful_quote_sends_one_content_type_and_credentials() {
    let reply = r#"{"globalCompliance":{"quote":{"lines":[]}}}"#;
    let (base, server) = serve_once("200 OK", reply, Duration::ZERO);
    let oracle = oracle_for(&base, 5_000);

    let exchange = oracle.quote(&quote_request());
    let captured = server.join().unwrap();

    assert_eq!(
        captured.request_line,
        "POST /api/v2/companies/7/globalcompliance HTTP/1.1"
    );
    assert_eq!(captured.header_values("content-type"), vec!["application/json"]);
    assert_eq!(captured.header_values("authorization"), vec!["Basic dG9rZW4="]);

    let sent: serde_json::Value = serde_json::from_slice(&captured.body).unwrap();
    assert_eq!(sent, exchange.request_payload);
    assert_eq!(sent["lines"][0]["item"]["classifications"][0]["hscode"], "61091000");

    assert_eq!(
        exchange.outcome.unwrap(),
        json!({"globalCompliance": {"quote": {"lines": []}}})
    );
}

#[test]
fn error_status_keeps_json_body() {
    let (base, server) = serve_once(
        "500 Internal Server Error",
        r#"{"error":"bad hs code"}"#,
        Duration::ZERO,
    );
    let exchange = oracle_for(&base, 5_000).quote(&quote_request());
    server.join().unwrap();

    let failure = exchange.outcome.unwrap_err();
    assert_eq!(failure.category, FailureCategory::HTTP_STATUS);
    assert_eq!(failure.http_status, Some(500));
    assert_eq!(failure.error_body, Some(json!({"error": "bad hs code"})));
    assert!(exchange.request_payload.is_object());
}

#[test]
fn error_status_keeps_text_body() {
    let (base, server) = serve_once("502 Bad Gateway", "upstream unavailable", Duration::ZERO);
    let exchange = oracle_for(&base, 5_000).quote(&quote_request());
    server.join().unwrap();

    let failure = exchange.outcome.unwrap_err();
    assert_eq!(failure.category, FailureCategory::HTTP_STATUS);
    assert_eq!(failure.http_status, Some(502));
    assert_eq!(failure.error_body, Some(json!("upstream unavailable")));
}

#[test]
fn non_json_success_body_is_malformed() {
    let (base, server) = serve_once("200 OK", "<html>maintenance</html>", Duration::ZERO);
    let exchange = oracle_for(&base, 5_000).quote(&quote_request());
    server.join().unwrap();

    let failure = exchange.outcome.unwrap_err();
    assert_eq!(failure.category, FailureCategory::MALFORMED_RESPONSE);
    assert_eq!(failure.http_status, None);
}

#[test]
fn slow_reply_times_out() {
    let (base, server) = serve_once("200 OK", "{}", Duration::from_millis(1_500));
    let exchange = oracle_for(&base, 200).quote(&quote_request());

    let failure = exchange.outcome.unwrap_err();
    assert_eq!(failure.category, FailureCategory::TIMEOUT);
    server.join().unwrap();
}
