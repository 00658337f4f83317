use std::time::Duration;

use gosub_http::retry::RetryConfig;
use gosub_http::{Client, ClientConfig, Request};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/status/503".to_string());

    // Retry server errors and flaky connections three times, logging every retry
    let retry = RetryConfig::builder()
        .max_retries(3)
        .log_level(log::Level::Info)
        .build()?;

    let config = ClientConfig::builder()
        .timeout(Duration::from_secs(15))
        .retry(retry)
        .build()?;
    let client = Client::from_config(config)?;

    let mut request = Request::get(&url)?;
    match client.send(&mut request) {
        Ok(response) => {
            println!(
                "{} {} after {} retries ({} bytes)",
                response.status,
                response.status_text,
                request.state().retries,
                response.body.len()
            );
            for cookie in response.set_cookie_headers() {
                println!("Set-Cookie: {cookie}");
            }
        }
        Err(e) => println!("request failed after {} retries: {e}", request.state().retries),
    }

    Ok(())
}
