//! Template based log lines for request attempts.
//!
//! A template is plain text with `{placeholder}` variables. Supported
//! placeholders:
//!
//! | Placeholder        | Value                                              |
//! |--------------------|----------------------------------------------------|
//! | `{ts}`             | current time, RFC 3339                             |
//! | `{method}`         | request method                                     |
//! | `{url}`            | full request URL                                   |
//! | `{host}`           | request host                                       |
//! | `{resource}`       | path plus query of the request                     |
//! | `{code}`           | response status code                               |
//! | `{phrase}`         | response reason phrase                             |
//! | `{error}`          | transport error message                            |
//! | `{req_header_X}`   | request header `X`                                 |
//! | `{res_header_X}`   | response header `X`                                |
//! | `{req_body}`       | request body (lossy UTF-8)                         |
//! | `{res_body}`       | response body (lossy UTF-8)                        |
//!
//! Any other name is looked up in the extra values of the
//! [`MessageContext`] (`retries`, `delay` and `total_time` for retry
//! logging). Unknown placeholders render as an empty string.
use std::collections::BTreeMap;

use time::format_description::well_known::Rfc3339;

use crate::errors::TransferError;
use crate::net::{Request, Response, TransferEvent};

/// Default line logged for every retry.
pub const RETRY_FORMAT: &str = "[{ts}] {method} {url} - {code} {phrase} - Retries: {retries}, \
     Delay: {delay}, Time: {total_time}, Error: {error}";

/// Everything a template can refer to.
pub struct MessageContext<'a> {
    pub request: &'a Request,
    pub response: Option<&'a Response>,
    pub error: Option<&'a TransferError>,
    pub extra: BTreeMap<&'static str, String>,
}

impl<'a> MessageContext<'a> {
    pub fn new(request: &'a Request) -> Self {
        Self {
            request,
            response: None,
            error: None,
            extra: BTreeMap::new(),
        }
    }

    /// Context for a finished attempt, with the transfer timings as extras.
    pub fn from_transfer(event: &'a TransferEvent<'_>) -> Self {
        let mut ctx = Self {
            request: event.request(),
            response: event.response(),
            error: event.error(),
            extra: BTreeMap::new(),
        };
        if let Some(total) = event.transfer_info("total_time") {
            ctx.extra.insert("total_time", total);
        }
        ctx
    }

    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.extra.insert(key, value.to_string());
        self
    }
}

/// Renders [`MessageContext`]s with a template.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    template: String,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(RETRY_FORMAT)
    }
}

impl MessageFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn format(&self, ctx: &MessageContext<'_>) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            match after.find('}') {
                Some(end) if is_placeholder(&after[..end]) => {
                    out.push_str(&resolve(&after[..end], ctx));
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn resolve(name: &str, ctx: &MessageContext<'_>) -> String {
    let request = ctx.request;

    match name {
        "ts" => time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        "method" => request.method().to_string(),
        "url" => request.url().to_string(),
        "host" => request.host().to_string(),
        "resource" => match request.url().query() {
            Some(q) => format!("{}?{}", request.path(), q),
            None => request.path().to_string(),
        },
        "code" => ctx.response.map(|r| r.status.to_string()).unwrap_or_default(),
        "phrase" => ctx.response.map(|r| r.status_text.clone()).unwrap_or_default(),
        "error" => ctx.error.map(|e| e.to_string()).unwrap_or_default(),
        "req_body" => String::from_utf8_lossy(request.body()).into_owned(),
        "res_body" => ctx
            .response
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .unwrap_or_default(),
        _ => {
            if let Some(header) = name.strip_prefix("req_header_") {
                return request.header(header).unwrap_or_default().to_string();
            }
            if let Some(header) = name.strip_prefix("res_header_") {
                return ctx
                    .response
                    .and_then(|r| r.header(header))
                    .unwrap_or_default()
                    .to_string();
            }
            ctx.extra.get(name).cloned().unwrap_or_default()
        }
    }
}
