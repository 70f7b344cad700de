use crate::timestamp::seconds_nanos;
use serde_json::{Map, Value};
use std::time::Duration;

/// Request-side values extracted from the serving framework.
///
/// The formatter never touches the framework's request object; callers copy
/// what they have into this struct. Empty strings are left out of the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: String,
    /// Original request URL as seen by the server, e.g. `/test?x=1`.
    pub url: String,
    pub user_agent: String,
    pub referer: String,
    /// Protocol used for the request, e.g. `HTTP/1.1`.
    pub protocol: String,
}

/// HTTP request metadata attached to a log entry.
///
/// Encodes to Cloud Logging's `HttpRequest` object:
/// <https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#HttpRequest>.
///
/// Every field whose value is zero, false or empty is treated as "not
/// recorded" and left out of the entry, so a request with unknown size is
/// never reported as a zero-byte request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    /// The request itself. `None` means there is nothing to log and the
    /// whole field is dropped from the entry.
    pub request: Option<RequestInfo>,

    /// Size of the request in bytes, including headers and body.
    pub request_size: u64,

    /// Response status code, e.g. 200 or 404.
    pub status: u16,

    /// Size of the response in bytes, including headers and body.
    pub response_size: u64,

    /// Time from receiving the request until the response was sent.
    pub latency: Duration,

    /// IP address (IPv4 or IPv6) of the server that handled the request.
    pub local_ip: String,

    /// Whether a cache lookup was attempted.
    pub cache_lookup: bool,

    /// Whether the response was served from cache, with or without
    /// validation.
    pub cache_hit: bool,

    /// Whether the response was validated with the origin server before
    /// being served from cache. Only meaningful when `cache_hit` is set.
    pub cache_validated_with_origin_server: bool,

    /// Bytes inserted into cache as a result of this request.
    pub cache_fill_bytes: u64,
}

impl HttpRequest {
    pub fn new(request: RequestInfo) -> Self {
        Self {
            request: Some(request),
            ..Self::default()
        }
    }

    /// Encode into the nested `HttpRequest` object.
    ///
    /// Returns `None` when there is no underlying request; the caller must
    /// then omit the field instead of writing `null` or `{}`.
    pub fn encode(&self) -> Option<Map<String, Value>> {
        let request = self.request.as_ref()?;
        let mut out = Map::new();

        put_str(&mut out, "requestMethod", &request.method);
        put_str(&mut out, "requestUrl", &request.url);
        put_size(&mut out, "requestSize", self.request_size);
        if self.status != 0 {
            out.insert("status".to_string(), Value::from(self.status));
        }
        put_size(&mut out, "responseSize", self.response_size);
        put_str(&mut out, "userAgent", &request.user_agent);
        put_str(&mut out, "serverIp", &self.local_ip);
        put_str(&mut out, "referer", &request.referer);
        if !self.latency.is_zero() {
            // Saturates at the top of the backend's int64 seconds range.
            let seconds = i64::try_from(self.latency.as_secs()).unwrap_or(i64::MAX);
            let latency = seconds_nanos(seconds, self.latency.subsec_nanos());
            out.insert("latency".to_string(), Value::Object(latency));
        }
        put_flag(&mut out, "cacheLookup", self.cache_lookup);
        put_flag(&mut out, "cacheHit", self.cache_hit);
        put_flag(
            &mut out,
            "cacheValidatedWithOriginServer",
            self.cache_validated_with_origin_server,
        );
        put_size(&mut out, "cacheFillBytes", self.cache_fill_bytes);
        put_str(&mut out, "protocol", &request.protocol);

        Some(out)
    }
}

fn put_str(out: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        out.insert(key.to_string(), Value::from(value));
    }
}

// Byte counts are int64 in the backend schema, which its JSON mapping
// carries as decimal strings.
fn put_size(out: &mut Map<String, Value>, key: &str, value: u64) {
    if value > 0 {
        out.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn put_flag(out: &mut Map<String, Value>, key: &str, value: bool) {
    if value {
        out.insert(key.to_string(), Value::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get_test() -> RequestInfo {
        RequestInfo {
            method: "GET".to_string(),
            url: "/test".to_string(),
            ..RequestInfo::default()
        }
    }

    #[test]
    fn zero_values_are_omitted() {
        let encoded = HttpRequest::new(get_test()).encode().unwrap();
        assert_eq!(
            Value::Object(encoded),
            json!({"requestMethod": "GET", "requestUrl": "/test"})
        );
    }

    #[test]
    fn missing_request_encodes_to_nothing() {
        let req = HttpRequest {
            request: None,
            status: 200,
            request_size: 10,
            ..HttpRequest::default()
        };
        assert!(req.encode().is_none());
    }

    #[test]
    fn fully_populated() {
        let req = HttpRequest {
            request: Some(RequestInfo {
                method: "POST".to_string(),
                url: "/upload?id=7".to_string(),
                user_agent: "curl/8.4.0".to_string(),
                referer: "https://example.com/".to_string(),
                protocol: "HTTP/1.1".to_string(),
            }),
            request_size: 2048,
            status: 201,
            response_size: 17,
            latency: Duration::from_millis(1500),
            local_ip: "10.0.0.5".to_string(),
            cache_lookup: true,
            cache_hit: true,
            cache_validated_with_origin_server: true,
            cache_fill_bytes: 4096,
        };

        assert_eq!(
            Value::Object(req.encode().unwrap()),
            json!({
                "requestMethod": "POST",
                "requestUrl": "/upload?id=7",
                "requestSize": "2048",
                "status": 201,
                "responseSize": "17",
                "userAgent": "curl/8.4.0",
                "serverIp": "10.0.0.5",
                "referer": "https://example.com/",
                "latency": {"seconds": 1, "nanos": 500_000_000},
                "cacheLookup": true,
                "cacheHit": true,
                "cacheValidatedWithOriginServer": true,
                "cacheFillBytes": "4096",
                "protocol": "HTTP/1.1",
            })
        );
    }

    #[test]
    fn sizes_are_decimal_strings() {
        let req = HttpRequest {
            request_size: 1,
            response_size: u64::MAX,
            ..HttpRequest::new(get_test())
        };
        let encoded = req.encode().unwrap();
        assert_eq!(encoded["requestSize"], "1");
        assert_eq!(encoded["responseSize"], "18446744073709551615");
    }

    #[test]
    fn huge_latency_saturates() {
        let req = HttpRequest {
            latency: Duration::MAX,
            ..HttpRequest::new(get_test())
        };
        let encoded = req.encode().unwrap();
        assert_eq!(
            encoded["latency"],
            json!({"seconds": i64::MAX, "nanos": 999_999_999})
        );
    }

    #[test]
    fn sub_second_latency_has_no_seconds() {
        let req = HttpRequest {
            latency: Duration::from_micros(250),
            ..HttpRequest::new(get_test())
        };
        let encoded = req.encode().unwrap();
        assert_eq!(encoded["latency"], json!({"nanos": 250_000}));
    }

    #[test]
    fn false_flags_never_appear() {
        let req = HttpRequest {
            cache_hit: false,
            cache_validated_with_origin_server: true,
            ..HttpRequest::new(get_test())
        };
        let encoded = req.encode().unwrap();
        assert!(!encoded.contains_key("cacheHit"));
        assert!(!encoded.contains_key("cacheLookup"));
        assert_eq!(encoded["cacheValidatedWithOriginServer"], true);
        assert!(encoded.values().all(|v| *v != "0" && *v != Value::Bool(false)));
    }
}
