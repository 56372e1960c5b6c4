//! Access logging.
//!
//! The router reports one line per completed request to an [`AccessLog`]
//! sink configured with [`Router::access_log`](crate::Router::access_log):
//!
//! ```text
//! 200 | 412.37µs | 10.0.0.7 | GET | /items
//! ```
//!
//! Fields are always in that order: status, duration, remote address (IP only,
//! `-` when the host did not supply one), method, path.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use http::{Method, StatusCode};
use tracing::info;

/// Receives one pre-formatted access line per request.
///
/// Closures work directly:
///
/// ```rust
/// use trellis::Router;
///
/// let app = Router::new().access_log(|line: &str| eprintln!("{line}"));
/// ```
pub trait AccessLog: Send + Sync + 'static {
    fn log(&self, line: &str);
}

impl<F> AccessLog for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// The default sink: emits each line as a `tracing` event at `INFO` on the
/// `trellis::access` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAccessLog;

impl AccessLog for TracingAccessLog {
    fn log(&self, line: &str) {
        info!(target: "trellis::access", "{line}");
    }
}

/// The fields of one access line.
pub(crate) struct AccessRecord {
    pub status: StatusCode,
    pub elapsed: Duration,
    pub remote: Option<SocketAddr>,
    pub method: Method,
    pub path: String,
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | ", self.status.as_u16(), format_elapsed(self.elapsed))?;
        match self.remote {
            Some(addr) => write!(f, "{}", addr.ip())?,
            None => f.write_str("-")?,
        }
        write!(f, " | {} | {}", self.method, self.path)
    }
}

/// Microseconds below one millisecond, milliseconds from there up.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_millis(1) {
        format!("{:.2}µs", elapsed.as_nanos() as f64 / 1_000.0)
    } else {
        format!("{:.2}ms", elapsed.as_secs_f64() * 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn formats_sub_millisecond_in_micros() {
        assert_eq!(format_elapsed(Duration::from_nanos(412_370)), "412.37µs");
        assert_eq!(format_elapsed(Duration::ZERO), "0.00µs");
    }

    #[test]
    fn formats_longer_in_millis() {
        assert_eq!(format_elapsed(Duration::from_millis(1)), "1.00ms");
        assert_eq!(format_elapsed(Duration::from_micros(12_346)), "12.35ms");
    }

    #[test]
    fn record_fields_are_ordered() {
        let record = AccessRecord {
            status: StatusCode::NOT_FOUND,
            elapsed: Duration::from_millis(3),
            remote: Some("10.0.0.7:51234".parse().unwrap()),
            method: Method::GET,
            path: "/missing".into(),
        };
        assert_eq!(record.to_string(), "404 | 3.00ms | 10.0.0.7 | GET | /missing");
    }

    #[test]
    fn ipv6_remote_drops_port_and_unknown_is_dash() {
        let mut record = AccessRecord {
            status: StatusCode::OK,
            elapsed: Duration::from_millis(2),
            remote: Some("[::1]:8080".parse().unwrap()),
            method: Method::POST,
            path: "/items".into(),
        };
        assert_eq!(record.to_string(), "200 | 2.00ms | ::1 | POST | /items");

        record.remote = None;
        assert_eq!(record.to_string(), "200 | 2.00ms | - | POST | /items");
    }

    #[test]
    fn closures_are_sinks() {
        let lines: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = {
            let lines = Arc::clone(&lines);
            move |line: &str| lines.lock().unwrap().push(line.to_owned())
        };
        sink.log("one");
        assert_eq!(*lines.lock().unwrap(), ["one"]);
    }
}
