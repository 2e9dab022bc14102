//! TCP connection probing

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::http::elapsed_ms;
use super::response::{build_error_response, build_tcp_response, build_timeout_response};
use super::validation::parse_tcp_target;
use crate::error::ProbeError;
use crate::protocol::{ProbeRequest, ProbeResponse};

/// Handle a TCP probe: the target is up once a connection is established.
///
/// The connection is closed immediately after the handshake.
pub async fn probe_tcp(request: &ProbeRequest, timeout_duration: Duration) -> ProbeResponse {
    let start = Instant::now();

    let (host, port) = match parse_tcp_target(&request.target) {
        Ok(parts) => parts,
        Err(error) => {
            return build_error_response(
                &ProbeError::InvalidRequest(error.to_string()),
                elapsed_ms(start),
            );
        }
    };

    debug!(%host, port, "TCP probe connecting");

    match timeout(timeout_duration, TcpStream::connect((host.as_str(), port))).await {
        Ok(Ok(_stream)) => {
            let elapsed = elapsed_ms(start);
            debug!(%host, port, elapsed, "TCP probe connected");
            build_tcp_response(&request.assertions, elapsed)
        }
        Ok(Err(io_error)) => {
            debug!(%host, port, error = %io_error, "TCP probe failed");
            build_error_response(&ProbeError::Connect(io_error), elapsed_ms(start))
        }
        Err(_) => {
            debug!(%host, port, timeout = ?timeout_duration, "TCP probe timed out");
            build_timeout_response(elapsed_ms(start))
        }
    }
}
