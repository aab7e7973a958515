//! Target readiness wait (spec §5, "Timeouts"): poll a CDP endpoint's
//! raw TCP port, then its `/json/list` HTTP endpoint, until the
//! debuggee is reachable or the attempt budget is exhausted. The
//! runtime/launcher itself stays an external collaborator; this module
//! only waits for what it starts to become reachable.

use crate::config::LaunchTimeouts;
use crate::debugger::error::{Error, Result};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct TargetInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

/// Poll `host:port` until a TCP connection succeeds, then poll
/// `http://host:port/json/list` until it returns at least one target,
/// returning that target's WebSocket debugger URL.
pub async fn wait_for_debugger_url(host: &str, port: u16, timeouts: &LaunchTimeouts) -> Result<String> {
    wait_for_port(host, port, timeouts).await?;

    let client = reqwest::Client::new();
    let list_url = format!("http://{host}:{port}/json/list");

    for attempt in 0..timeouts.poll_attempts {
        match client.get(&list_url).send().await {
            Ok(resp) => {
                if let Ok(targets) = resp.json::<Vec<TargetInfo>>().await {
                    if let Some(target) = targets.into_iter().next() {
                        return Ok(target.web_socket_debugger_url);
                    }
                }
            }
            Err(_) if attempt + 1 < timeouts.poll_attempts => {}
            Err(e) => return Err(Error::CdpTransport(e.to_string())),
        }
        sleep(timeouts.interval()).await;
    }

    Err(Error::CdpTransport(format!(
        "no debug targets reported by {list_url} after {} attempts",
        timeouts.poll_attempts
    )))
}

async fn wait_for_port(host: &str, port: u16, timeouts: &LaunchTimeouts) -> Result<()> {
    let addr = format!("{host}:{port}");
    for attempt in 0..timeouts.poll_attempts {
        if TcpStream::connect(&addr).await.is_ok() {
            return Ok(());
        }
        if attempt + 1 == timeouts.poll_attempts {
            return Err(Error::CdpTransport(format!(
                "{addr} did not become reachable after {} attempts",
                timeouts.poll_attempts
            )));
        }
        sleep(timeouts.interval()).await;
    }
    Ok(())
}
