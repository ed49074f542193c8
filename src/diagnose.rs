// Connectivity diagnostic for the API host: resolve the name, open a TCP
// connection and send a plain GET to the base URL. A stage only runs when
// the one before it passed.

use crate::error::VgError;
use reqwest::blocking::Client;
use reqwest::Url;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Connect,
    Request,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Resolve => "DNS resolution",
            Stage::Connect => "TCP connect",
            Stage::Request => "HTTP request",
        }
    }
}

#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct Diagnosis {
    pub stages: Vec<StageReport>,
}

impl Diagnosis {
    /// Stage that stopped the diagnostic, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.stages.iter().find(|s| !s.passed).map(|s| s.stage)
    }

    pub fn passed(&self) -> bool {
        self.stages.len() == 3 && self.failed_stage().is_none()
    }

    fn record(&mut self, stage: Stage, result: std::result::Result<String, String>) -> bool {
        let passed = result.is_ok();
        let detail = result.unwrap_or_else(|e| e);
        debug!(stage = stage.label(), passed, detail = %detail, "diagnostic stage");
        self.stages.push(StageReport { stage, passed, detail });
        passed
    }
}

pub fn run(client: &Client, base_url: &str, connect_timeout: Duration, request_timeout: Duration) -> Diagnosis {
    let mut diagnosis = Diagnosis::default();

    let target = Url::parse(base_url)
        .map_err(|e| format!("invalid base URL {base_url:?}: {e}"))
        .and_then(|url| {
            let host = url
                .host_str()
                .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
                .ok_or_else(|| format!("base URL {base_url:?} has no host"))?;
            let port = url.port_or_known_default().unwrap_or(443);
            Ok((url, host, port))
        });
    let (url, host, port) = match target {
        Ok(t) => t,
        Err(e) => {
            diagnosis.record(Stage::Resolve, Err(e));
            return diagnosis;
        }
    };

    let addrs = match resolve(&host, port) {
        Ok(addrs) => addrs,
        Err(e) => {
            diagnosis.record(Stage::Resolve, Err(format!("{host}: {e}")));
            return diagnosis;
        }
    };
    let ips: Vec<String> = addrs.iter().map(|a| a.ip().to_string()).collect();
    diagnosis.record(Stage::Resolve, Ok(format!("{host} -> {}", ips.join(", "))));

    let connected = connect(&addrs, connect_timeout)
        .map(|addr| format!("{addr} accepted the connection"))
        .map_err(|e| format!("{host}:{port}: {e}"));
    if !diagnosis.record(Stage::Connect, connected) {
        return diagnosis;
    }

    let answered = client
        .get(url.as_str())
        .timeout(request_timeout)
        .send()
        .map(|res| format!("{url} answered with HTTP {}", res.status().as_u16()))
        .map_err(|e| VgError::from(e).to_string());
    diagnosis.record(Stage::Request, answered);
    diagnosis
}

fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(ErrorKind::NotFound, "no addresses found"));
    }
    Ok(addrs)
}

/// First address that accepts a connection within `timeout`.
fn connect(addrs: &[SocketAddr], timeout: Duration) -> io::Result<SocketAddr> {
    let mut last = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(_) => return Ok(*addr),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| io::Error::new(ErrorKind::NotFound, "no addresses to connect to")))
}
