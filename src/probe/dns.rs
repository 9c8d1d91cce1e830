//! UDP DNS probe with multi-server fallback

use async_trait::async_trait;
use chrono::Utc;
use dns_parser::{Builder, Packet, QueryClass, QueryType, ResponseCode};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use super::HostProbe;
use crate::error::{HostForgeError, Result};
use crate::types::{DnsConfig, ProbeResult};

const MAX_RESPONSE_LEN: usize = 4096;

/// Checks hostname existence by issuing A-record queries to the configured
/// resolver endpoints, in order, until one gives a definitive answer.
pub struct DnsProbe {
    config: DnsConfig,
}

/// What one server's reply tells us
enum Answer {
    /// NoError or NXDOMAIN settles the question
    Definitive { exists: bool, ip_address: Option<String> },
    /// Any other response code: ask the next server
    TryNext { rcode: String },
}

impl DnsProbe {
    pub fn new(config: DnsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    async fn exchange(&self, server: &str, query: &[u8]) -> std::io::Result<Vec<u8>> {
        let addr = server_addr(server);
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&addr).await?;
        socket.send(query).await?;

        let mut buf = vec![0u8; MAX_RESPONSE_LEN];
        let len = timeout(self.config.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, "DNS query timed out")
            })??;
        buf.truncate(len);
        Ok(buf)
    }
}

#[async_trait]
impl HostProbe for DnsProbe {
    async fn check(&self, hostname: &str) -> Result<ProbeResult> {
        if hostname.is_empty() {
            return Err(HostForgeError::validation("empty hostname"));
        }

        let id = rand::random::<u16>();
        let query = build_query(id, hostname)?;

        let mut last_err: Option<String> = None;
        for server in &self.config.servers {
            let response = match self.exchange(server, &query).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(server = %server, hostname = %hostname, error = %e, "DNS query failed");
                    last_err = Some(e.to_string());
                    continue;
                }
            };

            match classify_response(id, &response) {
                Ok(Answer::Definitive { exists, ip_address }) => {
                    tracing::debug!(
                        server = %server,
                        hostname = %hostname,
                        exists,
                        "DNS check completed"
                    );
                    return Ok(ProbeResult {
                        hostname: hostname.to_string(),
                        exists,
                        ip_address,
                        checked_at: Utc::now(),
                    });
                }
                Ok(Answer::TryNext { rcode }) => {
                    tracing::warn!(
                        server = %server,
                        hostname = %hostname,
                        rcode = %rcode,
                        "DNS query returned error code"
                    );
                    last_err = Some(format!("DNS query returned error code: {}", rcode));
                }
                Err(e) => {
                    tracing::warn!(server = %server, hostname = %hostname, error = %e, "malformed DNS response");
                    last_err = Some(e.to_string());
                }
            }
        }

        if let Some(message) = last_err {
            return Err(HostForgeError::resolution(
                hostname,
                format!("all DNS servers failed: {}", message),
            ));
        }

        // Nothing answered but nothing errored either (e.g. no servers
        // configured): report the name as absent.
        Ok(ProbeResult {
            hostname: hostname.to_string(),
            exists: false,
            ip_address: None,
            checked_at: Utc::now(),
        })
    }
}

fn build_query(id: u16, hostname: &str) -> Result<Vec<u8>> {
    let mut builder = Builder::new_query(id, true);
    builder.add_question(hostname, false, QueryType::A, QueryClass::IN);
    builder
        .build()
        .map_err(|_| HostForgeError::internal("DNS query did not fit in a single packet"))
}

fn classify_response(query_id: u16, bytes: &[u8]) -> Result<Answer> {
    let packet = Packet::parse(bytes)
        .map_err(|e| HostForgeError::internal(format!("failed to parse DNS response: {}", e)))?;

    if packet.header.id != query_id {
        return Err(HostForgeError::internal(
            "DNS response id does not match query",
        ));
    }

    match packet.header.response_code {
        ResponseCode::NoError => {
            let ip_address = packet.answers.iter().find_map(|answer| match answer.data {
                dns_parser::rdata::RData::A(a) => Some(a.0.to_string()),
                _ => None,
            });
            Ok(Answer::Definitive {
                exists: !packet.answers.is_empty(),
                ip_address,
            })
        }
        // NXDOMAIN: the name definitely does not exist
        ResponseCode::NameError => Ok(Answer::Definitive {
            exists: false,
            ip_address: None,
        }),
        other => Ok(Answer::TryNext {
            rcode: format!("{:?}", other),
        }),
    }
}

fn server_addr(server: &str) -> String {
    if server.contains(':') {
        server.to_string()
    } else {
        format!("{}:53", server)
    }
}
