//! NetworkProcessor - forwards files to a remote orchestration endpoint over TCP
//!
//! Request frame:
//!
//! ```text
//! u32 BE  header length
//! [u8]    header (JSON object of the request context)
//! u64 BE  body length
//! [u8]    body
//! ```
//!
//! Response: a single line, `OK <message>` or `ERR <message>`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{ContractError, ProcessingResult, Processor, RequestContext};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

/// Configuration for NetworkProcessor
#[derive(Debug, Clone)]
pub struct NetworkProcessorConfig {
    /// Orchestrator address
    pub addr: SocketAddr,
    /// Largest body forwarded; bigger files fail before anything is sent
    pub max_payload_bytes: u64,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl NetworkProcessorConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let max_payload_bytes = params
            .get("max_payload_bytes")
            .and_then(|s| s.parse().ok())
            .unwrap_or(64 * 1024 * 1024);

        let connect_timeout_ms = params
            .get("connect_timeout_ms")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5_000);

        Ok(Self {
            addr,
            max_payload_bytes,
            connect_timeout: Duration::from_millis(connect_timeout_ms),
        })
    }
}

/// Encode a request frame
pub fn encode_request(context: &RequestContext, body: &[u8]) -> Result<Bytes, serde_json::Error> {
    let header = serde_json::to_vec(context)?;
    let mut frame = BytesMut::with_capacity(4 + header.len() + 8 + body.len());
    frame.put_u32(header.len() as u32);
    frame.put_slice(&header);
    frame.put_u64(body.len() as u64);
    frame.put_slice(body);
    Ok(frame.freeze())
}

/// Interpret the orchestrator's response line
pub fn decode_response(processor: &str, line: &str) -> Result<ProcessingResult, ContractError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(ContractError::processor_failure(
            processor,
            "connection closed without response",
        ));
    }
    if line == "OK" {
        return Ok(String::new());
    }
    if let Some(message) = line.strip_prefix("OK ") {
        return Ok(message.to_string());
    }
    if line == "ERR" {
        return Err(ContractError::processor_failure(processor, "remote error"));
    }
    if let Some(message) = line.strip_prefix("ERR ") {
        return Err(ContractError::processor_failure(processor, message));
    }
    Err(ContractError::processor_failure(
        processor,
        format!("malformed response: {line}"),
    ))
}

/// Processor that hands each file to a remote orchestrator, one connection per file
pub struct NetworkProcessor {
    name: String,
    config: NetworkProcessorConfig,
}

impl NetworkProcessor {
    /// Create a new NetworkProcessor
    pub fn new(name: impl Into<String>, config: NetworkProcessorConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, String> {
        let config = NetworkProcessorConfig::from_params(params)?;
        Ok(Self::new(name, config))
    }

    pub fn config(&self) -> &NetworkProcessorConfig {
        &self.config
    }

    fn fail(&self, e: std::io::Error) -> ContractError {
        ContractError::processor_failure_with(&self.name, e)
    }

    async fn read_body<R>(&self, content: &mut R) -> Result<Vec<u8>, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let limit = self.config.max_payload_bytes;
        let mut body = Vec::new();
        // One byte past the limit is enough to detect oversize input
        content
            .take(limit.saturating_add(1))
            .read_to_end(&mut body)
            .await
            .map_err(|e| self.fail(e))?;

        if body.len() as u64 > limit {
            warn!(processor = %self.name, max = limit, "Payload too large");
            return Err(ContractError::processor_failure(
                &self.name,
                format!("payload exceeds {limit} bytes"),
            ));
        }
        Ok(body)
    }

    async fn connect(&self) -> Result<TcpStream, ContractError> {
        let connect = TcpStream::connect(self.config.addr);
        match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(self.fail(e)),
            Err(_) => Err(ContractError::processor_failure(
                &self.name,
                format!("connect to {} timed out", self.config.addr),
            )),
        }
    }
}

impl Processor for NetworkProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_processor_run",
        skip(self, context, content),
        fields(processor = %self.name, addr = %self.config.addr)
    )]
    async fn run<R>(
        &self,
        context: RequestContext,
        content: &mut R,
    ) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let body = self.read_body(content).await?;
        let frame = encode_request(&context, &body)
            .map_err(|e| ContractError::processor_failure_with(&self.name, e))?;

        let mut stream = self.connect().await?;
        stream.write_all(&frame).await.map_err(|e| self.fail(e))?;
        stream.flush().await.map_err(|e| self.fail(e))?;
        debug!(processor = %self.name, bytes = frame.len(), "Request sent");

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| self.fail(e))?;

        decode_response(&self.name, &line)
    }
}
