//! Telnet transport over a plain TCP stream.
//!
//! Option negotiation is kept minimal: the client lets the server echo and
//! suppress go-ahead, and refuses every other option.

use bytes::{BufMut, BytesMut};
use log::{debug, trace};
use memchr::memchr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::ShellStream;
use super::config::TelnetConfig;
use crate::error::{ChannelError, Result, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

/// Telnet connection: a TCP stream plus the option negotiation state.
pub struct TelnetTransport {
    stream: TcpStream,
    codec: TelnetCodec,
    read_buf: Vec<u8>,
}

impl TelnetTransport {
    /// Open the TCP connection.
    pub async fn connect(config: &TelnetConfig) -> Result<Self> {
        debug!("telnet: connecting to {}", config.socket_addr());

        let stream = tokio::time::timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        let _ = stream.set_nodelay(true);

        Ok(Self {
            stream,
            codec: TelnetCodec::default(),
            read_buf: vec![0u8; 4096],
        })
    }
}

impl ShellStream for TelnetTransport {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let escaped = escape_iac(data);
        self.stream
            .write_all(&escaped)
            .await
            .map_err(TransportError::Io)?;
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>> {
        loop {
            let n = self
                .stream
                .read(&mut self.read_buf)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                return Err(ChannelError::Closed.into());
            }

            let mut data = Vec::with_capacity(n);
            let mut replies = BytesMut::new();
            self.codec
                .decode(&self.read_buf[..n], &mut data, &mut replies);

            if !replies.is_empty() {
                trace!("telnet: sending {} negotiation bytes", replies.len());
                self.stream
                    .write_all(&replies)
                    .await
                    .map_err(TransportError::Io)?;
            }

            // A read made only of negotiation carries no shell output
            if !data.is_empty() {
                return Ok(data);
            }
        }
    }

    async fn shutdown(mut self) -> Result<()> {
        self.stream
            .shutdown()
            .await
            .map_err(TransportError::Io)?;
        Ok(())
    }
}

/// Double every IAC byte so it is sent as data.
fn escape_iac(data: &[u8]) -> Vec<u8> {
    if memchr(IAC, data).is_none() {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(data.len() + 8);
    for &b in data {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum CodecState {
    #[default]
    Data,
    /// Previous byte was a carriage return; a following NUL is padding.
    Cr,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Incremental Telnet decoder. State persists across reads so a command
/// sequence split over two TCP segments is still recognised.
#[derive(Debug, Default)]
struct TelnetCodec {
    state: CodecState,
}

impl TelnetCodec {
    fn decode(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut BytesMut) {
        let mut rest = input;

        while !rest.is_empty() {
            if self.state == CodecState::Data {
                // Fast path: copy everything up to the next IAC or CR
                let stop = rest
                    .iter()
                    .position(|&b| b == IAC || b == b'\r')
                    .unwrap_or(rest.len());
                data.extend_from_slice(&rest[..stop]);
                rest = &rest[stop..];
                if rest.is_empty() {
                    break;
                }
            }

            let b = rest[0];
            rest = &rest[1..];

            self.state = match self.state {
                CodecState::Data | CodecState::Cr if b == IAC => CodecState::Iac,
                CodecState::Data if b == b'\r' => {
                    data.push(b);
                    CodecState::Cr
                }
                CodecState::Data => {
                    data.push(b);
                    CodecState::Data
                }
                CodecState::Cr => {
                    if b != 0 {
                        data.push(b);
                    }
                    if b == b'\r' { CodecState::Cr } else { CodecState::Data }
                }
                CodecState::Iac => match b {
                    IAC => {
                        data.push(IAC);
                        CodecState::Data
                    }
                    WILL | WONT | DO | DONT => CodecState::Negotiate(b),
                    SB => CodecState::Sub,
                    // NOP, GA, DM and friends carry no data
                    _ => CodecState::Data,
                },
                CodecState::Negotiate(verb) => {
                    Self::respond(verb, b, replies);
                    CodecState::Data
                }
                CodecState::Sub => {
                    if b == IAC {
                        CodecState::SubIac
                    } else {
                        CodecState::Sub
                    }
                }
                CodecState::SubIac => {
                    if b == SE {
                        CodecState::Data
                    } else {
                        CodecState::Sub
                    }
                }
            };
        }
    }

    fn respond(verb: u8, option: u8, replies: &mut BytesMut) {
        let answer = match (verb, option) {
            (WILL, OPT_ECHO) | (WILL, OPT_SGA) => Some(DO),
            (WILL, _) => Some(DONT),
            (DO, OPT_SGA) => Some(WILL),
            (DO, _) => Some(WONT),
            // Acknowledging WONT/DONT could loop forever
            _ => None,
        };
        if let Some(answer) = answer {
            replies.put_slice(&[IAC, answer, option]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn decode(codec: &mut TelnetCodec, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::new();
        let mut replies = BytesMut::new();
        codec.decode(input, &mut data, &mut replies);
        (data, replies.to_vec())
    }

    #[test]
    fn test_plain_data_passes_through() {
        let mut codec = TelnetCodec::default();
        let (data, replies) = decode(&mut codec, b"Username: ");
        assert_eq!(data, b"Username: ");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_negotiation_replies() {
        let mut codec = TelnetCodec::default();
        let input = [IAC, WILL, OPT_ECHO, IAC, DO, 24, b'o', b'k'];
        let (data, replies) = decode(&mut codec, &input);
        assert_eq!(data, b"ok");
        assert_eq!(replies, vec![IAC, DO, OPT_ECHO, IAC, WONT, 24]);
    }

    #[test]
    fn test_split_sequence_across_reads() {
        let mut codec = TelnetCodec::default();
        let (data, replies) = decode(&mut codec, &[b'a', IAC]);
        assert_eq!(data, b"a");
        assert!(replies.is_empty());

        let (data, replies) = decode(&mut codec, &[DO, OPT_SGA, b'b']);
        assert_eq!(data, b"b");
        assert_eq!(replies, vec![IAC, WILL, OPT_SGA]);
    }

    #[test]
    fn test_subnegotiation_is_skipped() {
        let mut codec = TelnetCodec::default();
        let input = [IAC, SB, 24, 1, IAC, SE, b'x'];
        let (data, _) = decode(&mut codec, &input);
        assert_eq!(data, b"x");
    }

    #[test]
    fn test_escaped_iac_and_cr_nul() {
        let mut codec = TelnetCodec::default();
        let (data, _) = decode(&mut codec, &[b'a', IAC, IAC, b'\r', 0, b'\r', b'\n']);
        assert_eq!(data, vec![b'a', IAC, b'\r', b'\r', b'\n']);
    }

    #[test]
    fn test_escape_iac() {
        assert_eq!(escape_iac(b"show ver\n"), b"show ver\n".to_vec());
        assert_eq!(escape_iac(&[1, IAC, 2]), vec![1, IAC, IAC, 2]);
    }

    #[tokio::test]
    async fn test_read_chunk_answers_negotiation() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[IAC, WILL, OPT_ECHO]).await.unwrap();
            socket.write_all(b"login: ").await.unwrap();
            let mut reply = [0u8; 3];
            socket.read_exact(&mut reply).await.unwrap();
            reply
        });

        let config = TelnetConfig {
            host: "127.0.0.1".into(),
            port,
            timeout: Duration::from_secs(5),
        };
        let mut transport = TelnetTransport::connect(&config).await.unwrap();

        let mut seen = Vec::new();
        while !seen.ends_with(b"login: ") {
            seen.extend(transport.read_chunk().await.unwrap());
        }

        assert_eq!(server.await.unwrap(), [IAC, DO, OPT_ECHO]);
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = TelnetConfig {
            host: "127.0.0.1".into(),
            port,
            timeout: Duration::from_secs(5),
        };
        let err = TelnetTransport::connect(&config).await.err().unwrap();
        assert!(matches!(
            err,
            crate::Error::Transport(TransportError::ConnectionFailed { .. })
        ));
    }
}
