use super::*;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// How long a single `read` waits before reporting "no data yet".
const POLL_SLICE: Duration = Duration::from_millis(50);

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SUPPRESS_GO_AHEAD: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DecodeState {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Separates option negotiation from terminal data.
///
/// Every option the server asks us to enable is refused. Server-side echo
/// and suppress-go-ahead are accepted, everything else the server offers is
/// declined.
#[derive(Debug, Default)]
struct IacDecoder {
    state: DecodeState,
}

impl IacDecoder {
    fn decode(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &b in input {
            self.state = match (self.state, b) {
                (DecodeState::Data, IAC) => DecodeState::Iac,
                (DecodeState::Data, 0) => DecodeState::Data,
                (DecodeState::Data, b) => {
                    data.push(b);
                    DecodeState::Data
                }
                (DecodeState::Iac, IAC) => {
                    data.push(IAC);
                    DecodeState::Data
                }
                (DecodeState::Iac, cmd @ (DO | DONT | WILL | WONT)) => DecodeState::Negotiate(cmd),
                (DecodeState::Iac, SB) => DecodeState::Sub,
                (DecodeState::Iac, _) => DecodeState::Data,
                (DecodeState::Negotiate(cmd), opt) => {
                    if let Some(answer) = Self::answer(cmd, opt) {
                        replies.extend_from_slice(&[IAC, answer, opt]);
                    }
                    DecodeState::Data
                }
                (DecodeState::Sub, IAC) => DecodeState::SubIac,
                (DecodeState::Sub, _) => DecodeState::Sub,
                (DecodeState::SubIac, SE) => DecodeState::Data,
                (DecodeState::SubIac, _) => DecodeState::Sub,
            };
        }
    }

    fn answer(cmd: u8, opt: u8) -> Option<u8> {
        match cmd {
            DO => Some(WONT),
            WILL if opt == OPT_ECHO || opt == OPT_SUPPRESS_GO_AHEAD => Some(DO),
            WILL => Some(DONT),
            _ => None,
        }
    }
}

/// Telnet client transport over TCP.
///
/// Every write is followed by a fixed settle delay; switch CLIs drop
/// keystrokes that arrive faster than they redraw.
pub struct TelnetTransport {
    stream: Option<TcpStream>,
    decoder: IacDecoder,
    raw: Vec<u8>,
    write_delay: Duration,
    read_timeout: Duration,
    last_data: Instant,
}

impl Default for TelnetTransport {
    fn default() -> Self {
        Self::new(config::DEFAULT_WRITE_DELAY, config::DEFAULT_READ_TIMEOUT)
    }
}

impl TelnetTransport {
    pub fn new(write_delay: Duration, read_timeout: Duration) -> Self {
        Self {
            stream: None,
            decoder: IacDecoder::default(),
            raw: Vec::new(),
            write_delay,
            read_timeout,
            last_data: Instant::now(),
        }
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "telnet client not connected"))
    }
}

#[async_trait]
impl Transport for TelnetTransport {
    async fn connect(&mut self, address: IpAddr, port: u16) -> io::Result<()> {
        if let Some(stream) = &self.stream {
            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("telnet client already connected to: {peer}"),
            ));
        }

        let stream = TcpStream::connect((address, port)).await?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        self.decoder = IacDecoder::default();
        self.last_data = Instant::now();
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut raw = std::mem::take(&mut self.raw);
        raw.resize(buf.len(), 0);

        let stream = self.stream()?;
        let polled = tokio::time::timeout(POLL_SLICE, stream.read(&mut raw)).await;
        let n = match polled {
            Err(_) => {
                self.raw = raw;
                if self.last_data.elapsed() >= self.read_timeout {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "telnet read timed out"));
                }
                return Ok(0);
            }
            Ok(Ok(0)) => {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "telnet peer closed the connection"));
            }
            Ok(result) => result?,
        };
        self.last_data = Instant::now();

        let mut data = Vec::with_capacity(n);
        let mut replies = Vec::new();
        self.decoder.decode(&raw[..n], &mut data, &mut replies);
        self.raw = raw;

        if !replies.is_empty() {
            trace!("Telnet negotiation reply: {:?}", replies);
            self.stream()?.write_all(&replies).await?;
        }

        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let stream = self.stream()?;
        let n = stream.write(buf).await?;
        tokio::time::sleep(self.write_delay).await;
        Ok(n)
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}
