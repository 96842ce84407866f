use super::*;

/// Bytes requested from the transport per read.
const READ_CHUNK: usize = 512;

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            scanner: PromptScanner::new(),
            connected: false,
            verbose: false,
            port: config::DEFAULT_TELNET_PORT,
            report: NeighborReport::default(),
        }
    }

    /// Echo every received chunk to stderr.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn state(&self) -> SessionState {
        self.scanner.state()
    }

    /// Connects to `address` and logs in.
    ///
    /// An open session is closed first, and the previously retrieved report
    /// is discarded.
    pub async fn connect(
        &mut self,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<(), CrawlerError> {
        self.report = NeighborReport::default();

        if self.connected {
            debug!("Closing previous session before reconnecting");
            if let Err(e) = self.close().await {
                debug!("Error closing previous session: {}", e);
            }
        }

        let addr: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| CrawlerError::InvalidAddress(address.to_string()))?;
        self.report.address = addr.to_string();

        self.transport.connect(addr, self.port).await?;
        self.connected = true;
        debug!("{}:{} TCP connection successful", addr, self.port);

        self.scanner.begin_login(username, password);
        let result = self.login(addr).await;
        if result.is_err() {
            self.abort().await;
        }
        result
    }

    async fn login(&mut self, addr: IpAddr) -> Result<(), CrawlerError> {
        loop {
            match self.next_step().await? {
                Step::Send(data) => self.send(&data).await?,
                Step::Authenticated => {
                    debug!("{} Login successful", addr);
                    return Ok(());
                }
                Step::Rejected => return Err(CrawlerError::AuthenticationFailure(addr)),
                Step::Expired => return Err(CrawlerError::SessionTimeout(addr)),
                Step::NeighborDump(_) => {}
            }
        }
    }

    /// Reads the prompt name and the CDP neighbor table of the connected switch.
    pub async fn fetch_report(&mut self) -> Result<NeighborReport, CrawlerError> {
        if !self.connected {
            return Err(CrawlerError::NotConnected);
        }

        let result = self.fetch().await;
        if result.is_err() {
            self.abort().await;
        }
        result
    }

    async fn fetch(&mut self) -> Result<NeighborReport, CrawlerError> {
        let wake = self.scanner.begin_fetch();
        self.send(&wake).await?;

        loop {
            match self.next_step().await? {
                Step::Send(data) => self.send(&data).await?,
                Step::NeighborDump(dump) => {
                    self.report.name = self.scanner.device_name().unwrap_or_default().to_string();
                    self.report.neighbors = parse_neighbors(&dump);
                    debug!(
                        "{} ({}) reported {} neighbors",
                        self.report.address,
                        self.report.name,
                        self.report.neighbors.len()
                    );
                    return Ok(self.report.clone());
                }
                _ => {}
            }
        }
    }

    /// Closes the session.
    pub async fn close(&mut self) -> Result<(), CrawlerError> {
        if !self.connected {
            return Err(CrawlerError::AlreadyClosed(self.report.address.parse().ok()));
        }

        self.connected = false;
        self.scanner.close();
        self.transport.close().await?;
        Ok(())
    }

    /// Tears the session down after a failure, ignoring close errors.
    async fn abort(&mut self) {
        self.scanner.fail();
        if self.connected {
            self.connected = false;
            if let Err(e) = self.transport.close().await {
                debug!("Error closing transport after failure: {}", e);
            }
        }
    }

    /// Returns the next scanner step, reading from the transport as needed.
    async fn next_step(&mut self) -> Result<Step, CrawlerError> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(step) = self.scanner.step() {
                return Ok(step);
            }

            let n = self.transport.read(&mut buf).await?;
            if n == 0 {
                tokio::task::yield_now().await;
                continue;
            }

            let chunk = &buf[..n];
            trace!("{:?}", String::from_utf8_lossy(chunk));
            if self.verbose {
                eprint!("{}", String::from_utf8_lossy(chunk));
            }
            self.scanner.feed(chunk);
        }
    }

    async fn send(&mut self, data: &str) -> Result<(), CrawlerError> {
        trace!("Send: {:?}", data);
        let bytes = data.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            let n = self.transport.write(&bytes[written..]).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "transport accepted no bytes").into());
            }
            written += n;
        }
        Ok(())
    }
}
