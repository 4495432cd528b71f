// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bootloader communication.
//!
//! The device numbers every command it receives with a token, one higher
//! than the last, and echoes it in the `Ack`/`Data` completion. Commands are
//! strictly sequential (a newer command replaces an unstarted one on the
//! device), so the transport tracks the next token and drops completions
//! left over from an earlier command that timed out.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use uf2boot_common::protocol::{Command, Response, MAX_FRAME_SIZE};

/// Default time to wait for a completion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Erasing the whole 16M window takes well over the default timeout.
pub const ERASE_TIMEOUT: Duration = Duration::from_secs(120);
/// Per-read timeout on the port; the reply deadline is enforced above it.
const READ_POLL: Duration = Duration::from_millis(20);

/// How long the device may take to complete `cmd`.
pub fn reply_timeout(cmd: &Command) -> Duration {
    match cmd {
        Command::FlashErase { .. } => ERASE_TIMEOUT,
        _ => DEFAULT_TIMEOUT,
    }
}

/// What to do with a received frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    /// Belongs to the command just sent.
    Accept,
    /// Completion of an earlier command.
    Stale(u32),
}

/// Follows the device's token counter across commands.
#[derive(Debug, Default)]
pub struct TokenTracker {
    /// Token the device will give the next command; unknown until the
    /// first completion is seen.
    next: Option<u32>,
}

impl TokenTracker {
    /// Classify `response` to the command just sent and advance the counter.
    pub fn check(&mut self, response: &Response) -> Result<Reply> {
        let expected = self.next;
        match (response.completion(), expected) {
            // Status replies carry no token but still used one up.
            (None, _) => {
                self.next = expected.map(|t| t.wrapping_add(1));
                Ok(Reply::Accept)
            }
            (Some((token, _)), None) => {
                self.next = Some(token.wrapping_add(1));
                Ok(Reply::Accept)
            }
            (Some((token, _)), Some(want)) if token == want => {
                self.next = Some(token.wrapping_add(1));
                Ok(Reply::Accept)
            }
            (Some((token, _)), Some(want)) if (token.wrapping_sub(want) as i32) < 0 => {
                Ok(Reply::Stale(token))
            }
            (Some((token, _)), Some(want)) => {
                // Lost sync: the device saw commands we did not send.
                self.next = None;
                bail!("Reply token {} does not match command token {}", token, want)
            }
        }
    }

    /// Forget the counter after a failed exchange; a timed-out command may
    /// or may not have reached the device.
    pub fn lose_sync(&mut self) {
        self.next = None;
    }
}

/// USB CDC transport for communicating with the bootloader.
pub struct Transport {
    port: Box<dyn SerialPort>,
    rx_buf: Vec<u8>,
    tokens: TokenTracker,
}

impl Transport {
    /// Open the specified serial port.
    pub fn new(port_name: &str) -> Result<Self> {
        let port = serialport::new(port_name, 115200)
            .timeout(READ_POLL)
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self {
            port,
            rx_buf: Vec::with_capacity(MAX_FRAME_SIZE),
            tokens: TokenTracker::default(),
        })
    }

    fn send(&mut self, cmd: &Command) -> Result<()> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let encoded = postcard::to_slice_cobs(cmd, &mut buf)
            .map_err(|e| anyhow::anyhow!("Failed to serialize command: {}", e))?;
        self.port
            .write_all(encoded)
            .map_err(|e| anyhow::anyhow!("Failed to write to serial port: {}", e))?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one COBS frame, giving up at `deadline`.
    fn receive(&mut self, deadline: Instant) -> Result<Response> {
        self.rx_buf.clear();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    self.rx_buf.push(byte[0]);
                    if byte[0] == 0 {
                        break;
                    }
                    if self.rx_buf.len() > MAX_FRAME_SIZE {
                        bail!("Response frame exceeds {} bytes", MAX_FRAME_SIZE);
                    }
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => bail!("Serial read error: {}", e),
            }
            if Instant::now() >= deadline {
                bail!("Timeout waiting for response");
            }
        }

        postcard::from_bytes_cobs(&mut self.rx_buf).map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize response: {} (raw {} bytes: {:02x?})",
                e,
                self.rx_buf.len(),
                &self.rx_buf[..self.rx_buf.len().min(32)]
            )
        })
    }

    /// Discard anything already buffered; the port's short read timeout
    /// ends the loop once the line is quiet.
    fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
    }

    /// Send a command and wait for its completion, skipping completions of
    /// earlier commands.
    pub fn send_recv(&mut self, cmd: &Command) -> Result<Response> {
        self.drain_rx();
        self.send(cmd)?;

        let deadline = Instant::now() + reply_timeout(cmd);
        loop {
            let response = match self.receive(deadline) {
                Ok(response) => response,
                Err(e) => {
                    self.tokens.lose_sync();
                    return Err(e);
                }
            };
            match self.tokens.check(&response)? {
                Reply::Accept => return Ok(response),
                Reply::Stale(token) => eprintln!("Dropping stale reply for token {}", token),
            }
        }
    }
}
