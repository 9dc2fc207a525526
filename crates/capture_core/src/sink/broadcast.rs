//! TCP Broadcast Sink & Client
//!
//! Bit-exact little-endian wire protocol: a format header sent once per
//! client, then a stream of audio/keepalive/end packets. A write failure
//! on one client removes only that client; it never disturbs the others.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::Sink;
use crate::buffer::{AudioBuffer, SampleLayout};
use crate::error::CaptureError;
use crate::format::AudioFormat;

const MAGIC: &[u8; 5] = b"AUDIO";
const VERSION: u8 = 1;
const PACKET_HEADER: u8 = 0x02;
const PACKET_AUDIO: u8 = 0x01;
const PACKET_END: u8 = 0xFF;
const KEEPALIVE_BYTE: u8 = 0x00;
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(30);

fn header_bytes(format: AudioFormat) -> Vec<u8> {
    let mut buf = Vec::with_capacity(19);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.push(PACKET_HEADER);
    buf.extend_from_slice(&(format.sample_rate as u32).to_le_bytes());
    buf.extend_from_slice(&format.channel_count.to_le_bytes());
    buf.extend_from_slice(&(format.bit_depth as u16).to_le_bytes());
    let mut flags: u32 = 0;
    if format.is_float {
        flags |= 0b01;
    }
    if format.is_interleaved {
        flags |= 0b10;
    }
    buf.extend_from_slice(&flags.to_le_bytes());
    buf
}

fn audio_packet_bytes(timestamp_us: u64, frame_count: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 8 + 4 + payload.len());
    buf.push(PACKET_AUDIO);
    buf.extend_from_slice(&timestamp_us.to_le_bytes());
    buf.extend_from_slice(&frame_count.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn encode_payload(format: AudioFormat, samples: &[f32]) -> Vec<u8> {
    if format.is_float {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    } else if format.bit_depth == 24 {
        samples
            .iter()
            .flat_map(|s| capture_dsp::float_to_int24(*s).to_le_bytes()[..3].to_vec())
            .collect()
    } else {
        samples
            .iter()
            .flat_map(|s| capture_dsp::float_to_int16(*s).to_le_bytes())
            .collect()
    }
}

struct ConnectedClient {
    write_half: Arc<Mutex<OwnedWriteHalf>>,
}

/// Accepts one connection, sends the format header, and spawns its
/// keepalive reader. Used both by the background accept loop and by tests
/// that want to drive a single acceptance deterministically.
async fn accept_one(
    listener: &TcpListener,
    clients: &Mutex<Vec<ConnectedClient>>,
    format: AudioFormat,
) -> Result<(), CaptureError> {
    let (mut stream, addr) = listener
        .accept()
        .await
        .map_err(|e| CaptureError::NetworkConnectionFailed(e.to_string()))?;

    if stream.write_all(&header_bytes(format)).await.is_ok() {
        info!(%addr, "broadcast client connected");
        let (read_half, write_half) = stream.into_split();
        let write_half = Arc::new(Mutex::new(write_half));
        tokio::spawn(run_keepalive_reader(read_half, Arc::clone(&write_half)));
        clients.lock().await.push(ConnectedClient { write_half });
    }
    Ok(())
}

/// Services a listener for as long as the sink is configured: every
/// accepted client gets the format header and a keepalive reader. Runs
/// until the listener errors or the task is aborted (on `finish`).
async fn run_accept_loop(
    listener: Arc<TcpListener>,
    clients: Arc<Mutex<Vec<ConnectedClient>>>,
    format: AudioFormat,
) {
    loop {
        if let Err(err) = accept_one(&listener, &clients, format).await {
            warn!(error = %err, "broadcast accept loop stopping");
            return;
        }
    }
}

/// Reads (and discards) client bytes so the socket stays readable, writing
/// a single keepalive byte whenever the 30-second read timeout elapses.
/// Exits once the peer closes the connection or a write fails; the next
/// broadcast attempt then removes the client via its own write failure.
async fn run_keepalive_reader(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    write_half: Arc<Mutex<OwnedWriteHalf>>,
) {
    let mut discard = [0u8; 64];
    loop {
        match tokio::time::timeout(CLIENT_READ_TIMEOUT, read_half.read(&mut discard)).await {
            Ok(Ok(0)) => return,
            Ok(Ok(_)) => continue,
            Ok(Err(_)) => return,
            Err(_) => {
                if write_half
                    .lock()
                    .await
                    .write_all(&[KEEPALIVE_BYTE])
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

/// Broadcasts converted buffers to every connected TCP client.
pub struct BroadcastSink {
    listener: Arc<TcpListener>,
    clients: Arc<Mutex<Vec<ConnectedClient>>>,
    format: Mutex<Option<AudioFormat>>,
    accept_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    start: Instant,
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl BroadcastSink {
    pub async fn bind(host: &str, port: u16) -> Result<Self, CaptureError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| CaptureError::NetworkConnectionFailed(e.to_string()))?;
        Ok(Self {
            listener: Arc::new(listener),
            clients: Arc::new(Mutex::new(Vec::new())),
            format: Mutex::new(None),
            accept_task: Mutex::new(None),
            start: Instant::now(),
            packets_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        })
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn client_count(&self) -> usize {
        self.clients.try_lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Accepts one pending connection, sending it the format header if the
    /// sink has already been configured. No-op if nothing is pending. Kept
    /// for callers that want to drive acceptance deterministically (e.g.
    /// tests); the integrated path services the listener continuously via
    /// the accept loop spawned from `configure`.
    pub async fn accept_pending(&self) -> Result<(), CaptureError> {
        let format = *self.format.lock().await;
        let Some(format) = format else { return Ok(()) };
        accept_one(&self.listener, &self.clients, format).await
    }

    fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    async fn broadcast_bytes(&self, bytes: &[u8]) {
        let mut clients = self.clients.lock().await;
        let mut i = 0;
        while i < clients.len() {
            let write_result = clients[i].write_half.lock().await.write_all(bytes).await;
            match write_result {
                Ok(()) => i += 1,
                Err(e) => {
                    warn!(error = %e, "dropping broadcast client after write failure");
                    clients.remove(i);
                }
            }
        }
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes.len() as u64, Ordering::Relaxed);
    }
}

#[async_trait]
impl Sink for BroadcastSink {
    async fn configure(&self, format: AudioFormat) -> Result<(), CaptureError> {
        *self.format.lock().await = Some(format);
        let handle = tokio::spawn(run_accept_loop(
            Arc::clone(&self.listener),
            Arc::clone(&self.clients),
            format,
        ));
        *self.accept_task.lock().await = Some(handle);
        Ok(())
    }

    async fn process(&self, buffer: &AudioBuffer) -> Result<(), CaptureError> {
        let format = self
            .format
            .lock()
            .await
            .ok_or(CaptureError::OutputNotConfigured)?;

        let interleaved = buffer.data.to_interleaved(format.channel_count as usize);
        let payload = encode_payload(format, &interleaved);
        let packet = audio_packet_bytes(self.elapsed_us(), buffer.frame_count as u32, &payload);
        self.broadcast_bytes(&packet).await;
        Ok(())
    }

    async fn handle_error(&self, error: &CaptureError) {
        warn!(error = %error, "broadcast sink processing error");
    }

    async fn finish(&self) -> Result<(), CaptureError> {
        if let Some(handle) = self.accept_task.lock().await.take() {
            handle.abort();
        }
        let mut buf = Vec::with_capacity(9);
        buf.push(PACKET_END);
        buf.extend_from_slice(&self.elapsed_us().to_le_bytes());
        self.broadcast_bytes(&buf).await;
        self.clients.lock().await.clear();
        Ok(())
    }
}

/// Reads a [`BroadcastSink`]'s wire protocol, yielding decoded buffers.
///
/// Every `timestamp_us` is treated as server-relative only; the client
/// never combines it with a local wall-clock base.
pub struct BroadcastClient {
    stream: TcpStream,
    format: AudioFormat,
}

impl BroadcastClient {
    pub async fn connect(host: &str, port: u16) -> Result<Self, CaptureError> {
        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| CaptureError::NetworkConnectionFailed(e.to_string()))?;

        let mut header = [0u8; 19];
        stream
            .read_exact(&mut header)
            .await
            .map_err(|e| CaptureError::StreamingProtocol(e.to_string()))?;

        if &header[0..5] != MAGIC {
            return Err(CaptureError::StreamingProtocol("bad magic".into()));
        }
        if header[5] != VERSION {
            return Err(CaptureError::StreamingProtocol("unsupported version".into()));
        }
        if header[6] != PACKET_HEADER {
            return Err(CaptureError::StreamingProtocol("expected header packet".into()));
        }

        let sample_rate = u32::from_le_bytes(header[7..11].try_into().unwrap());
        let channels = u16::from_le_bytes(header[11..13].try_into().unwrap());
        let bit_depth = u16::from_le_bytes(header[13..15].try_into().unwrap());
        let flags = u32::from_le_bytes(header[15..19].try_into().unwrap());

        let format = AudioFormat::new(
            sample_rate as f64,
            channels,
            bit_depth as u8,
            flags & 0b01 != 0,
            flags & 0b10 != 0,
        );

        debug!(?format, "broadcast client negotiated format");
        Ok(Self { stream, format })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Reads the next packet, returning `None` on a clean end-of-stream
    /// or a server-sent end packet.
    pub async fn next_buffer(&mut self) -> Result<Option<AudioBuffer>, CaptureError> {
        loop {
            let mut packet_type = [0u8; 1];
            match self.stream.read_exact(&mut packet_type).await {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(CaptureError::StreamingProtocol(e.to_string())),
            }

            match packet_type[0] {
                KEEPALIVE_BYTE => continue,
                PACKET_END => {
                    let mut ts = [0u8; 8];
                    self.stream
                        .read_exact(&mut ts)
                        .await
                        .map_err(|e| CaptureError::StreamingProtocol(e.to_string()))?;
                    return Ok(None);
                }
                PACKET_AUDIO => {
                    let mut rest = [0u8; 12];
                    self.stream
                        .read_exact(&mut rest)
                        .await
                        .map_err(|e| CaptureError::StreamingProtocol(e.to_string()))?;
                    let _timestamp_us = u64::from_le_bytes(rest[0..8].try_into().unwrap());
                    let frame_count = u32::from_le_bytes(rest[8..12].try_into().unwrap()) as usize;

                    let bytes_per_sample = self.format.bit_depth as usize / 8;
                    let payload_len = frame_count * self.format.channel_count as usize * bytes_per_sample;
                    let mut payload = vec![0u8; payload_len];
                    self.stream
                        .read_exact(&mut payload)
                        .await
                        .map_err(|e| CaptureError::StreamingProtocol(e.to_string()))?;

                    let samples = decode_payload(self.format, &payload);
                    return Ok(Some(AudioBuffer::new(
                        SampleLayout::Interleaved(samples),
                        self.format,
                        Instant::now(),
                    )));
                }
                other => {
                    return Err(CaptureError::StreamingProtocol(format!(
                        "unknown packet type {other:#x}"
                    )))
                }
            }
        }
    }
}

fn decode_payload(format: AudioFormat, payload: &[u8]) -> Vec<f32> {
    if format.is_float {
        payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
            .collect()
    } else if format.bit_depth == 24 {
        payload
            .chunks_exact(3)
            .map(|b| {
                let mut bytes = [0u8; 4];
                bytes[..3].copy_from_slice(b);
                let value = i32::from_le_bytes(bytes) << 8 >> 8;
                value as f32 / 8_388_608.0
            })
            .collect()
    } else {
        payload
            .chunks_exact(2)
            .map(|b| capture_dsp::int16_to_float(i16::from_le_bytes(b.try_into().unwrap())))
            .collect()
    }
}
