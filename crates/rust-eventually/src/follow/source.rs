//! Remote log sources.
//!
//! A [`LogSource`] opens one connection at a time and hands back the raw
//! frames it receives. Dropping the returned stream releases the connection.

use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Raw frames from one connection, in arrival order.
pub type FrameStream = BoxStream<'static, io::Result<Bytes>>;

/// A remote, continuously growing log source.
pub trait LogSource: Send + 'static {
    /// A short name for logs and errors.
    fn describe(&self) -> String;

    /// Open a new connection.
    ///
    /// Called again after a disconnect when the follower is configured to
    /// reconnect.
    fn open(&mut self) -> BoxFuture<'_, io::Result<FrameStream>>;
}

impl LogSource for Box<dyn LogSource> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn open(&mut self) -> BoxFuture<'_, io::Result<FrameStream>> {
        (**self).open()
    }
}

/// Sending half of a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::UnboundedSender<io::Result<Bytes>>,
}

impl LogSink {
    /// Send raw bytes. Returns `false` once the source is gone.
    pub fn send(&self, data: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(data.into())).is_ok()
    }

    /// Send one line, adding the trailing newline.
    pub fn send_line(&self, line: &str) -> bool {
        self.send(format!("{line}\n"))
    }

    /// Break the connection with an error.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.tx
            .send(Err(io::Error::new(io::ErrorKind::ConnectionReset, message.into())))
            .is_ok()
    }
}

/// An in-process source fed through a [`LogSink`].
///
/// The connection ends when every sink is dropped. It can only be opened once.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Option<mpsc::UnboundedReceiver<io::Result<Bytes>>>,
}

impl ChannelSource {
    /// Create a source and its sink.
    #[must_use]
    pub fn new() -> (LogSink, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LogSink { tx }, Self { rx: Some(rx) })
    }
}

impl LogSource for ChannelSource {
    fn describe(&self) -> String {
        "channel".to_string()
    }

    fn open(&mut self) -> BoxFuture<'_, io::Result<FrameStream>> {
        let rx = self.rx.take();
        Box::pin(async move {
            let rx = rx.ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotConnected, "channel source already consumed")
            })?;
            let frames: FrameStream = Box::pin(UnboundedReceiverStream::new(rx));
            Ok(frames)
        })
    }
}

/// Follows the standard output of a command.
///
/// The child is killed when its connection is released.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    /// Create a source for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl LogSource for CommandSource {
    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn open(&mut self) -> BoxFuture<'_, io::Result<FrameStream>> {
        Box::pin(async move {
            let mut child = Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()?;
            let stdout = child.stdout.take().ok_or_else(|| {
                io::Error::new(io::ErrorKind::BrokenPipe, "child stdout was not captured")
            })?;
            debug!(program = %self.program, pid = child.id(), "spawned log command");
            let frames: FrameStream = Box::pin(ChildFrames {
                frames: ReaderStream::new(stdout),
                _child: child,
            });
            Ok(frames)
        })
    }
}

/// Keeps the child alive for as long as its output is being read.
struct ChildFrames {
    frames: ReaderStream<ChildStdout>,
    _child: Child,
}

impl Stream for ChildFrames {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.frames).poll_next(cx)
    }
}

/// Follows a TCP endpoint, optionally sending a request line after connecting.
#[derive(Debug, Clone)]
pub struct TcpSource {
    addr: String,
    request: Option<String>,
}

impl TcpSource {
    /// Create a source for `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            request: None,
        }
    }

    /// Send `request` (plus a newline) after each connect.
    #[must_use]
    pub fn request(mut self, request: impl Into<String>) -> Self {
        self.request = Some(request.into());
        self
    }
}

impl LogSource for TcpSource {
    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    fn open(&mut self) -> BoxFuture<'_, io::Result<FrameStream>> {
        Box::pin(async move {
            let mut stream = TcpStream::connect(&self.addr).await?;
            if let Some(request) = &self.request {
                stream.write_all(request.as_bytes()).await?;
                stream.write_all(b"\n").await?;
            }
            let frames: FrameStream = Box::pin(ReaderStream::new(stream));
            Ok(frames)
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn channel_source_delivers_in_order() {
        let (sink, mut source) = ChannelSource::new();
        let mut frames = source.open().await.unwrap();
        sink.send_line("a");
        sink.send("b");
        drop(sink);

        assert_eq!(frames.next().await.unwrap().unwrap(), Bytes::from("a\n"));
        assert_eq!(frames.next().await.unwrap().unwrap(), Bytes::from("b"));
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn channel_source_opens_once() {
        let (_sink, mut source) = ChannelSource::new();
        assert!(source.open().await.is_ok());
        let err = source.open().await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn tcp_source_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let mut source = TcpSource::new(addr.to_string());
        assert!(source.open().await.is_err());
    }

    #[tokio::test]
    async fn tcp_source_sends_request() {
        use tokio::io::{AsyncBufReadExt, BufReader};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut request = String::new();
            BufReader::new(read).read_line(&mut request).await.unwrap();
            write.write_all(b"streaming logs\n").await.unwrap();
            request
        });

        let mut source = TcpSource::new(addr.to_string()).request("TAIL app");
        let mut frames = source.open().await.unwrap();
        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(frame, Bytes::from("streaming logs\n"));
        assert_eq!(server.await.unwrap(), "TAIL app\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_source_reads_stdout() {
        let mut source = CommandSource::new("sh").args(["-c", "echo hello"]);
        assert_eq!(source.describe(), "sh -c echo hello");
        let mut frames = source.open().await.unwrap();
        let mut out = Vec::new();
        while let Some(frame) = frames.next().await {
            out.extend_from_slice(&frame.unwrap());
        }
        assert_eq!(out, b"hello\n");
    }
}
