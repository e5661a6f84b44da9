//! Unix domain socket transports with Bincode framing.
//!
//! Every connection carries one typed, length-delimited Bincode channel. The
//! lifecycle and control services layer tarpc channels on top; the heartbeat
//! path uses the typed transport directly as a duplex message stream.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use tarpc::serde_transport::{self, Transport};
use tarpc::tokio_serde::formats::Bincode;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// A typed duplex channel over a Unix socket: receives `In`, sends `Out`.
pub type UnixTransport<In, Out> = Transport<UnixStream, In, Out, Bincode<In, Out>>;

/// Binds a listener at `path`, replacing any stale socket file left behind
/// by a previous host that did not exit cleanly.
pub fn bind(path: &Path) -> io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(path)
}

/// Wraps an accepted stream in the typed Bincode framing.
pub fn framed<In, Out>(stream: UnixStream) -> UnixTransport<In, Out>
where
    In: for<'de> Deserialize<'de>,
    Out: Serialize,
{
    serde_transport::new(
        Framed::new(stream, LengthDelimitedCodec::new()),
        Bincode::default(),
    )
}

/// Connects to `path` and returns the typed transport.
pub async fn connect<In, Out>(path: &Path) -> io::Result<UnixTransport<In, Out>>
where
    In: for<'de> Deserialize<'de>,
    Out: Serialize,
{
    let stream = UnixStream::connect(path).await?;
    Ok(framed(stream))
}
