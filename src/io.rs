//! Reading and writing text and JSON-lines entity streams.
//!
//! Every location is either a file path or `-` for standard input/output.

use futures::stream::{self, Stream};
use std::path::Path;
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::entity::Entity;
use crate::error::Result;

pub const STDIO: &str = "-";

pub type Reader = Pin<Box<dyn AsyncRead + Send>>;
pub type Writer = Pin<Box<dyn AsyncWrite + Send>>;

/// Reader for a file, or stdin for `-`
pub async fn open_reader(uri: &str) -> Result<Reader> {
    if uri == STDIO {
        Ok(Box::pin(tokio::io::stdin()))
    } else {
        Ok(Box::pin(tokio::fs::File::open(Path::new(uri)).await?))
    }
}

/// Writer creating a file, or stdout for `-`
pub async fn open_writer(uri: &str) -> Result<Writer> {
    if uri == STDIO {
        Ok(Box::pin(tokio::io::stdout()))
    } else {
        Ok(Box::pin(tokio::fs::File::create(Path::new(uri)).await?))
    }
}

/// Whole content of `uri` as text
pub async fn read_text(uri: &str) -> Result<String> {
    let mut reader = open_reader(uri).await?;
    let mut text = String::new();
    reader.read_to_string(&mut text).await?;
    Ok(text)
}

/// Write `text` followed by a newline
pub async fn write_text(uri: &str, text: &str) -> Result<()> {
    let mut writer = open_writer(uri).await?;
    writer.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Lazily parse one entity per line. Blank lines are skipped, unparseable
/// ones are logged and skipped; read errors end the stream.
pub fn entity_stream<R>(reader: R) -> impl Stream<Item = Entity>
where
    R: AsyncRead + Unpin,
{
    let lines = BufReader::new(reader).lines();
    stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<Entity>(&line) {
                    Ok(entity) => return Some((entity, lines)),
                    Err(e) => warn!("Skipping invalid entity line: {}", e),
                },
                Ok(None) => return None,
                Err(e) => {
                    warn!("Failed to read entity stream: {}", e);
                    return None;
                }
            }
        }
    })
}

/// Write one entity as a JSON line
pub async fn write_entity<W>(writer: &mut W, entity: &Entity) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut line = serde_json::to_vec(entity)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    Ok(())
}
