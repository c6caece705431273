//! Chunked copying between async readers and writers.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Default size of a single chunk when streaming file contents
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Copies everything from `reader` into `writer`, one chunk at a time
///
/// Each chunk is fully written before the next one is read, so at most one chunk is ever held in
/// memory. `on_chunk` receives the length of every chunk after it has been written. Returns the
/// total number of bytes copied.
pub(crate) async fn pump<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    mut on_chunk: F,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    F: FnMut(usize),
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut copied = 0u64;

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }

        writer.write_all(&buffer[..read]).await?;
        copied += read as u64;
        trace!(chunk = read, copied, "chunk written");
        on_chunk(read);
    }

    writer.flush().await?;
    Ok(copied)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use crate::stream::pump;

    #[tokio::test]
    async fn pump_in_chunks() {
        let data = (0..=255u8).cycle().take(1000).collect::<Vec<_>>();
        let mut output = Vec::new();
        let mut chunks = Vec::new();

        let copied = pump(&mut Cursor::new(&data), &mut output, 300, |len| chunks.push(len))
            .await
            .unwrap();

        assert_eq!(copied, 1000);
        assert_eq!(output, data);
        assert_eq!(chunks, vec![300, 300, 300, 100]);
    }

    #[tokio::test]
    async fn pump_empty() {
        let mut output = Vec::new();
        let mut calls = 0;

        let copied = pump(&mut Cursor::new(Vec::new()), &mut output, 16, |_| calls += 1)
            .await
            .unwrap();

        assert_eq!(copied, 0);
        assert_eq!(calls, 0);
    }
}
