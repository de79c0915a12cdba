//! Frame layer - newline-delimited frames over any byte stream
//!
//! One frame is one UTF-8 JSON document terminated by `\n`. JSON string
//! escaping guarantees the document itself never contains a raw newline.

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Write one frame, appending the terminator
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Read one frame; `None` on a clean end of stream
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Bytes>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    Ok(Some(Bytes::from(buf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = client;
        let mut reader = BufReader::new(server);

        write_frame(&mut writer, br#"{"worker":"echo"}"#).await.unwrap();
        write_frame(&mut writer, b"second").await.unwrap();
        drop(writer);

        assert_eq!(
            read_frame(&mut reader).await.unwrap().unwrap().as_ref(),
            br#"{"worker":"echo"}"#
        );
        assert_eq!(
            read_frame(&mut reader).await.unwrap().unwrap().as_ref(),
            b"second"
        );
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_still_a_frame() {
        use tokio::io::AsyncWriteExt;

        let (mut client, server) = tokio::io::duplex(1024);
        let mut reader = BufReader::new(server);

        client.write_all(b"partial").await.unwrap();
        drop(client);

        assert_eq!(
            read_frame(&mut reader).await.unwrap().unwrap().as_ref(),
            b"partial"
        );
    }
}
