use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{IoContext, Result};

/// Read cursor over a seekable byte stream. All reads are little-endian and
/// exact: a short read is an error, never a partial value.
pub struct Reader<'a, R> {
    inner: &'a mut R,
    pos: u64,
}

impl<'a, R: Read + Seek> Reader<'a, R> {
    /// Wrap a stream, positioning it at offset 0.
    pub fn new(inner: &'a mut R) -> Result<Self> {
        let mut reader = Self { inner, pos: 0 };
        reader.seek(0)?;
        Ok(reader)
    }

    /// Current byte position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Seek to an absolute position.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(pos))
            .io_context(|| format!("seeking to offset {pos:#x}"))?;
        self.pos = pos;
        Ok(())
    }

    /// Fill `buf` completely from the current position.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let pos = self.pos;
        self.inner
            .read_exact(buf)
            .io_context(|| format!("reading {} bytes at offset {pos:#x}", buf.len()))?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Read a 4-byte magic/tag.
    pub fn read_magic(&mut self) -> Result<[u8; 4]> {
        let mut magic = [0u8; 4];
        self.read_exact(&mut magic)?;
        Ok(magic)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read `len` bytes into a new buffer.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// The wrapped stream, for collaborators that read on their own.
    ///
    /// The tracked position is stale after using it; call [`Reader::seek`]
    /// before the next read through this cursor.
    pub fn inner_mut(&mut self) -> &mut R {
        self.inner
    }
}

/// Write cursor over a seekable byte stream. Every write is seek-then-write
/// of an exact length; gaps left by forward seeks read back as zeros.
pub struct Writer<'a, W> {
    inner: &'a mut W,
    pos: u64,
    /// Highest position ever written, to pad the tail on [`Writer::finish`].
    end: u64,
}

impl<'a, W: Write + Seek> Writer<'a, W> {
    /// Wrap a stream, positioning it at offset 0.
    pub fn new(inner: &'a mut W) -> Result<Self> {
        let mut writer = Self { inner, pos: 0, end: 0 };
        writer.seek(0)?;
        Ok(writer)
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(pos))
            .io_context(|| format!("seeking output to offset {pos:#x}"))?;
        self.pos = pos;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let pos = self.pos;
        self.inner
            .write_all(bytes)
            .io_context(|| format!("writing {} bytes at offset {pos:#x}", bytes.len()))?;
        self.advance(bytes.len() as u64);
        Ok(())
    }

    pub fn write_magic(&mut self, magic: &[u8; 4]) -> Result<()> {
        self.write_bytes(magic)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Copy exactly `len` bytes from `source` at `src_offset` to the current
    /// output position. Running out of source bytes is an error.
    pub fn copy_from<R: Read + Seek>(&mut self, source: &mut R, src_offset: u64, len: u64) -> Result<()> {
        source
            .seek(SeekFrom::Start(src_offset))
            .io_context(|| format!("seeking source to offset {src_offset:#x}"))?;
        self.copy_stream(source, len, || format!("source offset {src_offset:#x}"))
    }

    /// Copy exactly `len` bytes from the current position of `source`.
    pub fn copy_stream<R: Read>(&mut self, source: &mut R, len: u64, describe: impl Fn() -> String) -> Result<()> {
        let pos = self.pos;
        let copied = io::copy(&mut source.take(len), &mut *self.inner)
            .io_context(|| format!("copying {len} bytes from {} to output offset {pos:#x}", describe()))?;
        if copied != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("unexpected end of file while copying: got {copied} of {len} bytes"),
            ))
            .io_context(|| format!("copying from {}", describe()));
        }
        self.advance(len);
        Ok(())
    }

    /// Zero-fill up to `total` bytes if nothing has been written that far,
    /// then flush.
    pub fn finish(mut self, total: u64) -> Result<()> {
        if self.end < total {
            let pad = total - self.end;
            self.seek(self.end)?;
            self.copy_stream(&mut io::repeat(0), pad, || "zero padding".to_string())?;
        }
        self.inner.flush().io_context(|| "flushing output".to_string())
    }

    fn advance(&mut self, n: u64) {
        self.pos += n;
        self.end = self.end.max(self.pos);
    }
}
