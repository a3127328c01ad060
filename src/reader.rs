//! Buffered readers and line decoding
use crate::{error::ParsingError, options::Encoding};

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

#[cfg(feature = "flate2")]
use flate2::read::GzDecoder;

/// [BufferedReader] abstracts the supported file sources
#[derive(Debug)]
pub enum BufferedReader {
    /// Readable file
    PlainFile(BufReader<File>),
    /// gzip compressed file
    #[cfg(feature = "flate2")]
    #[cfg_attr(docsrs, doc(cfg(feature = "flate2")))]
    GzFile(BufReader<GzDecoder<File>>),
}

impl BufferedReader {
    /// Opens a plain readable file
    pub fn plain_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let fd = File::open(path)?;
        Ok(Self::PlainFile(BufReader::new(fd)))
    }
    /// Opens a gzip compressed file
    #[cfg(feature = "flate2")]
    #[cfg_attr(docsrs, doc(cfg(feature = "flate2")))]
    pub fn gzip_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let fd = File::open(path)?;
        Ok(Self::GzFile(BufReader::new(GzDecoder::new(fd))))
    }
}

impl Read for BufferedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::PlainFile(h) => h.read(buf),
            #[cfg(feature = "flate2")]
            Self::GzFile(h) => h.read(buf),
        }
    }
}

impl BufRead for BufferedReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        match self {
            Self::PlainFile(h) => h.fill_buf(),
            #[cfg(feature = "flate2")]
            Self::GzFile(h) => h.fill_buf(),
        }
    }
    fn consume(&mut self, s: usize) {
        match self {
            Self::PlainFile(h) => h.consume(s),
            #[cfg(feature = "flate2")]
            Self::GzFile(h) => h.consume(s),
        }
    }
}

/// Decodes one raw line. Latin-1 maps each byte to the code point of same value.
pub fn decode(bytes: &[u8], encoding: Encoding, index: usize) -> Result<String, ParsingError> {
    let latin1 = |bytes: &[u8]| bytes.iter().map(|b| *b as char).collect::<String>();
    match encoding {
        Encoding::Latin1 => Ok(latin1(bytes)),
        Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| ParsingError::Encoding(index)),
        Encoding::Auto => match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Ok(latin1(bytes)),
        },
    }
}

/// [Lines] iterates the decoded lines of a [BufRead]er,
/// without their `\n` or `\r\n` termination.
pub struct Lines<R: BufRead> {
    reader: R,
    encoding: Encoding,
    index: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> Lines<R> {
    pub fn new(reader: R, encoding: Encoding) -> Self {
        Self {
            reader,
            encoding,
            index: 0,
            buf: Vec::with_capacity(128),
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = Result<String, ParsingError>;
    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                let line = decode(&self.buf, self.encoding, self.index);
                self.index += 1;
                Some(line)
            },
            Err(e) => Some(Err(ParsingError::Io(e))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn line_terminations() {
        let content = "first\r\nsecond\nthird";
        let lines: Vec<String> = Lines::new(content.as_bytes(), Encoding::Auto)
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["first", "second", "third"]);
    }
    #[test]
    fn latin1_fallback() {
        // "Zürich" in ISO 8859-1
        let content: &[u8] = b"Z\xfcrich\nplain\n";
        let lines: Vec<String> = Lines::new(content, Encoding::Auto)
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["Zürich", "plain"]);

        let mut strict = Lines::new(content, Encoding::Utf8);
        assert!(matches!(strict.next(), Some(Err(ParsingError::Encoding(0)))));
        assert_eq!(strict.next().unwrap().unwrap(), "plain");

        let first = Lines::new(content, Encoding::Latin1).next().unwrap().unwrap();
        assert_eq!(first.chars().count(), 6);
    }
}
