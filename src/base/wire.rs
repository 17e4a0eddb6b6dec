//! Creating and consuming data in wire format.
//!
//! The [`Parser`] is a read cursor over a complete DNS message. It always
//! keeps the entire message around, so that compression pointers, which are
//! absolute offsets from the start of the message, can be followed from
//! anywhere. The [`Composer`] is the matching write cursor over a buffer of
//! fixed capacity.

use super::iana::Rtype;
use super::name::Name;
use bytes::{BufMut, Bytes, BytesMut};
use core::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// The size of the buffer used for composing requests.
///
/// A request carries a header, one question with a name of at most 255
/// octets, and the OPT record, so this leaves plenty of room.
pub const MAX_REQUEST_SIZE: usize = 1024;

//------------ Parser --------------------------------------------------------

/// A read cursor over the octets of a DNS message.
///
/// Every read checks that enough octets are left and fails with
/// [`ParseError::ShortInput`] otherwise. The parser never reads past the end
/// of the buffer.
#[derive(Clone, Debug)]
pub struct Parser {
    /// The complete message.
    octets: Bytes,

    /// The current read position.
    pos: usize,
}

impl Parser {
    /// Creates a parser positioned at the start of `octets`.
    pub fn new(octets: Bytes) -> Self {
        Parser { octets, pos: 0 }
    }

    /// Creates a parser positioned at `pos`.
    pub fn at(octets: Bytes, pos: usize) -> Result<Self, ParseError> {
        if pos > octets.len() {
            return Err(ParseError::ShortInput);
        }
        Ok(Parser { octets, pos })
    }

    /// Returns the complete underlying message.
    pub fn octets(&self) -> &Bytes {
        &self.octets
    }

    /// Returns the current position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the number of octets left to read.
    pub fn remaining(&self) -> usize {
        self.octets.len() - self.pos
    }

    /// Moves the parser to an absolute position.
    pub fn seek(&mut self, pos: usize) -> Result<(), ParseError> {
        if pos > self.octets.len() {
            return Err(ParseError::ShortInput);
        }
        self.pos = pos;
        Ok(())
    }

    /// Skips over `len` octets.
    pub fn advance(&mut self, len: usize) -> Result<(), ParseError> {
        self.check_len(len)?;
        self.pos += len;
        Ok(())
    }

    /// Moves the parser back by `len` octets.
    pub(crate) fn retreat(&mut self, len: usize) -> Result<(), ParseError> {
        self.pos = self.pos.checked_sub(len).ok_or(ParseError::ShortInput)?;
        Ok(())
    }

    /// Checks that at least `len` octets are left.
    pub fn check_len(&self, len: usize) -> Result<(), ParseError> {
        match self.pos.checked_add(len) {
            Some(end) if end <= self.octets.len() => Ok(()),
            _ => Err(ParseError::ShortInput),
        }
    }

    /// Takes the next `N` octets into an array.
    fn parse_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        self.check_len(N)?;
        let mut res = [0u8; N];
        res.copy_from_slice(&self.octets[self.pos..self.pos + N]);
        self.pos += N;
        Ok(res)
    }

    pub fn parse_u8(&mut self) -> Result<u8, ParseError> {
        self.parse_array::<1>().map(|[b]| b)
    }

    /// Takes a 16 bit integer in host byte order.
    pub fn parse_u16(&mut self) -> Result<u16, ParseError> {
        self.parse_array().map(u16::from_ne_bytes)
    }

    /// Takes a 16 bit integer in network byte order.
    pub fn parse_u16_be(&mut self) -> Result<u16, ParseError> {
        self.parse_array().map(u16::from_be_bytes)
    }

    /// Takes a 32 bit integer in host byte order.
    pub fn parse_u32(&mut self) -> Result<u32, ParseError> {
        self.parse_array().map(u32::from_ne_bytes)
    }

    /// Takes a 32 bit integer in network byte order.
    pub fn parse_u32_be(&mut self) -> Result<u32, ParseError> {
        self.parse_array().map(u32::from_be_bytes)
    }

    /// Takes a signed 32 bit integer in network byte order.
    pub fn parse_i32_be(&mut self) -> Result<i32, ParseError> {
        self.parse_array().map(i32::from_be_bytes)
    }

    /// Takes `len` octets.
    ///
    /// The returned value shares the underlying buffer.
    pub fn parse_bytes(&mut self, len: usize) -> Result<Bytes, ParseError> {
        self.check_len(len)?;
        let res = self.octets.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(res)
    }

    /// Takes a character string prefixed by its one octet length.
    ///
    /// Octets that aren’t valid UTF-8 are replaced.
    pub fn parse_string(&mut self) -> Result<String, ParseError> {
        let len = self.parse_u8()?;
        self.parse_string_len(usize::from(len))
    }

    /// Takes a string of `len` octets.
    pub fn parse_string_len(
        &mut self,
        len: usize,
    ) -> Result<String, ParseError> {
        let bytes = self.parse_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn parse_ipv4(&mut self) -> Result<Ipv4Addr, ParseError> {
        self.parse_array::<4>().map(Ipv4Addr::from)
    }

    pub fn parse_ipv6(&mut self) -> Result<Ipv6Addr, ParseError> {
        self.parse_array::<16>().map(Ipv6Addr::from)
    }

    /// Takes a domain name, following compression pointers.
    pub fn parse_name(&mut self) -> Result<Name, ParseError> {
        Name::parse(self)
    }
}

//------------ Composer ------------------------------------------------------

/// A write cursor over a buffer with a fixed capacity.
///
/// Any write that would take the buffer beyond its capacity fails with
/// [`ComposeError::ShortBuf`] and leaves the buffer unchanged.
#[derive(Clone, Debug)]
pub struct Composer {
    /// The composed data so far.
    buf: BytesMut,

    /// The maximum number of octets the buffer may hold.
    capacity: usize,
}

impl Composer {
    /// Creates a composer with room for a complete request.
    pub fn new() -> Self {
        Self::with_capacity(MAX_REQUEST_SIZE)
    }

    /// Creates a composer that holds at most `capacity` octets.
    pub fn with_capacity(capacity: usize) -> Self {
        Composer {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the number of octets composed so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_ref()
    }

    /// Returns a mutable view of what has been composed so far.
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    fn reserve(&self, len: usize) -> Result<(), ComposeError> {
        match self.buf.len().checked_add(len) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(ComposeError::ShortBuf),
        }
    }

    pub fn append_slice(&mut self, slice: &[u8]) -> Result<(), ComposeError> {
        self.reserve(slice.len())?;
        self.buf.put_slice(slice);
        Ok(())
    }

    pub fn append_u8(&mut self, value: u8) -> Result<(), ComposeError> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    pub fn append_u16_be(&mut self, value: u16) -> Result<(), ComposeError> {
        self.reserve(2)?;
        self.buf.put_u16(value);
        Ok(())
    }

    pub fn append_u32_be(&mut self, value: u32) -> Result<(), ComposeError> {
        self.reserve(4)?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Appends a host name in presentation format.
    ///
    /// The name is split on ASCII dots into length-prefixed labels and
    /// terminated by the empty root label. An empty name or a single dot
    /// becomes the root name, a single zero octet.
    pub fn append_host_name(&mut self, name: &str) -> Result<(), ComposeError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes == b"." {
            return self.append_u8(0);
        }
        let bytes = bytes.strip_suffix(b".").unwrap_or(bytes);
        let labels: Vec<&[u8]> = bytes.split(|&ch| ch == b'.').collect();
        self.append_labels(&labels)
    }

    /// Appends a sequence of labels followed by the root label.
    ///
    /// Nothing is appended if any of the labels is invalid.
    pub fn append_labels<L: AsRef<[u8]>>(
        &mut self,
        labels: &[L],
    ) -> Result<(), ComposeError> {
        let mut total = 1;
        for label in labels {
            let label = label.as_ref();
            if label.is_empty() {
                return Err(ComposeError::EmptyLabel);
            }
            if label.len() > 63 {
                return Err(ComposeError::LongLabel);
            }
            total += label.len() + 1;
        }
        if total > 255 {
            return Err(ComposeError::LongName);
        }
        self.reserve(total)?;
        for label in labels {
            let label = label.as_ref();
            self.buf.put_u8(label.len() as u8);
            self.buf.put_slice(label);
        }
        self.buf.put_u8(0);
        Ok(())
    }

    /// Converts the composer into the composed octets.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for Composer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

//============ Error Types ===================================================

//------------ ComposeError --------------------------------------------------

/// An error happened while composing data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComposeError {
    /// The buffer is full.
    ShortBuf,

    /// A label is longer than 63 octets.
    LongLabel,

    /// An empty label appeared in the middle of a name.
    EmptyLabel,

    /// A name is longer than 255 octets.
    LongName,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ComposeError::ShortBuf => f.write_str("buffer size exceeded"),
            ComposeError::LongLabel => f.write_str("label too long"),
            ComposeError::EmptyLabel => f.write_str("empty label"),
            ComposeError::LongName => f.write_str("domain name too long"),
        }
    }
}

impl std::error::Error for ComposeError {}

//------------ ParseError ----------------------------------------------------

/// An error happened while parsing data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// An attempt was made to go beyond the end of the parser.
    ShortInput,

    /// A domain name has a bad label sequence or too many pointers.
    MalformedName(&'static str),

    /// A record data decoder did not consume exactly RDLENGTH octets.
    ///
    /// This indicates a broken decoder in the registry rather than bad
    /// input.
    Desync {
        /// The record type whose decoder misbehaved.
        rtype: Rtype,

        /// The RDLENGTH of the record.
        expected: u16,

        /// The number of octets the decoder actually consumed.
        consumed: usize,
    },

    /// A formatting error occurred.
    Form(FormError),
}

impl ParseError {
    /// Creates a new parse error as a form error with the given message.
    pub fn form_error(msg: &'static str) -> Self {
        FormError::new(msg).into()
    }
}

//--- From

impl From<FormError> for ParseError {
    fn from(err: FormError) -> Self {
        ParseError::Form(err)
    }
}

//--- Display and Error

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::ShortInput => f.write_str("unexpected end of input"),
            ParseError::MalformedName(msg) => {
                write!(f, "malformed domain name: {}", msg)
            }
            ParseError::Desync {
                rtype,
                expected,
                consumed,
            } => write!(
                f,
                "decoder for {} consumed {} octets instead of {}",
                rtype, consumed, expected
            ),
            ParseError::Form(ref err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ParseError {}

//------------ FormError -----------------------------------------------------

/// A formatting error occured.
///
/// This is a generic error for all kinds of error cases that result in data
/// not being accepted. For diagnostics, the error is being given a static
/// string describing the error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormError(&'static str);

impl FormError {
    /// Creates a new form error value with the given diagnostics string.
    pub fn new(msg: &'static str) -> Self {
        FormError(msg)
    }
}

//--- Display and Error

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for FormError {}

//============ Testing =======================================================
