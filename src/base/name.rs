//! Domain names.
//!
//! A domain name is a sequence of labels, each at most 63 octets long,
//! terminated by the empty root label. In a message, the tail of a name can
//! be replaced by a compression pointer to an earlier occurence of that
//! tail. [`Name::parse`] follows these pointers and always produces the
//! fully expanded name.
//!
//! A name has two textual representations. The presentation form, provided
//! by the `Display` impl, escapes everything that isn’t printable ASCII.
//! The raw form, provided by [`Name::raw`], keeps the label content as is
//! and is meant for consumers that need the original octets, such as IDN
//! conversion.

use super::wire::{ComposeError, Composer, ParseError, Parser};
use bytes::Bytes;
use core::{fmt, hash, str::FromStr};
use std::collections::HashSet;
use std::net::IpAddr;

/// The maximum number of compression pointers followed for a single name.
///
/// A legitimate name has at most 127 labels and therefore can’t need more
/// pointers than that.
pub const MAX_POINTER_HOPS: usize = 127;

/// The prefix of an ASCII compatible encoded IDN label.
const ACE_PREFIX: &[u8] = b"xn--";

//------------ Name ----------------------------------------------------------

/// An absolute domain name.
///
/// The name is kept as its sequence of non-empty labels. The root label is
/// implied. Comparison and hashing ignore ASCII case.
#[derive(Clone, Default)]
pub struct Name {
    labels: Vec<Bytes>,
}

impl Name {
    /// Returns the root name.
    pub fn root() -> Self {
        Name::default()
    }

    /// Creates a name from a sequence of labels.
    ///
    /// Fails if a label is empty or longer than 63 octets or if the
    /// resulting name would be longer than 255 octets in wire format.
    pub fn from_labels<I, L>(labels: I) -> Result<Self, ComposeError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Bytes>,
    {
        let labels: Vec<Bytes> = labels.into_iter().map(Into::into).collect();
        let mut len = 1;
        for label in &labels {
            if label.is_empty() {
                return Err(ComposeError::EmptyLabel);
            }
            if label.len() > 63 {
                return Err(ComposeError::LongLabel);
            }
            len += label.len() + 1;
        }
        if len > 255 {
            return Err(ComposeError::LongName);
        }
        Ok(Name { labels })
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns an iterator over the content of the labels.
    pub fn labels(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.labels.iter().map(|label| label.as_ref())
    }

    /// Returns the number of labels, not counting the root label.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Returns the length of the name in uncompressed wire format.
    pub fn compose_len(&self) -> usize {
        self.labels.iter().map(|label| label.len() + 1).sum::<usize>() + 1
    }

    /// Returns whether any label is an ASCII compatible encoded IDN label.
    pub fn has_ace_label(&self) -> bool {
        self.labels.iter().any(|label| {
            label.len() >= ACE_PREFIX.len()
                && label[..ACE_PREFIX.len()].eq_ignore_ascii_case(ACE_PREFIX)
        })
    }

    /// Returns the unescaped form of the name.
    ///
    /// Labels are converted lossily from UTF-8 and joined with dots. The
    /// result always ends in a dot.
    pub fn raw(&self) -> String {
        if self.labels.is_empty() {
            return ".".into();
        }
        let mut res = String::with_capacity(self.compose_len());
        for label in &self.labels {
            res.push_str(&String::from_utf8_lossy(label));
            res.push('.');
        }
        res
    }

    /// Returns the lower case presentation form used for keying.
    pub fn to_canonical(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }

    /// Returns the name used for reverse lookups of `addr`.
    ///
    /// This is the name under `in-addr.arpa.` for IPv4 and under
    /// `ip6.arpa.` for IPv6 addresses.
    pub fn reverse_address(addr: IpAddr) -> Self {
        let mut labels: Vec<Bytes> = Vec::new();
        match addr {
            IpAddr::V4(addr) => {
                for octet in addr.octets().iter().rev() {
                    labels.push(octet.to_string().into());
                }
                labels.push(Bytes::from_static(b"in-addr"));
            }
            IpAddr::V6(addr) => {
                for octet in addr.octets().iter().rev() {
                    labels.push(format!("{:x}", octet & 0x0F).into());
                    labels.push(format!("{:x}", octet >> 4).into());
                }
                labels.push(Bytes::from_static(b"ip6"));
            }
        }
        labels.push(Bytes::from_static(b"arpa"));
        Name { labels }
    }

    /// Appends the name in uncompressed wire format.
    pub fn compose(&self, target: &mut Composer) -> Result<(), ComposeError> {
        target.append_labels(&self.labels)
    }
}

/// # Parsing
///
impl Name {
    /// Takes a name from the parser, following compression pointers.
    ///
    /// The parser ends up right behind the name as it appears at its
    /// original position, i.e., behind the first compression pointer if
    /// there is one.
    ///
    /// A pointer whose target lies at or beyond the end of the message is
    /// not treated as a pointer. Instead, its first octet is reinterpreted
    /// as the length of an oversized label. Some servers produce such
    /// labels and this keeps their responses usable.
    ///
    /// Pointer loops are detected. A name that revisits a pointer target or
    /// needs more than [`MAX_POINTER_HOPS`] pointers is rejected as
    /// malformed.
    pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let mut labels = Vec::new();
        let mut cur = parser.clone();
        let mut resume = None;
        let mut visited = HashSet::new();
        loop {
            let ltype = cur.parse_u8()?;
            match ltype {
                0 => break,
                1..=0x3F => {
                    labels.push(cur.parse_bytes(usize::from(ltype))?);
                }
                0xC0..=0xFF => {
                    let target = usize::from(ltype & 0x3F) << 8
                        | usize::from(cur.parse_u8()?);
                    if target >= cur.octets().len() {
                        cur.retreat(1)?;
                        labels.push(cur.parse_bytes(usize::from(ltype))?);
                        continue;
                    }
                    if visited.len() >= MAX_POINTER_HOPS {
                        return Err(ParseError::MalformedName(
                            "too many compression pointers",
                        ));
                    }
                    if !visited.insert(target) {
                        return Err(ParseError::MalformedName(
                            "compression pointer loop",
                        ));
                    }
                    if resume.is_none() {
                        resume = Some(cur.pos());
                    }
                    cur.seek(target)?;
                }
                _ => {
                    return Err(ParseError::MalformedName(
                        "invalid label type",
                    ))
                }
            }
        }
        parser.seek(resume.unwrap_or_else(|| cur.pos()))?;
        Ok(Name { labels })
    }
}

//--- FromStr

impl FromStr for Name {
    type Err = FromStrError;

    /// Reads a name in presentation format.
    ///
    /// The name is considered absolute whether or not it ends in a dot.
    /// Escape sequences of the form `\DDD` and `\X` are understood.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "." {
            return Ok(Name::root());
        }
        let mut labels = Vec::new();
        let mut label = Vec::new();
        let mut chars = s.as_bytes().iter().copied();
        while let Some(ch) = chars.next() {
            match ch {
                b'.' => {
                    if label.is_empty() {
                        return Err(FromStrError::EmptyLabel);
                    }
                    labels.push(Bytes::from(core::mem::take(&mut label)));
                }
                b'\\' => {
                    let first = chars.next().ok_or(FromStrError::BadEscape)?;
                    if first.is_ascii_digit() {
                        let mut value = u32::from(first - b'0');
                        for _ in 0..2 {
                            let ch = chars
                                .next()
                                .filter(u8::is_ascii_digit)
                                .ok_or(FromStrError::BadEscape)?;
                            value = value * 10 + u32::from(ch - b'0');
                        }
                        label.push(
                            u8::try_from(value)
                                .map_err(|_| FromStrError::BadEscape)?,
                        );
                    } else {
                        label.push(first);
                    }
                }
                _ => label.push(ch),
            }
            if label.len() > 63 {
                return Err(FromStrError::LongLabel);
            }
        }
        if !label.is_empty() {
            labels.push(label.into());
        }
        Name::from_labels(labels).map_err(|err| match err {
            ComposeError::LongLabel => FromStrError::LongLabel,
            ComposeError::EmptyLabel => FromStrError::EmptyLabel,
            _ => FromStrError::LongName,
        })
    }
}

//--- PartialEq, Eq, and Hash

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(left, right)| left.eq_ignore_ascii_case(right))
    }
}

impl Eq for Name {}

impl hash::Hash for Name {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for label in &self.labels {
            state.write_u8(label.len() as u8);
            for ch in label.iter() {
                state.write_u8(ch.to_ascii_lowercase())
            }
        }
        state.write_u8(0)
    }
}

//--- Display and Debug

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for label in &self.labels {
            escape_into(label, f)?;
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

//------------ Escaping ------------------------------------------------------

/// Writes octets in escaped presentation format.
///
/// Octets outside of printable ASCII become `\DDD` with the decimal value
/// zero padded to three digits. A semicolon, backslash, or double quote
/// gets a leading backslash.
pub fn escape_into<W: fmt::Write>(octets: &[u8], target: &mut W) -> fmt::Result {
    for &ch in octets {
        match ch {
            b';' | b'\\' | b'"' => {
                target.write_char('\\')?;
                target.write_char(ch as char)?;
            }
            32..=126 => target.write_char(ch as char)?,
            _ => write!(target, "\\{:03}", ch)?,
        }
    }
    Ok(())
}

/// Returns octets in escaped presentation format.
pub fn escape(octets: &[u8]) -> String {
    let mut res = String::with_capacity(octets.len());
    // Writing to a string never fails.
    let _ = escape_into(octets, &mut res);
    res
}

//------------ FromStrError --------------------------------------------------

/// A name could not be read from its presentation format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FromStrError {
    EmptyLabel,
    LongLabel,
    LongName,
    BadEscape,
}

impl fmt::Display for FromStrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            FromStrError::EmptyLabel => "empty label",
            FromStrError::LongLabel => "label too long",
            FromStrError::LongName => "domain name too long",
            FromStrError::BadEscape => "invalid escape sequence",
        })
    }
}

impl std::error::Error for FromStrError {}

//============ Testing =======================================================
