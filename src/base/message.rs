//! Accessing and creating DNS messages.
//!
//! A response is decoded in one go into a [`Message`]: the header, the
//! question section, and the three record sections, in that order and all
//! read through the same [`Parser`] so that compression pointers can refer
//! to names anywhere earlier in the message.
//!
//! Requests are represented by [`Request`]. A request always carries
//! exactly one question and one OPT record in its additional section.

use super::header::{Header, HeaderCounts};
use super::iana::{OptRcode, Rcode};
use super::question::Question;
use super::record::Record;
use super::wire::{ComposeError, Composer, ParseError, Parser};
use crate::rdata::{Opt, RecordData, Registry};
use bytes::Bytes;

/// The length of the message header in octets.
pub const HEADER_LEN: usize = 12;

//------------ Message -------------------------------------------------------

/// A decoded DNS message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    header: Header,
    counts: HeaderCounts,
    question: Vec<Question>,
    answer: Vec<Record>,
    authority: Vec<Record>,
    additional: Vec<Record>,

    /// The size of the message in octets.
    size: usize,
}

/// # Decoding
///
impl Message {
    /// Decodes a complete message.
    ///
    /// Exactly as many questions and records are read as the header
    /// announces. Running out of data before that is an error. Record data
    /// is decoded by `registry`.
    pub fn from_octets(
        octets: Bytes,
        registry: &Registry,
    ) -> Result<Self, ParseError> {
        let size = octets.len();
        let mut parser = Parser::new(octets);
        let header = Header::parse(&mut parser)?;
        let counts = HeaderCounts::parse(&mut parser)?;
        let question = (0..counts.qdcount)
            .map(|_| Question::parse(&mut parser))
            .collect::<Result<_, _>>()?;
        let mut section = |count: u16| {
            (0..count)
                .map(|_| registry.decode_record(&mut parser))
                .collect::<Result<Vec<_>, _>>()
        };
        let answer = section(counts.ancount)?;
        let authority = section(counts.nscount)?;
        let additional = section(counts.arcount)?;
        Ok(Message {
            header,
            counts,
            question,
            answer,
            authority,
            additional,
            size,
        })
    }
}

/// # Access
///
impl Message {
    pub fn header(&self) -> Header {
        self.header
    }

    pub fn counts(&self) -> HeaderCounts {
        self.counts
    }

    /// Returns the ID of the message.
    pub fn id(&self) -> u16 {
        self.header.id()
    }

    pub fn question(&self) -> &[Question] {
        &self.question
    }

    /// Returns the first question if there is one.
    pub fn first_question(&self) -> Option<&Question> {
        self.question.first()
    }

    pub fn answer(&self) -> &[Record] {
        &self.answer
    }

    pub fn authority(&self) -> &[Record] {
        &self.authority
    }

    pub fn additional(&self) -> &[Record] {
        &self.additional
    }

    /// Returns the size of the message on the wire.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns whether the truncation flag is set.
    pub fn is_truncated(&self) -> bool {
        self.header.tc()
    }

    /// Returns all records of the three record sections except OPT.
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.answer
            .iter()
            .chain(self.authority.iter())
            .chain(self.additional.iter())
            .filter(|record| !matches!(record.data(), RecordData::Opt(_)))
    }

    /// Returns the OPT record if the message has one.
    pub fn opt(&self) -> Option<&Opt> {
        self.additional.iter().find_map(|record| match record.data() {
            RecordData::Opt(opt) => Some(opt),
            _ => None,
        })
    }

    /// Returns the full response code.
    ///
    /// This combines the header’s code with the extended bits of the OPT
    /// record if there is one.
    pub fn opt_rcode(&self) -> OptRcode {
        match self.opt() {
            Some(opt) => opt.rcode(self.header.rcode()),
            None => self.header.rcode().into(),
        }
    }

    /// Returns whether the response signals an error.
    pub fn has_error(&self) -> bool {
        self.opt_rcode().is_error()
    }

    /// Returns the smallest TTL of all records except OPT.
    pub fn min_ttl(&self) -> Option<i32> {
        self.records().map(Record::ttl).min()
    }

    /// Returns a copy with the TTLs of all records reduced by `secs`.
    ///
    /// The TTL field of an OPT record carries flags and stays untouched.
    #[must_use]
    pub fn aged(&self, secs: u32) -> Self {
        let age = |records: &[Record]| -> Vec<Record> {
            records
                .iter()
                .map(|record| match record.data() {
                    RecordData::Opt(_) => record.clone(),
                    _ => record.aged(secs),
                })
                .collect()
        };
        Message {
            answer: age(&self.answer),
            authority: age(&self.authority),
            additional: age(&self.additional),
            question: self.question.clone(),
            ..*self
        }
    }
}

//------------ Request -------------------------------------------------------

/// A request message.
#[derive(Clone, Debug)]
pub struct Request {
    header: Header,
    question: Question,
    opt: Opt,
}

impl Request {
    /// Creates a standard query for the question.
    pub fn new(
        question: Question,
        recursion_desired: bool,
        udp_payload_size: u16,
    ) -> Self {
        let mut header = Header::new();
        header.set_rd(recursion_desired);
        Request {
            header,
            question,
            opt: Opt::new(udp_payload_size, false),
        }
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn opt(&self) -> &Opt {
        &self.opt
    }

    /// Sets the DO flag of the OPT record.
    pub fn set_dnssec_ok(&mut self, dnssec_ok: bool) {
        self.opt = Opt::new(self.opt.udp_payload_size(), dnssec_ok);
    }

    /// Appends the request in wire format.
    ///
    /// The header announces one question and one additional record. No
    /// name compression is used.
    pub fn compose(&self, target: &mut Composer) -> Result<(), ComposeError> {
        self.header.compose(target)?;
        HeaderCounts {
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 1,
        }
        .compose(target)?;
        self.question.compose(target)?;
        self.opt.compose_record(target)
    }

    /// Returns the request in wire format.
    pub fn to_bytes(&self) -> Result<Bytes, ComposeError> {
        let mut target = Composer::new();
        self.compose(&mut target)?;
        Ok(target.finish())
    }
}

/// Returns whether a response code is one where other servers won’t know
/// better.
///
/// Those are success and the statement that the name doesn’t exist.
pub fn is_final_rcode(rcode: OptRcode) -> bool {
    rcode == OptRcode::NOERROR || rcode == Rcode::NXDOMAIN.into()
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::{Class, Rtype};
    use std::net::Ipv4Addr;

    /// A response for `example.com. IN A` with a CNAME pointing into the
    /// question name, an A record for the target, and an OPT record.
    const RESPONSE: &[u8] = b"\x12\x34\x81\x80\x00\x01\x00\x02\x00\x00\x00\x01\
        \x07example\x03com\x00\x00\x01\x00\x01\
        \xc0\x0c\x00\x05\x00\x01\x00\x00\x00\x1e\x00\x06\x03www\xc0\x0c\
        \xc0\x29\x00\x01\x00\x01\x00\x00\x00\x0a\x00\x04\xc0\x00\x02\x01\
        \x00\x00\x29\x10\x00\x00\x00\x00\x00\x00\x00";

    #[test]
    fn compose_request() {
        let question =
            Question::new_in("example.com".parse().unwrap(), Rtype::A);
        let mut request = Request::new(question, true, 4096);
        request.header_mut().set_id(0xbeef);
        let bytes = request.to_bytes().unwrap();
        assert_eq!(&bytes[..12], b"\xbe\xef\x01\x00\x00\x01\x00\x00\x00\x00\x00\x01");
        assert_eq!(
            &bytes[12..29],
            b"\x07example\x03com\x00\x00\x01\x00\x01"
        );
        assert_eq!(
            &bytes[29..],
            b"\x00\x00\x29\x10\x00\x00\x00\x00\x00\x00\x00"
        );
    }

    #[test]
    fn decode_response() {
        let msg = Message::from_octets(
            Bytes::from_static(RESPONSE),
            &Registry::standard(),
        )
        .unwrap();
        assert_eq!(msg.id(), 0x1234);
        assert!(!msg.is_truncated());
        assert_eq!(msg.size(), RESPONSE.len());
        assert_eq!(msg.question().len(), 1);
        assert_eq!(
            msg.first_question().unwrap().qname().to_string(),
            "example.com."
        );
        assert_eq!(msg.first_question().unwrap().qclass(), Class::IN);

        let answer = msg.answer();
        assert_eq!(answer.len(), 2);
        assert_eq!(answer[0].owner().to_string(), "example.com.");
        assert_eq!(answer[0].data().to_string(), "www.example.com.");
        assert_eq!(answer[1].owner().to_string(), "www.example.com.");
        assert_eq!(
            answer[1].data(),
            &RecordData::A(crate::rdata::A::new(Ipv4Addr::new(192, 0, 2, 1)))
        );

        assert_eq!(msg.opt().unwrap().udp_payload_size(), 4096);
        assert_eq!(msg.opt_rcode(), OptRcode::NOERROR);
        assert_eq!(msg.records().count(), 2);
        assert_eq!(msg.min_ttl(), Some(10));
    }

    #[test]
    fn aged_response() {
        let msg = Message::from_octets(
            Bytes::from_static(RESPONSE),
            &Registry::standard(),
        )
        .unwrap();
        let aged = msg.aged(12);
        assert_eq!(aged.answer()[0].ttl(), 18);
        assert_eq!(aged.answer()[1].ttl(), 0);
        assert_eq!(aged.additional()[0].ttl(), 0);
        assert_eq!(msg.answer()[0].ttl(), 30);
    }

    #[test]
    fn missing_records() {
        // Announces two answers but ends after the first one.
        let res = Message::from_octets(
            Bytes::from_static(&RESPONSE[..56]),
            &Registry::standard(),
        );
        assert_eq!(res, Err(ParseError::ShortInput));

        let res = Message::from_octets(
            Bytes::from_static(&RESPONSE[..8]),
            &Registry::standard(),
        );
        assert_eq!(res, Err(ParseError::ShortInput));
    }

    #[test]
    fn final_rcodes() {
        assert!(is_final_rcode(OptRcode::NOERROR));
        assert!(is_final_rcode(OptRcode::NXDOMAIN));
        assert!(!is_final_rcode(OptRcode::SERVFAIL));
        assert!(!is_final_rcode(OptRcode::BADVERS));
    }
}
