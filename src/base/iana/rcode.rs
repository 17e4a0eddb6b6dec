//! DNS response codes and extended response codes.
//!
//! The original DNS specification in [RFC 1035] specified four bits of the
//! message header as response code. The type [`Rcode`] defined herein
//! represents these codes. Later, [RFC 6891] added eight bits to the
//! response code to be transmitted as part of the OPT pseudo-resource
//! record. The type [`OptRcode`] represents the combined twelve bit code.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035
//! [RFC 6891]: https://tools.ietf.org/html/rfc6891

//------------ Rcode ---------------------------------------------------------

int_enum! {
    /// DNS Response Codes.
    ///
    /// The response code of a response indicates what happend on the server
    /// when trying to answer the query. The code is a 4 bit value and part
    /// of the header of a DNS message.
    =>
    Rcode, u8, "RCODE";

    /// No error condition.
    (NOERROR => 0, "NOERROR")

    /// Format error.
    ///
    /// The name server was unable to interpret the query.
    (FORMERR => 1, "FORMERR")

    /// Server failure.
    (SERVFAIL => 2, "SERVFAIL")

    /// Name error.
    ///
    /// The domain name given in the query does not exist at the name
    /// server.
    (NXDOMAIN => 3, "NXDOMAIN")

    /// Not implemented.
    (NOTIMP => 4, "NOTIMP")

    /// Query refused.
    (REFUSED => 5, "REFUSED")

    /// Name exists when it should not.
    (YXDOMAIN => 6, "YXDOMAIN")

    /// RR set exists when it should not.
    (YXRRSET => 7, "YXRRSET")

    /// RR set that should exist does not.
    (NXRRSET => 8, "NXRRSET")

    /// Server not authoritative for zone or client not authorized.
    (NOTAUTH => 9, "NOTAUTH")

    /// Name not contained in zone.
    (NOTZONE => 10, "NOTZONE")
}

impl Rcode {
    /// Creates a response code from the lower four bits of an integer.
    #[must_use]
    pub const fn masked(value: u8) -> Self {
        Rcode::from_int(value & 0x0F)
    }

    /// Returns whether this code signals an error.
    #[must_use]
    pub fn is_error(self) -> bool {
        self != Rcode::NOERROR
    }
}

//------------ OptRcode ------------------------------------------------------

int_enum! {
    /// Extended DNS Response Codes for OPT records.
    ///
    /// The lower four bits come from the message header, the upper eight
    /// bits from the TTL field of the OPT record.
    =>
    OptRcode, u16, "RCODE";

    /// No error condition.
    (NOERROR => 0, "NOERROR")

    /// Format error.
    (FORMERR => 1, "FORMERR")

    /// Server failure.
    (SERVFAIL => 2, "SERVFAIL")

    /// Name error.
    (NXDOMAIN => 3, "NXDOMAIN")

    /// Not implemented.
    (NOTIMP => 4, "NOTIMP")

    /// Query refused.
    (REFUSED => 5, "REFUSED")

    /// Bad OPT version.
    (BADVERS => 16, "BADVERS")

    /// Bad or missing server cookie.
    (BADCOOKIE => 23, "BADCOOKIE")
}

impl OptRcode {
    /// Combines the header code with the upper bits from an OPT record.
    #[must_use]
    pub fn from_parts(rcode: Rcode, ext: u8) -> Self {
        OptRcode::from_int(u16::from(ext) << 4 | u16::from(rcode.to_int()))
    }

    /// Returns the part of the code that goes into the message header.
    #[must_use]
    pub fn rcode(self) -> Rcode {
        Rcode::masked(self.to_int() as u8)
    }

    /// Returns the part of the code that goes into the OPT record.
    #[must_use]
    pub fn ext(self) -> u8 {
        (self.to_int() >> 4) as u8
    }

    /// Returns whether this code signals an error.
    #[must_use]
    pub fn is_error(self) -> bool {
        self != OptRcode::NOERROR
    }
}

impl From<Rcode> for OptRcode {
    fn from(rcode: Rcode) -> Self {
        OptRcode::from_int(rcode.to_int().into())
    }
}

//============ Tests =========================================================
