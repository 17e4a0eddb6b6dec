//! Resource Record (RR) TYPEs

//------------ Rtype ---------------------------------------------------------

int_enum! {
    /// Resource Record Types.
    ///
    /// Each resource records has a 16 bit type value indicating what kind of
    /// information is represented by the record. Normal query includes the
    /// type of record information is requested for. A few aditional types,
    /// called query types, are defined as well and can only be used in
    /// questions.
    ///
    /// Only the types a stub client commonly runs into are given names
    /// here. All others are still perfectly usable via `from_int()` and are
    /// displayed in the generic `TYPEnnn` form of [RFC 3597].
    ///
    /// See the [IANA registry] for a complete list of assigned values.
    ///
    /// [RFC 3597]: https://tools.ietf.org/html/rfc3597
    /// [IANA registry]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
    =>
    Rtype, u16, "TYPE";

    /// A host address.
    (A => 1, "A")

    /// An authoritative name server.
    (NS => 2, "NS")

    /// The canonical name for an alias.
    (CNAME => 5, "CNAME")

    /// Marks the start of a zone of authority.
    (SOA => 6, "SOA")

    /// A mailbox domain name (experimental).
    (MB => 7, "MB")

    /// A mail group member (experimental).
    (MG => 8, "MG")

    /// A mail rename domain name (experimental).
    (MR => 9, "MR")

    /// A null resource record (experimental).
    (NULL => 10, "NULL")

    /// A well known service description.
    (WKS => 11, "WKS")

    /// A domain name pointer.
    (PTR => 12, "PTR")

    /// Host information.
    (HINFO => 13, "HINFO")

    /// Mailbox or mail list information.
    (MINFO => 14, "MINFO")

    /// Mail exchange.
    (MX => 15, "MX")

    /// Text strings.
    (TXT => 16, "TXT")

    /// For responsible person.
    (RP => 17, "RP")

    /// For AFS data base location.
    (AFSDB => 18, "AFSDB")

    /// IPv6 address.
    (AAAA => 28, "AAAA")

    /// Server selection.
    (SRV => 33, "SRV")

    /// Naming authority pointer.
    (NAPTR => 35, "NAPTR")

    /// CERT.
    (CERT => 37, "CERT")

    /// OPT pseudo-record.
    ///
    /// Defined in [RFC 6891].
    ///
    /// [RFC 6891]: https://tools.ietf.org/html/rfc6891
    (OPT => 41, "OPT")

    /// Delegation signer.
    (DS => 43, "DS")

    /// SSH key fingerprint.
    (SSHFP => 44, "SSHFP")

    /// RRSIG.
    (RRSIG => 46, "RRSIG")

    /// NSEC.
    (NSEC => 47, "NSEC")

    /// DNSKEY.
    (DNSKEY => 48, "DNSKEY")

    /// NSEC3.
    (NSEC3 => 50, "NSEC3")

    /// NSEC3PARAM.
    (NSEC3PARAM => 51, "NSEC3PARAM")

    /// TLSA.
    (TLSA => 52, "TLSA")

    /// SPF.
    (SPF => 99, "SPF")

    /// Transfer of an entire zone.
    (AXFR => 252, "AXFR")

    /// A request for all records the server/cache has available.
    (ANY => 255, "ANY")

    /// URI.
    (URI => 256, "URI")

    /// Certification Authority Restriction.
    (CAA => 257, "CAA")
}

int_enum_wire_u16!(Rtype);

impl Rtype {
    /// Returns whether this type may only appear in a question.
    #[must_use]
    pub fn is_qtype(self) -> bool {
        matches!(self, Rtype::AXFR | Rtype::ANY)
    }
}

//============ Tests =========================================================
