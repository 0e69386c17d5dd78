/// Bounds-checked views over captured ESP-NOW action frames.
///
/// A captured frame is an 802.11 management header extended with the
/// vendor-specific action fields, followed by one vendor-specific element:
///
/// ```text
///  0      2      4         10        16        22    24   25     28      32
///  | fc   | dur  | addr1   | addr2   | addr3   | seq | cat| oui  | nonce |
///  32   33   34     37    38    39
///  | id | len | oui  | type| ver | payload...
/// ```
///
/// Multi-byte fields are little-endian. Views borrow the radio's buffer and
/// must not outlive the capture callback.

/// A 6-byte link-layer address.
pub type MacAddress = [u8; 6];

// ── Link header layout ───────────────────────────────────────────────

pub const FRAME_CONTROL_OFFSET: usize = 0;
pub const DURATION_OFFSET: usize = 2;
pub const ADDRESS1_OFFSET: usize = 4;
pub const ADDRESS2_OFFSET: usize = 10;
pub const ADDRESS3_OFFSET: usize = 16;
pub const SEQUENCE_CONTROL_OFFSET: usize = 22;
pub const CATEGORY_CODE_OFFSET: usize = 24;
pub const HEADER_OUI_OFFSET: usize = 25;
pub const NONCE_OFFSET: usize = 28;

/// Size of the link header including the vendor action fields.
pub const LINK_HEADER_LEN: usize = 32;

// ── Vendor element layout (relative to the end of the link header) ───

pub const ELEMENT_ID_OFFSET: usize = 0;
pub const ELEMENT_LENGTH_OFFSET: usize = 1;
pub const ELEMENT_OUI_OFFSET: usize = 2;
pub const PROTOCOL_TYPE_OFFSET: usize = 5;
pub const PROTOCOL_VERSION_OFFSET: usize = 6;

/// Fixed prefix of the vendor element before its payload.
pub const VENDOR_ELEMENT_LEN: usize = 7;

/// Shortest buffer the classifier will look inside.
pub const MIN_FRAME_LEN: usize = LINK_HEADER_LEN + VENDOR_ELEMENT_LEN;

/// Packet class reported by the capture path alongside each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Management,
    Control,
    Data,
    Other,
}

impl PacketKind {
    /// Map the driver's `wifi_promiscuous_pkt_type_t` value.
    pub fn from_promiscuous_type(raw: u32) -> Self {
        match raw {
            0 => PacketKind::Management,
            1 => PacketKind::Control,
            2 => PacketKind::Data,
            _ => PacketKind::Other,
        }
    }
}

/// Metadata the radio attaches to a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureMetadata {
    pub kind: PacketKind,
    /// Received signal strength in dBm
    pub rssi: i8,
}

/// Link header view. Only constructible from a buffer of at least
/// [`LINK_HEADER_LEN`] bytes.
#[derive(Debug, Clone, Copy)]
pub struct LinkHeader<'a> {
    bytes: &'a [u8; LINK_HEADER_LEN],
}

impl<'a> LinkHeader<'a> {
    /// Borrow the header at the start of `frame`, or `None` if it is too short.
    pub fn parse(frame: &'a [u8]) -> Option<Self> {
        let bytes = frame.get(..LINK_HEADER_LEN)?.try_into().ok()?;
        Some(Self { bytes })
    }

    pub fn frame_control(&self) -> u16 {
        self.u16_at(FRAME_CONTROL_OFFSET)
    }

    /// Low byte of the frame control field (type and subtype bits).
    pub fn subtype_byte(&self) -> u8 {
        self.bytes[FRAME_CONTROL_OFFSET]
    }

    pub fn duration(&self) -> u16 {
        self.u16_at(DURATION_OFFSET)
    }

    /// Receiver address.
    pub fn address1(&self) -> MacAddress {
        self.mac_at(ADDRESS1_OFFSET)
    }

    /// Transmitter address.
    pub fn address2(&self) -> MacAddress {
        self.mac_at(ADDRESS2_OFFSET)
    }

    /// Filtering address (BSSID).
    pub fn address3(&self) -> MacAddress {
        self.mac_at(ADDRESS3_OFFSET)
    }

    pub fn sequence_control(&self) -> u16 {
        self.u16_at(SEQUENCE_CONTROL_OFFSET)
    }

    pub fn category_code(&self) -> u8 {
        self.bytes[CATEGORY_CODE_OFFSET]
    }

    pub fn organization_id(&self) -> [u8; 3] {
        let o = HEADER_OUI_OFFSET;
        [self.bytes[o], self.bytes[o + 1], self.bytes[o + 2]]
    }

    /// Random value the sender places after the OUI.
    pub fn nonce(&self) -> u32 {
        let o = NONCE_OFFSET;
        u32::from_le_bytes([
            self.bytes[o],
            self.bytes[o + 1],
            self.bytes[o + 2],
            self.bytes[o + 3],
        ])
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    fn mac_at(&self, offset: usize) -> MacAddress {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.bytes[offset..offset + 6]);
        mac
    }
}

/// Vendor-specific element view over the bytes following the link header.
#[derive(Debug, Clone, Copy)]
pub struct VendorElement<'a> {
    prefix: &'a [u8; VENDOR_ELEMENT_LEN],
    payload: &'a [u8],
}

impl<'a> VendorElement<'a> {
    /// Borrow the element at the start of `body`, or `None` if the fixed
    /// prefix does not fit.
    pub fn parse(body: &'a [u8]) -> Option<Self> {
        if body.len() < VENDOR_ELEMENT_LEN {
            return None;
        }
        let (prefix, payload) = body.split_at(VENDOR_ELEMENT_LEN);
        Some(Self {
            prefix: prefix.try_into().ok()?,
            payload,
        })
    }

    pub fn element_id(&self) -> u8 {
        self.prefix[ELEMENT_ID_OFFSET]
    }

    /// Declared element length (OUI, type, version and body).
    pub fn length(&self) -> u8 {
        self.prefix[ELEMENT_LENGTH_OFFSET]
    }

    pub fn organization_id(&self) -> [u8; 3] {
        let o = ELEMENT_OUI_OFFSET;
        [self.prefix[o], self.prefix[o + 1], self.prefix[o + 2]]
    }

    pub fn protocol_type(&self) -> u8 {
        self.prefix[PROTOCOL_TYPE_OFFSET]
    }

    pub fn protocol_version(&self) -> u8 {
        self.prefix[PROTOCOL_VERSION_OFFSET]
    }

    /// Everything after the fixed prefix, up to the end of the capture.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Split a captured frame into its link header and vendor element.
///
/// Returns `None` for anything shorter than [`MIN_FRAME_LEN`]. Safe to call
/// from ISR context (no allocation, no blocking).
pub fn parse_action_frame(frame: &[u8]) -> Option<(LinkHeader<'_>, VendorElement<'_>)> {
    if frame.len() < MIN_FRAME_LEN {
        return None;
    }
    let header = LinkHeader::parse(frame)?;
    let element = VendorElement::parse(&frame[LINK_HEADER_LEN..])?;
    Some((header, element))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// ESP-NOW broadcast captured from a peer pinger.
    pub(crate) const SAMPLE_FRAME: [u8; 48] = [
        0xd0, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7c, 0xdf, 0xa1, 0x01,
        0xf3, 0x14, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xa0, 0x37, 0x7f, 0x18, 0xfe, 0x34,
        0xac, 0x2b, 0x9d, 0xd8, 0xdd, 0x0b, 0x18, 0xfe, 0x34, 0x04, 0x01, 0x01, 0x23, 0x45,
        0x67, 0x89, 0xab, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn header_fields_from_sample() {
        let header = LinkHeader::parse(&SAMPLE_FRAME).unwrap();
        assert_eq!(header.frame_control(), 0x00d0);
        assert_eq!(header.subtype_byte(), 0xd0);
        assert_eq!(header.duration(), 0);
        assert_eq!(header.address1(), [0xff; 6]);
        assert_eq!(header.address2(), [0x7c, 0xdf, 0xa1, 0x01, 0xf3, 0x14]);
        assert_eq!(header.address3(), [0xff; 6]);
        assert_eq!(header.sequence_control(), 0x37a0);
        assert_eq!(header.category_code(), crate::defaults::VENDOR_SPECIFIC_CATEGORY);
        assert_eq!(header.organization_id(), [0x18, 0xfe, 0x34]);
        assert_eq!(header.nonce(), 0xd89d_2bac);
    }

    #[test]
    fn vendor_element_from_sample() {
        let (_, element) = parse_action_frame(&SAMPLE_FRAME).unwrap();
        assert_eq!(element.element_id(), crate::defaults::VENDOR_ELEMENT_ID);
        assert_eq!(element.length(), 0x0b);
        assert_eq!(element.organization_id(), [0x18, 0xfe, 0x34]);
        assert_eq!(element.protocol_type(), 0x04);
        assert_eq!(element.protocol_version(), 0x01);
        assert_eq!(&element.payload()[..6], &[0x01, 0x23, 0x45, 0x67, 0x89, 0xab]);
        assert_eq!(element.payload().len(), SAMPLE_FRAME.len() - MIN_FRAME_LEN);
    }

    #[test]
    fn header_rejects_short_buffer() {
        assert!(LinkHeader::parse(&SAMPLE_FRAME[..LINK_HEADER_LEN - 1]).is_none());
        assert!(LinkHeader::parse(&SAMPLE_FRAME[..LINK_HEADER_LEN]).is_some());
        assert!(LinkHeader::parse(&[]).is_none());
    }

    #[test]
    fn element_rejects_short_body() {
        assert!(VendorElement::parse(&[0xdd, 0x0b, 0x18, 0xfe, 0x34, 0x04]).is_none());
        let element = VendorElement::parse(&[0xdd, 0x05, 0x18, 0xfe, 0x34, 0x04, 0x01]).unwrap();
        assert!(element.payload().is_empty());
    }

    #[test]
    fn action_frame_needs_both_prefixes() {
        assert!(parse_action_frame(&SAMPLE_FRAME[..MIN_FRAME_LEN - 1]).is_none());
        assert!(parse_action_frame(&SAMPLE_FRAME[..MIN_FRAME_LEN]).is_some());
    }

    #[test]
    fn packet_kind_from_driver_values() {
        assert_eq!(PacketKind::from_promiscuous_type(0), PacketKind::Management);
        assert_eq!(PacketKind::from_promiscuous_type(1), PacketKind::Control);
        assert_eq!(PacketKind::from_promiscuous_type(2), PacketKind::Data);
        assert_eq!(PacketKind::from_promiscuous_type(3), PacketKind::Other);
        assert_eq!(PacketKind::from_promiscuous_type(42), PacketKind::Other);
    }
}
