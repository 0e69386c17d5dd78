/// ESP-NOW frame classifier.
///
/// Decides whether a captured frame is a vendor action frame carrying the
/// configured protocol marker and, if so, extracts the sender address and
/// signal strength. No state, no allocation: runs inside the sniffer
/// callback.

use crate::defaults::{ACTION_SUBTYPE, ESPRESSIF_OUI, ESP_NOW_TYPE, ESP_NOW_VERSION};
use crate::frame::{parse_action_frame, CaptureMetadata, MacAddress, PacketKind};

/// Vendor protocol marker a frame must carry to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorMarker {
    /// Organization identifier in the action header
    pub oui: [u8; 3],
    /// Protocol type in the vendor element
    pub protocol_type: u8,
    /// Protocol version peers emit. Informational; not matched.
    pub protocol_version: u8,
}

impl VendorMarker {
    /// Espressif ESP-NOW.
    pub const ESP_NOW: Self = Self {
        oui: ESPRESSIF_OUI,
        protocol_type: ESP_NOW_TYPE,
        protocol_version: ESP_NOW_VERSION,
    };
}

impl Default for VendorMarker {
    fn default() -> Self {
        Self::ESP_NOW
    }
}

/// A peer sighting: who sent the frame and how loud it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RssiSample {
    pub peer_address: MacAddress,
    /// Signal strength in dBm
    pub rssi: i8,
}

/// Which check turned a frame away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotManagement,
    Truncated,
    NotAction,
    ForeignOrganization,
    ForeignProtocol,
}

/// Outcome of classifying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Accepted(RssiSample),
    Rejected(Rejection),
}

impl Classification {
    pub fn sample(&self) -> Option<RssiSample> {
        match self {
            Classification::Accepted(sample) => Some(*sample),
            Classification::Rejected(_) => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted(_))
    }
}

/// Classify a captured frame against `marker`.
///
/// Length is checked before any field is read, so truncated captures are
/// rejected rather than read past their end.
pub fn classify(frame: &[u8], meta: &CaptureMetadata, marker: &VendorMarker) -> Classification {
    if meta.kind != PacketKind::Management {
        return Classification::Rejected(Rejection::NotManagement);
    }

    let Some((header, element)) = parse_action_frame(frame) else {
        return Classification::Rejected(Rejection::Truncated);
    };

    if header.subtype_byte() != ACTION_SUBTYPE {
        return Classification::Rejected(Rejection::NotAction);
    }

    if header.organization_id() != marker.oui {
        return Classification::Rejected(Rejection::ForeignOrganization);
    }

    if element.protocol_type() != marker.protocol_type {
        return Classification::Rejected(Rejection::ForeignProtocol);
    }

    Classification::Accepted(RssiSample {
        peer_address: header.address2(),
        rssi: meta.rssi,
    })
}
