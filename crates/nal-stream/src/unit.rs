//! A parsed NAL unit and its type classification

use crate::annexb::RawUnit;
use crate::rbsp;
use std::io::Write;

/// H.264 NAL unit type
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NalUnitType {
    Slice,
    SliceA,
    SliceB,
    SliceC,
    Idr,
    Sei,
    Sps,
    Pps,
    Aud,
    EndSeq,
    EndStream,
    FillerData,
    Other(u8),
}

impl From<u8> for NalUnitType {
    fn from(val: u8) -> Self {
        match val & 0x1F {
            1 => Self::Slice,
            2 => Self::SliceA,
            3 => Self::SliceB,
            4 => Self::SliceC,
            5 => Self::Idr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndSeq,
            11 => Self::EndStream,
            12 => Self::FillerData,
            other => Self::Other(other),
        }
    }
}

impl NalUnitType {
    /// Short label used in reports
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Slice => "slice".to_string(),
            Self::SliceA => "slice-a".to_string(),
            Self::SliceB => "slice-b".to_string(),
            Self::SliceC => "slice-c".to_string(),
            Self::Idr => "idr".to_string(),
            Self::Sei => "sei".to_string(),
            Self::Sps => "sps".to_string(),
            Self::Pps => "pps".to_string(),
            Self::Aud => "aud".to_string(),
            Self::EndSeq => "end-seq".to_string(),
            Self::EndStream => "end-stream".to_string(),
            Self::FillerData => "filler".to_string(),
            Self::Other(t) => format!("type-{t}"),
        }
    }
}

/// NAL unit held by a walker's cursor
///
/// The escaped bytes are kept so an untouched unit is written back exactly
/// as read; only a replaced payload is re-escaped.
#[derive(Debug, Clone)]
pub(crate) struct NalUnit {
    prefix: Vec<u8>,
    header: u8,
    ebsp: Vec<u8>,
    rbsp: Vec<u8>,
    replaced: bool,
}

impl NalUnit {
    pub(crate) fn from_raw(raw: RawUnit) -> Self {
        let rbsp = rbsp::unescape(&raw.ebsp);
        Self {
            prefix: raw.prefix,
            header: raw.header,
            ebsp: raw.ebsp,
            rbsp,
            replaced: false,
        }
    }

    pub(crate) fn unit_type(&self) -> u8 {
        self.header & 0x1F
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.rbsp
    }

    pub(crate) fn replace_payload(&mut self, payload: &[u8]) {
        self.rbsp = payload.to_vec();
        self.replaced = true;
    }

    pub(crate) fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.prefix)?;
        out.write_all(&[self.header])?;
        if self.replaced {
            out.write_all(&rbsp::escape(&self.rbsp))
        } else {
            out.write_all(&self.ebsp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(header: u8, ebsp: &[u8]) -> RawUnit {
        RawUnit {
            offset: 0,
            prefix: vec![0, 0, 0, 1],
            header,
            ebsp: ebsp.to_vec(),
        }
    }

    #[test]
    fn test_nal_type_parsing() {
        assert_eq!(NalUnitType::from(0x67), NalUnitType::Sps);
        assert_eq!(NalUnitType::from(0x68), NalUnitType::Pps);
        assert_eq!(NalUnitType::from(0x65), NalUnitType::Idr);
        assert_eq!(NalUnitType::from(0x41), NalUnitType::Slice);
        assert_eq!(NalUnitType::from(0x0e), NalUnitType::Other(14));
        assert_eq!(NalUnitType::Other(14).label(), "type-14");
    }

    #[test]
    fn test_untouched_unit_is_written_verbatim() {
        // 00 00 03 04 is a redundant but legal escape; it must survive untouched
        let unit = NalUnit::from_raw(raw(0x65, &[0x00, 0x00, 0x03, 0x04]));
        assert_eq!(unit.payload(), &[0x00, 0x00, 0x04]);

        let mut out = Vec::new();
        unit.write_to(&mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 1, 0x65, 0x00, 0x00, 0x03, 0x04]);
    }

    #[test]
    fn test_replaced_payload_is_escaped() {
        let mut unit = NalUnit::from_raw(raw(0x65, &[0x88, 0x84]));
        unit.replace_payload(&[0x00, 0x00, 0x01, 0x80]);
        assert_eq!(unit.unit_type(), 5);

        let mut out = Vec::new();
        unit.write_to(&mut out).unwrap();
        assert_eq!(
            out,
            vec![0, 0, 0, 1, 0x65, 0x00, 0x00, 0x03, 0x01, 0x80]
        );
    }
}
