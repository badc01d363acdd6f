//! TDS protocol version codes as reported by `sys.dm_exec_connections`.
use std::{fmt, str::FromStr};

/// The protocol versions a session can report, oldest first.
///
/// The server stores the negotiated version as a packed 32-bit value in the
/// `protocol_version` column. The values are kept verbatim in
/// [`PROTOCOL_VERSIONS`]; the packing is not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TdsVersion {
    /// TDS 4.2
    V4_2,
    /// TDS 7.0
    V7_0,
    /// TDS 7.1 (revision 1)
    V7_1,
    /// TDS 7.2
    V7_2,
    /// TDS 7.3 (revision B)
    V7_3,
    /// TDS 7.4
    V7_4,
}

/// Every known `protocol_version` value and the version it stands for.
pub const PROTOCOL_VERSIONS: [(i32, TdsVersion); 6] = [
    (67239936, TdsVersion::V4_2),
    (117440512, TdsVersion::V7_0),
    (1895825409, TdsVersion::V7_1),
    (1913192450, TdsVersion::V7_2),
    (1930100739, TdsVersion::V7_3),
    (1946157060, TdsVersion::V7_4),
];

impl TdsVersion {
    /// The short label, e.g. `"7.4"`.
    pub fn label(self) -> &'static str {
        match self {
            TdsVersion::V4_2 => "4.2",
            TdsVersion::V7_0 => "7.0",
            TdsVersion::V7_1 => "7.1",
            TdsVersion::V7_2 => "7.2",
            TdsVersion::V7_3 => "7.3",
            TdsVersion::V7_4 => "7.4",
        }
    }

    /// The raw value the server reports for this version.
    pub fn code(self) -> i32 {
        PROTOCOL_VERSIONS
            .iter()
            .find(|(_, version)| *version == self)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }

    /// The server generation that introduced this version.
    pub fn server_release(self) -> &'static str {
        match self {
            TdsVersion::V4_2 => "SQL Server 4.2 / 6.x",
            TdsVersion::V7_0 => "SQL Server 7.0",
            TdsVersion::V7_1 => "SQL Server 2000 SP1",
            TdsVersion::V7_2 => "SQL Server 2005",
            TdsVersion::V7_3 => "SQL Server 2008 R2",
            TdsVersion::V7_4 => "SQL Server 2012 or later",
        }
    }

    /// Looks up a raw `protocol_version` value.
    pub fn from_code(code: i32) -> Option<Self> {
        PROTOCOL_VERSIONS
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, version)| *version)
    }
}

impl fmt::Display for TdsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TdsVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PROTOCOL_VERSIONS
            .iter()
            .map(|(_, version)| *version)
            .find(|version| version.label() == s)
            .ok_or_else(|| crate::Error::Config(format!("unknown TDS version `{}`", s).into()))
    }
}

/// A decoded `protocol_version` value.
///
/// Codes missing from [`PROTOCOL_VERSIONS`] are kept as
/// [`Unknown`](Self::Unknown) so newer protocol revisions still show up in
/// the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionLabel {
    /// A version from the static table.
    Known(TdsVersion),
    /// Any other value, as reported by the server.
    Unknown(i32),
}

impl VersionLabel {
    /// The raw value this label was decoded from.
    pub fn code(&self) -> i32 {
        match self {
            VersionLabel::Known(version) => version.code(),
            VersionLabel::Unknown(code) => *code,
        }
    }

    /// The known version, if any.
    pub fn version(&self) -> Option<TdsVersion> {
        match self {
            VersionLabel::Known(version) => Some(*version),
            VersionLabel::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, VersionLabel::Known(_))
    }
}

impl From<i32> for VersionLabel {
    fn from(code: i32) -> Self {
        decode(code)
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionLabel::Known(version) => write!(f, "{}", version),
            VersionLabel::Unknown(code) => write!(f, "unknown ({})", code),
        }
    }
}

/// Maps a raw `protocol_version` value to its label.
pub fn decode(code: i32) -> VersionLabel {
    TdsVersion::from_code(code)
        .map(VersionLabel::Known)
        .unwrap_or(VersionLabel::Unknown(code))
}

/// A raw `protocol_version` value, for diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersionCode(pub i32);

impl ProtocolVersionCode {
    /// The value as the four bytes the server packs, most significant first.
    pub fn packed_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ProtocolVersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0 as u32)
    }
}

impl From<VersionLabel> for ProtocolVersionCode {
    fn from(label: VersionLabel) -> Self {
        ProtocolVersionCode(label.code())
    }
}
