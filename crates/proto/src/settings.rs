//! SETTINGS identifiers and their default values (RFC 7540 §6.5.2).

/// Lower bound for `SETTINGS_MAX_FRAME_SIZE` (RFC 7540 §6.5.2).
pub const MAX_FRAME_SIZE_FLOOR: u32 = 16_384;
/// Upper bound for `SETTINGS_MAX_FRAME_SIZE`.
pub const MAX_FRAME_SIZE_CEILING: u32 = 16_777_215;
/// Default `SETTINGS_INITIAL_WINDOW_SIZE`.
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;
/// Default `SETTINGS_HEADER_TABLE_SIZE`.
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4_096;
/// Hard cap on a single frame's length regardless of peer settings.
pub const FRAME_LENGTH_HARD_CAP: u32 = 16 * 1024 * 1024;
/// HTTP/2 connection preface, RFC 7540 §3.5.
pub const H2_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// A SETTINGS parameter identifier.
///
/// Values above the well-known set decode to [`SettingId::Unknown`] and
/// are not rejected. RFC 7540 §6.5.2 / RFC 9114 §7.2.4.1 both require
/// unknown settings to be ignored, not treated as an error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SettingId {
    /// `SETTINGS_HEADER_TABLE_SIZE` (0x1).
    HeaderTableSize,
    /// `SETTINGS_ENABLE_PUSH` (0x2, h2 only).
    EnablePush,
    /// `SETTINGS_MAX_CONCURRENT_STREAMS` (0x3).
    MaxConcurrentStreams,
    /// `SETTINGS_INITIAL_WINDOW_SIZE` (0x4).
    InitialWindowSize,
    /// `SETTINGS_MAX_FRAME_SIZE` (0x5, h2 only).
    MaxFrameSize,
    /// `SETTINGS_MAX_HEADER_LIST_SIZE` (0x6).
    MaxHeaderListSize,
    /// A setting id this codec does not interpret.
    Unknown(u64),
}

impl SettingId {
    /// Decode a raw identifier into a `SettingId`.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        match raw {
            0x1 => Self::HeaderTableSize,
            0x2 => Self::EnablePush,
            0x3 => Self::MaxConcurrentStreams,
            0x4 => Self::InitialWindowSize,
            0x5 => Self::MaxFrameSize,
            0x6 => Self::MaxHeaderListSize,
            other => Self::Unknown(other),
        }
    }

    /// Encode back to the raw wire identifier.
    #[must_use]
    pub fn to_raw(self) -> u64 {
        match self {
            Self::HeaderTableSize => 0x1,
            Self::EnablePush => 0x2,
            Self::MaxConcurrentStreams => 0x3,
            Self::InitialWindowSize => 0x4,
            Self::MaxFrameSize => 0x5,
            Self::MaxHeaderListSize => 0x6,
            Self::Unknown(raw) => raw,
        }
    }
}

/// A peer's (or our own) negotiated SETTINGS, with the RFC 7540 §6.5.2
/// defaults pre-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// `SETTINGS_HEADER_TABLE_SIZE`.
    pub header_table_size: u32,
    /// `SETTINGS_ENABLE_PUSH`.
    pub enable_push: bool,
    /// `SETTINGS_MAX_CONCURRENT_STREAMS`; `None` means unbounded.
    pub max_concurrent_streams: Option<u32>,
    /// `SETTINGS_INITIAL_WINDOW_SIZE`.
    pub initial_window_size: u32,
    /// `SETTINGS_MAX_FRAME_SIZE`.
    pub max_frame_size: u32,
    /// `SETTINGS_MAX_HEADER_LIST_SIZE`; `None` means unbounded.
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: DEFAULT_HEADER_TABLE_SIZE,
            enable_push: true,
            max_concurrent_streams: None,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: MAX_FRAME_SIZE_FLOOR,
            max_header_list_size: None,
        }
    }
}

impl Settings {
    /// Apply a single (id, value) pair received from the peer, validating
    /// `MAX_FRAME_SIZE`'s bounds per RFC 7540 §6.5.2.
    pub fn apply(&mut self, id: SettingId, value: u32) -> Result<(), crate::Error> {
        match id {
            SettingId::HeaderTableSize => self.header_table_size = value,
            SettingId::EnablePush => self.enable_push = value != 0,
            SettingId::MaxConcurrentStreams => self.max_concurrent_streams = Some(value),
            SettingId::InitialWindowSize => self.initial_window_size = value,
            SettingId::MaxFrameSize => {
                if !(MAX_FRAME_SIZE_FLOOR..=MAX_FRAME_SIZE_CEILING).contains(&value) {
                    return Err(crate::Error::ProtocolError);
                }
                self.max_frame_size = value;
            }
            SettingId::MaxHeaderListSize => self.max_header_list_size = Some(value),
            SettingId::Unknown(_) => {}
        }
        Ok(())
    }
}
