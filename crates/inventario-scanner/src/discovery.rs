//! # Port Discovery
//!
//! Picks the serial port a barcode scanner is most likely attached to.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────┬──────────────────────┐
//! │ Caller       │ Match                         │ Nothing matched      │
//! ├──────────────┼───────────────────────────────┼──────────────────────┤
//! │ server       │ SERVER_KEYWORDS in            │ first port listed    │
//! │              │ description / hardware id     │                      │
//! │ forwarder    │ user filter (also the name)   │ None (keep polling)  │
//! │              │ or FORWARDER_KEYWORDS         │                      │
//! └──────────────┴───────────────────────────────┴──────────────────────┘
//! ```
//! All comparisons are case-insensitive.

/// Keywords the server worker looks for.
pub const SERVER_KEYWORDS: &[&str] = &[
    "usb",
    "serial",
    "scanner",
    "barcode",
    "dispositivo serie",
    "usb-to-serial",
    "ftdi",
    "prolific",
    "ch340",
    "uart",
    "hid",
];

/// Keywords the remote forwarder looks for.
pub const FORWARDER_KEYWORDS: &[&str] = &["USB", "Scanner", "HID", "Barcode", "Prolific"];

/// One enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path or name (`/dev/ttyUSB0`, `COM3`).
    pub name: String,
    pub description: Option<String>,
    pub hardware_id: Option<String>,
}

impl PortInfo {
    /// Creates a port with no descriptive metadata.
    pub fn named(name: impl Into<String>) -> Self {
        PortInfo {
            name: name.into(),
            description: None,
            hardware_id: None,
        }
    }

    fn description_lower(&self) -> String {
        self.description.as_deref().unwrap_or_default().to_lowercase()
    }

    fn hardware_id_lower(&self) -> String {
        self.hardware_id.as_deref().unwrap_or_default().to_lowercase()
    }

    /// Whether any keyword occurs in the description or hardware id.
    pub fn matches_any(&self, keywords: &[&str]) -> bool {
        let desc = self.description_lower();
        let hwid = self.hardware_id_lower();
        keywords.iter().map(|k| k.to_lowercase()).any(|k| desc.contains(&k) || hwid.contains(&k))
    }

    /// Whether `filter` occurs in the description, hardware id or name.
    pub fn matches_filter(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.description_lower().contains(&filter)
            || self.hardware_id_lower().contains(&filter)
            || self.name.to_lowercase().contains(&filter)
    }
}

/// Port selection for the in-process worker.
///
/// Returns `None` only when `ports` is empty.
pub fn select_server_port(ports: &[PortInfo]) -> Option<String> {
    ports
        .iter()
        .find(|p| p.matches_any(SERVER_KEYWORDS))
        .or_else(|| ports.first())
        .map(|p| p.name.clone())
}

/// Port selection for the remote forwarder. There is no fallback.
pub fn select_forwarder_port(ports: &[PortInfo], filter: Option<&str>) -> Option<String> {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());
    ports
        .iter()
        .find(|p| filter.is_some_and(|f| p.matches_filter(f)) || p.matches_any(FORWARDER_KEYWORDS))
        .map(|p| p.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, desc: &str, hwid: &str) -> PortInfo {
        PortInfo {
            name: name.into(),
            description: Some(desc.into()),
            hardware_id: Some(hwid.into()),
        }
    }

    #[test]
    fn test_server_prefers_keyword_match() {
        let ports = vec![
            port("COM1", "Communications Port", "ACPI\\PNP0501"),
            port("COM4", "Prolific USB-to-Serial Comm Port", "USB VID:PID=067B:2303"),
        ];
        assert_eq!(select_server_port(&ports).as_deref(), Some("COM4"));
    }

    #[test]
    fn test_server_falls_back_to_first_port() {
        let ports = vec![port("COM1", "Communications Port", "ACPI"), port("COM2", "Modem", "PCI")];
        assert_eq!(select_server_port(&ports).as_deref(), Some("COM1"));
        assert_eq!(select_server_port(&[]), None);
    }

    #[test]
    fn test_forwarder_has_no_fallback() {
        let ports = vec![port("COM1", "Communications Port", "ACPI")];
        assert_eq!(select_forwarder_port(&ports, None), None);
    }

    #[test]
    fn test_forwarder_filter_matches_name() {
        let ports = vec![port("COM1", "Communications Port", "ACPI"), PortInfo::named("/dev/ttyACM0")];
        assert_eq!(select_forwarder_port(&ports, Some("ttyacm")).as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(select_forwarder_port(&ports, Some("  ")), None);
    }

    #[test]
    fn test_forwarder_keywords_are_case_insensitive() {
        let ports = vec![port("/dev/ttyS0", "ttyS0", ""), port("/dev/ttyUSB0", "barcode reader", "")];
        assert_eq!(select_forwarder_port(&ports, None).as_deref(), Some("/dev/ttyUSB0"));
    }
}
