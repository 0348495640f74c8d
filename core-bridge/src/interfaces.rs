//! Network interface listing.
//!
//! The host reports interfaces as one line per interface:
//!
//! ```text
//! wlan0 30 1500 true true false false true | fe80::2f60:2c82:4163:8389%wlan0/64 10.1.10.131/24
//! ```
//!
//! Eight space-separated fields (name, index, MTU, then the up, broadcast,
//! loopback, point-to-point and multicast flags) come before the `|`, and CIDR
//! prefixes come after it. A line that does not fit this shape is skipped with
//! a warning. A prefix that does not parse is dropped from its own record only.
//! Zone-scoped IPv6 addresses are not CIDR prefixes and are dropped this way.

use std::fmt;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const HEADER_FIELDS: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceFlags {
    pub up: bool,
    pub broadcast: bool,
    pub loopback: bool,
    pub point_to_point: bool,
    pub multicast: bool,
}

/// One host network interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub index: u32,
    pub mtu: u32,
    pub flags: InterfaceFlags,
    pub prefixes: Vec<IpNet>,
}

impl Interface {
    pub fn is_up(&self) -> bool {
        self.flags.up
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (index {}, mtu {})", self.name, self.index, self.mtu)
    }
}

/// Why a single line was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterfaceParseError {
    #[error("expected exactly one '|' separator")]
    MissingSeparator,

    #[error("expected {HEADER_FIELDS} fields before '|', found {0}")]
    FieldCount(usize),

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Parse the whole listing, skipping malformed lines.
///
/// Never fails: a bad line costs only that line.
pub fn parse_interfaces(listing: &str) -> Vec<Interface> {
    listing
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_line(line) {
            Ok(interface) => Some(interface),
            Err(err) => {
                warn!(line = %line, error = %err, "Skipping malformed interface line");
                None
            }
        })
        .collect()
}

/// Parse a single interface line.
pub fn parse_line(line: &str) -> Result<Interface, InterfaceParseError> {
    let mut parts = line.split('|');
    let (Some(header), Some(addresses), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(InterfaceParseError::MissingSeparator);
    };

    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != HEADER_FIELDS {
        return Err(InterfaceParseError::FieldCount(fields.len()));
    }

    let interface = Interface {
        name: fields[0].to_string(),
        index: parse_field("index", fields[1])?,
        mtu: parse_field("mtu", fields[2])?,
        flags: InterfaceFlags {
            up: parse_field("up", fields[3])?,
            broadcast: parse_field("broadcast", fields[4])?,
            loopback: parse_field("loopback", fields[5])?,
            point_to_point: parse_field("pointToPoint", fields[6])?,
            multicast: parse_field("multicast", fields[7])?,
        },
        prefixes: addresses
            .split_whitespace()
            .filter_map(|prefix| prefix.parse::<IpNet>().ok())
            .collect(),
    };

    Ok(interface)
}

fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<T, InterfaceParseError> {
    value.parse().map_err(|_| InterfaceParseError::InvalidField {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wlan_line() {
        let iface = parse_line("wlan0 30 1500 true true false false true | fe80::1/64 10.0.0.1/24")
            .unwrap();

        assert_eq!(iface.name, "wlan0");
        assert_eq!(iface.index, 30);
        assert_eq!(iface.mtu, 1500);
        assert_eq!(
            iface.flags,
            InterfaceFlags {
                up: true,
                broadcast: true,
                loopback: false,
                point_to_point: false,
                multicast: true,
            }
        );
        assert_eq!(
            iface.prefixes,
            vec![
                "fe80::1/64".parse::<IpNet>().unwrap(),
                "10.0.0.1/24".parse::<IpNet>().unwrap(),
            ]
        );
        // Host bits are kept, not masked off.
        assert_eq!(iface.prefixes[1].to_string(), "10.0.0.1/24");
    }

    #[test]
    fn test_zone_scoped_prefix_dropped_from_record_only() {
        let iface = parse_line(
            "wlan0 30 1500 true true false false true | fe80::2f60:2c82:4163:8389%wlan0/64 10.1.10.131/24",
        )
        .unwrap();

        assert_eq!(iface.prefixes.len(), 1);
        assert_eq!(iface.prefixes[0].to_string(), "10.1.10.131/24");
    }

    #[test]
    fn test_no_prefixes() {
        let iface = parse_line("lo 1 65536 true false true false false |").unwrap();
        assert!(iface.prefixes.is_empty());
        assert!(iface.flags.loopback);
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(
            parse_line("wlan0 30 1500 true true false false | 10.0.0.1/24"),
            Err(InterfaceParseError::FieldCount(7))
        );
        assert_eq!(
            parse_line("wlan0 30 1500 true true false false true extra | 10.0.0.1/24"),
            Err(InterfaceParseError::FieldCount(9))
        );
    }

    #[test]
    fn test_separator_required() {
        assert_eq!(
            parse_line("wlan0 30 1500 true true false false true"),
            Err(InterfaceParseError::MissingSeparator)
        );
        assert_eq!(
            parse_line("wlan0 30 1500 true true false false true | a | b"),
            Err(InterfaceParseError::MissingSeparator)
        );
    }

    #[test]
    fn test_invalid_fields() {
        assert!(matches!(
            parse_line("wlan0 -1 1500 true true false false true |"),
            Err(InterfaceParseError::InvalidField { field: "index", .. })
        ));
        assert!(matches!(
            parse_line("wlan0 30 1500 yes true false false true |"),
            Err(InterfaceParseError::InvalidField { field: "up", .. })
        ));
    }

    #[test]
    fn test_listing_skips_bad_lines_and_blanks() {
        let listing = "\
wlan0 30 1500 true true false false true | 10.1.10.131/24
garbage line without separator

r_rmnet_data0 21 1500 true false false false false | fe80::9318:6093:d1ad:ba7f%r_rmnet_data0/64
tun0 40 1280 true false false true false | 100.64.0.7/32 fd7a:115c:a1e0::7/128
";
        let interfaces = parse_interfaces(listing);
        let names: Vec<_> = interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["wlan0", "r_rmnet_data0", "tun0"]);
        assert!(interfaces[1].prefixes.is_empty());
        assert_eq!(interfaces[2].prefixes.len(), 2);
        assert!(interfaces[2].flags.point_to_point);
    }

    #[test]
    fn test_empty_listing() {
        assert!(parse_interfaces("").is_empty());
        assert!(parse_interfaces("\n\n").is_empty());
    }
}
