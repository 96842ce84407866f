use super::*;

/// `Device ID` line followed, later in the same block, by an `IP address`
/// line. Both must be line terminated.
static NEIGHBOR_BLOCK: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(
        r"Device ID:[ \t]*([^\r\n]*?)[ \t]*\r?\n(?s:.*?)IP address:[ \t]*([^\r\n]*?)[ \t]*\r?\n",
    ) {
        Ok(re) => re,
        Err(err) => panic!("invalid NEIGHBOR_BLOCK regex: {err}"),
    }
});

/// Extracts neighbor records from a cleaned `show cdp neighbors detail` dump.
///
/// Blocks without a recognizable device/address pair are skipped.
pub fn parse_neighbors(dump: &str) -> Vec<NeighborReport> {
    dump.split(DEVICE_SEPARATOR)
        .filter_map(|block| {
            let caps = NEIGHBOR_BLOCK.captures(block)?;
            let name = caps.get(1)?.as_str();
            let address = caps.get(2)?.as_str();
            if address.is_empty() {
                trace!("Skipping block without address: {:?}", name);
                return None;
            }
            Some(NeighborReport::new(name, address))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "Device ID: sw-dist-1.corp\r\n\
Entry address(es): \r\n\
  IP address: 10.0.0.2\r\n\
Platform: cisco WS-C3750G-24TS,  Capabilities: Switch IGMP \r\n\
Interface: GigabitEthernet0/1,  Port ID (outgoing port): GigabitEthernet1/0/24\r\n\
Holdtime : 152 sec\r\n\
\r\n\
-------------------------\r\n\
Device ID: SEP001122334455\r\n\
Entry address(es): \r\n\
Platform: Cisco IP Phone 7945,  Capabilities: Host Phone \r\n\
\r\n\
-------------------------\r\n\
Device ID: sw-acc-7\r\n\
Entry address(es): \r\n\
  IP address: 10.0.0.7\r\n\
Platform: cisco WS-C2960-24TT-L,  Capabilities: Switch IGMP \r\n\
\r\n\
sw-core>";

    #[test]
    fn blocks_with_name_and_address_are_extracted() {
        assert_eq!(
            parse_neighbors(DUMP),
            vec![
                NeighborReport::new("sw-dist-1.corp", "10.0.0.2"),
                NeighborReport::new("sw-acc-7", "10.0.0.7"),
            ]
        );
    }

    #[test]
    fn address_line_must_follow_device_line_in_the_same_block() {
        let dump = "Device ID: orphan\r\nPlatform: x\r\n-------------------------\r\n  IP address: 10.9.9.9\r\n";

        assert!(parse_neighbors(dump).is_empty());
    }

    #[test]
    fn unterminated_lines_are_ignored() {
        assert!(parse_neighbors("Device ID: sw\r\n  IP address: 10.0.0.3").is_empty());
        assert!(parse_neighbors("").is_empty());
    }

    #[test]
    fn bare_newlines_are_accepted() {
        let dump = "Device ID: sw-lf\nEntry address(es):\n  IP address: 192.168.5.5\n";

        assert_eq!(
            parse_neighbors(dump),
            vec![NeighborReport::new("sw-lf", "192.168.5.5")]
        );
    }

    #[test]
    fn report_display_lists_neighbors() {
        let mut report = NeighborReport::new("core", "10.0.0.1");
        assert_eq!(report.to_string(), "NeighborReport {Name: core, Address: 10.0.0.1}");

        report.neighbors = parse_neighbors(DUMP);
        assert_eq!(
            report.to_string(),
            "NeighborReport {Name: core, Address: 10.0.0.1, Neighbors: [\
NeighborReport {Name: sw-dist-1.corp, Address: 10.0.0.2} \
NeighborReport {Name: sw-acc-7, Address: 10.0.0.7}]}"
        );
    }
}
