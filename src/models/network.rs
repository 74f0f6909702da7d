// Network adapter inventory records

/// One network adapter configuration as reported by the inventory source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdapterRecord {
    pub description: String,
    /// Connection name (e.g. "Ethernet 2"); empty when the source has none.
    pub connection_id: String,
    pub ip_enabled: bool,
    /// IPv4 and IPv6 addresses in source order.
    pub addresses: Vec<String>,
}
