//! Port-to-endpoint demultiplexing.
//!
//! At `connect()` time the port is the only thing telling a SOCKS dial apart
//! from a control-port dial, so the table below is all the routing there is.

/// Which of the two provisioned local endpoints a connection goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Socks,
    Control,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Socks => "socks",
            Endpoint::Control => "control",
        }
    }
}

/// System tor defaults.
pub const SYSTEM_SOCKS_PORT: u16 = 9050;
pub const SYSTEM_CONTROL_PORT: u16 = 9051;
/// Bundled tor defaults.
pub const BUNDLED_SOCKS_PORT: u16 = 9150;
pub const BUNDLED_CONTROL_PORT: u16 = 9151;

pub const PORT_MAP: [(u16, Endpoint); 4] = [
    (SYSTEM_SOCKS_PORT, Endpoint::Socks),
    (SYSTEM_CONTROL_PORT, Endpoint::Control),
    (BUNDLED_SOCKS_PORT, Endpoint::Socks),
    (BUNDLED_CONTROL_PORT, Endpoint::Control),
];

/// Classify a host-order port. `None` means the port is not routable.
pub fn classify(port: u16) -> Option<Endpoint> {
    PORT_MAP
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, endpoint)| *endpoint)
}
