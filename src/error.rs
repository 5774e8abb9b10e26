/// Errors reported by the JK BMS protocol layer and its clients.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device address outside of 1..=15. Checked before any I/O happens.
    #[error("Invalid BMS address {0}, must be in range 1..=15")]
    InvalidAddress(u8),
    /// The serial port could not be opened or configured.
    #[error("Cannot open serial port '{port}': {source}")]
    TransportUnavailable {
        port: String,
        #[source]
        source: std::io::Error,
    },
    /// Fewer bytes than signature and group identifier were received.
    #[error("No response or response too short ({received} bytes)")]
    ShortResponse { received: usize },
    /// No signature followed by the expected group identifier was found.
    #[error("Invalid response, no frame for group {group_id} found")]
    SignatureNotFound { group_id: u16 },
    /// The payload ended before the named register.
    #[error("Missing data in group {group_id}, payload ends before register '{register}'")]
    IncompleteData {
        group_id: u16,
        register: &'static str,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
