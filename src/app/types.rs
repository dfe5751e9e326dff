/// Why the capture run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(String),
    /// A bounded run finished its iterations
    Completed,
}
