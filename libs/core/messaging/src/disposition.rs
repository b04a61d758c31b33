//! Dispositions a fetched message can receive.

use std::fmt;
use std::time::Duration;

/// What to tell the queue about a fetched message.
///
/// `Acknowledge` and `NegativeAcknowledge` are terminal: exactly one of them is
/// recorded per fetched message. `InProgressExtend` only renews the lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fully processed; the queue will not redeliver it.
    Acknowledge,

    /// Failed; redeliver no sooner than `delay`.
    NegativeAcknowledge { delay: Duration },

    /// Still working; push out the redelivery deadline.
    InProgressExtend,
}

impl Disposition {
    /// Negative acknowledgement with the given redelivery delay.
    pub fn nak(delay: Duration) -> Self {
        Self::NegativeAcknowledge { delay }
    }

    /// Whether this disposition finalizes the message.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Disposition::InProgressExtend)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Acknowledge => "ack",
            Disposition::NegativeAcknowledge { .. } => "nak",
            Disposition::InProgressExtend => "in_progress",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::NegativeAcknowledge { delay } => write!(f, "nak({:?})", delay),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_dispositions() {
        assert!(Disposition::Acknowledge.is_terminal());
        assert!(Disposition::nak(Duration::from_secs(30)).is_terminal());
        assert!(!Disposition::InProgressExtend.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(Disposition::Acknowledge.to_string(), "ack");
        assert_eq!(
            Disposition::nak(Duration::from_secs(30)).to_string(),
            "nak(30s)"
        );
    }
}
