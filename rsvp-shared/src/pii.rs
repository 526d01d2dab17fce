use std::fmt;

/// Placeholder printed in place of secrets such as password hashes.
pub const REDACTED: &str = "[redacted]";

/// Log-safe view of an email address: keeps the first character and the
/// domain so support can still correlate entries, e.g. `a***@example.com`.
#[derive(Clone, Copy)]
pub struct MaskedEmail<'a>(pub &'a str);

impl fmt::Display for MaskedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.trim().split_once('@') {
            Some((local, domain)) if !domain.is_empty() => match local.chars().next() {
                Some(first) => write!(f, "{}***@{}", first, domain),
                None => write!(f, "***@{}", domain),
            },
            _ => write!(f, "***"),
        }
    }
}

impl fmt::Debug for MaskedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
