//! Crate-level error types.

use std::fmt;

/// Errors produced by the instancer crate.
///
/// The bool-returning registry methods log these and return `false`; the
/// `try_*` variants hand them back to the caller.
#[derive(Debug)]
pub enum InstancingError {
    /// No group is registered under the given ID.
    GroupNotFound(String),
    /// The group already holds `capacity` instances.
    CapacityExceeded {
        /// Group that rejected the instance.
        group: String,
        /// Fixed capacity of that group.
        capacity: usize,
    },
    /// The group has no instance with the given ID.
    InstanceNotFound {
        /// Group that was searched.
        group: String,
        /// Instance ID that was not found.
        instance: String,
    },
    /// An instance with the same ID already exists in the group.
    DuplicateInstance {
        /// Group that already holds the ID.
        group: String,
        /// The colliding instance ID.
        instance: String,
    },
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for InstancingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupNotFound(group) => {
                write!(f, "instance group '{group}' not found")
            }
            Self::CapacityExceeded { group, capacity } => write!(
                f,
                "instance group '{group}' is full (capacity {capacity})"
            ),
            Self::InstanceNotFound { group, instance } => write!(
                f,
                "instance '{instance}' not found in group '{group}'"
            ),
            Self::DuplicateInstance { group, instance } => write!(
                f,
                "instance '{instance}' already exists in group '{group}'"
            ),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for InstancingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InstancingError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_group_and_instance() {
        let err = InstancingError::InstanceNotFound {
            group: "trees".into(),
            instance: "t9".into(),
        };
        assert_eq!(err.to_string(), "instance 't9' not found in group 'trees'");

        let err = InstancingError::CapacityExceeded {
            group: "trees".into(),
            capacity: 3,
        };
        assert!(err.to_string().contains("capacity 3"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error;

        let err: InstancingError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(InstancingError::GroupNotFound("x".into()).source().is_none());
    }
}
