use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one field of one table. Used as the cache key by every matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub table_id: String,
    pub field_id: String,
}

impl FieldRef {
    #[inline]
    #[must_use]
    pub fn new(table_id: impl Into<String>, field_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            field_id: field_id.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table_id, self.field_id)
    }
}

/// Field description as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub field_id: String,
    /// Column name in the physical table.
    pub physical_name: String,
    /// Human readable name, used for semantic matching.
    pub logical_name: String,
}

impl FieldInfo {
    pub fn new(
        field_id: impl Into<String>,
        physical_name: impl Into<String>,
        logical_name: impl Into<String>,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            physical_name: physical_name.into(),
            logical_name: logical_name.into(),
        }
    }

    #[must_use]
    pub fn field_ref(&self, table_id: &str) -> FieldRef {
        FieldRef::new(table_id, self.field_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ref_ordering() {
        let a = FieldRef::new("t1", "f2");
        let b = FieldRef::new("t2", "f1");
        assert!(a < b);
        assert_eq!(a.to_string(), "t1/f2");
    }

    #[test]
    fn test_field_info_ref() {
        let info = FieldInfo::new("f1", "phone", "手机号码");
        assert_eq!(info.field_ref("t1"), FieldRef::new("t1", "f1"));
    }
}
