// src/permissions.rs

//! Access rights attached to algorithms, objectives and produced models.
//!
//! A model produced by a tuple inherits the permissions of every model it was
//! trained from: each parent's grant conditions must still hold, so merging
//! two permission sets can only narrow who is allowed to process the result.

use serde::{Deserialize, Serialize};

/// Who may process an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub public: bool,
    /// Sorted, deduplicated node ids. Ignored when `public` is set.
    #[serde(default)]
    pub authorized_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub process: Permission,
}

/// Permissions as supplied by a registration request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPermissions {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub authorized_ids: Vec<String>,
}

impl InputPermissions {
    pub fn open() -> Self {
        Self {
            public: true,
            authorized_ids: Vec::new(),
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::open()
    }
}

impl Permissions {
    /// Maximally open baseline.
    pub fn open() -> Self {
        Self {
            process: Permission {
                public: true,
                authorized_ids: Vec::new(),
            },
        }
    }

    /// Restricted to exactly the given ids.
    pub fn restricted_to<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            process: Permission {
                public: false,
                authorized_ids: normalize(ids.into_iter().map(Into::into).collect()),
            },
        }
    }

    /// Build the permissions of an asset owned by `owner`.
    ///
    /// A restricted policy always includes its owner.
    pub fn from_input(owner: &str, input: &InputPermissions) -> Self {
        if input.public {
            return Self::open();
        }
        let mut ids = input.authorized_ids.clone();
        ids.push(owner.to_string());
        Self::restricted_to(ids)
    }

    pub fn is_public(&self) -> bool {
        self.process.public
    }

    /// Whether `node` may process an asset owned by `owner`.
    pub fn can_process(&self, owner: &str, node: &str) -> bool {
        self.process.public
            || node == owner
            || self.process.authorized_ids.iter().any(|id| id == node)
    }

    /// Combine two permission sets so that both grant conditions hold.
    pub fn merge(&self, other: &Permissions) -> Permissions {
        match (self.process.public, other.process.public) {
            (true, true) => Permissions::open(),
            (true, false) => other.clone(),
            (false, true) => self.clone(),
            (false, false) => Permissions::restricted_to(
                self.process
                    .authorized_ids
                    .iter()
                    .filter(|id| other.process.authorized_ids.contains(id))
                    .cloned()
                    .collect::<Vec<_>>(),
            ),
        }
    }
}

fn normalize(mut ids: Vec<String>) -> Vec<String> {
    ids.retain(|id| !id.is_empty());
    ids.sort();
    ids.dedup();
    ids
}
