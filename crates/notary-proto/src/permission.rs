//! Capability checks on [`Permission`].

use std::fmt;

use crate::error::ProtoError;
use crate::messages::Permission;

const NONE: Permission = Permission {
    grant: false,
    revoke: false,
    search: false,
    refresh: false,
    sync: false,
    deploy: false,
};

const ALL: Permission = Permission {
    grant: true,
    revoke: true,
    search: true,
    refresh: true,
    sync: true,
    deploy: true,
};

impl Permission {
    /// Required to call `Grant`.
    pub const GRANT: Self = Self { grant: true, ..NONE };
    /// Required to call `Revoke`.
    pub const REVOKE: Self = Self {
        revoke: true,
        ..NONE
    };
    /// Required to call `Search`.
    pub const SEARCH: Self = Self {
        search: true,
        ..NONE
    };
    /// Required to call `Refresh`.
    pub const REFRESH: Self = Self {
        refresh: true,
        ..NONE
    };
    /// Required to call `Sync/Stream`.
    pub const SYNC: Self = Self { sync: true, ..NONE };
    /// Required by deployment services.
    pub const DEPLOY: Self = Self {
        deploy: true,
        ..NONE
    };

    /// Denies everything. This is also the protobuf default.
    #[must_use]
    pub const fn none() -> Self {
        NONE
    }

    /// Allows everything; for bootstrap and admin identities.
    #[must_use]
    pub const fn all() -> Self {
        ALL
    }

    /// Whether no capability is set.
    #[must_use]
    pub fn is_none(&self) -> bool {
        *self == NONE
    }

    /// Whether every capability set in `required` is also set here.
    #[must_use]
    pub fn allows(&self, required: &Self) -> bool {
        self.flags()
            .iter()
            .zip(required.flags())
            .all(|((_, have), (_, need))| *have || !need)
    }

    /// Union of two permission sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            grant: self.grant || other.grant,
            revoke: self.revoke || other.revoke,
            search: self.search || other.search,
            refresh: self.refresh || other.refresh,
            sync: self.sync || other.sync,
            deploy: self.deploy || other.deploy,
        }
    }

    /// Build a permission set from capability names.
    ///
    /// Accepts `grant`, `revoke`, `search`, `refresh`, `sync`, `deploy`,
    /// plus `all` and `none`. Matching is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::UnknownPermission`] for any other name.
    pub fn from_names<I, S>(names: I) -> Result<Self, ProtoError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(NONE, |acc, name| {
            let name = name.as_ref().trim().to_ascii_lowercase();
            let bit = match name.as_str() {
                "grant" => Self::GRANT,
                "revoke" => Self::REVOKE,
                "search" => Self::SEARCH,
                "refresh" => Self::REFRESH,
                "sync" => Self::SYNC,
                "deploy" => Self::DEPLOY,
                "all" => ALL,
                "none" => NONE,
                _ => return Err(ProtoError::UnknownPermission(name)),
            };
            Ok(acc.union(&bit))
        })
    }

    /// Names of the capabilities that are set, in wire order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    fn flags(&self) -> [(&'static str, bool); 6] {
        [
            ("grant", self.grant),
            ("revoke", self.revoke),
            ("search", self.search),
            ("refresh", self.refresh),
            ("sync", self.sync),
            ("deploy", self.deploy),
        ]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "none");
        }
        write!(f, "{}", self.names().join(","))
    }
}
