//! Logical bus roles and their binding to physical signals.
//!
//! A [`SignalMap`] is configuration: one physical signal name per role, supplied once.
//! [`BusSignals`] is the resolved form, a record of typed handles validated eagerly so a
//! missing or misspelled role fails at construction instead of on the first access.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{SignalAccess, SignalId, SignalTable};
use crate::common::BfmError;
use crate::common::constants::{CONTROL_BITS, DATA_BITS, SEL_BITS};

/// Logical signal roles of a Wishbone bus interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalRole {
    /// Bus cycle in progress (master to slave).
    Cyc,
    /// Valid strobe on this edge (master to slave).
    Stb,
    /// Write enable (master to slave).
    We,
    /// Word address (master to slave).
    Adr,
    /// Byte-lane select (master to slave).
    Sel,
    /// Write data (master to slave).
    Datwr,
    /// Read data (slave to master).
    Datrd,
    /// Transfer acknowledged (slave to master).
    Ack,
}

impl SignalRole {
    /// Every role, in resolution order.
    pub const ALL: [Self; 8] = [
        Self::Cyc,
        Self::Stb,
        Self::We,
        Self::Adr,
        Self::Sel,
        Self::Datwr,
        Self::Datrd,
        Self::Ack,
    ];

    /// Lower-case role name as used in signal maps.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cyc => "cyc",
            Self::Stb => "stb",
            Self::We => "we",
            Self::Adr => "adr",
            Self::Sel => "sel",
            Self::Datwr => "datwr",
            Self::Datrd => "datrd",
            Self::Ack => "ack",
        }
    }

    /// Bit width of the role; `adr_width` applies to the address role.
    pub const fn width(self, adr_width: u32) -> u32 {
        match self {
            Self::Cyc | Self::Stb | Self::We | Self::Ack => CONTROL_BITS,
            Self::Adr => adr_width,
            Self::Sel => SEL_BITS,
            Self::Datwr | Self::Datrd => DATA_BITS,
        }
    }
}

impl fmt::Display for SignalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from logical roles to physical signal names.
///
/// Deserializes from an object keyed by role name:
///
/// ```
/// use wishbone_bfm::signals::{SignalMap, SignalRole};
///
/// let map: SignalMap = serde_json::from_str(r#"{
///     "cyc": "wbs_a_cyc_i", "stb": "wbs_a_stb_i", "we": "wbs_a_we_i",
///     "adr": "wbs_a_adr_i", "sel": "wbs_a_sel_i", "datwr": "wbs_a_dat_i",
///     "datrd": "wbs_a_dat_o", "ack": "wbs_a_ack_o"
/// }"#).unwrap();
/// assert_eq!(map.get(SignalRole::Datrd), Some("wbs_a_dat_o"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalMap(BTreeMap<SignalRole, String>);

impl SignalMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the conventional map `<prefix><role><suffix>` for every role, e.g.
    /// `with_affixes("wbs_a_", "")` yields `wbs_a_cyc`, `wbs_a_stb`, ...
    pub fn with_affixes(prefix: &str, suffix: &str) -> Self {
        SignalRole::ALL
            .into_iter()
            .map(|role| (role, format!("{prefix}{role}{suffix}")))
            .collect()
    }

    /// Returns the map with `role` bound to `name`.
    #[must_use]
    pub fn with(mut self, role: SignalRole, name: impl Into<String>) -> Self {
        self.insert(role, name);
        self
    }

    /// Binds `role` to `name`, replacing any previous binding.
    pub fn insert(&mut self, role: SignalRole, name: impl Into<String>) {
        let _ = self.0.insert(role, name.into());
    }

    /// Returns the physical name bound to `role`.
    pub fn get(&self, role: SignalRole) -> Option<&str> {
        self.0.get(&role).map(String::as_str)
    }

    /// Returns the first role with no binding.
    pub fn first_missing(&self) -> Option<SignalRole> {
        SignalRole::ALL.into_iter().find(|role| !self.0.contains_key(role))
    }

    /// Declares every mapped signal in `table` with its role width, then resolves.
    ///
    /// # Errors
    ///
    /// Returns [`BfmError::MissingSignal`] if any role is unmapped; nothing is declared
    /// in that case.
    pub fn declare(&self, table: &mut SignalTable, adr_width: u32) -> Result<BusSignals, BfmError> {
        if let Some(role) = self.first_missing() {
            return Err(BfmError::MissingSignal(role));
        }
        for (role, name) in &self.0 {
            let _ = table.declare(name, role.width(adr_width));
        }
        BusSignals::resolve(self, &*table)
    }
}

impl FromIterator<(SignalRole, String)> for SignalMap {
    fn from_iter<I: IntoIterator<Item = (SignalRole, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolved signal handles of one bus interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusSignals {
    /// Bus cycle in progress.
    pub cyc: SignalId,
    /// Strobe.
    pub stb: SignalId,
    /// Write enable.
    pub we: SignalId,
    /// Word address.
    pub adr: SignalId,
    /// Byte select.
    pub sel: SignalId,
    /// Write data.
    pub datwr: SignalId,
    /// Read data.
    pub datrd: SignalId,
    /// Acknowledge.
    pub ack: SignalId,
}

impl BusSignals {
    /// Resolves every role of `map` against the host's signals.
    ///
    /// # Errors
    ///
    /// Returns [`BfmError::MissingSignal`] for an unmapped role and
    /// [`BfmError::UnknownSignal`] for a name the host does not know.
    pub fn resolve(map: &SignalMap, access: &dyn SignalAccess) -> Result<Self, BfmError> {
        let find = |role: SignalRole| -> Result<SignalId, BfmError> {
            let name = map.get(role).ok_or(BfmError::MissingSignal(role))?;
            access.lookup(name).ok_or_else(|| BfmError::UnknownSignal {
                role,
                name: name.to_owned(),
            })
        };
        Ok(Self {
            cyc: find(SignalRole::Cyc)?,
            stb: find(SignalRole::Stb)?,
            we: find(SignalRole::We)?,
            adr: find(SignalRole::Adr)?,
            sel: find(SignalRole::Sel)?,
            datwr: find(SignalRole::Datwr)?,
            datrd: find(SignalRole::Datrd)?,
            ack: find(SignalRole::Ack)?,
        })
    }

    /// Returns the handle bound to `role`.
    pub const fn get(&self, role: SignalRole) -> SignalId {
        match role {
            SignalRole::Cyc => self.cyc,
            SignalRole::Stb => self.stb,
            SignalRole::We => self.we,
            SignalRole::Adr => self.adr,
            SignalRole::Sel => self.sel,
            SignalRole::Datwr => self.datwr,
            SignalRole::Datrd => self.datrd,
            SignalRole::Ack => self.ack,
        }
    }
}
