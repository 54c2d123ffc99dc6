use std::borrow::{Borrow, Cow};
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

macro_rules! name_newtype {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Cow<'static, str>);

        impl $t {
            pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            pub const fn from_static(name: &'static str) -> Self {
                Self(Cow::Borrowed(name))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $t {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&'static str> for $t {
            fn from(value: &'static str) -> Self {
                Self::from_static(value)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(Cow::Owned(value))
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_newtype!(
    /// Top-level permission module (e.g. `finance`).
    ModuleName
);

name_newtype!(
    /// Second-level key under a module (e.g. `flow` under `finance`).
    SubModuleName
);

name_newtype!(
    /// Leaf action name (e.g. `view`, `create`).
    ///
    /// Unknown actions are kept verbatim so administrators can grant actions the
    /// engine has no constant for.
    Action
);

impl ModuleName {
    pub const FINANCE: ModuleName = ModuleName::from_static("finance");
    pub const HR: ModuleName = ModuleName::from_static("hr");
    pub const ASSET: ModuleName = ModuleName::from_static("asset");
    pub const REPORT: ModuleName = ModuleName::from_static("report");
    pub const SYSTEM: ModuleName = ModuleName::from_static("system");
}

impl Action {
    pub const VIEW: Action = Action::from_static("view");
    pub const CREATE: Action = Action::from_static("create");
    pub const UPDATE: Action = Action::from_static("update");
    pub const DELETE: Action = Action::from_static("delete");
    pub const APPROVE: Action = Action::from_static("approve");
    pub const REJECT: Action = Action::from_static("reject");
    pub const EXPORT: Action = Action::from_static("export");
    pub const IMPORT: Action = Action::from_static("import");
    pub const PRINT: Action = Action::from_static("print");
}

type SubModuleGrants = BTreeMap<SubModuleName, BTreeSet<Action>>;

/// Three-level grant map: module → sub-module → actions.
///
/// Anything not present is a denial. Deserialization is lenient: malformed
/// branches are dropped (and logged) instead of failing the whole catalog row,
/// so a corrupt grant can only ever narrow access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<ModuleName, SubModuleGrants>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `actions` on `module.sub_module`, merging with existing grants.
    pub fn grant<I, A>(
        mut self,
        module: impl Into<ModuleName>,
        sub_module: impl Into<SubModuleName>,
        actions: I,
    ) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action>,
    {
        self.0
            .entry(module.into())
            .or_default()
            .entry(sub_module.into())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
        self
    }

    /// Sub-module map for `module`, if the module is present at all.
    pub fn module(&self, module: &str) -> Option<&SubModuleGrants> {
        self.0.get(module)
    }

    /// Action set for `module.sub_module`, if present.
    pub fn actions(&self, module: &str, sub_module: &str) -> Option<&BTreeSet<Action>> {
        self.module(module)?.get(sub_module)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleName> {
        self.0.keys()
    }

    /// Whether every action granted here is also granted by `other`.
    pub fn is_subset_of(&self, other: &PermissionSet) -> bool {
        self.0.iter().all(|(module, subs)| {
            subs.iter().all(|(sub_module, actions)| {
                actions.is_empty()
                    || other
                        .actions(module.as_str(), sub_module.as_str())
                        .is_some_and(|held| actions.is_subset(held))
            })
        })
    }

    /// Build a grant map from an untyped JSON document, dropping malformed parts.
    pub fn from_json_lossy(value: &Value) -> Self {
        let Some(modules) = value.as_object() else {
            if !value.is_null() {
                tracing::warn!(kind = json_kind(value), "permission map is not an object; treating as empty");
            }
            return Self::default();
        };

        let mut out = BTreeMap::new();
        for (module, subs) in modules {
            let Some(subs) = subs.as_object() else {
                tracing::warn!(%module, kind = json_kind(subs), "dropping malformed permission module");
                continue;
            };

            let mut grants = SubModuleGrants::new();
            for (sub_module, actions) in subs {
                let Some(actions) = actions.as_array() else {
                    tracing::warn!(
                        %module,
                        %sub_module,
                        kind = json_kind(actions),
                        "dropping malformed action list"
                    );
                    continue;
                };

                let mut set = BTreeSet::new();
                for action in actions {
                    match action.as_str().map(str::trim) {
                        Some(a) if !a.is_empty() => {
                            set.insert(Action::from(a.to_string()));
                        }
                        _ => {
                            tracing::warn!(%module, %sub_module, "dropping malformed action entry");
                        }
                    }
                }
                grants.insert(SubModuleName::from(sub_module.clone()), set);
            }
            out.insert(ModuleName::from(module.clone()), grants);
        }

        Self(out)
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json_lossy(&value))
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
