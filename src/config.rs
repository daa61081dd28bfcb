//! Options / config loading (`§6`): which PTA variant to run, and the
//! sources/sinks/transfers the taint pass (`§4.G`) is configured with.
//! Deserialized with `serde_json`; unresolved method references are
//! reported per-entry via [`crate::errors::ConfigError`] rather than
//! aborting the whole load (`§7`).

use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    ir::{ClassId, MethodId, Program, Subsignature},
};

/// Which pointer-analysis variant a run should use (`§6`: "picks the PTA
/// variant to consume").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PtaVariant {
    ContextInsensitive,
    /// `k`-call-site-sensitive, as built by [`crate::pta::context::KCallSiteSensitivity`].
    ContextSensitive { k: usize },
}

/// A method reference as it appears in a config entry: declaring class
/// plus subsignature, exactly the fields that identify a [`MethodId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub class: String,
    pub subsignature: String,
}

impl MethodSignature {
    #[must_use]
    pub fn to_method_id(&self) -> MethodId {
        MethodId {
            declaring_class: ClassId::from(self.class.as_str()),
            subsignature: Subsignature::new(self.subsignature.clone()),
        }
    }
}

impl std::fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.class, self.subsignature)
    }
}

/// `sources[]`: `{method signature, returnType}` (`§6`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub method: MethodSignature,
    pub return_type: crate::ir::Type,
}

/// `sinks[]`: `{method signature, paramIndex}` (`§6`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSpec {
    pub method: MethodSignature,
    pub param_index: usize,
}

/// An endpoint of a transfer: the call's receiver, its result, or one of
/// its argument positions (`§4.G`). Open Question 2 deliberately omits an
/// `Arg -> Arg` form; extend this enum uniformly if that is ever needed.
///
/// Serialized as the strings `"BASE"`/`"RESULT"` or a plain integer for
/// `Arg`, matching the schema table in `§6` ("from: BASE\|RESULT\|int").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEndpoint {
    Base,
    Result,
    Arg(usize),
}

impl Serialize for TransferEndpoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Base => serializer.serialize_str("BASE"),
            Self::Result => serializer.serialize_str("RESULT"),
            Self::Arg(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

impl<'de> Deserialize<'de> for TransferEndpoint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Index(usize),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Name(s) if s.eq_ignore_ascii_case("base") => Ok(Self::Base),
            Repr::Name(s) if s.eq_ignore_ascii_case("result") => Ok(Self::Result),
            Repr::Name(other) => Err(serde::de::Error::custom(format!(
                "expected \"BASE\", \"RESULT\" or an argument index, found {other:?}"
            ))),
            Repr::Index(i) => Ok(Self::Arg(i)),
        }
    }
}

/// `transfers[]`: `{method signature, from, to, type}` (`§6`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSpec {
    pub method: MethodSignature,
    pub from: TransferEndpoint,
    pub to: TransferEndpoint,
    #[serde(rename = "type")]
    pub ty: crate::ir::Type,
}

/// The taint configuration: sources, sinks and transfers, already
/// resolved against a [`Program`] so the taint pass never has to repeat
/// string lookups (`§6` schema table).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaintConfig {
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
    #[serde(default)]
    pub transfers: Vec<TransferSpec>,
}

impl TaintConfig {
    /// Parses a `TaintConfig` from its JSON representation.
    ///
    /// # Errors
    /// Returns [`ConfigError::Malformed`] if `json` does not match the
    /// schema.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Validates every entry against `program`, returning the entries that
    /// resolve plus the [`ConfigError`]s for the ones that don't. Matches
    /// `§7`'s "report with location, skip the entry; do not abort" policy:
    /// the returned [`TaintConfig`] only contains resolvable entries.
    #[must_use]
    pub fn resolve_against(self, program: &Program) -> (Self, Vec<ConfigError>) {
        let mut errors = Vec::new();
        let sources = self
            .sources
            .into_iter()
            .filter(|s| {
                let ok = program.method(&s.method.to_method_id()).is_some();
                if !ok {
                    errors.push(ConfigError::UnknownSourceMethod(s.method.to_string()));
                }
                ok
            })
            .collect();
        let sinks = self
            .sinks
            .into_iter()
            .filter(|s| {
                let Some(method) = program.method(&s.method.to_method_id()) else {
                    errors.push(ConfigError::UnknownSinkMethod(s.method.to_string()));
                    return false;
                };
                if s.param_index >= method.params.len() {
                    errors.push(ConfigError::UnknownSinkParam {
                        method: s.method.to_string(),
                        param_index: s.param_index,
                    });
                    return false;
                }
                true
            })
            .collect();
        let transfers = self
            .transfers
            .into_iter()
            .filter(|t| {
                let ok = program.method(&t.method.to_method_id()).is_some();
                if !ok {
                    errors.push(ConfigError::UnknownTransferMethod(t.method.to_string()));
                }
                ok
            })
            .collect();
        (
            Self {
                sources,
                sinks,
                transfers,
            },
            errors,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ClassId, MethodBuilder, ProgramBuilder, Subsignature, Type, StmtId, StmtKind};

    fn program_with_method(class: &str, sig: &str) -> Program {
        let mut pb = ProgramBuilder::new();
        pb.class(class, false, None, vec![]);
        let mut mb = MethodBuilder::new(Subsignature::new(sig), false)
            .this(Type::Class(ClassId::from(class)));
        mb.stmt(StmtId(0), StmtKind::Return(None));
        pb.method(&ClassId::from(class), mb);
        pb.build()
    }

    #[test]
    fn deserializes_the_s6_scenario_config() {
        let json = r#"{
            "sources": [{"method": {"class": "Io", "subsignature": "readSecret()"}, "return_type": {"Class": "String"}}],
            "sinks": [{"method": {"class": "Io", "subsignature": "log(Ljava/lang/Object;)"}, "param_index": 1}],
            "transfers": [{"method": {"class": "String", "subsignature": "concat(Ljava/lang/String;)"}, "from": 0, "to": "RESULT", "type": {"Class": "String"}}]
        }"#;
        let cfg = TaintConfig::from_json(json).expect("parses");
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sinks[0].param_index, 1);
        assert_eq!(cfg.transfers[0].from, TransferEndpoint::Arg(0));
        assert_eq!(cfg.transfers[0].to, TransferEndpoint::Result);
    }

    #[test]
    fn unresolved_source_is_reported_and_dropped_not_aborted() {
        let program = program_with_method("Io", "readSecret()");
        let cfg = TaintConfig {
            sources: vec![SourceSpec {
                method: MethodSignature {
                    class: "Io".into(),
                    subsignature: "missing()".into(),
                },
                return_type: Type::Class(ClassId::from("String")),
            }],
            sinks: vec![],
            transfers: vec![],
        };
        let (resolved, errors) = cfg.resolve_against(&program);
        assert!(resolved.sources.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ConfigError::UnknownSourceMethod(_)));
    }
}
