//! Classes of objects the module hands out.

use sc_02_call_bridge::NativeClass;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassTag {
    Channel,
    Query,
    Rng,
    ExchangeKey,
    AccessKey,
    VaultKey,
}

impl NativeClass for ClassTag {
    fn name(self) -> &'static str {
        match self {
            ClassTag::Channel => "Channel",
            ClassTag::Query => "Query",
            ClassTag::Rng => "Rng",
            ClassTag::ExchangeKey => "ExchangeKey",
            ClassTag::AccessKey => "AccessKey",
            ClassTag::VaultKey => "VaultKey",
        }
    }

    fn all() -> &'static [Self] {
        &[
            ClassTag::Channel,
            ClassTag::Query,
            ClassTag::Rng,
            ClassTag::ExchangeKey,
            ClassTag::AccessKey,
            ClassTag::VaultKey,
        ]
    }
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_02_call_bridge::{ClassTable, FaultKind};

    #[test]
    fn test_every_tag_resolves() {
        let table = ClassTable::<ClassTag>::build();
        assert_eq!(table.len(), ClassTag::all().len());
        for class in ClassTag::all() {
            assert_eq!(table.resolve(class.name()).unwrap(), *class);
        }
        assert_eq!(table.resolve("Wallet").unwrap_err().kind, FaultKind::UnknownClass);
    }
}
