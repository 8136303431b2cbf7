//! Update rules and the version chain
//!
//! Each schema revision is an [`UpdateRule`] built from a small set of
//! positional field-editing primitives. Rules are registered in a
//! [`VersionChain`] that is verified gap-free when it is built.
//!
//! # Core Concepts
//!
//! - [`primitives`]: insert, delete, move, rename, remap and derive operations
//! - [`RecordEdit`]: the per-record surface a handler works through
//! - [`RevisionRule`]: a rule made of per-object-type handlers
//! - [`VersionChain`]: ordered rules between consecutive releases
//! - [`Diagnostics`]: ordered record of every non-trivial decision
//! - [`catalog`]: the built-in releases, rules and schema bundle
//!
//! # Example
//!
//! ```rust,ignore
//! use modelver_rules::prelude::*;
//!
//! let rule = RevisionRule::builder(revision, "boiler gains a subcategory")
//!     .handler("OS:Boiler:Steam", |edit| {
//!         edit.insert(15, "General")?;
//!         Ok(())
//!     })
//!     .build()?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod catalog;
pub mod chain;
mod diagnostics;
mod edit;
pub mod primitives;
mod revision;
pub mod rule;

pub use chain::{ChainError, ChainLookup, VersionChain, VersionChainBuilder};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use edit::RecordEdit;
pub use primitives::{EditError, EnumRemap, LossPolicy, RemapOutcome};
pub use revision::Revision;
pub use rule::{
    ChangeLog, ComposedRule, IdentityRule, RecordChange, RevisionRule, RevisionRuleBuilder,
    RuleError, StepContext, UpdateRule,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for writing rules
pub mod prelude {
    pub use crate::{
        Diagnostic, Diagnostics, EditError, EnumRemap, RecordEdit, Revision, RevisionRule,
        RuleError, Severity, StepContext, UpdateRule, VersionChain,
    };
    pub use modelver_document::{Document, Field, Record, RecordId};
    pub use modelver_schema::{SchemaAccessor, Version};
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use modelver_document::{Document, Field};
    use modelver_schema::Version;

    #[test]
    fn builtin_chain_runs_end_to_end_on_empty_document() {
        let chain = catalog::builtin_chain().unwrap();
        let schema = catalog::builtin_schema().unwrap();
        let mut doc = Document::new(chain.oldest());

        for rule in chain.rules() {
            let mut ctx = StepContext::new(schema.as_ref(), rule.revision());
            doc = rule.apply(&doc, &mut ctx).unwrap();
            doc.validate(schema.as_ref()).unwrap();
        }
        assert_eq!(doc.version(), Version::new(3, 1, 0));
    }

    #[test]
    fn composed_catalog_matches_stepwise() {
        let chain = catalog::builtin_chain().unwrap();
        let schema = catalog::builtin_schema().unwrap();
        let from = Version::new(2, 9, 1);
        let to = Version::new(3, 1, 0);

        let mut doc = Document::new(from);
        let mut fields = vec![Field::Blank; 15];
        fields[1] = Field::text("Gas");
        doc.add_record("OS:Boiler:Steam", {
            fields.push(Field::text("General"));
            fields
        });

        let mut stepwise = doc.clone();
        for rule in chain.rules().filter(|r| r.revision().from >= from) {
            let mut ctx = StepContext::new(schema.as_ref(), rule.revision());
            stepwise = rule.apply(&stepwise, &mut ctx).unwrap();
        }

        let composed = chain.compose(&from, &to).unwrap();
        let mut ctx = StepContext::new(schema.as_ref(), composed.revision());
        let combined = composed.apply(&doc, &mut ctx).unwrap();

        assert_eq!(combined.fingerprint().unwrap(), stepwise.fingerprint().unwrap());
    }
}
