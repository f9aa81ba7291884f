//! Least-fixpoint check that a schema admits at least one finite value.

use std::collections::HashSet;

use crate::schema::Schema;

pub(crate) fn is_inhabited(schema: &Schema) -> bool {
    Inhabitation::default().check(schema)
}

#[derive(Default)]
struct Inhabitation {
    /// Recursive names on the current path; reaching one again proves nothing.
    visiting: HashSet<String>,
    known: HashSet<String>,
}

impl Inhabitation {
    fn check(&mut self, schema: &Schema) -> bool {
        match schema {
            Schema::Primitive(_) | Schema::List(_) | Schema::Dictionary(_) => true,
            Schema::Record(record) => record
                .fields()
                .iter()
                .filter(|f| !f.optional)
                .all(|f| self.check(&f.schema)),
            Schema::Variant(variant) => variant
                .constructors()
                .iter()
                .any(|ctor| ctor.args.iter().all(|arg| self.check(&arg.schema))),
            Schema::Representation(repr) => self.check(repr.proxy()),
            Schema::Recursive(handle) => {
                let name = handle.name();
                if self.known.contains(name) {
                    return true;
                }
                if !self.visiting.insert(name.to_string()) {
                    return false;
                }
                let inhabited = handle.get().is_some_and(|target| self.check(target));
                self.visiting.remove(name);
                if inhabited {
                    self.known.insert(name.to_string());
                }
                inhabited
            }
        }
    }
}
