//! Declarative member selection
//!
//! A [`MatchCriteria`] is an immutable set of predicates combined by logical
//! AND; a member either satisfies all of them or is excluded. Matching is
//! purely structural — it never inspects body content — and has no side
//! effects, so repeated selection over an unchanged model is idempotent.

use crate::model::{ClassModel, MemberModel, MemberRef};
use crate::TypeDesc;
use glob::Pattern;

/// Which member variant to match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Methods only
    Method,
    /// Fields only
    Field,
}

/// An AND-combined set of member selection predicates
#[derive(Debug, Clone, Default)]
pub struct MatchCriteria {
    kind: Option<MemberKind>,
    name: Option<String>,
    name_pattern: Option<Pattern>,
    descriptor: Option<String>,
    access_mask: u32,
    annotation: Option<String>,
}

impl MatchCriteria {
    /// Criteria matching every member
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria matching methods only
    pub fn methods() -> Self {
        Self {
            kind: Some(MemberKind::Method),
            ..Self::default()
        }
    }

    /// Criteria matching fields only
    pub fn fields() -> Self {
        Self {
            kind: Some(MemberKind::Field),
            ..Self::default()
        }
    }

    /// Require an exact member name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Require the name to match a glob pattern, e.g. `ba*`
    ///
    /// Invalid patterns are rejected at construction, not at match time.
    pub fn with_name_pattern(mut self, pattern: &str) -> Result<Self, glob::PatternError> {
        self.name_pattern = Some(Pattern::new(pattern)?);
        Ok(self)
    }

    /// Require an exact descriptor (compiled syntax, e.g. `(I)V` or `I`)
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    /// Require every bit of `mask` to be set in the member's access flags
    pub fn with_access(mut self, mask: u32) -> Self {
        self.access_mask |= mask;
        self
    }

    /// Require an annotation of the given dotted type name to be present
    pub fn with_annotation(mut self, name: impl Into<String>) -> Self {
        self.annotation = Some(name.into());
        self
    }

    /// Check a single member against all predicates
    pub fn matches(&self, member: &MemberModel) -> bool {
        if let Some(kind) = self.kind {
            let actual = match member {
                MemberModel::Method(_) => MemberKind::Method,
                MemberModel::Field(_) => MemberKind::Field,
            };
            if actual != kind {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if member.name() != name {
                return false;
            }
        }
        if let Some(pattern) = &self.name_pattern {
            if !pattern.matches(member.name()) {
                return false;
            }
        }
        if let Some(descriptor) = &self.descriptor {
            if &member.descriptor_string() != descriptor {
                return false;
            }
        }
        if member.access() & self.access_mask != self.access_mask {
            return false;
        }
        if let Some(annotation) = &self.annotation {
            let present = member.annotations().iter().any(|a| match &a.ty {
                TypeDesc::Object(name) => name == annotation,
                _ => false,
            });
            if !present {
                return false;
            }
        }
        true
    }

    /// Select matching members, in declaration order
    pub fn select<'a>(&self, class: &'a ClassModel) -> Vec<&'a MemberModel> {
        class
            .members()
            .iter()
            .filter(|member| self.matches(member))
            .collect()
    }

    /// Select references to matching members, for feeding the mutation engine
    pub fn select_refs(&self, class: &ClassModel) -> Vec<MemberRef> {
        self.select(class)
            .into_iter()
            .map(MemberModel::reference)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MethodDesc;
    use crate::model::{AnnotationModel, FieldModel, MethodModel, Origin};
    use opal_bytecode::access;

    fn sample_class() -> ClassModel {
        let mut class = ClassModel::new(Origin::Bytecode, "demo.Counter");
        let mut count = FieldModel::new("count", TypeDesc::Int);
        count.access = access::PRIVATE | access::STATIC;
        class.push_member(MemberModel::Field(count));

        let mut foo = MethodModel::new("foo", MethodDesc::parse("()V").unwrap());
        foo.access = access::PUBLIC;
        class.push_member(MemberModel::Method(foo));

        let mut bar = MethodModel::new("bar", MethodDesc::parse("(I)V").unwrap());
        bar.access = access::PUBLIC;
        bar.annotations.push(AnnotationModel::marker("demo.Slow"));
        class.push_member(MemberModel::Method(bar));

        let mut baz = MethodModel::new("baz", MethodDesc::parse("(I)I").unwrap());
        baz.access = access::PUBLIC | access::STATIC;
        class.push_member(MemberModel::Method(baz));

        class
    }

    #[test]
    fn test_select_all_in_declaration_order() {
        let class = sample_class();
        let names: Vec<&str> = MatchCriteria::new()
            .select(&class)
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["count", "foo", "bar", "baz"]);
    }

    #[test]
    fn test_select_is_idempotent() {
        let class = sample_class();
        let criteria = MatchCriteria::methods();
        let first: Vec<String> = criteria
            .select(&class)
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        let second: Vec<String> = criteria
            .select(&class)
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_name_pattern() {
        let class = sample_class();
        let criteria = MatchCriteria::new().with_name_pattern("ba*").unwrap();
        let names: Vec<&str> = criteria.select(&class).iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["bar", "baz"]);
    }

    #[test]
    fn test_predicates_are_anded() {
        let class = sample_class();
        let criteria = MatchCriteria::methods()
            .with_name_pattern("ba*")
            .unwrap()
            .with_descriptor("(I)V");
        let selected = criteria.select(&class);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "bar");
    }

    #[test]
    fn test_access_mask_requires_all_bits() {
        let class = sample_class();
        let criteria = MatchCriteria::new().with_access(access::PUBLIC | access::STATIC);
        let names: Vec<&str> = criteria.select(&class).iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["baz"]);
    }

    #[test]
    fn test_annotation_presence() {
        let class = sample_class();
        let criteria = MatchCriteria::new().with_annotation("demo.Slow");
        let selected = criteria.select(&class);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "bar");
    }

    #[test]
    fn test_no_match_is_empty() {
        let class = sample_class();
        let criteria = MatchCriteria::new().with_name("missing");
        assert!(criteria.select(&class).is_empty());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(MatchCriteria::new().with_name_pattern("ba[").is_err());
    }
}
