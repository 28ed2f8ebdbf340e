use engagement_core::{CoreError, Result};

/// Bounds how deep a chain of AI skill invocations may go and forbids a
/// skill from re-entering itself. Immutable and cheap to clone — each
/// call into a nested skill gets its own extended copy rather than a
/// shared mutable counter.
#[derive(Debug, Clone, Default)]
pub struct SkillInvocationGuard {
    chain: Vec<String>,
}

const MAX_DEPTH: usize = 3;

impl SkillInvocationGuard {
    pub fn root() -> Self {
        Self { chain: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Returns a guard extended with `skill`, or an error if doing so
    /// would exceed the depth cap or re-enter a skill already on the chain.
    pub fn enter(&self, skill: &str) -> Result<Self> {
        if self.chain.len() >= MAX_DEPTH {
            return Err(CoreError::permanent(format!(
                "skill invocation depth exceeded: cannot enter '{skill}' at depth {}",
                self.chain.len()
            )));
        }
        if self.chain.iter().any(|s| s == skill) {
            return Err(CoreError::permanent(format!(
                "skill '{skill}' cannot invoke itself, directly or via the current chain"
            )));
        }
        let mut chain = self.chain.clone();
        chain.push(skill.to_string());
        Ok(Self { chain })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_depth() {
        let guard = SkillInvocationGuard::root();
        let guard = guard.enter("a").unwrap();
        let guard = guard.enter("b").unwrap();
        let guard = guard.enter("c").unwrap();
        assert_eq!(guard.depth(), 3);
    }

    #[test]
    fn rejects_exceeding_max_depth() {
        let guard = SkillInvocationGuard::root()
            .enter("a")
            .unwrap()
            .enter("b")
            .unwrap()
            .enter("c")
            .unwrap();
        assert!(guard.enter("d").is_err());
    }

    #[test]
    fn rejects_direct_self_invocation() {
        let guard = SkillInvocationGuard::root().enter("draft_email").unwrap();
        assert!(guard.enter("draft_email").is_err());
    }

    #[test]
    fn rejects_indirect_re_entry_of_an_earlier_skill() {
        let guard = SkillInvocationGuard::root().enter("a").unwrap().enter("b").unwrap();
        assert!(guard.enter("a").is_err());
    }
}
