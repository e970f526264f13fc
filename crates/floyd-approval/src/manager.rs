use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use floyd_core::{PermissionRule, Verdict};
use globset::Glob;
use tracing::debug;

use crate::error::{ApprovalError, ApprovalResult};

/// How long a grant or denial lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantScope {
    /// Consumed by the very next `check` for this tool name.
    Once,
    /// Lasts until the process exits.
    Session,
    /// Persisted to the rules file; survives restarts.
    Always,
}

struct CompiledRule {
    matcher: Glob,
    source: PermissionRule,
}

/// Deterministic, pattern-based authorization for tool names.
///
/// `check` never blocks: it only computes a verdict. When that verdict is
/// `ask`, pausing for a human decision and feeding the result back via
/// `grant`/`deny` is the Agent Engine's job.
pub struct PermissionManager {
    once: Mutex<HashMap<String, Verdict>>,
    session: Mutex<HashMap<String, Verdict>>,
    /// Persisted always-scope overrides, highest-priority rules first.
    always: RwLock<Arc<Vec<CompiledRule>>>,
    /// The static, caller-configured rule list — lowest priority short of
    /// the `ask` fallback.
    static_rules: RwLock<Arc<Vec<CompiledRule>>>,
}

impl PermissionManager {
    /// Build a manager from the static rule list, loading any persisted
    /// `always`-scope overrides from disk.
    pub fn new(static_rules: Vec<PermissionRule>) -> ApprovalResult<Self> {
        let always = floyd_config::load_permission_rules()?;
        Ok(Self {
            once: Mutex::new(HashMap::new()),
            session: Mutex::new(HashMap::new()),
            always: RwLock::new(Arc::new(compile(always)?)),
            static_rules: RwLock::new(Arc::new(compile(static_rules)?)),
        })
    }

    /// Build a manager with no persisted state — useful in tests.
    pub fn in_memory(static_rules: Vec<PermissionRule>) -> ApprovalResult<Self> {
        Ok(Self {
            once: Mutex::new(HashMap::new()),
            session: Mutex::new(HashMap::new()),
            always: RwLock::new(Arc::new(Vec::new())),
            static_rules: RwLock::new(Arc::new(compile(static_rules)?)),
        })
    }

    /// Compute the verdict for `tool_name`. O(rules); first match wins at
    /// each layer, and layers are consulted in priority order: once →
    /// session → always → static rules → `ask`.
    pub fn check(&self, tool_name: &str) -> Verdict {
        if let Some(verdict) = self.once.lock().expect("lock poisoned").remove(tool_name) {
            debug!(tool = tool_name, ?verdict, "consumed once-grant");
            return verdict;
        }
        if let Some(&verdict) = self.session.lock().expect("lock poisoned").get(tool_name) {
            return verdict;
        }
        let always = Arc::clone(&self.always.read().expect("lock poisoned"));
        if let Some(verdict) = first_match(&always, tool_name) {
            return verdict;
        }
        let static_rules = Arc::clone(&self.static_rules.read().expect("lock poisoned"));
        first_match(&static_rules, tool_name).unwrap_or(Verdict::Ask)
    }

    /// Record a grant (verdict `Allow`) for `tool_name` at the given scope.
    pub fn grant(&self, tool_name: &str, scope: GrantScope) -> ApprovalResult<()> {
        self.set(tool_name, Verdict::Allow, scope)
    }

    /// Record a denial (verdict `Deny`) for `tool_name` at the given scope.
    pub fn deny(&self, tool_name: &str, scope: GrantScope) -> ApprovalResult<()> {
        self.set(tool_name, Verdict::Deny, scope)
    }

    /// Remove any `session` or `always` override for `tool_name`, falling
    /// back to the static rule list on the next `check`.
    pub fn reset(&self, tool_name: &str) -> ApprovalResult<()> {
        self.session.lock().expect("lock poisoned").remove(tool_name);
        let mut always = (*self.always.read().expect("lock poisoned")).clone();
        let before = always.len();
        always.retain(|r| r.source.pattern != tool_name);
        if always.len() != before {
            self.persist_always(&always)?;
        }
        Ok(())
    }

    fn set(&self, tool_name: &str, verdict: Verdict, scope: GrantScope) -> ApprovalResult<()> {
        match scope {
            GrantScope::Once => {
                self.once
                    .lock()
                    .expect("lock poisoned")
                    .insert(tool_name.to_string(), verdict);
            }
            GrantScope::Session => {
                self.session
                    .lock()
                    .expect("lock poisoned")
                    .insert(tool_name.to_string(), verdict);
            }
            GrantScope::Always => {
                let mut always = (*self.always.read().expect("lock poisoned")).clone();
                always.retain(|r| r.source.pattern != tool_name);
                always.insert(
                    0,
                    CompiledRule {
                        matcher: compile_one(tool_name)?,
                        source: PermissionRule::new(tool_name, verdict),
                    },
                );
                self.persist_always(&always)?;
            }
        }
        Ok(())
    }

    fn persist_always(&self, rules: &[CompiledRule]) -> ApprovalResult<()> {
        let sources: Vec<PermissionRule> = rules.iter().map(|r| r.source.clone()).collect();
        floyd_config::save_permission_rules(&sources)?;
        *self.always.write().expect("lock poisoned") = Arc::new(
            rules
                .iter()
                .map(|r| CompiledRule {
                    matcher: r.matcher.clone(),
                    source: r.source.clone(),
                })
                .collect(),
        );
        Ok(())
    }
}

fn compile(rules: Vec<PermissionRule>) -> ApprovalResult<Vec<CompiledRule>> {
    rules
        .into_iter()
        .map(|rule| {
            let matcher = compile_one(&rule.pattern)?;
            Ok(CompiledRule {
                matcher,
                source: rule,
            })
        })
        .collect()
}

fn compile_one(pattern: &str) -> ApprovalResult<Glob> {
    Glob::new(pattern).map_err(|source| ApprovalError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn first_match(rules: &[CompiledRule], tool_name: &str) -> Option<Verdict> {
    rules
        .iter()
        .find(|r| r.matcher.compile_matcher().is_match(tool_name))
        .map(|r| r.source.verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(rules: Vec<PermissionRule>) -> PermissionManager {
        PermissionManager::in_memory(rules).unwrap()
    }

    #[test]
    fn default_verdict_is_ask_when_nothing_matches() {
        let mgr = manager(vec![]);
        assert_eq!(mgr.check("shell"), Verdict::Ask);
    }

    #[test]
    fn first_matching_static_rule_wins() {
        let mgr = manager(vec![
            PermissionRule::new("fs-write", Verdict::Deny),
            PermissionRule::new("fs-*", Verdict::Allow),
        ]);
        assert_eq!(mgr.check("fs-write"), Verdict::Deny);
        assert_eq!(mgr.check("fs-read"), Verdict::Allow);
    }

    #[test]
    fn once_grant_is_consumed_exactly_once() {
        let mgr = manager(vec![PermissionRule::new("shell", Verdict::Ask)]);
        mgr.grant("shell", GrantScope::Once).unwrap();
        assert_eq!(mgr.check("shell"), Verdict::Allow);
        assert_eq!(mgr.check("shell"), Verdict::Ask);
    }

    #[test]
    fn session_grant_persists_across_checks_but_not_processes() {
        let mgr = manager(vec![]);
        mgr.grant("shell", GrantScope::Session).unwrap();
        assert_eq!(mgr.check("shell"), Verdict::Allow);
        assert_eq!(mgr.check("shell"), Verdict::Allow);
    }

    #[test]
    fn session_scope_outranks_the_static_list() {
        let mgr = manager(vec![PermissionRule::new("shell", Verdict::Deny)]);
        mgr.grant("shell", GrantScope::Session).unwrap();
        assert_eq!(mgr.check("shell"), Verdict::Allow);
    }

    #[test]
    fn reset_clears_a_session_override() {
        let mgr = manager(vec![PermissionRule::new("shell", Verdict::Deny)]);
        mgr.grant("shell", GrantScope::Session).unwrap();
        mgr.reset("shell").unwrap();
        assert_eq!(mgr.check("shell"), Verdict::Deny);
    }

    #[test]
    fn star_matches_everything() {
        let mgr = manager(vec![PermissionRule::new("*", Verdict::Allow)]);
        assert_eq!(mgr.check("anything"), Verdict::Allow);
    }
}
