use ledger_wizard_confirmation::{DelegateIs, SemanticCheck, StakeAbove};
use ledger_wizard_types::{BranchVariant, StageKind, StageProgress};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::FlowError;

// ═══════════════════════════════════════════════════════════════════════════
// TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════

/// One stage of a flow before pruning
#[derive(Clone)]
pub struct StageTemplate {
    pub id: String,
    pub title: String,
    pub kind: StageKind,
    pub check: Option<Arc<dyn SemanticCheck>>,
    /// Skipped by the abbreviated variant
    pub full_only: bool,
}

impl StageTemplate {
    pub fn input(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: StageKind::Input,
            check: None,
            full_only: false,
        }
    }

    pub fn submit(
        id: impl Into<String>,
        title: impl Into<String>,
        check: impl SemanticCheck + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: StageKind::Submit,
            check: Some(Arc::new(check)),
            full_only: false,
        }
    }

    pub fn full_only(mut self) -> Self {
        self.full_only = true;
        self
    }

    fn included_in(&self, variant: BranchVariant) -> bool {
        match variant {
            BranchVariant::Full => true,
            BranchVariant::Abbreviated => !self.full_only,
        }
    }
}

impl fmt::Debug for StageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageTemplate")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("check", &self.check.as_ref().map(|check| check.describe()))
            .field("full_only", &self.full_only)
            .finish()
    }
}

/// Ordered stage list shared by every session of one kind of operation
#[derive(Debug, Clone, Default)]
pub struct FlowTemplate {
    name: String,
    stages: Vec<StageTemplate>,
}

impl FlowTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Choose a delegate, then stake. Accounts that already delegate skip
    /// straight to the stake submission.
    pub fn delegate_then_stake(delegate: impl Into<String>, stake_baseline: u128) -> Self {
        let delegate = delegate.into();
        Self::new("delegate_then_stake")
            .stage(StageTemplate::input("choose_delegate", "Choose a delegate").full_only())
            .stage(StageTemplate::input("review_delegation", "Review delegation").full_only())
            .stage(
                StageTemplate::submit(
                    "submit_delegation",
                    "Submit delegation",
                    DelegateIs::new(delegate),
                )
                .full_only(),
            )
            .stage(StageTemplate::submit(
                "submit_stake",
                "Submit stake",
                StakeAbove::new(stake_baseline),
            ))
            .stage(StageTemplate::input("summary", "Summary"))
    }

    pub fn stage(mut self, stage: StageTemplate) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn push(&mut self, stage: StageTemplate) {
        self.stages.push(stage);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[StageTemplate] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        if self.stages.is_empty() {
            errors.push("template has no stages".to_string());
        }
        for stage in &self.stages {
            if !seen.insert(stage.id.as_str()) {
                errors.push(format!("duplicate stage id '{}'", stage.id));
            }
            if stage.kind.is_submit() && stage.check.is_none() {
                errors.push(format!("submit stage '{}' has no semantic check", stage.id));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FlowError::InvalidTemplate(errors.join("; ")))
        }
    }

    /// Stages kept for `variant`, in template order, with progress
    /// renumbered over the kept stages only
    pub fn prune(&self, variant: BranchVariant) -> Vec<StageDescriptor> {
        let kept: Vec<&StageTemplate> = self
            .stages
            .iter()
            .filter(|stage| stage.included_in(variant))
            .collect();
        let total = kept.len();

        kept.into_iter()
            .enumerate()
            .map(|(index, stage)| StageDescriptor {
                index,
                id: stage.id.clone(),
                title: stage.title.clone(),
                kind: stage.kind,
                progress: StageProgress::new(index + 1, total),
                check: stage.check.clone(),
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DESCRIPTORS
// ═══════════════════════════════════════════════════════════════════════════

/// A stage of a running session
#[derive(Clone)]
pub struct StageDescriptor {
    /// Position within the pruned stage list
    pub index: usize,
    pub id: String,
    pub title: String,
    pub kind: StageKind,
    pub progress: StageProgress,
    check: Option<Arc<dyn SemanticCheck>>,
}

impl StageDescriptor {
    pub fn check(&self) -> Option<&Arc<dyn SemanticCheck>> {
        self.check.as_ref()
    }

    pub fn is_submit(&self) -> bool {
        self.kind.is_submit()
    }
}

impl PartialEq for StageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.id == other.id
            && self.kind == other.kind
            && self.progress == other.progress
    }
}

impl fmt::Debug for StageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("progress", &self.progress)
            .field("check", &self.check.as_ref().map(|check| check.describe()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_wizard_types::RemoteStateSnapshot;

    fn ids(stages: &[StageDescriptor]) -> Vec<&str> {
        stages.iter().map(|stage| stage.id.as_str()).collect()
    }

    #[test]
    fn test_full_variant_keeps_every_stage() {
        let template = FlowTemplate::delegate_then_stake("baker1", 0);
        let stages = template.prune(BranchVariant::Full);

        assert_eq!(
            ids(&stages),
            vec![
                "choose_delegate",
                "review_delegation",
                "submit_delegation",
                "submit_stake",
                "summary"
            ]
        );
        assert_eq!(stages[2].progress, StageProgress::new(3, 5));
        assert!(stages[4].progress.is_last());
    }

    #[test]
    fn test_abbreviated_is_ordered_subsequence() {
        let template = FlowTemplate::delegate_then_stake("baker1", 0);
        let full = template.prune(BranchVariant::Full);
        let abbreviated = template.prune(BranchVariant::Abbreviated);

        assert!(abbreviated.len() < full.len());

        let mut cursor = full.iter();
        for stage in &abbreviated {
            assert!(cursor.any(|candidate| candidate.id == stage.id));
        }

        assert_eq!(abbreviated[0].kind, StageKind::Submit);
        assert_eq!(abbreviated[0].id, "submit_stake");
    }

    #[test]
    fn test_abbreviated_progress_is_renumbered() {
        let template = FlowTemplate::delegate_then_stake("baker1", 0);
        let stages = template.prune(BranchVariant::Abbreviated);

        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].index, 0);
        assert_eq!(stages[0].progress.to_string(), "1/2");
        assert_eq!(stages[1].progress.to_string(), "2/2");
    }

    #[test]
    fn test_stock_checks_are_attached() {
        let template = FlowTemplate::delegate_then_stake("baker1", 10);
        let stages = template.prune(BranchVariant::Full);

        let delegation = stages[2].check().unwrap();
        assert_eq!(delegation.describe(), "delegate_is(baker1)");
        assert!(delegation.holds(&RemoteStateSnapshot::new("a").with_delegate("baker1"), 1));

        let stake = stages[3].check().unwrap();
        assert!(!stake.holds(&RemoteStateSnapshot::new("a").with_staked(10), 2));
        assert!(stake.holds(&RemoteStateSnapshot::new("a").with_staked(11), 2));

        assert!(stages[0].check().is_none());
    }

    #[test]
    fn test_validate_collects_problems() {
        let mut broken = StageTemplate::input("stake", "Stake");
        broken.kind = StageKind::Submit;
        let template = FlowTemplate::new("broken")
            .stage(StageTemplate::input("stake", "Stake"))
            .stage(broken);

        let err = template.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate stage id 'stake'"));
        assert!(err.contains("has no semantic check"));

        assert!(FlowTemplate::new("empty").validate().is_err());
        assert!(FlowTemplate::delegate_then_stake("baker1", 0).validate().is_ok());
    }

    #[test]
    fn test_closure_checks() {
        let template = FlowTemplate::new("custom").stage(StageTemplate::submit(
            "bump_height",
            "Wait for height",
            |snapshot: &RemoteStateSnapshot, _cycle: u64| snapshot.height > 100,
        ));
        let stages = template.prune(BranchVariant::Abbreviated);

        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].check().unwrap().describe(), "custom");
    }
}
