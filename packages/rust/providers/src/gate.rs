//! Probe gate: the cost/volume budget consulted before each provider call.
//!
//! A veto is treated exactly like a provider failure — the call is skipped
//! and recorded as absence of a result, never as a batch abort.

use std::sync::Mutex;

use tracing::warn;

use citelens_shared::BudgetConfig;

/// Whether a provider call may proceed.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Admit,
    /// Vetoed, with the reason recorded in the failure accounting.
    Veto(String),
}

/// Consulted before each provider call; implementations may veto.
pub trait ProbeGate: Send + Sync {
    /// Decide whether a call to `provider` may proceed.
    fn admit(&self, provider: &str) -> GateDecision;

    /// Report actual spend after a completed call.
    fn record_cost(&self, provider: &str, cost_usd: f64);
}

/// Gate that admits everything (dry runs, tests).
pub struct OpenGate;

impl ProbeGate for OpenGate {
    fn admit(&self, _provider: &str) -> GateDecision {
        GateDecision::Admit
    }

    fn record_cost(&self, _provider: &str, _cost_usd: f64) {}
}

/// Run-scoped budget: a maximum call count and a maximum USD spend.
pub struct CostBudget {
    max_probes: u32,
    max_cost_usd: f64,
    state: Mutex<BudgetState>,
}

#[derive(Default)]
struct BudgetState {
    probes: u32,
    spent_usd: f64,
}

impl CostBudget {
    pub fn new(max_probes: u32, max_cost_usd: f64) -> Self {
        Self {
            max_probes,
            max_cost_usd,
            state: Mutex::new(BudgetState::default()),
        }
    }

    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(config.max_probes_per_run, config.max_cost_usd)
    }

    /// Spend so far in this run.
    pub fn spent_usd(&self) -> f64 {
        self.state.lock().expect("budget lock poisoned").spent_usd
    }

    /// Calls admitted so far in this run.
    pub fn probes(&self) -> u32 {
        self.state.lock().expect("budget lock poisoned").probes
    }
}

impl ProbeGate for CostBudget {
    fn admit(&self, provider: &str) -> GateDecision {
        let mut state = self.state.lock().expect("budget lock poisoned");
        if state.probes >= self.max_probes {
            warn!(provider, probes = state.probes, "probe budget exhausted");
            return GateDecision::Veto(format!(
                "probe budget exhausted ({} calls)",
                self.max_probes
            ));
        }
        if state.spent_usd >= self.max_cost_usd {
            warn!(provider, spent = state.spent_usd, "cost budget exhausted");
            return GateDecision::Veto(format!(
                "cost budget exhausted (${:.2})",
                self.max_cost_usd
            ));
        }
        state.probes += 1;
        GateDecision::Admit
    }

    fn record_cost(&self, _provider: &str, cost_usd: f64) {
        let mut state = self.state.lock().expect("budget lock poisoned");
        state.spent_usd += cost_usd;
    }
}
