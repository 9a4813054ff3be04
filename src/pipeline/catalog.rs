use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::errors::ScanhiveError;
use crate::models::scan::ScanType;
use crate::tools::{
    DigAdapter, FfufAdapter, MasscanAdapter, NmapAdapter, NmapProfile, NucleiAdapter, SubfinderAdapter,
    ToolAdapter,
};
use super::phase::{phase_definitions, Phase};

/// What a scan type runs: one adapter or a fixed phase sequence.
#[derive(Clone, Debug)]
pub enum ExecutionPlan {
    Single(Arc<dyn ToolAdapter>),
    Sequence(Vec<Phase>),
}

impl ExecutionPlan {
    pub fn adapters(&self) -> Vec<Arc<dyn ToolAdapter>> {
        match self {
            ExecutionPlan::Single(adapter) => vec![adapter.clone()],
            ExecutionPlan::Sequence(phases) => phases.iter().map(|p| p.adapter.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub program: String,
    pub available: bool,
}

/// Fixed mapping from scan type to execution plan, built once at startup.
#[derive(Clone, Default)]
pub struct ScanCatalog {
    plans: HashMap<ScanType, ExecutionPlan>,
}

impl ScanCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Standard plans, using configured program paths where set.
    pub fn from_config(config: &EngineConfig) -> Self {
        let nmap_fast: Arc<dyn ToolAdapter> = Arc::new(NmapAdapter::new(config.tool_path("nmap"), NmapProfile::Fast));
        let nmap_service: Arc<dyn ToolAdapter> =
            Arc::new(NmapAdapter::new(config.tool_path("nmap"), NmapProfile::Service));
        let masscan: Arc<dyn ToolAdapter> = Arc::new(MasscanAdapter::new(config.tool_path("masscan")));
        let dig: Arc<dyn ToolAdapter> = Arc::new(DigAdapter::new(config.tool_path("dig")));
        let subfinder: Arc<dyn ToolAdapter> = Arc::new(SubfinderAdapter::new(config.tool_path("subfinder")));
        let nuclei: Arc<dyn ToolAdapter> = Arc::new(NucleiAdapter::new(config.tool_path("nuclei")));
        let ffuf: Arc<dyn ToolAdapter> =
            Arc::new(FfufAdapter::new(config.tool_path("ffuf"), config.ffuf_wordlist()));

        // Sequences resolve phase tools by name; nmap runs with service detection there.
        let by_tool: HashMap<&str, Arc<dyn ToolAdapter>> = HashMap::from([
            ("nmap", nmap_service.clone()),
            ("masscan", masscan.clone()),
            ("dig", dig.clone()),
            ("subfinder", subfinder.clone()),
            ("nuclei", nuclei.clone()),
            ("ffuf", ffuf.clone()),
        ]);
        let sequence = |scan_type: ScanType| {
            let phases = phase_definitions(scan_type)
                .iter()
                .filter_map(|def| {
                    by_tool
                        .get(def.tool)
                        .map(|adapter| Phase::new(def.name, adapter.clone(), def.weight))
                })
                .collect();
            ExecutionPlan::Sequence(phases)
        };

        Self::empty()
            .with_plan(ScanType::Quick, ExecutionPlan::Single(nmap_fast))
            .with_plan(ScanType::Service, ExecutionPlan::Single(nmap_service.clone()))
            .with_plan(ScanType::Masscan, ExecutionPlan::Single(masscan))
            .with_plan(ScanType::Dns, ExecutionPlan::Single(dig.clone()))
            .with_plan(ScanType::Subdomain, ExecutionPlan::Single(subfinder.clone()))
            .with_plan(ScanType::Vuln, ExecutionPlan::Single(nuclei.clone()))
            .with_plan(ScanType::WebFuzz, ExecutionPlan::Single(ffuf.clone()))
            .with_plan(ScanType::FullRecon, sequence(ScanType::FullRecon))
            .with_plan(ScanType::FullWeb, sequence(ScanType::FullWeb))
    }

    pub fn with_plan(mut self, scan_type: ScanType, plan: ExecutionPlan) -> Self {
        self.plans.insert(scan_type, plan);
        self
    }

    pub fn plan(&self, scan_type: ScanType) -> Result<&ExecutionPlan, ScanhiveError> {
        self.plans
            .get(&scan_type)
            .ok_or_else(|| ScanhiveError::Validation(format!("Scan type '{}' is not enabled", scan_type)))
    }

    /// Availability of every distinct program the catalog can run, sorted by tool name.
    pub fn tool_statuses(&self) -> Vec<ToolStatus> {
        let mut seen: HashMap<(String, String), bool> = HashMap::new();
        for plan in self.plans.values() {
            for adapter in plan.adapters() {
                let key = (adapter.name().to_string(), adapter.program().to_string());
                if !seen.contains_key(&key) {
                    let available = adapter.is_available();
                    seen.insert(key, available);
                }
            }
        }
        let mut statuses: Vec<ToolStatus> = seen
            .into_iter()
            .map(|((name, program), available)| ToolStatus { name, program, available })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.program.cmp(&b.program)));
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_scan_type_has_a_plan() {
        let catalog = ScanCatalog::from_config(&EngineConfig::default());
        for scan_type in ScanType::ALL {
            let plan = catalog.plan(scan_type).unwrap();
            assert_eq!(matches!(plan, ExecutionPlan::Sequence(_)), scan_type.is_sequence(), "{}", scan_type);
        }
    }

    #[test]
    fn test_full_recon_phase_order() {
        let catalog = ScanCatalog::from_config(&EngineConfig::default());
        let ExecutionPlan::Sequence(phases) = catalog.plan(ScanType::FullRecon).unwrap() else {
            panic!("expected sequence");
        };
        let tools: Vec<&str> = phases.iter().map(|p| p.adapter.name()).collect();
        assert_eq!(tools, vec!["subfinder", "dig", "nmap", "nuclei"]);
        let weights: Vec<u32> = phases.iter().map(|p| p.weight).collect();
        assert_eq!(weights, vec![25, 10, 40, 25]);
    }

    #[test]
    fn test_configured_paths_are_used() {
        let config = crate::config::parser::parse_config_str("tools:\n  nuclei: /opt/nuclei/nuclei\n").unwrap();
        let catalog = ScanCatalog::from_config(&config);
        let ExecutionPlan::Single(adapter) = catalog.plan(ScanType::Vuln).unwrap() else {
            panic!("expected single");
        };
        assert_eq!(adapter.program(), "/opt/nuclei/nuclei");
    }

    #[test]
    fn test_empty_catalog_rejects_type() {
        let err = ScanCatalog::empty().plan(ScanType::Dns).unwrap_err();
        assert!(matches!(err, ScanhiveError::Validation(_)));
    }

    #[test]
    fn test_tool_statuses_are_deduplicated() {
        let catalog = ScanCatalog::from_config(&EngineConfig::default());
        let statuses = catalog.tool_statuses();
        let names: Vec<&str> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["dig", "ffuf", "masscan", "nmap", "nuclei", "subfinder"]);
    }
}
