// custos-core/src/infrastructure/config/registry.rs

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::error::DomainError;
use crate::domain::tenant::TenantConfig;
use crate::infrastructure::error::InfrastructureError;

/// Immutable snapshot of the tenant definitions for one run batch.
///
/// Loaded and validated once; PipelineRunner only ever reads it, so a
/// tenant's configuration cannot change under a running cycle.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    tenants: Vec<TenantConfig>,
}

#[instrument(skip(path))] // Log automatique de l'entrée/sortie de la fonction
pub fn load_registry(path: &Path) -> Result<ConfigRegistry, InfrastructureError> {
    let config_path = find_config_file(path)?;
    info!(path = ?config_path, "Loading tenant registry");

    let content = fs::read_to_string(&config_path)?;
    let entries: Vec<TenantConfig> = serde_json::from_str(&content)?;

    ConfigRegistry::from_entries(entries)
}

fn find_config_file(path: &Path) -> Result<PathBuf, InfrastructureError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    // Directory given: probe the conventional file names
    let candidates = ["tenants.json", "custos_tenants.json"];
    for filename in candidates {
        let p = path.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No tenant file found at {:?}. Checked: {:?}",
        path, candidates
    )))
}

impl ConfigRegistry {
    /// Validate every entry, derive omitted resource names, reject
    /// duplicate active org_ids. Bad input aborts the whole load: nothing
    /// downstream may run on a half-valid registry.
    pub fn from_entries(entries: Vec<TenantConfig>) -> Result<Self, InfrastructureError> {
        let mut tenants = Vec::with_capacity(entries.len());
        let mut seen_active: HashSet<String> = HashSet::new();

        for mut tenant in entries {
            tenant.validate().map_err(|e| {
                InfrastructureError::ConfigError(format!(
                    "Invalid tenant entry '{}': {}",
                    tenant.org_id, e
                ))
            })?;

            // Resource naming: derive when omitted, warn on explicit override.
            if tenant.glue_db.is_empty() {
                tenant.glue_db = TenantConfig::default_glue_db(&tenant.org_id);
            } else if tenant.glue_db != TenantConfig::default_glue_db(&tenant.org_id) {
                warn!(
                    org_id = %tenant.org_id,
                    glue_db = %tenant.glue_db,
                    "glue_db overrides the custos naming convention"
                );
            }
            if tenant.athena_workgroup.is_empty() {
                tenant.athena_workgroup = TenantConfig::default_workgroup(&tenant.org_id);
            } else if tenant.athena_workgroup != TenantConfig::default_workgroup(&tenant.org_id) {
                warn!(
                    org_id = %tenant.org_id,
                    workgroup = %tenant.athena_workgroup,
                    "athena_workgroup overrides the custos naming convention"
                );
            }

            if tenant.active && !seen_active.insert(tenant.org_id.clone()) {
                return Err(InfrastructureError::ConfigError(format!(
                    "Duplicate active org_id '{}'",
                    tenant.org_id
                )));
            }

            tenants.push(tenant);
        }

        // Stable processing order for reproducible logs and tests
        tenants.sort_by(|a, b| a.org_id.cmp(&b.org_id));

        info!(
            total = tenants.len(),
            active = tenants.iter().filter(|t| t.active).count(),
            "Tenant registry loaded"
        );

        Ok(Self { tenants })
    }

    /// Active tenants in org_id order (deterministic batch order).
    pub fn active_tenants(&self) -> Vec<&TenantConfig> {
        self.tenants.iter().filter(|t| t.active).collect()
    }

    pub fn get(&self, org_id: &str) -> Result<&TenantConfig, DomainError> {
        self.tenants
            .iter()
            .find(|t| t.org_id == org_id)
            .ok_or_else(|| DomainError::TenantNotFound(org_id.to_string()))
    }

    pub fn tenants(&self) -> &[TenantConfig] {
        &self.tenants
    }

    pub fn to_json(&self) -> Result<String, InfrastructureError> {
        Ok(serde_json::to_string_pretty(&self.tenants)?)
    }
}
