use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "deployer.yaml";

pub const APPS_DIR: &str = "apps";
pub const POLICIES_DIR: &str = "policies";
pub const NAMESPACES_DIR: &str = "namespaces";
pub const POLICY_CRD_FILE: &str = "policy-crd.yaml";
pub const POLICY_DEFINITIONS_DIR: &str = "definitions";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(cwd: &Path) -> PathBuf {
    cwd.join(CONFIG_FILE)
}

pub fn apps_path(dir: &Path) -> PathBuf {
    dir.join(APPS_DIR)
}

pub fn policies_path(dir: &Path) -> PathBuf {
    dir.join(POLICIES_DIR)
}

pub fn namespaces_path(dir: &Path) -> PathBuf {
    dir.join(NAMESPACES_DIR)
}

pub fn policy_crd_path(dir: &Path) -> PathBuf {
    policies_path(dir).join(POLICY_CRD_FILE)
}

pub fn policy_definitions_path(dir: &Path) -> PathBuf {
    policies_path(dir).join(POLICY_DEFINITIONS_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_layout() {
        let dir = Path::new("/srv/env");
        assert_eq!(apps_path(dir), PathBuf::from("/srv/env/apps"));
        assert_eq!(namespaces_path(dir), PathBuf::from("/srv/env/namespaces"));
        assert_eq!(
            policy_crd_path(dir),
            PathBuf::from("/srv/env/policies/policy-crd.yaml")
        );
        assert_eq!(
            policy_definitions_path(dir),
            PathBuf::from("/srv/env/policies/definitions")
        );
    }
}
