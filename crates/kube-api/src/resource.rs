//! REST paths for the object kinds found in Venona manifests

use crate::error::{KubeError, Result};

/// Kind, plural resource name, namespaced
const KNOWN_KINDS: &[(&str, &str, bool)] = &[
    ("Namespace", "namespaces", false),
    ("Pod", "pods", true),
    ("PersistentVolumeClaim", "persistentvolumeclaims", true),
    ("Service", "services", true),
    ("ServiceAccount", "serviceaccounts", true),
    ("Secret", "secrets", true),
    ("ConfigMap", "configmaps", true),
    ("Deployment", "deployments", true),
    ("DaemonSet", "daemonsets", true),
    ("Role", "roles", true),
    ("RoleBinding", "rolebindings", true),
    ("ClusterRole", "clusterroles", false),
    ("ClusterRoleBinding", "clusterrolebindings", false),
    ("StorageClass", "storageclasses", false),
    ("Ingress", "ingresses", true),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResource {
    /// `api/v1` for the core group, `apis/<group>/<version>` otherwise
    pub prefix: String,
    pub plural: &'static str,
    pub namespaced: bool,
}

impl ApiResource {
    pub fn resolve(api_version: &str, kind: &str) -> Result<Self> {
        let (_, plural, namespaced) = KNOWN_KINDS
            .iter()
            .find(|(known, _, _)| *known == kind)
            .ok_or_else(|| KubeError::UnsupportedKind {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })?;
        if api_version.is_empty() {
            return Err(KubeError::InvalidObject {
                reason: format!("{kind} has no apiVersion"),
            });
        }
        let prefix = if api_version.contains('/') {
            format!("apis/{api_version}")
        } else {
            format!("api/{api_version}")
        };
        Ok(Self {
            prefix,
            plural,
            namespaced: *namespaced,
        })
    }

    /// Collection path when `name` is `None`, object path otherwise.
    /// The namespace is ignored for cluster scoped kinds.
    pub fn path(&self, namespace: &str, name: Option<&str>) -> String {
        let mut path = if self.namespaced {
            format!("/{}/namespaces/{}/{}", self.prefix, namespace, self.plural)
        } else {
            format!("/{}/{}", self.prefix, self.plural)
        };
        if let Some(name) = name {
            path.push('/');
            path.push_str(name);
        }
        path
    }
}
