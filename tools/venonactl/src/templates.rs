//! Bundled Kubernetes manifests and their rendering

use crate::error::{InstallerError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use minijinja::Environment;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

macro_rules! template {
    ($name:literal) => {
        ($name, include_str!(concat!("templates/", $name)))
    };
}

/// Manifest templates in apply order
pub const TEMPLATES: &[(&str, &str)] = &[
    template!("engine-sa.engine.yaml"),
    template!("engine-role.engine.yaml"),
    template!("engine-rolebinding.engine.yaml"),
    template!("codefresh-certs-server.re.yaml"),
    template!("dind-service.re.yaml"),
    template!("venona-sa.venona.yaml"),
    template!("venona-secret.venona.yaml"),
    template!("venona-role.venona.yaml"),
    template!("venona-rolebinding.venona.yaml"),
    template!("venona-deployment.venona.yaml"),
    template!("storageclass.vp.yaml"),
    template!("dind-volume-provisioner-sa.vp.yaml"),
    template!("dind-volume-provisioner.vp.yaml"),
    template!("monitor-sa.monitor.yaml"),
    template!("monitor-deployment.monitor.yaml"),
    template!("app-proxy-deployment.app-proxy.yaml"),
    template!("app-proxy-service.app-proxy.yaml"),
    template!("app-proxy-ingress.app-proxy.yaml"),
];

/// One rendered manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub file: String,
    pub object: Value,
}

fn b64enc(value: String) -> String {
    STANDARD.encode(value)
}

/// `key1=value1,key2=value2` to YAML mapping lines. Malformed pairs are dropped.
pub fn node_selector_to_yaml(selector: String) -> String {
    selector
        .split(',')
        .filter_map(|pair| match pair.split('=').collect::<Vec<_>>().as_slice() {
            [key, value] => Some(format!("{}: {:?}", key.trim(), value.trim())),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_yaml(value: minijinja::Value) -> std::result::Result<String, minijinja::Error> {
    serde_yaml::to_string(&value)
        .map(|yaml| yaml.trim_end().to_string())
        .map_err(|err| {
            minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, err.to_string())
        })
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("b64enc", b64enc);
    env.add_filter("node_selector_to_yaml", node_selector_to_yaml);
    env.add_filter("yaml", to_yaml);
    env
}

/// Renders the templates whose file name matches `pattern`.
///
/// Renders without a single alphanumeric character are dropped, which lets a
/// template opt out with a top level `if`.
pub fn render(pattern: &str, values: &Value) -> Result<Vec<(String, String)>> {
    render_from(TEMPLATES, pattern, values)
}

pub fn render_from(
    templates: &[(&str, &str)],
    pattern: &str,
    values: &Value,
) -> Result<Vec<(String, String)>> {
    let matcher = Regex::new(pattern)?;
    let env = environment();
    let mut rendered = Vec::new();
    for (name, source) in templates {
        if !matcher.is_match(name) {
            debug!(pattern, name, "Skipping template, pattern does not match");
            continue;
        }
        debug!(name, "Rendering template");
        let output = env
            .render_str(source, values)
            .map_err(|source| InstallerError::Template {
                name: name.to_string(),
                source,
            })?;
        if output.chars().any(|c| c.is_ascii_alphanumeric()) {
            rendered.push((name.to_string(), output));
        } else {
            debug!(name, "Template rendered empty");
        }
    }
    Ok(rendered)
}

/// Renders and parses the matching templates into Kubernetes objects
pub fn manifests(pattern: &str, values: &Value) -> Result<Vec<Manifest>> {
    parse(render(pattern, values)?)
}

fn parse(rendered: Vec<(String, String)>) -> Result<Vec<Manifest>> {
    rendered
        .into_iter()
        .map(|(file, yaml)| {
            let object: Value =
                serde_yaml::from_str(&yaml).map_err(|source| InstallerError::Manifest {
                    name: file.clone(),
                    source,
                })?;
            Ok(Manifest { file, object })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Values;
    use serde_json::json;

    fn context() -> Value {
        Values {
            namespace: "codefresh".to_string(),
            agent_id: "agent-1".to_string(),
            agent_token: "token".to_string(),
            ..Values::default()
        }
        .build_values()
    }

    #[test]
    fn test_node_selector_to_yaml() {
        assert_eq!(
            node_selector_to_yaml("disk=ssd,zone=a".to_string()),
            "disk: \"ssd\"\nzone: \"a\""
        );
        assert_eq!(node_selector_to_yaml("broken,zone=a=b".to_string()), "");
    }

    #[test]
    fn test_every_bundled_template_renders() {
        let mut values = Values {
            namespace: "codefresh".to_string(),
            node_selector: "disk=ssd".to_string(),
            install_monitor: true,
            ..Values::default()
        };
        values.app_proxy.host = "proxy.example.com".to_string();
        values
            .resources
            .insert("runner".to_string(), json!({ "limits": { "cpu": "400m" } }));

        let manifests = manifests(".*", &values.build_values()).unwrap();

        assert_eq!(manifests.len(), TEMPLATES.len());
        assert!(manifests.iter().all(|m| m.object["kind"].is_string()));
    }

    #[test]
    fn test_pattern_selects_plugin_templates() {
        let manifests = manifests(r"\.venona\.yaml$", &context()).unwrap();

        let kinds: Vec<_> = manifests
            .iter()
            .map(|m| m.object["kind"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["ServiceAccount", "Secret", "Role", "RoleBinding", "Deployment"]);
    }

    #[test]
    fn test_engine_role_is_bound_to_its_account() {
        let manifests = manifests(r"\.engine\.yaml$", &context()).unwrap();

        let kinds: Vec<_> = manifests.iter().map(|m| m.object["kind"].clone()).collect();
        assert_eq!(kinds, vec!["ServiceAccount", "Role", "RoleBinding"]);
        let binding = &manifests[2].object;
        assert_eq!(binding["subjects"][0]["name"], "codefresh-engine");
        assert_eq!(binding["roleRef"]["name"], "codefresh-engine");
    }

    #[test]
    fn test_secret_values_are_base64() {
        let manifests = manifests(r"venona-secret\.venona\.yaml$", &context()).unwrap();

        assert_eq!(manifests[0].object["data"]["codefresh.token"], "dG9rZW4=");
    }

    #[test]
    fn test_deployment_node_selector() {
        let mut values = Values {
            namespace: "codefresh".to_string(),
            ..Values::default()
        };
        values.node_selector = "disk=ssd,zone=a".to_string();

        let manifests =
            manifests(r"venona-deployment\.venona\.yaml$", &values.build_values()).unwrap();

        let selector = &manifests[0].object["spec"]["template"]["spec"]["nodeSelector"];
        assert_eq!(selector, &json!({ "disk": "ssd", "zone": "a" }));
    }

    #[test]
    fn test_empty_renders_are_skipped() {
        let templates = [("only-if.x.yaml", "{% if Missing %}kind: Secret{% endif %}\n---\n")];

        let rendered = render_from(&templates, r"\.x\.yaml$", &json!({})).unwrap();

        assert!(rendered.is_empty());
    }

    #[test]
    fn test_disabled_monitor_renders_nothing() {
        assert!(manifests(r"\.monitor\.yaml$", &context()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(matches!(
            render("(", &context()),
            Err(InstallerError::Pattern(_))
        ));
    }
}
