// * Masks proxy settings in pod definitions before they are recorded.

use k8s_openapi::api::core::v1::{Container, Pod};

// ! Proxy URLs can embed credentials
const SENSITIVE_ENV_VARS: &[&str] = &["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY"];

/// Replaces every byte of `value` with `x`, keeping its length
pub fn obfuscate(value: &str) -> String {
    "x".repeat(value.len())
}

fn is_sensitive(name: &str) -> bool {
    SENSITIVE_ENV_VARS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(name))
}

/// Obfuscates the literal values of known sensitive env vars
pub fn sensitive_env_vars(containers: &mut [Container]) {
    for container in containers.iter_mut() {
        let Some(env) = container.env.as_mut() else {
            continue;
        };
        for var in env.iter_mut().filter(|var| is_sensitive(&var.name)) {
            if let Some(value) = var.value.as_mut() {
                *value = obfuscate(value);
            }
        }
    }
}

/// Applies `sensitive_env_vars` to the init and main containers of a pod
pub fn anonymize_pod(pod: &mut Pod) {
    if let Some(spec) = pod.spec.as_mut() {
        if let Some(init) = spec.init_containers.as_mut() {
            sensitive_env_vars(init);
        }
        sensitive_env_vars(&mut spec.containers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EnvVar, PodSpec};

    fn env(name: &str, value: &str) -> EnvVar {
        EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_obfuscate_keeps_length() {
        assert_eq!(obfuscate("hello world"), "xxxxxxxxxxx");
        assert_eq!(obfuscate(""), "");
    }

    #[test]
    fn test_only_proxy_vars_are_masked() {
        let mut pod = Pod {
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "app".to_string(),
                    env: Some(vec![
                        env("HTTPS_PROXY", "http://user:pw@proxy:3128"),
                        env("no_proxy", ".cluster.local"),
                        env("LOG_LEVEL", "debug"),
                    ]),
                    ..Default::default()
                }],
                init_containers: Some(vec![Container {
                    name: "init".to_string(),
                    env: Some(vec![env("HTTP_PROXY", "proxy")]),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        anonymize_pod(&mut pod);

        let spec = pod.spec.unwrap();
        let main_env = spec.containers[0].env.as_ref().unwrap();
        assert_eq!(main_env[0].value.as_deref(), Some("x".repeat(25).as_str()));
        assert_eq!(main_env[1].value.as_deref(), Some("x".repeat(14).as_str()));
        assert_eq!(main_env[2].value.as_deref(), Some("debug"));
        let init_env = spec.init_containers.unwrap()[0].env.clone().unwrap();
        assert_eq!(init_env[0].value.as_deref(), Some("xxxxx"));
    }
}
