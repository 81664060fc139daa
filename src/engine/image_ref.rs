// * Container image reference parsing
// * Grammar: [registry[:port]/]path[:tag][@algorithm:hex]

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::cluster::errors::GatherError;

static IMAGE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    let domain_component = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(r"{domain_component}(?:\.{domain_component})*(?::[0-9]+)?");
    let path_component = r"[a-z0-9]+(?:(?:[._]|__|-*)[a-z0-9]+)*";
    let tag = r"[\w][\w.-]{0,127}";
    let digest = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9A-Fa-f]{32,}";
    Regex::new(&format!(
        r"^(?:(?P<domain>{domain})/)?(?P<path>{path_component}(?:/{path_component})*)(?::(?P<tag>{tag}))?(?:@(?P<digest>{digest}))?$"
    ))
    .expect("Invalid image reference regex")
});

const MAX_NAME_LENGTH: usize = 255;

/// A parsed image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: Option<String>,
    pub path: String,
    pub tag: Option<String>,
    /// Content-addressed identifier, e.g. `sha256:...`
    pub digest: Option<String>,
}

// * Only a first segment that looks like a host is a registry
fn is_registry(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

impl ImageReference {
    pub fn parse(reference: &str) -> Result<Self, GatherError> {
        let invalid = || GatherError::InvalidImageReference(reference.to_string());

        let captures = IMAGE_REFERENCE.captures(reference).ok_or_else(invalid)?;
        let mut registry = captures.name("domain").map(|m| m.as_str().to_string());
        let mut path = captures
            .name("path")
            .map(|m| m.as_str().to_string())
            .ok_or_else(invalid)?;

        if let Some(segment) = registry.take() {
            if is_registry(&segment) {
                registry = Some(segment);
            } else if segment.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(invalid());
            } else {
                path = format!("{segment}/{path}");
            }
        }

        let name_length = registry.as_ref().map_or(0, |r| r.len() + 1) + path.len();
        if name_length > MAX_NAME_LENGTH {
            return Err(invalid());
        }

        Ok(Self {
            registry,
            path,
            tag: captures.name("tag").map(|m| m.as_str().to_string()),
            digest: captures.name("digest").map(|m| m.as_str().to_string()),
        })
    }

    /// Registry and path, without tag or digest
    pub fn name(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{registry}/{}", self.path),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

/// Census key of an image: its digest when present, otherwise the reference as written
pub fn image_identity(reference: &str) -> Result<String, GatherError> {
    let parsed = ImageReference::parse(reference)?;
    Ok(parsed.digest.unwrap_or_else(|| reference.to_string()))
}
