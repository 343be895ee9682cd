//! Device configuration rendering.
//!
//! Templates are plain text with `{{ field }}` placeholders, filled from the
//! serialized fields of a [`CircuitDescriptor`]. A line consisting only of a
//! placeholder that renders empty is dropped, which is how optional commands
//! (such as CCM hardware offload) are expressed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::descriptor::CircuitDescriptor;
use crate::error::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
});

const BUILTIN_PROVISION: &str = "\
ethernet evc EVC{{circuit_id}}
ethernet cfm domain {{cfm_domain}} level {{cfm_level}}
 service SVC{{circuit_id}} evc EVC{{circuit_id}} vlan {{vlan}} direction down
  continuity-check
  continuity-check interval {{ccm_interval}}
  {{ccm_offload}}
interface {{interface}}
 service instance {{vlan}} ethernet EVC{{circuit_id}}
  encapsulation dot1q {{vlan}}
  rewrite ingress tag pop 1 symmetric
  cfm mep domain {{cfm_domain}} mpid {{local_mpid}}
l2vpn xconnect context VC{{vcid}}
 member {{interface}} service-instance {{vlan}}
 member {{peer_loopback}} {{vcid}} encapsulation mpls
ip sla {{slm_probe_id}}
 ethernet y1731 loss SLM domain {{cfm_domain}} evc EVC{{circuit_id}} mpid {{remote_mpid}} cos 0 source mpid {{local_mpid}}
ip sla schedule {{slm_probe_id}} life forever start-time now
ip sla {{dmm_probe_id}}
 ethernet y1731 delay DMMv1 domain {{cfm_domain}} evc EVC{{circuit_id}} mpid {{remote_mpid}} cos 0 source mpid {{local_mpid}}
ip sla schedule {{dmm_probe_id}} life forever start-time now
";

const BUILTIN_REMOVAL: &str = "\
no ip sla {{slm_probe_id}}
no ip sla {{dmm_probe_id}}
no l2vpn xconnect context VC{{vcid}}
interface {{interface}}
 no service instance {{vlan}} ethernet
ethernet cfm domain {{cfm_domain}} level {{cfm_level}}
 no service SVC{{circuit_id}} evc EVC{{circuit_id}} vlan {{vlan}} direction down
no ethernet evc EVC{{circuit_id}}
";

/// CFM command emitted when hardware offload is enabled.
const CCM_OFFLOAD_COMMAND: &str = "offload sampling 1000";

/// The two renderings every circuit needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Configuration that creates the circuit
    Provision,
    /// Configuration that removes it again
    Removal,
}

impl Template {
    /// Template name, used in file names and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Provision => "l2vpn",
            Self::Removal => "l2vpn_removal",
        }
    }

    /// File name looked up in a template directory.
    pub fn file_name(self) -> String {
        format!("{}.tmpl", self.name())
    }

    fn builtin(self) -> &'static str {
        match self {
            Self::Provision => BUILTIN_PROVISION,
            Self::Removal => BUILTIN_REMOVAL,
        }
    }
}

/// Turns a descriptor into device-ready configuration text.
pub trait Renderer {
    /// Render `template` for one circuit end.
    fn render(&self, template: Template, descriptor: &CircuitDescriptor) -> Result<String>;
}

/// Placeholder-substitution renderer.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    provision: String,
    removal: String,
}

impl TemplateRenderer {
    /// Renderer using the built-in IOS-XE templates.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_PROVISION, BUILTIN_REMOVAL)
    }

    /// Renderer with explicit template sources.
    pub fn new(provision: impl Into<String>, removal: impl Into<String>) -> Self {
        Self {
            provision: provision.into(),
            removal: removal.into(),
        }
    }

    /// Load templates from `dir`, falling back to the built-in template for
    /// any file that is not there.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let load = |template: Template| -> Result<String> {
            let path = dir.join(template.file_name());
            if path.is_file() {
                log::debug!("Using template {}", path.display());
                Ok(fs::read_to_string(&path)?)
            } else {
                log::debug!("No {} in {}, using built-in", template.file_name(), dir.display());
                Ok(template.builtin().to_string())
            }
        };

        Ok(Self {
            provision: load(Template::Provision)?,
            removal: load(Template::Removal)?,
        })
    }

    fn source(&self, template: Template) -> &str {
        match template {
            Template::Provision => &self.provision,
            Template::Removal => &self.removal,
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: Template, descriptor: &CircuitDescriptor) -> Result<String> {
        let fields = template_fields(descriptor)?;
        fill(template.name(), self.source(template), &fields)
    }
}

/// Placeholder values for a descriptor.
///
/// Every serialized descriptor field, plus `ccm_offload` which is the
/// offload command when hardware offload is on and empty otherwise.
pub fn template_fields(descriptor: &CircuitDescriptor) -> Result<BTreeMap<String, String>> {
    let Value::Object(map) = serde_json::to_value(descriptor)? else {
        return Err(Error::Template {
            template: "descriptor".to_string(),
            message: "descriptor did not serialize to an object".to_string(),
        });
    };

    let mut fields: BTreeMap<String, String> = map
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect();

    let offload = if descriptor.hw_offload {
        CCM_OFFLOAD_COMMAND
    } else {
        ""
    };
    fields.insert("ccm_offload".to_string(), offload.to_string());
    Ok(fields)
}

fn fill(name: &str, source: &str, fields: &BTreeMap<String, String>) -> Result<String> {
    let mut lines = Vec::new();

    for line in source.lines() {
        if let Some(caps) = PLACEHOLDER
            .captures_iter(line)
            .find(|caps| !fields.contains_key(&caps[1]))
        {
            return Err(Error::Template {
                template: name.to_string(),
                message: format!("unknown placeholder `{}`", &caps[1]),
            });
        }

        let rendered = PLACEHOLDER.replace_all(line, |caps: &Captures| {
            fields.get(&caps[1]).cloned().unwrap_or_default()
        });

        if rendered.trim().is_empty() && is_lone_placeholder(line) {
            continue;
        }
        lines.push(rendered.into_owned());
    }

    Ok(lines.join("\n"))
}

fn is_lone_placeholder(line: &str) -> bool {
    let trimmed = line.trim();
    PLACEHOLDER
        .find(trimmed)
        .is_some_and(|m| m.start() == 0 && m.end() == trimmed.len())
}
