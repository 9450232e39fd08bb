/// Script library backed by Tera.
/// Scripts are Jinja2-style templates; only PKI settings are rendered into them,
/// runtime inputs are passed as positional arguments.
use super::embedded_scripts;
use crate::config::PkiSettings;
use crate::error::ScriptError;
use tera::{Context, Tera};

pub struct ScriptLibrary {
    tera: Tera,
    context: Context,
}

impl ScriptLibrary {
    /// Create a library from the scripts compiled into the binary.
    pub fn embedded(pki: &PkiSettings) -> Result<Self, ScriptError> {
        Self::from_raw(embedded_scripts::ALL_SCRIPTS, pki)
    }

    /// Create a library from (name, content) pairs.
    pub fn from_raw(scripts: &[(&str, &str)], pki: &PkiSettings) -> Result<Self, ScriptError> {
        let mut tera = Tera::default();

        for (name, content) in scripts {
            tera.add_raw_template(name, content)
                .map_err(|e| ScriptError::Render {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            tracing::debug!("[ScriptLibrary] Loaded script: {}", name);
        }

        tracing::info!("[ScriptLibrary] Loaded {} scripts", scripts.len());

        let mut context = Context::new();
        context.insert("key_bits", &pki.key_bits);
        context.insert("ca_days", &pki.ca_days);
        context.insert("cert_days", &pki.cert_days);

        Ok(Self { tera, context })
    }

    /// Resolve a script by asset name and render it.
    pub fn render(&self, name: &str) -> Result<String, ScriptError> {
        if !self.contains(name) {
            return Err(ScriptError::NotFound(name.to_string()));
        }

        let rendered = self
            .tera
            .render(name, &self.context)
            .map_err(|e| ScriptError::Render {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            "[ScriptLibrary] Rendered script {} ({} bytes)",
            name,
            rendered.len()
        );

        Ok(rendered)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// List all loaded script names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }
}
