//! Rendering of the configuration templates placed on the host and inside
//! each container.
//!
//! Templates are looked up by name, first in an optional template
//! directory and then in the set compiled into the binary. Rendering is a
//! pure function of the template text and the [`Context`].

pub mod parser;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use lustmolch_common::config::Settings;
use lustmolch_common::error::{LustmolchError, Result};
use lustmolch_common::types::ContainerRecord;

use self::parser::Segment;

/// Reverse proxy virtual host.
pub const HOST_NGINX: &str = "host/nginx";
/// Host side of the veth pair.
pub const HOST_NETWORK: &str = "host/80-container-ve.network";
/// systemd-nspawn unit settings.
pub const HOST_NSPAWN: &str = "host/nspawn";
/// sshd configuration inside the container.
pub const CONTAINER_SSHD: &str = "container/sshd_config";
/// Container side of the veth pair.
pub const CONTAINER_NETWORK: &str = "container/80-container-host0.network";
/// Shell script run once inside a new machine. Copied, not rendered.
pub const BOOTSTRAP_SCRIPT: &str = "container/bootstrap.sh";

const BUILTIN: &[(&str, &str)] = &[
    (HOST_NGINX, include_str!("../../templates/host/nginx")),
    (
        HOST_NETWORK,
        include_str!("../../templates/host/80-container-ve.network"),
    ),
    (HOST_NSPAWN, include_str!("../../templates/host/nspawn")),
    (
        CONTAINER_SSHD,
        include_str!("../../templates/container/sshd_config"),
    ),
    (
        CONTAINER_NETWORK,
        include_str!("../../templates/container/80-container-host0.network"),
    ),
    (
        BOOTSTRAP_SCRIPT,
        include_str!("../../templates/container/bootstrap.sh"),
    ),
];

/// A value substituted for a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Free text.
    Text(String),
    /// An unsigned number.
    Number(u64),
    /// A list, rendered space separated.
    List(Vec<String>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Self::Number(n.into())
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Placeholder values available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(BTreeMap<String, Value>);

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the per-container context: `name`, `ssh_port`,
    /// `ip_address_host`, `ip_address_container`, `ip_subnet_length`, `url`,
    /// `users` and `www_dir`.
    ///
    /// The subnet length falls back to the configured one when the record
    /// does not carry one. `www_dir` is the host path as seen from the
    /// running host, not the staging root.
    #[must_use]
    pub fn for_container(record: &ContainerRecord, settings: &Settings) -> Self {
        Self::new()
            .with("name", record.name.as_str())
            .with("ssh_port", record.ssh_port)
            .with("ip_address_host", record.ip_address_host.as_str())
            .with("ip_address_container", record.ip_address_container.as_str())
            .with(
                "ip_subnet_length",
                record
                    .ip_subnet_length
                    .unwrap_or(settings.ip_subnet_length),
            )
            .with("url", record.url.as_str())
            .with("users", record.users.clone())
            .with(
                "www_dir",
                settings.www_root.join(&record.name).display().to_string(),
            )
    }

    /// Adds or replaces `key`, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the value bound to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Resolves template names to their source and renders them.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    template_dir: Option<PathBuf>,
}

impl Renderer {
    /// Creates a renderer that prefers templates found in `template_dir`.
    #[must_use]
    pub const fn new(template_dir: Option<PathBuf>) -> Self {
        Self { template_dir }
    }

    /// Returns the source text of template `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::Template`] if the name is not a relative
    /// path or no such template exists, and [`LustmolchError::Io`] if an
    /// override exists but cannot be read.
    pub fn source(&self, name: &str) -> Result<Cow<'static, str>> {
        if !Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(template_err(name, "template names must be relative paths"));
        }

        if let Some(dir) = &self.template_dir {
            let path = dir.join(name);
            if path.is_file() {
                tracing::debug!(template = name, path = %path.display(), "using template override");
                return std::fs::read_to_string(&path)
                    .map(Cow::Owned)
                    .map_err(|e| LustmolchError::io(path, e));
            }
        }

        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| Cow::Borrowed(*source))
            .ok_or_else(|| template_err(name, "no such template"))
    }

    /// Renders template `name` with `context`.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::Template`] if the template is unknown,
    /// malformed, or references a key missing from `context`.
    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        let source = self.source(name)?;
        render_source(name, &source, context)
    }
}

/// Renders template text `source` with `context`.
///
/// # Errors
///
/// Returns [`LustmolchError::Template`] if the text is malformed or
/// references a key missing from `context`.
pub fn render_source(name: &str, source: &str, context: &Context) -> Result<String> {
    let segments = parser::parse(name, source)?;
    let mut out = String::with_capacity(source.len());
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(key) => {
                let value = context
                    .get(key)
                    .ok_or_else(|| template_err(name, format!("undefined variable {key:?}")))?;
                out.push_str(&value.to_string());
            }
        }
    }
    Ok(out)
}

fn template_err(name: &str, message: impl Into<String>) -> LustmolchError {
    LustmolchError::Template {
        template: name.to_owned(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            ip_subnet_length: 30,
            ..Settings::default()
        }
    }

    fn record() -> ContainerRecord {
        ContainerRecord {
            name: "web".into(),
            ssh_port: 11022,
            ip_address_host: "192.168.0.9".into(),
            ip_address_container: "192.168.0.10".into(),
            ip_subnet_length: None,
            url: "web.stusta.de".into(),
            users: vec!["alice".into(), "bob".into()],
        }
    }

    #[test]
    fn context_exposes_all_container_keys() {
        let ctx = Context::for_container(&record(), &settings());
        for key in [
            "name",
            "ssh_port",
            "ip_address_host",
            "ip_address_container",
            "ip_subnet_length",
            "url",
            "users",
            "www_dir",
        ] {
            assert!(ctx.get(key).is_some(), "missing {key}");
        }
        assert_eq!(ctx.get("ip_subnet_length"), Some(&Value::Number(30)));
    }

    #[test]
    fn render_substitutes_values() {
        let ctx = Context::new()
            .with("name", "web")
            .with("ssh_port", 10022_u16)
            .with("users", vec!["alice".to_owned(), "bob".to_owned()]);
        let out = render_source("t", "{{ name }}:{{ssh_port}} [{{ users }}]", &ctx).unwrap();
        assert_eq!(out, "web:10022 [alice bob]");
    }

    #[test]
    fn render_fails_on_missing_variable() {
        let err = render_source("t", "{{ nope }}", &Context::new()).unwrap_err();
        assert!(err.to_string().contains("undefined variable \"nope\""));
    }

    #[test]
    fn builtin_templates_render_with_container_context() {
        let renderer = Renderer::default();
        let ctx = Context::for_container(&record(), &settings());
        for name in [
            HOST_NGINX,
            HOST_NETWORK,
            HOST_NSPAWN,
            CONTAINER_SSHD,
            CONTAINER_NETWORK,
        ] {
            let out = renderer.render(name, &ctx).unwrap();
            assert!(!out.contains("{{"), "{name} left a placeholder");
        }
    }

    #[test]
    fn host_network_carries_address_and_prefix() {
        let out = Renderer::default()
            .render(HOST_NETWORK, &Context::for_container(&record(), &settings()))
            .unwrap();
        assert!(out.contains("Name=ve-web"));
        assert!(out.contains("Address=192.168.0.9/30"));
    }

    #[test]
    fn www_dir_follows_configured_root() {
        let settings = Settings {
            www_root: PathBuf::from("/srv/www"),
            ..settings()
        };
        let ctx = Context::for_container(&record(), &settings);
        let renderer = Renderer::default();

        let nginx = renderer.render(HOST_NGINX, &ctx).unwrap();
        assert!(nginx.contains("root /srv/www/web;"), "{nginx}");
        let nspawn = renderer.render(HOST_NSPAWN, &ctx).unwrap();
        assert!(nspawn.contains("Bind=/srv/www/web:/var/www"), "{nspawn}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = Renderer::default();
        let ctx = Context::for_container(&record(), &settings());
        let first = renderer.render(HOST_NGINX, &ctx).unwrap();
        let second = renderer.render(HOST_NGINX, &ctx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_template_is_an_error() {
        assert!(matches!(
            Renderer::default().render("host/apache", &Context::new()),
            Err(LustmolchError::Template { .. })
        ));
    }

    #[test]
    fn escaping_names_are_rejected() {
        let renderer = Renderer::new(Some(PathBuf::from("/tmp")));
        assert!(renderer.source("../etc/passwd").is_err());
        assert!(renderer.source("/etc/passwd").is_err());
    }

    #[test]
    fn template_dir_overrides_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("host")).expect("mkdir");
        std::fs::write(dir.path().join("host/nginx"), "vhost {{ url }}\n").expect("write");

        let renderer = Renderer::new(Some(dir.path().to_path_buf()));
        let out = renderer
            .render(HOST_NGINX, &Context::for_container(&record(), &settings()))
            .unwrap();
        assert_eq!(out, "vhost web.stusta.de\n");

        let fallback = renderer.source(HOST_NSPAWN).unwrap();
        assert!(fallback.contains("VirtualEthernet=yes"));
    }
}
