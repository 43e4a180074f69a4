//! Placeholder expansion for target URL templates.
//!
//! Syntax: `{field}` expands a bound field, `{env.KEY}` reads the context
//! environment map, and `{{` / `}}` escape literal braces. Unknown fields,
//! unset environment keys, and unbalanced braces are errors.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result, bail};

use crate::artifact::Artifact;
use crate::context::Context;

/// A template evaluator bound to one run context, and optionally to one
/// artifact.
pub struct Template<'a> {
    fields: BTreeMap<&'static str, String>,
    env: &'a BTreeMap<String, String>,
}

impl<'a> Template<'a> {
    /// Binds the context fields `project` and `version`.
    pub fn new(ctx: &'a Context) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("project", ctx.project.clone());
        fields.insert("version", ctx.version.clone());
        Self {
            fields,
            env: &ctx.env,
        }
    }

    /// Binds the artifact fields `artifact`, `os`, and `arch`, mapping os and
    /// arch through the replacement table first.
    pub fn with_artifact(
        mut self,
        artifact: &Artifact,
        replacements: &BTreeMap<String, String>,
    ) -> Self {
        let replace = |value: &str| {
            replacements
                .get(value)
                .cloned()
                .unwrap_or_else(|| value.to_string())
        };
        self.fields.insert("artifact", artifact.name.clone());
        self.fields.insert("os", replace(&artifact.os));
        self.fields.insert("arch", replace(&artifact.arch));
        self
    }

    /// Expands every placeholder in `input`.
    pub fn apply(&self, input: &str) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => bail!("unclosed '{{' in template: {input}"),
                        }
                    }
                    out.push_str(&self.lookup(&name, input)?);
                }
                '}' => bail!("unmatched '}}' in template: {input}"),
                c => out.push(c),
            }
        }
        Ok(out)
    }

    fn lookup(&self, name: &str, input: &str) -> Result<String> {
        if let Some(key) = name.strip_prefix("env.") {
            return self
                .env
                .get(key)
                .cloned()
                .with_context(|| format!("template references unset environment variable {key}"));
        }
        self.fields
            .get(name)
            .cloned()
            .with_context(|| format!("unknown template field '{name}' in: {input}"))
    }
}

#[cfg(test)]
mod tests {
    use crate::artifact::ArtifactKind;

    use super::*;

    fn ctx() -> Context {
        let mut ctx = Context::new("hoist", "1.4.0");
        ctx.env.insert("REPO".to_string(), "releases".to_string());
        ctx
    }

    fn artifact() -> Artifact {
        Artifact {
            name: "hoist_1.4.0_linux_amd64.tar.gz".to_string(),
            path: "dist/hoist_1.4.0_linux_amd64.tar.gz".into(),
            kind: ArtifactKind::UploadableArchive,
            id: "hoist".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        }
    }

    #[test]
    fn expands_context_and_env_fields() {
        let ctx = ctx();
        let out = Template::new(&ctx)
            .apply("https://example.com/{env.REPO}/{project}/{version}")
            .expect("apply");
        assert_eq!(out, "https://example.com/releases/hoist/1.4.0");
    }

    #[test]
    fn expands_artifact_fields() {
        let ctx = ctx();
        let out = Template::new(&ctx)
            .with_artifact(&artifact(), &BTreeMap::new())
            .apply("{project}/{os}/{arch}/{artifact}")
            .expect("apply");
        assert_eq!(out, "hoist/linux/amd64/hoist_1.4.0_linux_amd64.tar.gz");
    }

    #[test]
    fn replacement_table_rewrites_os_and_arch() {
        let ctx = ctx();
        let mut replacements = BTreeMap::new();
        replacements.insert("linux".to_string(), "Linux".to_string());
        replacements.insert("amd64".to_string(), "x86_64".to_string());
        let out = Template::new(&ctx)
            .with_artifact(&artifact(), &replacements)
            .apply("{os}-{arch}")
            .expect("apply");
        assert_eq!(out, "Linux-x86_64");
    }

    #[test]
    fn braces_escape_to_literals() {
        let ctx = ctx();
        let out = Template::new(&ctx).apply("literal {{project}}").expect("apply");
        assert_eq!(out, "literal {project}");
    }

    #[test]
    fn unknown_field_is_an_error() {
        let ctx = ctx();
        let err = Template::new(&ctx).apply("{nope}").unwrap_err();
        assert!(err.to_string().contains("unknown template field 'nope'"));
    }

    #[test]
    fn artifact_fields_require_binding() {
        let ctx = ctx();
        assert!(Template::new(&ctx).apply("{artifact}").is_err());
    }

    #[test]
    fn unset_env_key_is_an_error() {
        let ctx = ctx();
        let err = Template::new(&ctx).apply("{env.MISSING}").unwrap_err();
        assert!(err.to_string().contains("MISSING"));
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        let ctx = ctx();
        assert!(Template::new(&ctx).apply("https://{project").is_err());
        assert!(Template::new(&ctx).apply("dangling}").is_err());
    }
}
