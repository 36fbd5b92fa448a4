//! Optional RON configuration file layered over the engine defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use archive_logging::archive_info;
use archiver_core::{OrdinalStyle, RemovalPolicy, RemovalRule, RunMode};
use archiver_engine::{EngineConfig, Wrap};
use serde::Deserialize;

use super::cli::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum ModeSetting {
    Html,
    HtmlPdf,
    HtmlMarkdown,
}

impl From<ModeSetting> for RunMode {
    fn from(mode: ModeSetting) -> Self {
        match mode {
            ModeSetting::Html => RunMode::HtmlOnly,
            ModeSetting::HtmlPdf => RunMode::HtmlPdf,
            ModeSetting::HtmlMarkdown => RunMode::HtmlMarkdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct RuleSetting {
    tag: String,
    attribute: String,
    value: String,
}

/// Every field is optional; missing ones keep the engine default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    landing_url: Option<String>,
    tool_name: Option<String>,
    output: Option<PathBuf>,
    mode: Option<ModeSetting>,
    ordinal_width: Option<usize>,
    jobs: Option<usize>,
    keep_raw_on_sanitize_failure: Option<bool>,
    /// Replaces the built-in removal rules.
    removal_rules: Option<Vec<RuleSetting>>,
    /// Added to whichever removal rules are active.
    extra_removal_rules: Vec<RuleSetting>,
    user_agent: Option<String>,
    request_timeout_secs: Option<u64>,
    max_page_bytes: Option<u64>,
    code_language: Option<String>,
    wrap_width: Option<usize>,
    pdf_binary: Option<PathBuf>,
    pdf_args: Option<Vec<String>>,
    pdf_timeout_secs: Option<u64>,
    write_manifest: Option<bool>,
}

pub(crate) fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = parse_file_config(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    archive_info!("Loaded configuration from {:?}", path);
    Ok(config)
}

pub(crate) fn parse_file_config(content: &str) -> Result<FileConfig> {
    Ok(ron::from_str(content)?)
}

impl FileConfig {
    pub(crate) fn apply(self, config: &mut EngineConfig) {
        if let Some(url) = self.landing_url {
            config.landing_url = url;
        }
        if let Some(name) = self.tool_name {
            config.tool_name = name;
        }
        if let Some(output) = self.output {
            config.output_root = output;
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(width) = self.ordinal_width {
            config.ordinal_style = OrdinalStyle::new(width);
        }
        if let Some(jobs) = self.jobs {
            config.max_concurrent_conversions = jobs.max(1);
        }
        if let Some(keep) = self.keep_raw_on_sanitize_failure {
            config.keep_raw_on_sanitize_failure = keep;
        }
        if let Some(rules) = self.removal_rules {
            config.removal_policy = RemovalPolicy::new(rules.into_iter().map(RuleSetting::into_rule).collect());
        }
        for rule in self.extra_removal_rules {
            config.removal_policy.push(rule.into_rule());
        }
        if let Some(agent) = self.user_agent {
            config.fetch.user_agent = agent;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.fetch.request_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = self.max_page_bytes {
            config.fetch.max_bytes = bytes;
        }
        if let Some(language) = self.code_language {
            config.markdown.code_language = language;
        }
        if let Some(width) = self.wrap_width {
            config.format.wrap = Wrap::Width(width);
        }
        if let Some(binary) = self.pdf_binary {
            config.pdf.binary = binary;
        }
        if let Some(args) = self.pdf_args {
            config.pdf.extra_args = args;
        }
        if let Some(secs) = self.pdf_timeout_secs {
            config.pdf.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(write) = self.write_manifest {
            config.write_manifest = write;
        }
    }
}

impl RuleSetting {
    fn into_rule(self) -> RemovalRule {
        RemovalRule::new(self.tag, self.attribute, self.value)
    }
}

/// Engine defaults, then the config file, then command line flags.
pub(crate) fn resolve_config(cli: &Cli, cwd: PathBuf) -> Result<EngineConfig> {
    let mut config = EngineConfig::default_with_output(cwd);
    if let Some(path) = &cli.config {
        load_file_config(path)?.apply(&mut config);
    }
    if let Some(output) = &cli.output {
        config.output_root = output.clone();
    }
    if let Some(mode) = cli.mode() {
        config.mode = mode;
    }
    if let Some(jobs) = cli.jobs {
        config.max_concurrent_conversions = jobs as usize;
    }
    Ok(config)
}
