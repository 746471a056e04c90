//! Configure command - Save the default server profile
//!
//! `rivet configure --url URL --auth CRED` validates the server URL, the
//! server version, and the credential before anything is written, then
//! stores the normalized URL and the credential in the configuration file.
//! `rivet configure --show` prints the current configuration instead.

use anyhow::{bail, Context as _, Result};
use clap::Args;
use rivet_core::config::Config;
use tracing::info;

use super::{connect, Context};
use crate::output::{get_formatter, OutputFormat};

const REDACTED: &str = "********";

#[derive(Debug, Args)]
pub struct ConfigureCommand {
    /// Print the current configuration instead of saving a profile
    #[arg(long)]
    pub show: bool,
}

impl ConfigureCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        if self.show {
            return self.execute_show(ctx);
        }

        let formatter = get_formatter(ctx.format);
        let (Some(url), Some(auth)) = (ctx.url.as_deref(), ctx.auth.as_deref()) else {
            bail!("configure needs both --url and --auth");
        };

        let (base, _client) = connect(ctx, url, auth).await?;

        let mut config = ctx.config.clone();
        config.profile.url = Some(base.clone());
        config.profile.auth = Some(auth.to_string());

        let errors = config.validate();
        if !errors.is_empty() {
            for e in &errors {
                formatter.error(&e.to_string());
            }
            bail!("configuration has {} error(s)", errors.len());
        }

        config
            .save(&ctx.config_path)
            .with_context(|| format!("failed to write {}", ctx.config_path.display()))?;
        info!(path = %ctx.config_path.display(), url = %base, "saved profile");
        formatter.success(&format!(
            "Saved profile for {base} to {}",
            ctx.config_path.display()
        ));
        Ok(())
    }

    fn execute_show(&self, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = redacted(&ctx.config);

        if ctx.format == OutputFormat::Json {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }
}

/// Copy of `config` with the stored credential masked
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.profile.auth.is_some() {
        config.profile.auth = Some(REDACTED.to_string());
    }
    config
}
