use super::emit;
use artcache_cache::CacheSettings;
use std::process::ExitCode;
use tracing::debug;

pub fn execute(settings: &CacheSettings) -> miette::Result<ExitCode> {
    let target = settings.check_config()?;
    debug!(?settings, "Configuration is complete");

    emit(&format!(
        "{}/{}",
        target.remote.base_url.trim_end_matches('/'),
        target.repo_key
    ));
    Ok(ExitCode::SUCCESS)
}
