use anyhow::Context;
use showrun_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let port = match port {
        Some(p) => p,
        None => {
            Config::load_or_default(root)
                .context("failed to read config")?
                .server
                .port
        }
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(showrun_server::serve(root.to_path_buf(), port))
}
