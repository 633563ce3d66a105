use scene_sandbox::config::SandboxConfig;

fn main() -> anyhow::Result<()> {
    let mut config = SandboxConfig::default();
    // an asset directory may be passed as the only argument
    if let Some(asset_dir) = std::env::args().nth(1) {
        config.asset_dir = asset_dir;
    }
    scene_sandbox::flow::run(config)
}
