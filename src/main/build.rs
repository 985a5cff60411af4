#[toml_cfg::toml_config]
pub struct Config {
    #[default(1000)]
    tick_interval_ms: u64,
    #[default(1000)]
    poll_interval_ms: u64,
}

fn main() {
    // Settings are baked in at compile time by toml-cfg
    println!("cargo:rerun-if-changed=cfg.toml");

    if CONFIG.tick_interval_ms == 0 || CONFIG.poll_interval_ms == 0 {
        panic!("tick_interval_ms and poll_interval_ms in cfg.toml must be greater than zero");
    }
}
