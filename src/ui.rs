use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use toml::Table;

use crate::masku::config::MaskUnitConfig;
use crate::sim::config::{Config, SimConfig};
use crate::sim::top::Sim;
use crate::traffic::config::TrafficConfig;

#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct MaskuArgs {
    #[arg(help = "Path to config.toml")]
    pub config_path: PathBuf,
    #[arg(long, help = "Override number of lanes")]
    pub num_lanes: Option<usize>,
    #[arg(long, help = "Override bytes per lane per cycle")]
    pub stripe_width: Option<usize>,
    #[arg(long, help = "Enable log at level (0:none, 1:info, 2:debug)")]
    pub log: Option<u64>,
    #[arg(long, help = "Override traffic seed")]
    pub seed: Option<u64>,
    #[arg(long, help = "Override cycle timeout")]
    pub timeout: Option<u64>,
    #[arg(long, help = "Write the run summary as JSON")]
    pub stats_json: Option<PathBuf>,
}

/// Make a Sim object from the TOML configuration.
/// If `cli_args` is given, override TOML options with CLI arguments.
pub fn make_sim(toml_string: &str, cli_args: Option<&MaskuArgs>) -> Result<Sim> {
    let config_table: Table = toml::from_str(toml_string).context("cannot parse config toml")?;
    let mut sim_config = SimConfig::from_section(config_table.get("sim"))?;
    let mut masku_config = MaskUnitConfig::from_section(config_table.get("masku"))?;
    let mut traffic_config = TrafficConfig::from_section(config_table.get("traffic"))?;

    // override toml configs with CLI args
    if let Some(args) = cli_args {
        sim_config.log_level = args.log.unwrap_or(sim_config.log_level);
        sim_config.timeout = args.timeout.unwrap_or(sim_config.timeout);
        if args.stats_json.is_some() {
            sim_config.stats_json = args.stats_json.clone();
        }
        masku_config.num_lanes = args.num_lanes.unwrap_or(masku_config.num_lanes);
        masku_config.stripe_width = args.stripe_width.unwrap_or(masku_config.stripe_width);
        traffic_config.seed = args.seed.unwrap_or(traffic_config.seed);
    }

    Sim::new(sim_config, masku_config, traffic_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::behavior::Parameterizable;

    const CONFIG: &str = r#"
[sim]
timeout = 50000

[masku]
num_lanes = 4
stripe_width = 8

[traffic]
seed = 7

[[traffic.instructions]]
vl = 100
ew = "e32"
pattern = "first:40"

[[traffic.instructions]]
vl = 64
ew = "e8"
consumer = "store"
pattern = "ones"
"#;

    #[test]
    fn runs_a_toml_workload() {
        let mut sim = make_sim(CONFIG, None).unwrap();
        let summary = sim.simulate().unwrap();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.masku.bits_issued, 164);
        // 40 active e32 elements plus 64 active bytes
        assert_eq!(summary.bytes_strobed, 40 * 4 + 64);
    }

    #[test]
    fn cli_overrides_the_toml() {
        let args = MaskuArgs {
            num_lanes: Some(2),
            seed: Some(99),
            ..MaskuArgs::default()
        };
        let sim = make_sim(CONFIG, Some(&args)).unwrap();
        assert_eq!(sim.unit.conf().num_lanes, 2);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let mut sim = make_sim("", None).unwrap();
        assert!(sim.simulate().unwrap().completed > 0);
    }

    #[test]
    fn bad_geometry_is_rejected() {
        let err = make_sim("[masku]\nstripe_width = 12\n", None).err().unwrap();
        assert!(err.to_string().contains("stripe_width"));
    }
}
