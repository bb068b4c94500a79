use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use clap::{Parser, Subcommand, ValueEnum};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "perfume-pipeline")]
#[command(about = "Turns harvested plants into packaged perfumes")]
pub struct CliConfig {
    /// TOML configuration file; overrides the endpoint flags below
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, default_value = "http://localhost:3001/api")]
    pub inventory_endpoint: String,

    #[arg(long, default_value = "http://localhost:3002/api")]
    pub storage_endpoint: String,

    #[arg(long)]
    pub audit_endpoint: Option<String>,

    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "50")]
    pub creation_delay_ms: u64,

    #[arg(long, default_value = "200")]
    pub settle_delay_ms: u64,

    #[arg(long, default_value = "Unknown")]
    pub origin_country: String,

    #[arg(long, default_value = "256")]
    pub audit_queue_capacity: usize,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a processing batch, optionally packing and sending the result
    Process {
        #[arg(long)]
        perfume_name: String,

        #[arg(long)]
        count: u32,

        #[arg(long)]
        bottle_size_ml: u32,

        /// PERFUME or COLOGNE
        #[arg(long, default_value = "PERFUME")]
        kind: String,

        /// Common name of the plant to source
        #[arg(long)]
        plant: String,

        /// Pack the produced goods into a shipment with this label
        #[arg(long, requires_all = ["sender", "warehouse"])]
        pack_label: Option<String>,

        #[arg(long, requires = "pack_label")]
        sender: Option<String>,

        #[arg(long, requires = "pack_label")]
        warehouse: Option<String>,

        /// Send the shipment to storage after packing
        #[arg(long, requires = "pack_label")]
        send: bool,
    },
    /// Adjust a unit's oil strength by a percentage in [-100, 100]
    AdjustOil {
        #[arg(long)]
        unit_id: String,

        #[arg(long, allow_hyphen_values = true)]
        percentage: f64,
    },
}

impl ConfigProvider for CliConfig {
    fn inventory_endpoint(&self) -> &str {
        &self.inventory_endpoint
    }

    fn storage_endpoint(&self) -> &str {
        &self.storage_endpoint
    }

    fn audit_endpoint(&self) -> Option<&str> {
        self.audit_endpoint.as_deref()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn creation_delay(&self) -> Duration {
        Duration::from_millis(self.creation_delay_ms)
    }

    fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    fn default_origin_country(&self) -> &str {
        &self.origin_country
    }

    fn audit_queue_capacity(&self) -> usize {
        self.audit_queue_capacity
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("inventory_endpoint", &self.inventory_endpoint)?;
        validate_url("storage_endpoint", &self.storage_endpoint)?;
        if let Some(audit) = &self.audit_endpoint {
            validate_url("audit_endpoint", audit)?;
        }
        validate_positive_number("timeout_seconds", self.timeout_seconds as usize, 1)?;
        validate_positive_number("audit_queue_capacity", self.audit_queue_capacity, 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_command() {
        let config = CliConfig::try_parse_from([
            "perfume-pipeline",
            "--settle-delay-ms",
            "0",
            "process",
            "--perfume-name",
            "Rose Noir",
            "--count",
            "3",
            "--bottle-size-ml",
            "150",
            "--plant",
            "Rose",
            "--pack-label",
            "Batch 1",
            "--sender",
            "12 Distillery Lane",
            "--warehouse",
            "wh-north",
            "--send",
        ])
        .unwrap();

        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(config.validate().is_ok());
        match config.command {
            Command::Process {
                count,
                bottle_size_ml,
                kind,
                send,
                ..
            } => {
                assert_eq!(count, 3);
                assert_eq!(bottle_size_ml, 150);
                assert_eq!(kind, "PERFUME");
                assert!(send);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_json_log_format() {
        let config = CliConfig::try_parse_from([
            "perfume-pipeline",
            "--log-format",
            "json",
            "adjust-oil",
            "--unit-id",
            "plant-1",
            "--percentage",
            "10",
        ])
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_negative_percentage_is_accepted() {
        let config = CliConfig::try_parse_from([
            "perfume-pipeline",
            "adjust-oil",
            "--unit-id",
            "plant-1",
            "--percentage",
            "-35",
        ])
        .unwrap();

        assert!(matches!(config.command, Command::AdjustOil { percentage, .. } if percentage == -35.0));
    }

    #[test]
    fn test_send_requires_pack_label() {
        let result = CliConfig::try_parse_from([
            "perfume-pipeline",
            "process",
            "--perfume-name",
            "x",
            "--count",
            "1",
            "--bottle-size-ml",
            "50",
            "--plant",
            "Rose",
            "--send",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pack_label_requires_sender_and_warehouse() {
        let base = [
            "perfume-pipeline",
            "process",
            "--perfume-name",
            "x",
            "--count",
            "1",
            "--bottle-size-ml",
            "50",
            "--plant",
            "Rose",
            "--pack-label",
            "Batch 1",
        ];
        let with = |extra: &[&'static str]| base.iter().chain(extra).copied().collect::<Vec<_>>();

        assert!(CliConfig::try_parse_from(base).is_err());
        assert!(CliConfig::try_parse_from(with(&["--sender", "Grasse"])).is_err());
        assert!(CliConfig::try_parse_from(with(&["--warehouse", "wh-1"])).is_err());
        assert!(
            CliConfig::try_parse_from(with(&["--sender", "Grasse", "--warehouse", "wh-1"])).is_ok()
        );
    }
}
