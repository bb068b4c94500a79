use clap::Parser;
use perfume_pipeline::core::ConfigProvider;
use perfume_pipeline::domain::model::{
    ApiResponse, ErrorResponse, GoodKind, PackagingRequest, ProcessingRequest, UnitId,
};
use perfume_pipeline::utils::error::ErrorSeverity;
use perfume_pipeline::utils::logger;
use perfume_pipeline::utils::validation::{validate_non_empty_string, Validate};
use perfume_pipeline::{CliConfig, Command, LogFormat, PerfumeService, PipelineError, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }
    tracing::info!("Starting perfume-pipeline");

    let config: Box<dyn ConfigProvider> = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            Box::new(TomlConfig::from_file(path).and_then(|c| c.validate().map(|_| c)).map_err(
                |e| {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    e
                },
            )?)
        }
        None => {
            if let Err(e) = cli.validate() {
                tracing::error!("❌ Configuration validation failed: {}", e);
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(1);
            }
            Box::new(cli.clone())
        }
    };

    let service = PerfumeService::from_config(config.as_ref())?;
    let outcome = run(&service, &cli.command).await;
    service.shutdown().await;

    match outcome {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);

            std::process::exit(match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            });
        }
    }
}

async fn run(service: &PerfumeService, command: &Command) -> Result<String, PipelineError> {
    match command {
        Command::Process {
            perfume_name,
            count,
            bottle_size_ml,
            kind,
            plant,
            pack_label,
            sender,
            warehouse,
            send,
        } => {
            // 包裝欄位要在處理前檢查，處理的副作用無法回滾
            if let Some(label) = pack_label {
                validate_non_empty_string("label", label)?;
                validate_non_empty_string("senderAddress", sender.as_deref().unwrap_or_default())?;
                validate_non_empty_string(
                    "destinationWarehouseId",
                    warehouse.as_deref().unwrap_or_default(),
                )?;
            }

            let request = ProcessingRequest {
                perfume_name: perfume_name.clone(),
                count: *count,
                bottle_size_ml: *bottle_size_ml,
                kind: kind.parse::<GoodKind>()?,
                unit_common_name: plant.clone(),
            };
            let goods = service.start_processing(&request).await?;

            let Some(label) = pack_label else {
                return Ok(serde_json::to_string_pretty(&ApiResponse::list(goods))?);
            };

            let packaging = PackagingRequest {
                label: label.clone(),
                sender_address: sender.clone().unwrap_or_default(),
                destination_warehouse_id: warehouse.clone().unwrap_or_default(),
                good_ids: goods.iter().map(|g| g.id).collect(),
            };
            let mut shipment = service.create_packaging(&packaging).await?;
            if *send {
                shipment = service.send_packaging(&shipment.id).await?;
            }
            Ok(serde_json::to_string_pretty(&ApiResponse::ok(shipment))?)
        }
        Command::AdjustOil {
            unit_id,
            percentage,
        } => {
            let unit = service
                .adjust_oil_strength(&UnitId::new(unit_id.clone()), *percentage)
                .await?;
            Ok(serde_json::to_string_pretty(&ApiResponse::ok(unit))?)
        }
    }
}
