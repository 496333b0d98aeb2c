//! Optional OTLP trace export, switched on by the `telemetry` build feature
//! plus the standard OTEL environment variables. Without either, the daemon
//! runs on the plain tracing-subscriber stack from main.

use anyhow::Result;

/// Exporter settings pulled from the environment; an absent endpoint means
/// export stays off.
struct OtlpSettings {
    endpoint: String,
    service_name: String,
}

impl OtlpSettings {
    fn from_env() -> Option<Self> {
        let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "drover".to_string());
        Some(Self {
            endpoint,
            service_name,
        })
    }
}

/// Wire the OTLP exporter into the global tracing subscriber, if configured.
pub fn init_telemetry() -> Result<()> {
    let Some(settings) = OtlpSettings::from_env() else {
        tracing::debug!("OTLP export disabled (OTEL_EXPORTER_OTLP_ENDPOINT not set)");
        return Ok(());
    };

    #[cfg(feature = "telemetry")]
    {
        install_exporter(&settings)?;
    }

    #[cfg(not(feature = "telemetry"))]
    {
        tracing::warn!(
            endpoint = %settings.endpoint,
            "OTLP endpoint configured but the 'telemetry' feature is compiled out; \
             rebuild with --features telemetry"
        );
    }

    Ok(())
}

#[cfg(feature = "telemetry")]
fn install_exporter(settings: &OtlpSettings) -> Result<()> {
    use opentelemetry::trace::TracerProvider;
    use opentelemetry_otlp::WithExportConfig;
    use tracing_subscriber::layer::SubscriberExt;

    tracing::info!(
        service_name = %settings.service_name,
        endpoint = %settings.endpoint,
        "Enabling OTLP trace export"
    );

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&settings.endpoint),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;
    let tracer = provider.tracer(settings.service_name.clone());

    let subscriber = tracing_subscriber::registry().with(
        tracing_opentelemetry::layer().with_tracer(tracer),
    );
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("OTLP trace export enabled");

    Ok(())
}
