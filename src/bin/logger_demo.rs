use dirauth::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(token_id = "00000000-0000-0000-0000-000000000000", "application debug log");
    info!("application info log");

    let bad = LogConfig {
        filter: "dirauth=notalevel".to_string(),
    };
    println!("Error on bad filter: {:?}", logger.reload_from_config(&bad).is_err());

    Ok(())
}
