use aws_config::{BehaviorVersion, Region};
use aws_sdk_rekognition::Client as RekognitionClient;
use lambda_runtime::{run, service_fn, tracing, Error};
mod config;
mod error;
mod event_handler;
mod object_key;
use config::Config;
use event_handler::{handle_with_env, without_retries};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::subscriber::fmt().json().init();
    let startup = Config::load()?;
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(startup.region.clone()))
        .load()
        .await;
    let rekognition_client = RekognitionClient::from_conf(
        without_retries(aws_sdk_rekognition::config::Builder::from(&shared_config)).build(),
    );
    tracing::info!(region = %startup.region, "Rekognition client ready");

    run(service_fn(|event| handle_with_env(event, &rekognition_client))).await
}
